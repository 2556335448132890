pub mod call_tree;
pub mod class_group;

pub use call_tree::{CallNode, CallTree, FunctionType, ROOT_KEY};
pub use class_group::{ClassGroup, GroupSet, MethodStats};
