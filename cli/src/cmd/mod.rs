//! 命令实现

pub mod consume;
pub mod publish;
pub mod topic;
