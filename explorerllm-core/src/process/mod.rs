// 模块声明
mod runner;
mod ssh;
mod types;

// 重新导出公共API
pub use runner::{Executor, ProcessRunner, SystemRunner};
pub use ssh::{rsync_location, rsync_remote_shell, shell_quote};
pub use types::{CommandOutput, CommandSpec, RemoteTarget, join_remote};
