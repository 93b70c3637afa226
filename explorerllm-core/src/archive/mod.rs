// 模块声明
mod inspect;
mod sync;
mod transport;

// 重新导出公共API
pub use inspect::{ArchiveSummary, inspect_archive};
pub use sync::{SyncRequest, remote_sync};
pub use transport::ArchiveTransport;
