// 模块声明
mod backup;
mod context;
mod migrate;
mod orchestrator;
mod restore;
mod types;
mod verify;

// 重新导出公共API
pub use migrate::MigrationPlan;
pub use orchestrator::BackupRestoreOrchestrator;
pub use types::{
    HealthCheckWarning, PipelineKind, PipelineOptions, PipelineReport, PipelineState,
    PipelineWarning, StackStatus, VerifyReport,
};
