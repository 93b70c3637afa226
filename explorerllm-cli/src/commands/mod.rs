mod backup;
mod migrate;
mod restore;
mod status;
mod verify;

// Pipeline commands
pub use backup::run_backup;
pub use migrate::{MigrateRequest, run_migrate};
pub use restore::run_restore;

// Read-only commands
pub use status::run_status;
pub use verify::run_verify;

use explorerllm_core::pipeline::PipelineReport;
use tracing::{info, warn};

/// 流水线结束后的摘要：警告列表和备份集位置
fn log_report(report: &PipelineReport) {
    if report.dry_run {
        info!("🔍 [DRY RUN] 以上操作均未执行");
    }
    if let Some(set) = &report.backup_set {
        info!("📁 备份集: {}", set.dir());
        for file in set.files() {
            info!("   - {}", file);
        }
    }
    if !report.warnings.is_empty() {
        warn!("⚠️  共 {} 条警告:", report.warnings.len());
        for warning in &report.warnings {
            warn!("   - {}", warning);
        }
    }
}
