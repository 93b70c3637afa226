use super::log_report;
use crate::app::CliApp;
use explorerllm_core::{error::Result, pipeline::PipelineOptions};
use std::path::Path;
use tracing::info;

/// 创建备份
pub async fn run_backup(app: &CliApp, directory: Option<&Path>, dry_run: bool) -> Result<()> {
    info!("💾 创建数据备份");
    info!("===============");

    let options = PipelineOptions {
        dry_run,
        ..PipelineOptions::default()
    };
    let report = app.orchestrator.backup(directory, options).await?;
    log_report(&report);

    if let Some(set) = report.backup_set.as_ref().filter(|_| !report.dry_run) {
        info!("💡 恢复命令: explorerllm restore {}", set.dir());
    }
    Ok(())
}
