use super::log_report;
use crate::app::CliApp;
use explorerllm_core::{error::Result, pipeline::PipelineOptions};
use std::path::Path;
use tracing::{info, warn};

/// 从备份集恢复
pub async fn run_restore(
    app: &CliApp,
    dir: &Path,
    force: bool,
    dry_run: bool,
    skip_config: bool,
) -> Result<()> {
    info!("🔄 从备份恢复");
    info!("=============");
    if force {
        warn!("⚠️  --force: 运行中的服务将被停止，数据卷会被覆盖");
    }

    let options = PipelineOptions {
        force_restore: force,
        dry_run,
        skip_config,
        ..PipelineOptions::default()
    };
    let report = app.orchestrator.restore(dir, options).await?;
    log_report(&report);
    Ok(())
}
