use crate::app::CliApp;
use crate::project_info::get_version_string;
use explorerllm_core::error::Result;
use tracing::info;

/// 显示服务状态和已有备份
pub async fn run_status(app: &CliApp) -> Result<()> {
    info!("📊 {}", get_version_string());
    info!("==========================");

    let status = app.orchestrator.status().await?;
    info!("🐳 compose 文件: {}", app.config.project.compose_file);
    info!("服务状态: {}", status.service_state.display_name());
    for container in &status.containers {
        info!(
            "   - {} ({}): {}",
            container.name,
            container.service,
            if container.status.is_empty() {
                container.state.as_str()
            } else {
                container.status.as_str()
            }
        );
    }
    if let Some(count) = status.model_count {
        info!("🧠 已安装模型: {} 个", count);
    }

    info!("💾 备份目录: {}", status.backup_root);
    if status.backup_sets.is_empty() {
        info!("   (暂无备份)");
    } else {
        for set in &status.backup_sets {
            info!("   - {}", set);
        }
        info!(
            "   保留期: {} 天，超过的备份在下次备份时清理",
            app.config.backup.retention_days
        );
    }
    Ok(())
}
