use crate::app::CliApp;
use crate::utils::format_bytes;
use explorerllm_core::error::Result;
use std::path::Path;
use tracing::{info, warn};

/// 校验备份集（只读）
pub async fn run_verify(app: &CliApp, dir: &Path) -> Result<()> {
    info!("🔍 校验备份集");
    info!("=============");

    let report = app.orchestrator.verify(dir).await?;
    let set = &report.backup_set;
    info!("📁 {} ({})", set.id(), set.dir());
    for archive in &report.archives {
        info!(
            "   ✅ {}: {} 个条目, 解压后 {}, 归档 {}",
            archive
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            archive.entries,
            format_bytes(archive.unpacked_bytes),
            format_bytes(archive.archive_bytes)
        );
    }
    match (set.config_file(), report.config_bytes) {
        (Some(config), Some(bytes)) => info!("   ✅ {}: {}", config, format_bytes(bytes)),
        _ => info!("   ➖ 未包含 compose 配置"),
    }

    info!("📊 当前服务状态: {}", report.service_state.display_name());
    if let Some(count) = report.model_count {
        info!("🧠 已安装模型: {} 个", count);
    }
    for warning in &report.warnings {
        warn!("⚠️  {}", warning);
    }
    info!("✅ 备份集完整，可用于恢复: explorerllm restore {}", set.dir());
    Ok(())
}
