use explorerllm_core::{config::AppConfig, error::Result};
use std::path::Path;
use tracing::{info, warn};

/// 生成带注释的配置文件模板
pub async fn run_init(path: &Path, force: bool) -> Result<()> {
    info!("🦙 ExplorerLLM 初始化");
    info!("======================");

    if path.exists() && !force {
        warn!("⚠️  配置文件已存在: {}", path.display());
        info!("如果您要重新生成，请使用 --force 参数");
        info!("示例: explorerllm init --force");
        return Ok(());
    }

    let config = AppConfig::default();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    config.save_to_file(path)?;
    info!("   ✅ 创建配置文件: {}", path.display());
    info!("   📁 默认备份目录: {}", config.backup.storage_dir);
    info!("💡 编辑配置中的数据卷名称和 compose 文件路径后即可运行 `explorerllm backup`");
    Ok(())
}
