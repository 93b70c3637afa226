use clap::Parser;
use explorerllm_cli::{Cli, CliApp, Commands, run_init, setup_logging};
use explorerllm_core::constants::config;
use std::path::PathBuf;
use tracing::{error, info, warn};

const EXIT_FAILURE: i32 = 1;
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    // 解析命令行参数
    let cli = Cli::parse();

    // 设置日志记录
    setup_logging(cli.verbose);

    // `init` 命令不需要预先加载配置
    if let Commands::Init { force } = cli.command {
        let path = cli
            .config
            .unwrap_or_else(|| PathBuf::from(config::CONFIG_FILE_NAME));
        if let Err(e) = run_init(&path, force).await {
            error!("❌ 初始化失败: {}", e);
            std::process::exit(EXIT_FAILURE);
        }
        return;
    }

    let app = match CliApp::new(cli.config.as_deref()) {
        Ok(app) => app,
        Err(e) => {
            error!("❌ 加载配置失败: {}", e);
            info!("👉 可以运行 'explorerllm init' 生成配置文件模板");
            std::process::exit(EXIT_FAILURE);
        }
    };

    // 流水线与 Ctrl-C 竞争；中断时不做任何自动恢复，只提示可能的残留
    let notice = cli.command.interrupt_notice();
    let result = tokio::select! {
        result = app.run_command(cli.command) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("⚠️  操作被中断");
            if let Some(notice) = notice {
                warn!("   {}", notice);
            }
            std::process::exit(EXIT_INTERRUPTED);
        }
    };

    if let Err(e) = result {
        error!("❌ 操作失败: {}", e);
        if let Some(hint) = e.remediation() {
            info!("💡 {}", hint);
        }
        std::process::exit(EXIT_FAILURE);
    }
}
