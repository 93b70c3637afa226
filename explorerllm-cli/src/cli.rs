use crate::project_info::{metadata, version_info};
use clap::{Parser, Subcommand};
use explorerllm_core::constants::env;
use std::path::PathBuf;

/// ExplorerLLM CLI - Ollama + OpenWebUI 部署的备份、恢复与迁移工具
#[derive(Parser, Debug)]
#[command(name = "explorerllm")]
#[command(about = metadata::PROJECT_DESCRIPTION)]
#[command(version = version_info::CLI_VERSION)]
#[command(long_about = metadata::display::DESCRIPTION_LONG)]
#[command(author = metadata::PROJECT_AUTHORS)]
pub struct Cli {
    /// 配置文件路径（默认依次查找 config.toml、explorerllm.toml、.explorerllm.toml）
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 详细输出
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// 冷备份：停止服务、快照数据卷、复制 compose 配置、重新启动服务
    Backup {
        /// 备份根目录（默认使用配置中的 backup.storage_dir）
        directory: Option<PathBuf>,
        /// 只显示将要执行的操作
        #[arg(long)]
        dry_run: bool,
    },
    /// 从备份集目录恢复数据卷和配置
    Restore {
        /// 备份集目录，例如 ./backups/explorerllm_20250101_020000
        backup_directory: PathBuf,
        /// 服务运行中时强制恢复（会先停止服务）
        #[arg(long)]
        force: bool,
        /// 只显示将要执行的操作，校验照常进行
        #[arg(long)]
        dry_run: bool,
        /// 保留当前的 docker-compose.yml
        #[arg(long)]
        skip_config: bool,
    },
    /// 把整个部署从源主机迁移到目标主机
    Migrate {
        /// 源主机
        source_host: String,
        /// 目标主机
        destination_host: String,
        /// 两台主机的 SSH 用户
        #[arg(short, long, env = env::REMOTE_USER)]
        user: Option<String>,
        /// 两台主机上的项目目录
        #[arg(short, long, env = env::REMOTE_PATH)]
        path: Option<String>,
        /// SSH 私钥文件
        #[arg(short = 'k', long = "key", env = env::SSH_KEY)]
        key: Option<String>,
        /// 只显示将要执行的操作
        #[arg(long)]
        dry_run: bool,
        /// 不检查也不安装目标主机的 docker
        #[arg(long)]
        skip_docker: bool,
        /// 不迁移数据卷，只同步项目目录
        #[arg(long)]
        skip_backup: bool,
    },
    /// 校验备份集：识别文件并逐条目检查归档完整性（只读）
    Verify {
        /// 备份集目录
        backup_directory: PathBuf,
    },
    /// 显示服务状态和已有备份
    Status,
    /// 生成带注释的配置文件模板
    Init {
        /// 如果配置文件已存在，强制覆盖
        #[arg(long)]
        force: bool,
    },
}

impl Commands {
    /// 被中断时可能残留的状态，用于提示操作员
    pub fn interrupt_notice(&self) -> Option<&'static str> {
        match self {
            Commands::Backup { .. } => Some("服务可能处于停止状态，未完成的备份集目录可能残留"),
            Commands::Restore { .. } => {
                Some("服务可能处于停止状态，数据卷可能只恢复了一部分，请重新执行恢复")
            }
            Commands::Migrate { .. } => Some(
                "源主机服务可能处于停止状态，两台主机的 .migration/ 目录和本机暂存目录可能残留",
            ),
            Commands::Verify { .. } | Commands::Status | Commands::Init { .. } => None,
        }
    }
}
