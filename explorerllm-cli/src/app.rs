use crate::cli::Commands;
use crate::commands;
use explorerllm_core::{
    config::AppConfig, error::Result, pipeline::BackupRestoreOrchestrator, process::SystemRunner,
};
use std::path::Path;
use std::sync::Arc;

pub struct CliApp {
    pub config: AppConfig,
    pub orchestrator: BackupRestoreOrchestrator,
}

impl CliApp {
    /// 加载配置（指定文件或自动查找）并叠加环境变量
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => {
                tracing::debug!("使用配置文件: {}", path.display());
                AppConfig::load_from_file(path)?
            }
            None => AppConfig::find_and_load_config()?,
        };
        config.apply_env_overrides();
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: AppConfig) -> Self {
        let orchestrator = BackupRestoreOrchestrator::new(config.clone(), Arc::new(SystemRunner));
        Self {
            config,
            orchestrator,
        }
    }

    /// 运行应用命令
    pub async fn run_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Backup { directory, dry_run } => {
                commands::run_backup(self, directory.as_deref(), dry_run).await
            }
            Commands::Restore {
                backup_directory,
                force,
                dry_run,
                skip_config,
            } => {
                commands::run_restore(self, &backup_directory, force, dry_run, skip_config).await
            }
            Commands::Migrate {
                source_host,
                destination_host,
                user,
                path,
                key,
                dry_run,
                skip_docker,
                skip_backup,
            } => {
                let request = commands::MigrateRequest {
                    source_host,
                    destination_host,
                    user,
                    path,
                    key,
                    dry_run,
                    skip_docker,
                    skip_backup,
                };
                commands::run_migrate(self, request).await
            }
            Commands::Verify { backup_directory } => {
                commands::run_verify(self, &backup_directory).await
            }
            Commands::Status => commands::run_status(self).await,
            Commands::Init { .. } => unreachable!(), // 已经在 main.rs 中处理
        }
    }
}
