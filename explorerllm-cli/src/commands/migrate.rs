use super::log_report;
use crate::app::CliApp;
use explorerllm_core::{
    config::AppConfig,
    error::Result,
    pipeline::{MigrationPlan, PipelineOptions},
    process::RemoteTarget,
};
use tracing::info;

/// `migrate` 子命令的参数
#[derive(Debug, Clone, Default)]
pub struct MigrateRequest {
    pub source_host: String,
    pub destination_host: String,
    pub user: Option<String>,
    pub path: Option<String>,
    pub key: Option<String>,
    pub dry_run: bool,
    pub skip_docker: bool,
    pub skip_backup: bool,
}

impl MigrateRequest {
    /// 命令行参数优先，其次是配置（已叠加环境变量）
    pub fn plan(&self, config: &AppConfig) -> MigrationPlan {
        let user = self.user.clone().unwrap_or_else(|| config.remote.user.clone());
        let base_path = self
            .path
            .clone()
            .unwrap_or_else(|| config.remote.base_path.clone());
        let key = self.key.clone().or_else(|| config.remote.ssh_key.clone());

        let target = |host: &str| RemoteTarget::new(host, user.as_str(), key.clone(), base_path.as_str());
        MigrationPlan {
            source: target(&self.source_host),
            destination: target(&self.destination_host),
        }
    }

    pub fn options(&self) -> PipelineOptions {
        PipelineOptions {
            dry_run: self.dry_run,
            skip_docker: self.skip_docker,
            skip_backup: self.skip_backup,
            ..PipelineOptions::default()
        }
    }
}

/// 在两台主机之间迁移部署
pub async fn run_migrate(app: &CliApp, request: MigrateRequest) -> Result<()> {
    info!("🚚 迁移部署");
    info!("===========");

    let plan = request.plan(&app.config);
    info!("   源主机:   {} ({})", plan.source, plan.source.base_path);
    info!("   目标主机: {} ({})", plan.destination, plan.destination.base_path);

    let report = app.orchestrator.migrate(&plan, request.options()).await?;
    log_report(&report);
    if !report.dry_run {
        info!("✅ 部署已迁移到 {}", plan.destination);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> MigrateRequest {
        MigrateRequest {
            source_host: "old-box".to_string(),
            destination_host: "new-box".to_string(),
            ..MigrateRequest::default()
        }
    }

    #[test]
    fn test_plan_uses_config_defaults() {
        let mut config = AppConfig::default();
        config.remote.ssh_key = Some("/keys/deploy".to_string());

        let plan = request().plan(&config);
        assert_eq!(plan.source.host, "old-box");
        assert_eq!(plan.destination.host, "new-box");
        assert_eq!(plan.source.user, "root");
        assert_eq!(plan.destination.base_path, "/opt/explorerllm");
        assert_eq!(plan.destination.ssh_key.as_deref(), Some("/keys/deploy"));
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = AppConfig::default();
        config.apply_overrides_from(|key| match key {
            "REMOTE_USER" => Some("from-env".to_string()),
            _ => None,
        });

        let mut request = request();
        assert_eq!(request.plan(&config).source.user, "from-env");

        request.user = Some("from-flag".to_string());
        request.path = Some("/srv/llm".to_string());
        request.skip_backup = true;
        let plan = request.plan(&config);
        assert_eq!(plan.source.user, "from-flag");
        assert_eq!(plan.source.base_path, "/srv/llm");
        assert!(request.options().skip_backup);
        assert!(!request.options().force_restore);
    }
}
