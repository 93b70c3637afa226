use super::context::PipelineContext;
use super::types::{HealthCheckWarning, StackStatus};
use crate::archive::ArchiveTransport;
use crate::config::AppConfig;
use crate::constants::docker;
use crate::process::{Executor, ProcessRunner, RemoteTarget};
use crate::service::{Readiness, ServiceController, ServiceState};
use crate::{Result, StackError};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// 备份、恢复、迁移、校验四条流水线的入口
///
/// 本身不保存运行状态；每次调用创建独立的 [`PipelineContext`]，
/// 可以在同一进程内依次执行多次。
pub struct BackupRestoreOrchestrator {
    pub(crate) config: AppConfig,
    runner: Arc<dyn ProcessRunner>,
}

/// 流水线操作的一端（本机或远程主机）
#[derive(Debug)]
pub(crate) struct Site {
    pub host: Option<RemoteTarget>,
    pub services: ServiceController,
    pub archives: ArchiveTransport,
    /// 该主机上 compose 文件的绝对路径
    pub compose_file: String,
}

impl Site {
    pub fn label(&self) -> String {
        match &self.host {
            Some(host) => host.to_string(),
            None => "本机".to_string(),
        }
    }
}

impl BackupRestoreOrchestrator {
    pub fn new(config: AppConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub(crate) fn executor(&self, dry_run: bool) -> Executor {
        Executor::new(self.runner.clone(), dry_run)
    }

    pub(crate) fn local_site(&self, executor: &Executor) -> Result<Site> {
        let compose_file = absolute(Path::new(&self.config.project.compose_file))?;
        Ok(self.site(executor, None, compose_file))
    }

    pub(crate) fn remote_site(&self, executor: &Executor, target: &RemoteTarget) -> Site {
        let compose_file = target.project_path(&compose_file_name(&self.config.project.compose_file));
        self.site(executor, Some(target.clone()), compose_file)
    }

    fn site(&self, executor: &Executor, host: Option<RemoteTarget>, compose_file: String) -> Site {
        Site {
            services: ServiceController::new(
                executor.clone(),
                host.clone(),
                compose_file.as_str(),
                self.config.project.name.as_str(),
                self.config.health.models_service.as_str(),
            ),
            archives: ArchiveTransport::new(
                executor.clone(),
                host.clone(),
                self.config.volumes.helper_image.as_str(),
            ),
            host,
            compose_file,
        }
    }

    /// docker 与 compose 是否可用
    pub(crate) async fn check_dependencies(&self, executor: &Executor, site: &Site) -> Result<()> {
        if site.host.is_none() && !executor.locate("docker") {
            return Err(StackError::missing_dependency("本机未找到 docker"));
        }
        site.services.detect_compose().await?;
        Ok(())
    }

    /// 启动后的就绪轮询与模型检查；结果只记为警告
    pub(crate) async fn check_health(&self, ctx: &mut PipelineContext, site: &Site) {
        if ctx.options.dry_run {
            info!("🔍 [DRY RUN] 将等待{}服务就绪并检查模型", site.label());
            return;
        }

        let readiness = site
            .services
            .wait_until_running(self.config.start_timeout(), self.config.poll_interval())
            .await;
        match readiness {
            Readiness::Ready { waited } => {
                info!("✅ {}服务已就绪 (等待 {} 秒)", site.label(), waited.as_secs());
                match site.services.model_count().await {
                    Ok(0) => ctx.warn_health(HealthCheckWarning::NoModels),
                    Ok(count) => info!("🧠 已安装模型: {} 个", count),
                    Err(e) => ctx.warn_health(HealthCheckWarning::ModelCheckFailed(e.to_string())),
                }
            }
            Readiness::NotReady { last, waited } => {
                ctx.warn_health(HealthCheckWarning::NotReady { last, waited })
            }
            Readiness::FailedToStart { waited } => {
                ctx.warn_health(HealthCheckWarning::FailedToStart { waited })
            }
        }
    }

    /// 当前部署的服务状态、容器列表和已有备份
    pub async fn status(&self) -> Result<StackStatus> {
        let executor = self.executor(false);
        let site = self.local_site(&executor)?;
        self.check_dependencies(&executor, &site).await?;

        let containers = site.services.containers().await.unwrap_or_else(|e| {
            debug!("查询容器失败: {}", e);
            Vec::new()
        });
        let service_state = site.services.status().await;
        let model_count = if service_state == ServiceState::Running {
            site.services.model_count().await.ok()
        } else {
            None
        };

        let backup_root = absolute(&self.config.get_backup_dir())?;
        let backup_sets = site
            .archives
            .list_dir(&backup_root)
            .await?
            .into_iter()
            .filter(|name| name.starts_with(&format!("{}_", self.config.project.name)))
            .collect();

        Ok(StackStatus {
            service_state,
            containers,
            model_count,
            backup_root,
            backup_sets,
        })
    }
}

/// 本机路径转为绝对路径（辅助容器挂载需要）
pub(crate) fn absolute(path: &Path) -> Result<String> {
    Ok(std::path::absolute(path)?.to_string_lossy().to_string())
}

/// 配置中 compose 文件的文件名部分
pub(crate) fn compose_file_name(compose_file: &str) -> String {
    Path::new(compose_file)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| docker::COMPOSE_FILE_NAME.to_string())
}
