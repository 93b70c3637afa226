use super::orchestrator::{BackupRestoreOrchestrator, absolute};
use super::restore::load_backup_set;
use super::types::{HealthCheckWarning, PipelineWarning, VerifyReport};
use crate::Result;
use crate::archive::inspect_archive;
use crate::service::ServiceState;
use std::path::Path;
use tracing::{info, warn};

impl BackupRestoreOrchestrator {
    /// 只读检查备份集：识别文件、逐条目校验归档、报告当前服务状态
    pub async fn verify(&self, dir: &Path) -> Result<VerifyReport> {
        let executor = self.executor(false);
        let site = self.local_site(&executor)?;
        let set_dir = absolute(dir)?;

        info!("🔍 校验备份集: {}", set_dir);
        let set = load_backup_set(&site.archives, &set_dir).await?;

        let mut archives = Vec::new();
        for file in [set.webui_archive(), set.models_archive()] {
            let summary = inspect_archive(&Path::new(set.dir()).join(file)).await?;
            info!(
                "✅ {}: {} 个条目, {} 字节",
                file, summary.entries, summary.unpacked_bytes
            );
            archives.push(summary);
        }

        let config_bytes = match set.config_file() {
            Some(config) => {
                let path = Path::new(set.dir()).join(config);
                Some(tokio::fs::metadata(&path).await?.len())
            }
            None => None,
        };

        let mut warnings = Vec::new();
        if set.config_file().is_none() {
            warnings.push(PipelineWarning::ConfigMissing(set_dir.clone()));
        }

        // 服务状态只是参考信息，docker 不可用时不影响校验结果
        let (service_state, model_count) = match self.check_dependencies(&executor, &site).await {
            Ok(()) => {
                let state = site.services.status().await;
                let models = if state == ServiceState::Running {
                    match site.services.model_count().await {
                        Ok(count) => Some(count),
                        Err(e) => {
                            warnings.push(HealthCheckWarning::ModelCheckFailed(e.to_string()).into());
                            None
                        }
                    }
                } else {
                    None
                };
                (state, models)
            }
            Err(e) => {
                warn!("无法查询服务状态: {}", e);
                warnings.push(HealthCheckWarning::StatusUnavailable.into());
                (ServiceState::Unknown, None)
            }
        };
        if model_count == Some(0) {
            warnings.push(HealthCheckWarning::NoModels.into());
        }

        Ok(VerifyReport {
            backup_set: set,
            archives,
            config_bytes,
            service_state,
            model_count,
            warnings,
        })
    }
}
