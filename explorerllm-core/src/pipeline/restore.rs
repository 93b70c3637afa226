use super::context::PipelineContext;
use super::orchestrator::{BackupRestoreOrchestrator, Site, absolute};
use super::types::{
    HealthCheckWarning, PipelineKind, PipelineOptions, PipelineReport, PipelineState,
    PipelineWarning,
};
use crate::archive::ArchiveTransport;
use crate::backup_set::BackupSet;
use crate::constants::backup;
use crate::service::ServiceState;
use crate::{Result, StackError};
use chrono::Local;
use std::path::Path;
use tracing::info;

impl BackupRestoreOrchestrator {
    /// 从备份集目录恢复本机部署
    pub async fn restore(&self, dir: &Path, options: PipelineOptions) -> Result<PipelineReport> {
        let executor = self.executor(options.dry_run);
        let site = self.local_site(&executor)?;
        let set_dir = absolute(dir)?;

        let mut ctx = PipelineContext::new(PipelineKind::Restore, executor, options);
        match self.run_restore(&mut ctx, &site, &set_dir).await {
            Ok(set) => Ok(ctx.finish(Some(set))),
            Err(e) => Err(ctx.fail(e)),
        }
    }

    /// 恢复流程主体，迁移时也在目标主机上复用
    pub(crate) async fn run_restore(
        &self,
        ctx: &mut PipelineContext,
        site: &Site,
        set_dir: &str,
    ) -> Result<BackupSet> {
        // 1. 校验（dry-run 下同样执行）
        self.check_dependencies(&ctx.executor, site).await?;
        let set = load_backup_set(&site.archives, set_dir).await?;
        info!(
            "📁 备份集 {}: {}, {}",
            set.id(),
            set.webui_archive(),
            set.models_archive()
        );
        if set.config_file().is_none() && !ctx.options.skip_config {
            ctx.warn(PipelineWarning::ConfigMissing(set_dir.to_string()));
        }

        let state = site.services.status().await;
        info!("📊 {}服务状态: {}", site.label(), state.display_name());
        match state {
            ServiceState::Running if !ctx.options.force_restore => {
                return Err(StackError::ServicesRunning(format!(
                    "{}的服务正在运行，恢复会覆盖正在使用的数据卷",
                    site.label()
                )));
            }
            ServiceState::Unknown => ctx.warn_health(HealthCheckWarning::StatusUnavailable),
            _ => {}
        }
        ctx.advance(PipelineState::Validated);

        // 2. 强制恢复时先停服务
        if state == ServiceState::Running {
            site.services.stop().await?;
        }
        ctx.advance(PipelineState::ServicesQuiesced);

        // 3. 数据卷
        site.archives
            .apply(set.dir(), set.webui_archive(), &self.config.volumes.webui)
            .await?;
        site.archives
            .apply(set.dir(), set.models_archive(), &self.config.volumes.models)
            .await?;
        ctx.advance(PipelineState::DataTransferred);

        // 4. 配置
        match set.config_file() {
            Some(_) if ctx.options.skip_config => info!("⏭️  跳过配置恢复 (--skip-config)"),
            Some(config) => {
                let source = site.archives.join(set.dir(), config);
                if site.archives.exists(&site.compose_file).await? {
                    let aside = format!(
                        "{}.pre-restore_{}",
                        site.compose_file,
                        Local::now().format(backup::TIMESTAMP_FORMAT)
                    );
                    info!("💾 现有配置另存为 {}", aside);
                    site.archives.rename(&site.compose_file, &aside).await?;
                } else if let Some(parent) = Path::new(&site.compose_file).parent() {
                    site.archives.ensure_dir(&parent.to_string_lossy()).await?;
                }
                site.archives.copy_file(&source, &site.compose_file).await?;
            }
            None => {}
        }
        ctx.advance(PipelineState::ConfigApplied);

        // 5. 启动
        site.services.start().await?;
        ctx.advance(PipelineState::ServicesResumed);

        // 6. 健康检查
        self.check_health(ctx, site).await;
        ctx.advance(PipelineState::Verified);

        Ok(set)
    }
}

/// 读取目录并识别备份集：优先 JSON 清单，否则按文件名匹配
pub(crate) async fn load_backup_set(archives: &ArchiveTransport, dir: &str) -> Result<BackupSet> {
    if !archives.exists(dir).await? {
        return Err(StackError::invalid_backup_set(format!("目录不存在: {dir}")));
    }
    let listing = archives.list_dir(dir).await?;
    let manifest_json = archives
        .read_text(&archives.join(dir, backup::JSON_MANIFEST_NAME))
        .await?;
    let manifest_text = archives
        .read_text(&archives.join(dir, backup::TEXT_MANIFEST_NAME))
        .await?;
    BackupSet::resolve(dir, &listing, manifest_json.as_deref(), manifest_text)
}
