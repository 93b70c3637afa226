use super::context::PipelineContext;
use super::orchestrator::{BackupRestoreOrchestrator, Site, absolute, compose_file_name};
use super::types::{
    HealthCheckWarning, PipelineKind, PipelineOptions, PipelineReport, PipelineState,
    PipelineWarning,
};
use crate::Result;
use crate::backup_set::{
    BackupNames, BackupSet, build_manifest, expired_sets, render_text_manifest,
};
use crate::constants::backup;
use crate::service::ServiceState;
use chrono::Local;
use std::path::Path;
use tracing::{info, warn};

/// 一次备份的目标位置
pub(crate) struct BackupTarget<'a> {
    /// 备份根目录，备份集目录会建在它下面
    pub root: String,
    /// 是否按保留期清理根目录下的旧备份集
    pub prune: bool,
    pub site: &'a Site,
}

impl BackupRestoreOrchestrator {
    /// 备份本机部署
    ///
    /// `directory` 为空时使用配置中的备份目录。
    pub async fn backup(
        &self,
        directory: Option<&Path>,
        options: PipelineOptions,
    ) -> Result<PipelineReport> {
        let executor = self.executor(options.dry_run);
        let site = self.local_site(&executor)?;
        let root = match directory {
            Some(dir) => absolute(dir)?,
            None => absolute(&self.config.get_backup_dir())?,
        };

        let mut ctx = PipelineContext::new(PipelineKind::Backup, executor, options);
        let target = BackupTarget {
            root,
            prune: true,
            site: &site,
        };
        match self.run_backup(&mut ctx, &target).await {
            Ok(set) => Ok(ctx.finish(Some(set))),
            Err(e) => Err(ctx.fail(e)),
        }
    }

    /// 备份流程主体，迁移时也在源主机上复用
    pub(crate) async fn run_backup(
        &self,
        ctx: &mut PipelineContext,
        target: &BackupTarget<'_>,
    ) -> Result<BackupSet> {
        let site = target.site;

        // 1. 依赖检查
        self.check_dependencies(&ctx.executor, site).await?;
        ctx.advance(PipelineState::Validated);

        // 2. 停止服务
        let prior = site.services.status().await;
        info!("📊 {}服务状态: {}", site.label(), prior.display_name());
        if prior == ServiceState::Unknown {
            ctx.warn_health(HealthCheckWarning::StatusUnavailable);
        }
        let stopped = prior != ServiceState::Stopped;
        if stopped {
            site.services.stop().await?;
        }
        ctx.advance(PipelineState::ServicesQuiesced);

        // 3-4. 数据和配置；失败时尽力把服务拉起来再返回错误
        let now = Local::now();
        let names = BackupNames::at(&self.config.project.name, now.naive_local());
        let set_dir = site.archives.join(&target.root, &names.id);
        let config_file = match self.capture(ctx, site, target, &names, &set_dir).await {
            Ok(config_file) => config_file,
            Err(e) => {
                if stopped {
                    warn!("🔄 备份失败，尝试恢复服务运行...");
                    if let Err(resume) = site.services.start().await {
                        warn!("恢复服务失败: {}", resume);
                    }
                }
                return Err(e);
            }
        };

        // 5. 无论之前状态如何都启动服务
        site.services.start().await?;
        ctx.advance(PipelineState::ServicesResumed);

        // 6. 健康检查与旧备份清理
        self.check_health(ctx, site).await;
        if target.prune {
            self.prune_expired(ctx, site, &target.root, &names.id, now.naive_local())
                .await?;
        }
        ctx.advance(PipelineState::Verified);

        // 7. 清单
        let manifest = build_manifest(
            &self.config.project.name,
            &names,
            config_file.as_deref(),
            now,
        );
        let host = site.host.as_ref().map(|h| h.to_string());
        let text = render_text_manifest(
            &manifest,
            &set_dir,
            &self.config.volumes.webui,
            &self.config.volumes.models,
            host.as_deref(),
        );
        site.archives
            .write_text(
                &site.archives.join(&set_dir, backup::JSON_MANIFEST_NAME),
                &serde_json::to_string_pretty(&manifest)?,
            )
            .await?;
        site.archives
            .write_text(&site.archives.join(&set_dir, backup::TEXT_MANIFEST_NAME), &text)
            .await?;

        info!("📁 备份集: {}", set_dir);
        BackupSet::new(
            names.id,
            set_dir,
            names.webui_archive,
            names.models_archive,
            config_file,
            text,
        )
    }

    /// 快照两个数据卷并复制 compose 配置，返回写入备份集的配置文件名
    async fn capture(
        &self,
        ctx: &mut PipelineContext,
        site: &Site,
        target: &BackupTarget<'_>,
        names: &BackupNames,
        set_dir: &str,
    ) -> Result<Option<String>> {
        site.archives.ensure_dir(&target.root).await?;
        site.archives.ensure_dir(set_dir).await?;
        site.archives
            .snapshot(&self.config.volumes.webui, set_dir, &names.webui_archive)
            .await?;
        site.archives
            .snapshot(&self.config.volumes.models, set_dir, &names.models_archive)
            .await?;
        ctx.advance(PipelineState::DataTransferred);

        let config_file = if site.archives.exists(&site.compose_file).await? {
            let name = compose_file_name(&site.compose_file);
            let destination = site.archives.join(set_dir, &name);
            if site.archives.exists(&destination).await? {
                let aside = format!("{destination}.{}.bak", names.timestamp);
                info!("已存在同名配置，重命名为 {}", aside);
                site.archives.rename(&destination, &aside).await?;
            }
            site.archives
                .copy_file(&site.compose_file, &destination)
                .await?;
            Some(name)
        } else {
            ctx.warn(PipelineWarning::ConfigMissing(site.compose_file.clone()));
            None
        };
        ctx.advance(PipelineState::ConfigApplied);
        Ok(config_file)
    }

    /// 删除根目录下超过保留期的备份集（按目录名中的时间戳判断）
    async fn prune_expired(
        &self,
        ctx: &mut PipelineContext,
        site: &Site,
        root: &str,
        current: &str,
        now: chrono::NaiveDateTime,
    ) -> Result<()> {
        let days = self.config.backup.retention_days;
        let listing = site.archives.list_dir(root).await?;
        let expired = expired_sets(&self.config.project.name, &listing, now, days);

        for name in expired.into_iter().filter(|name| name != current) {
            info!("🗑️  删除超过 {} 天的备份: {}", days, name);
            if let Err(e) = site.archives.remove_dir(&site.archives.join(root, &name)).await {
                ctx.warn(PipelineWarning::PruneFailed {
                    set: name,
                    reason: e.to_string(),
                });
            }
        }
        Ok(())
    }
}
