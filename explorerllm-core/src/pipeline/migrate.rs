use super::backup::BackupTarget;
use super::context::PipelineContext;
use super::orchestrator::BackupRestoreOrchestrator;
use super::types::{PipelineKind, PipelineOptions, PipelineReport, PipelineState, PipelineWarning};
use crate::archive::{SyncRequest, remote_sync};
use crate::constants::{backup, migration};
use crate::process::{CommandSpec, Executor, RemoteTarget};
use crate::{Result, StackError};
use chrono::Local;
use std::path::Path;
use tracing::{info, warn};

/// 迁移的两端
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    pub source: RemoteTarget,
    pub destination: RemoteTarget,
}

impl BackupRestoreOrchestrator {
    /// 把部署从源主机迁移到目标主机（本机只做中转）
    pub async fn migrate(
        &self,
        plan: &MigrationPlan,
        options: PipelineOptions,
    ) -> Result<PipelineReport> {
        let executor = self.executor(options.dry_run);
        let mut ctx = PipelineContext::new(PipelineKind::Migrate, executor, options);
        match self.run_migrate(&mut ctx, plan).await {
            Ok(()) => Ok(ctx.finish(None)),
            Err(e) => Err(ctx.fail(e)),
        }
    }

    async fn run_migrate(&self, ctx: &mut PipelineContext, plan: &MigrationPlan) -> Result<()> {
        let (source, destination) = (&plan.source, &plan.destination);
        info!("🚚 迁移 {} -> {}", source, destination);

        // 1. 本机工具、连通性、目标主机 docker
        for program in ["ssh", "rsync"] {
            if !ctx.executor.locate(program) {
                return Err(StackError::missing_dependency(format!("本机未找到 {program}")));
            }
        }
        check_connectivity(&ctx.executor, source).await?;
        check_connectivity(&ctx.executor, destination).await?;
        if ctx.options.skip_docker {
            info!("⏭️  跳过目标主机 docker 检查 (--skip-docker)");
        } else {
            ensure_docker(&ctx.executor, destination).await?;
        }
        ctx.advance(PipelineState::Validated);

        // 2. 源主机备份
        let id = format!(
            "{}_{}",
            self.config.project.name,
            Local::now().format(backup::TIMESTAMP_FORMAT)
        );
        let source_root = source.project_path(migration::STAGING_DIR_NAME);
        let set_id = if ctx.options.skip_backup {
            info!("⏭️  跳过源主机备份 (--skip-backup)");
            None
        } else {
            let site = self.remote_site(&ctx.executor, source);
            let mut nested = PipelineContext::new(
                PipelineKind::Backup,
                ctx.executor.clone(),
                ctx.options,
            );
            let target = BackupTarget {
                root: source_root.clone(),
                prune: false,
                site: &site,
            };
            let set = self
                .run_backup(&mut nested, &target)
                .await
                .map_err(|e| nested.fail(e))?;
            ctx.absorb(&nested.finish(Some(set.clone())));
            Some(set.id().to_string())
        };

        // 3. 同步项目目录和备份集
        let staging = if ctx.options.dry_run {
            None
        } else {
            Some(
                tempfile::Builder::new()
                    .prefix("explorerllm-migrate-")
                    .tempdir()?,
            )
        };
        let staging_root = staging
            .as_ref()
            .map(|dir| dir.path().to_path_buf())
            .unwrap_or_else(|| std::env::temp_dir().join(format!("explorerllm-migrate-{id}")));

        let result = self
            .transfer_and_restore(ctx, plan, &staging_root, set_id.as_deref())
            .await;

        // 5. 收尾清理，失败只记警告；迁移失败时保留备份集
        if let Some(set_id) = &set_id {
            let relative = format!("{}/{set_id}", migration::STAGING_DIR_NAME);
            if result.is_ok() {
                for host in [source, destination] {
                    let path = host.project_path(&relative);
                    let site = self.remote_site(&ctx.executor, host);
                    if let Err(e) = site.archives.remove_dir(&path).await {
                        ctx.warn(PipelineWarning::CleanupFailed {
                            path: format!("{host}:{path}"),
                            reason: e.to_string(),
                        });
                    }
                }
            } else {
                warn!(
                    "迁移未完成，备份集保留在 {} 或 {} 的 {} 下",
                    source, destination, relative
                );
            }
        }
        if let Some(dir) = staging {
            let path = dir.path().to_string_lossy().to_string();
            if let Err(e) = dir.close() {
                ctx.warn(PipelineWarning::CleanupFailed {
                    path,
                    reason: e.to_string(),
                });
            }
        }

        result
    }

    async fn transfer_and_restore(
        &self,
        ctx: &mut PipelineContext,
        plan: &MigrationPlan,
        staging: &Path,
        set_id: Option<&str>,
    ) -> Result<()> {
        let (source, destination) = (&plan.source, &plan.destination);

        remote_sync(
            &ctx.executor,
            &staging.join("project"),
            &SyncRequest {
                from: source,
                from_path: source.base_path.clone(),
                to: destination,
                to_path: destination.base_path.clone(),
                excludes: migration::PROJECT_SYNC_EXCLUDES
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                remove_source: false,
            },
        )
        .await?;

        let dest_set_dir = match set_id {
            Some(set_id) => {
                let relative = format!("{}/{set_id}", migration::STAGING_DIR_NAME);
                let dest_set_dir = destination.project_path(&relative);
                remote_sync(
                    &ctx.executor,
                    &staging.join("set"),
                    &SyncRequest {
                        from: source,
                        from_path: source.project_path(&relative),
                        to: destination,
                        to_path: dest_set_dir.clone(),
                        excludes: Vec::new(),
                        remove_source: true,
                    },
                )
                .await?;
                Some(dest_set_dir)
            }
            None => None,
        };
        ctx.advance(PipelineState::DataTransferred);

        // 4. 目标主机恢复
        let site = self.remote_site(&ctx.executor, destination);
        match dest_set_dir {
            None => {
                site.services.detect_compose().await?;
                site.services.start().await?;
                ctx.warn(PipelineWarning::VolumesNotMigrated);
                self.check_health(ctx, &site).await;
            }
            Some(dir) if ctx.options.dry_run => {
                info!("🔍 [DRY RUN] 将在 {} 上从 {} 恢复数据卷并启动服务", destination, dir);
            }
            Some(dir) => {
                // 项目目录同步已带上 compose 文件；目标端的服务由本次迁移接管
                let options = PipelineOptions {
                    force_restore: true,
                    skip_config: true,
                    ..ctx.options
                };
                let mut nested =
                    PipelineContext::new(PipelineKind::Restore, ctx.executor.clone(), options);
                let set = self
                    .run_restore(&mut nested, &site, &dir)
                    .await
                    .map_err(|e| nested.fail(e))?;
                ctx.absorb(&nested.finish(Some(set)));
            }
        }
        ctx.advance(PipelineState::ServicesResumed);
        Ok(())
    }
}

/// `ssh host true` 必须成功
async fn check_connectivity(executor: &Executor, host: &RemoteTarget) -> Result<()> {
    let output = executor
        .probe(CommandSpec::read("true").on(Some(host)))
        .await?;
    if !output.success() {
        return Err(StackError::ConnectivityFailure {
            host: host.to_string(),
            reason: if output.stderr.trim().is_empty() {
                format!("ssh 退出码 {:?}", output.exit_code)
            } else {
                output.stderr.trim().to_string()
            },
        });
    }
    info!("🔗 {} 连接正常", host);
    Ok(())
}

/// 目标主机没有 docker 时安装
async fn ensure_docker(executor: &Executor, host: &RemoteTarget) -> Result<()> {
    let check = executor
        .probe(
            CommandSpec::read("sh")
                .args(["-c", "command -v docker"])
                .on(Some(host)),
        )
        .await?;
    if check.success() {
        info!("🐳 {} 已安装 docker", host);
        return Ok(());
    }

    warn!("{} 未安装 docker，开始安装...", host);
    executor
        .run(
            CommandSpec::mutate("sh")
                .args(["-c", migration::DOCKER_INSTALL_SCRIPT])
                .on(Some(host)),
        )
        .await?;
    Ok(())
}
