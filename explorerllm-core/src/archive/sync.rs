use crate::process::{CommandSpec, Executor, RemoteTarget, rsync_location, rsync_remote_shell, shell_quote};
use crate::{Result, StackError};
use std::path::Path;
use tracing::{info, warn};

/// 一次主机间目录同步
#[derive(Debug, Clone)]
pub struct SyncRequest<'a> {
    pub from: &'a RemoteTarget,
    pub from_path: String,
    pub to: &'a RemoteTarget,
    pub to_path: String,
    pub excludes: Vec<String>,
    /// 传输确认后删除源目录
    pub remove_source: bool,
}

/// 经本机中转在两台远程主机之间增量同步目录
///
/// 顺序固定：拉取到本机暂存目录 → 推送到目标 → 校验和比对确认无差异 → （可选）删除源目录。
/// 确认之前源端数据不会被删除。
pub async fn remote_sync(executor: &Executor, staging: &Path, request: &SyncRequest<'_>) -> Result<()> {
    let local = format!("{}/", staging.to_string_lossy().trim_end_matches('/'));
    let source = format!("{}/", request.from_path.trim_end_matches('/'));
    let target = format!("{}/", request.to_path.trim_end_matches('/'));

    info!(
        "🔄 同步 {}:{} -> {}:{}",
        request.from, request.from_path, request.to, request.to_path
    );

    if !executor.is_dry_run() {
        tokio::fs::create_dir_all(staging).await?;
    }

    // 1. 拉取到本机
    let mut pull = CommandSpec::mutate("rsync")
        .args(["-az", "--delete", "-e"])
        .arg(rsync_remote_shell(request.from));
    for exclude in &request.excludes {
        pull = pull.arg(format!("--exclude={exclude}"));
    }
    executor
        .run(
            pull.arg(rsync_location(request.from, &source))
                .arg(local.as_str()),
        )
        .await?;

    // 2. 目标目录
    executor
        .run(
            CommandSpec::mutate("mkdir")
                .args(["-p", request.to_path.as_str()])
                .on(Some(request.to)),
        )
        .await?;

    // 3. 推送
    executor
        .run(
            CommandSpec::mutate("rsync")
                .args(["-az", "-e"])
                .arg(rsync_remote_shell(request.to))
                .arg(local.as_str())
                .arg(rsync_location(request.to, &target)),
        )
        .await?;

    // 4. 确认
    if executor.is_dry_run() {
        info!("🔍 [DRY RUN] 将比对校验和确认 {}:{} 的传输结果", request.to, request.to_path);
    } else {
        confirm_transfer(executor, &local, request.to, &target).await?;
        info!("✅ 传输已确认: {}:{}", request.to, request.to_path);
    }

    // 5. 确认之后才删除源
    if request.remove_source {
        executor
            .run(
                CommandSpec::mutate("rm")
                    .args(["-rf", request.from_path.as_str()])
                    .on(Some(request.from)),
            )
            .await?;
    }

    Ok(())
}

/// 校验和 dry-run 比对；有任何差异都视为未确认
async fn confirm_transfer(
    executor: &Executor,
    local: &str,
    to: &RemoteTarget,
    target: &str,
) -> Result<()> {
    let output = executor
        .run(
            CommandSpec::read("rsync")
                .args(["-azn", "--checksum", "--itemize-changes", "-e"])
                .arg(rsync_remote_shell(to))
                .arg(local)
                .arg(rsync_location(to, target)),
        )
        .await?;

    let differences = pending_changes(&output.stdout);
    if !differences.is_empty() {
        warn!("传输后仍有 {} 处差异", differences.len());
        return Err(StackError::transfer(format!(
            "{}:{} 与暂存目录不一致: {}",
            to,
            shell_quote(target),
            differences.join(", ")
        )));
    }
    Ok(())
}

/// `--itemize-changes` 输出中代表待传输内容的行（目录时间戳变化不算）
fn pending_changes(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !(line.starts_with(".d") && !line.contains('+')))
        .map(str::to_string)
        .collect()
}
