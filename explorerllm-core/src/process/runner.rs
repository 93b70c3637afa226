use super::ssh;
use super::types::{CommandOutput, CommandSpec};
use crate::{Result, StackError};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// 外部命令执行器
///
/// 非零退出码统一以 [`StackError::CommandFailed`] 返回，由调用方决定是否致命。
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// 检查本机 PATH 中是否存在某个程序
    fn locate(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// 基于 tokio 子进程的真实执行器
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let (program, args) = ssh::wrap(spec);
        debug!("执行命令: {}", spec);

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(input) = &spec.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                // 子进程提前退出时以它的退出码和 stderr 为准
                match stdin.write_all(input.as_bytes()).await {
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                        debug!("子进程未读完 stdin: {}", e);
                    }
                    other => other?,
                }
                // 关闭 stdin，让 `cat > file` 之类的命令结束
                drop(stdin);
            }
        }

        let output = child.wait_with_output().await?;
        let result = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !output.status.success() {
            return Err(StackError::CommandFailed {
                command: spec.to_string(),
                code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }

        Ok(result)
    }
}

/// 流水线使用的命令入口：持有 dry-run 开关
///
/// dry-run 下有副作用的命令只记录日志，永远不会交给底层 runner。
#[derive(Clone)]
pub struct Executor {
    runner: Arc<dyn ProcessRunner>,
    dry_run: bool,
}

impl Executor {
    pub fn new(runner: Arc<dyn ProcessRunner>, dry_run: bool) -> Self {
        Self { runner, dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// 执行命令，失败即返回错误
    pub async fn run(&self, spec: CommandSpec) -> Result<CommandOutput> {
        if self.dry_run && spec.mutating {
            info!("🔍 [DRY RUN] 将执行: {}", spec);
            return Ok(CommandOutput::skipped());
        }
        self.runner.run(&spec).await
    }

    /// 执行只读探测命令；非零退出作为结果返回而不是错误
    pub async fn probe(&self, spec: CommandSpec) -> Result<CommandOutput> {
        debug_assert!(!spec.mutating, "probe 只能用于只读命令");
        match self.runner.run(&spec).await {
            Ok(output) => Ok(output),
            Err(StackError::CommandFailed { code, stderr, .. }) => Ok(CommandOutput {
                exit_code: code,
                stdout: String::new(),
                stderr,
            }),
            Err(e) => Err(e),
        }
    }

    /// 本机直接进行的文件系统修改是否应该执行；dry-run 下只记录意图
    pub fn should_mutate(&self, action: &str) -> bool {
        if self.dry_run {
            info!("🔍 [DRY RUN] 将{}", action);
            return false;
        }
        true
    }

    pub fn locate(&self, program: &str) -> bool {
        self.runner.locate(program)
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("dry_run", &self.dry_run)
            .finish()
    }
}
