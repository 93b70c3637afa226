use super::types::{ComposeFlavor, ContainerEntry, Readiness, ServiceState};
use crate::process::{CommandSpec, Executor, RemoteTarget};
use crate::{Result, StackError};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

/// compose 服务组的启停与状态查询（本机或某台远程主机）
#[derive(Debug)]
pub struct ServiceController {
    executor: Executor,
    host: Option<RemoteTarget>,
    compose_file: String,
    project: String,
    models_service: String,
    flavor: OnceLock<ComposeFlavor>,
}

impl ServiceController {
    pub fn new(
        executor: Executor,
        host: Option<RemoteTarget>,
        compose_file: impl Into<String>,
        project: impl Into<String>,
        models_service: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            host,
            compose_file: compose_file.into(),
            project: project.into(),
            models_service: models_service.into(),
            flavor: OnceLock::new(),
        }
    }

    pub fn compose_file(&self) -> &str {
        &self.compose_file
    }

    /// 检测可用的 compose 命令：优先 `docker compose`，回退到 `docker-compose`
    pub async fn detect_compose(&self) -> Result<ComposeFlavor> {
        if let Some(flavor) = self.flavor.get() {
            return Ok(*flavor);
        }

        let plugin = self
            .executor
            .probe(
                CommandSpec::read("docker")
                    .args(["compose", "version"])
                    .on(self.host.as_ref()),
            )
            .await?;

        let flavor = if plugin.success() {
            ComposeFlavor::Plugin
        } else {
            let standalone = self.probe_standalone().await?;
            if !standalone {
                return Err(StackError::missing_dependency(format!(
                    "{}上未找到 docker compose 或 docker-compose",
                    self.location()
                )));
            }
            ComposeFlavor::Standalone
        };

        debug!("{} 使用 compose 形态: {:?}", self.location(), flavor);
        let _ = self.flavor.set(flavor);
        Ok(flavor)
    }

    async fn probe_standalone(&self) -> Result<bool> {
        if self.host.is_none() && !self.executor.locate("docker-compose") {
            return Ok(false);
        }
        let output = self
            .executor
            .probe(
                CommandSpec::read("docker-compose")
                    .arg("version")
                    .on(self.host.as_ref()),
            )
            .await;
        match output {
            Ok(output) => Ok(output.success()),
            // 程序不存在时本机 spawn 会直接返回 IO 错误
            Err(StackError::Io(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// 构造 compose 命令（含 -f/-p）
    fn compose(&self, mutating: bool) -> CommandSpec {
        let base = match self.flavor.get().copied().unwrap_or(ComposeFlavor::Plugin) {
            ComposeFlavor::Plugin => {
                let spec = if mutating {
                    CommandSpec::mutate("docker")
                } else {
                    CommandSpec::read("docker")
                };
                spec.arg("compose")
            }
            ComposeFlavor::Standalone => {
                if mutating {
                    CommandSpec::mutate("docker-compose")
                } else {
                    CommandSpec::read("docker-compose")
                }
            }
        };

        base.args(["-f", self.compose_file.as_str(), "-p", self.project.as_str()])
            .on(self.host.as_ref())
    }

    /// 列出 compose 项目中的全部容器（含已停止的）
    pub async fn containers(&self) -> Result<Vec<ContainerEntry>> {
        let output = self
            .executor
            .run(self.compose(false).args(["ps", "--all", "--format", "json"]))
            .await?;
        Ok(parse_ps_output(&output.stdout))
    }

    /// 查询服务状态；查询失败归为 Unknown
    pub async fn status(&self) -> ServiceState {
        match self.containers().await {
            Ok(entries) => classify(&entries),
            Err(e) => {
                warn!("⚠️  无法获取{}服务状态: {}", self.location(), e);
                ServiceState::Unknown
            }
        }
    }

    /// 停止所有服务
    pub async fn stop(&self) -> Result<()> {
        info!("⏹️  停止{}服务...", self.location());
        self.executor.run(self.compose(true).arg("stop")).await?;
        Ok(())
    }

    /// 启动所有服务
    pub async fn start(&self) -> Result<()> {
        info!("▶️  启动{}服务...", self.location());
        self.executor
            .run(self.compose(true).args(["up", "-d"]))
            .await?;
        Ok(())
    }

    /// 启动后在限定时间内轮询，区分"尚未就绪"和"启动失败"
    pub async fn wait_until_running(&self, timeout: Duration, interval: Duration) -> Readiness {
        let started = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let state = self.status().await;
            let waited = started.elapsed();
            debug!("就绪检查第 {} 次: {}", attempt, state.display_name());

            if state == ServiceState::Running {
                return Readiness::Ready { waited };
            }

            if waited >= timeout {
                return match state {
                    ServiceState::Stopped => Readiness::FailedToStart { waited },
                    last => Readiness::NotReady { last, waited },
                };
            }

            sleep(interval.min(timeout - waited)).await;
        }
    }

    /// Ollama 中已安装的模型数量
    pub async fn model_count(&self) -> Result<usize> {
        let output = self
            .executor
            .run(self.compose(false).args([
                "exec",
                "-T",
                self.models_service.as_str(),
                "ollama",
                "list",
            ]))
            .await?;
        Ok(count_models(&output.stdout))
    }

    fn location(&self) -> String {
        match &self.host {
            Some(host) => format!(" {} ", host),
            None => "本机".to_string(),
        }
    }
}

/// 解析 `compose ps --format json`：新版本输出 JSON 数组，旧版本逐行输出对象
pub fn parse_ps_output(output: &str) -> Vec<ContainerEntry> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if trimmed.starts_with('[') {
        return match serde_json::from_str::<Vec<ContainerEntry>>(trimmed) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("解析容器列表失败: {}", e);
                Vec::new()
            }
        };
    }

    trimmed
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<ContainerEntry>(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("解析容器 JSON 失败: {}, 内容: {}", e, line);
                None
            }
        })
        .collect()
}

/// 至少一个容器处于 Up 即为 Running
pub fn classify(entries: &[ContainerEntry]) -> ServiceState {
    if entries.iter().any(ContainerEntry::is_up) {
        ServiceState::Running
    } else {
        ServiceState::Stopped
    }
}

/// `ollama list` 输出去掉表头后的非空行数
fn count_models(output: &str) -> usize {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("NAME"))
        .count()
}
