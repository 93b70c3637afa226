use serde::Deserialize;
use std::time::Duration;

/// 服务组整体状态（每次查询重新计算，不缓存）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Running,
    Stopped,
    Unknown,
}

impl ServiceState {
    /// 获取状态的中文显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceState::Running => "运行中",
            ServiceState::Stopped => "已停止",
            ServiceState::Unknown => "未知",
        }
    }
}

/// `compose ps --format json` 中的一条容器记录
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContainerEntry {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Service", default)]
    pub service: String,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "Status", default)]
    pub status: String,
}

impl ContainerEntry {
    /// 状态列以 `Up` 开头或 State 为 running 即视为运行
    pub fn is_up(&self) -> bool {
        self.status.trim_start().starts_with("Up") || self.state.eq_ignore_ascii_case("running")
    }
}

/// compose 命令形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeFlavor {
    /// `docker compose`（新语法）
    Plugin,
    /// 独立的 `docker-compose`（旧语法）
    Standalone,
}

/// 启动后的就绪轮询结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready { waited: Duration },
    /// 超时时服务仍未运行，但也没有确定失败
    NotReady { last: ServiceState, waited: Duration },
    /// 超时时容器全部处于停止状态
    FailedToStart { waited: Duration },
}
