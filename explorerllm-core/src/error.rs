use thiserror::Error;

pub type Result<T> = std::result::Result<T, StackError>;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("缺少依赖: {0}")]
    MissingDependency(String),

    #[error("备份集无效: {0}")]
    InvalidBackupSet(String),

    #[error("服务仍在运行: {0}")]
    ServicesRunning(String),

    #[error("无法连接远程主机 {host}: {reason}")]
    ConnectivityFailure { host: String, reason: String },

    #[error("命令执行失败 `{command}` (退出码: {}): {stderr}", display_code(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("数据传输失败: {0}")]
    Transfer(String),

    #[error("配置错误: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("任务执行错误: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("自定义错误: {0}")]
    Custom(String),
}

fn display_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "被信号终止".to_string())
}

impl StackError {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    pub fn missing_dependency(msg: impl Into<String>) -> Self {
        Self::MissingDependency(msg.into())
    }

    pub fn invalid_backup_set(msg: impl Into<String>) -> Self {
        Self::InvalidBackupSet(msg.into())
    }

    pub fn transfer(msg: impl Into<String>) -> Self {
        Self::Transfer(msg.into())
    }

    /// 给操作员的补救提示，CLI 在错误之后输出
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            StackError::MissingDependency(_) => {
                Some("请安装缺失的工具（docker、docker compose、ssh、rsync）并确认其在 PATH 中")
            }
            StackError::InvalidBackupSet(_) => Some(
                "备份目录必须包含一个 webui 归档和一个 models 归档，请检查目录或 backup_manifest.json",
            ),
            StackError::ServicesRunning(_) => {
                Some("请先停止服务 (docker compose stop)，或使用 --force 强制恢复")
            }
            StackError::ConnectivityFailure { .. } => {
                Some("请检查主机名、用户名和 SSH 密钥 (-u/-k 或 REMOTE_USER/SSH_KEY)")
            }
            StackError::CommandFailed { .. } => {
                Some("请查看上方命令输出；流水线不会自动回滚，服务可能处于停止状态")
            }
            StackError::Transfer(_) => Some("源端数据未被删除，可在排查网络后重新执行迁移"),
            _ => None,
        }
    }

    /// 是否为命令非零退出（调用方据此决定是否致命）
    pub fn is_command_failure(&self) -> bool {
        matches!(self, StackError::CommandFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display_includes_code_and_stderr() {
        let err = StackError::CommandFailed {
            command: "docker compose stop".to_string(),
            code: Some(125),
            stderr: "daemon not running".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("125"));
        assert!(text.contains("daemon not running"));
        assert!(err.is_command_failure());
    }

    #[test]
    fn test_guard_error_has_remediation() {
        let err = StackError::ServicesRunning("2 个容器运行中".to_string());
        assert!(err.remediation().unwrap().contains("--force"));
        assert!(StackError::custom("x").remediation().is_none());
    }
}
