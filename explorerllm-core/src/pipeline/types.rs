use crate::archive::ArchiveSummary;
use crate::backup_set::BackupSet;
use crate::service::{ContainerEntry, ServiceState};
use std::fmt;
use std::time::Duration;

/// 流水线种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    Backup,
    Restore,
    Migrate,
}

impl PipelineKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            PipelineKind::Backup => "备份",
            PipelineKind::Restore => "恢复",
            PipelineKind::Migrate => "迁移",
        }
    }
}

/// 流水线状态，只会向前推进；任何一步失败进入 `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    Init,
    Validated,
    ServicesQuiesced,
    DataTransferred,
    ConfigApplied,
    ServicesResumed,
    Verified,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Init => "Init",
            PipelineState::Validated => "Validated",
            PipelineState::ServicesQuiesced => "ServicesQuiesced",
            PipelineState::DataTransferred => "DataTransferred",
            PipelineState::ConfigApplied => "ConfigApplied",
            PipelineState::ServicesResumed => "ServicesResumed",
            PipelineState::Verified => "Verified",
            PipelineState::Done => "Done",
            PipelineState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// 运行选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// 服务运行中时仍然恢复
    pub force_restore: bool,
    pub dry_run: bool,
    /// 恢复时保留现有 compose 配置
    pub skip_config: bool,
    /// 迁移时不检查/安装目标主机的 docker
    pub skip_docker: bool,
    /// 迁移时不备份数据卷，只同步项目目录
    pub skip_backup: bool,
}

/// 服务启动后的健康检查结果，只作为警告，不会导致失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthCheckWarning {
    NotReady { last: ServiceState, waited: Duration },
    FailedToStart { waited: Duration },
    NoModels,
    ModelCheckFailed(String),
    StatusUnavailable,
}

impl fmt::Display for HealthCheckWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthCheckWarning::NotReady { last, waited } => write!(
                f,
                "服务在 {} 秒内未就绪 (最后状态: {})",
                waited.as_secs(),
                last.display_name()
            ),
            HealthCheckWarning::FailedToStart { waited } => {
                write!(f, "服务启动失败，{} 秒后容器仍处于停止状态", waited.as_secs())
            }
            HealthCheckWarning::NoModels => write!(f, "Ollama 中没有任何模型"),
            HealthCheckWarning::ModelCheckFailed(reason) => write!(f, "无法查询模型列表: {reason}"),
            HealthCheckWarning::StatusUnavailable => write!(f, "无法获取服务状态"),
        }
    }
}

/// 流水线过程中记录的非致命问题
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    Health(HealthCheckWarning),
    /// compose 配置文件不存在（备份时）或备份集中没有配置（恢复时）
    ConfigMissing(String),
    /// 迁移时使用了 --skip-backup
    VolumesNotMigrated,
    /// 过期备份集删除失败
    PruneFailed { set: String, reason: String },
    /// 迁移收尾清理失败
    CleanupFailed { path: String, reason: String },
}

impl From<HealthCheckWarning> for PipelineWarning {
    fn from(warning: HealthCheckWarning) -> Self {
        PipelineWarning::Health(warning)
    }
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::Health(warning) => write!(f, "健康检查: {warning}"),
            PipelineWarning::ConfigMissing(path) => write!(f, "未找到 compose 配置: {path}"),
            PipelineWarning::VolumesNotMigrated => {
                write!(f, "已跳过备份，数据卷 (webui/models) 没有迁移")
            }
            PipelineWarning::PruneFailed { set, reason } => {
                write!(f, "删除过期备份 {set} 失败: {reason}")
            }
            PipelineWarning::CleanupFailed { path, reason } => {
                write!(f, "清理 {path} 失败: {reason}")
            }
        }
    }
}

/// 一次流水线运行的结果
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub kind: PipelineKind,
    pub final_state: PipelineState,
    pub transitions: Vec<(PipelineState, PipelineState)>,
    pub backup_set: Option<BackupSet>,
    pub warnings: Vec<PipelineWarning>,
    pub dry_run: bool,
}

impl PipelineReport {
    pub fn succeeded(&self) -> bool {
        self.final_state == PipelineState::Done
    }
}

/// `verify` 的只读检查结果
#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub backup_set: BackupSet,
    pub archives: Vec<ArchiveSummary>,
    /// 备份集内 compose 配置的字节数
    pub config_bytes: Option<u64>,
    pub service_state: ServiceState,
    pub model_count: Option<usize>,
    pub warnings: Vec<PipelineWarning>,
}

/// `status` 命令使用的当前部署概况
#[derive(Debug, Clone)]
pub struct StackStatus {
    pub service_state: ServiceState,
    pub containers: Vec<ContainerEntry>,
    pub model_count: Option<usize>,
    pub backup_root: String,
    /// 备份根目录下的备份集（按名称排序，最新在后）
    pub backup_sets: Vec<String>,
}
