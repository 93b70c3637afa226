/// 项目标识相关常量
pub mod project {
    /// 项目标识（备份集目录名前缀、compose 项目名）
    pub const PROJECT_NAME: &str = "explorerllm";
}

/// Docker相关常量
pub mod docker {
    use std::path::{Path, PathBuf};

    /// docker-compose.yml文件名
    pub const COMPOSE_FILE_NAME: &str = "docker-compose.yml";

    /// OpenWebUI 数据卷默认名称
    pub const DEFAULT_WEBUI_VOLUME: &str = "explorerllm_open-webui";

    /// Ollama 模型卷默认名称
    pub const DEFAULT_MODELS_VOLUME: &str = "explorerllm_ollama";

    /// 一次性辅助容器镜像（提供 tar/find）
    pub const DEFAULT_HELPER_IMAGE: &str = "alpine:3.20";

    /// 运行 Ollama 的 compose 服务名
    pub const DEFAULT_MODELS_SERVICE: &str = "ollama";

    /// 辅助容器内卷的挂载点
    pub const SOURCE_MOUNT: &str = "/source";
    pub const TARGET_MOUNT: &str = "/target";
    pub const BACKUP_MOUNT: &str = "/backup";

    /// 获取默认的docker-compose.yml文件路径
    pub fn get_compose_file_path() -> PathBuf {
        Path::new(".").join(COMPOSE_FILE_NAME)
    }

    pub fn get_compose_file_path_str() -> String {
        get_compose_file_path().to_string_lossy().to_string()
    }
}

/// 备份相关常量
pub mod backup {
    use std::path::{Path, PathBuf};

    /// 备份根目录名
    pub const BACKUP_DIR_NAME: &str = "backups";

    /// 备份集 ID / 文件名中的时间戳格式
    pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

    /// webui 归档文件名前缀
    pub const WEBUI_ARCHIVE_PREFIX: &str = "webui-data_";

    /// models 归档文件名前缀
    pub const MODELS_ARCHIVE_PREFIX: &str = "models_";

    /// 归档扩展名
    pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

    /// 旧备份集识别用的子串
    pub const WEBUI_MARKER: &str = "webui";
    pub const MODELS_MARKER: &str = "models";

    /// 人类可读清单
    pub const TEXT_MANIFEST_NAME: &str = "backup_manifest.txt";

    /// 机器可读清单
    pub const JSON_MANIFEST_NAME: &str = "backup_manifest.json";

    /// 清单格式版本
    pub const MANIFEST_FORMAT_VERSION: u32 = 1;

    /// 默认保留天数
    pub const DEFAULT_RETENTION_DAYS: u32 = 30;

    /// 获取默认备份目录路径
    pub fn get_default_storage_dir() -> PathBuf {
        Path::new(".").join(BACKUP_DIR_NAME)
    }
}

/// 迁移相关常量
pub mod migration {
    /// 项目目录下的迁移临时目录
    pub const STAGING_DIR_NAME: &str = ".migration";

    /// 远程默认用户
    pub const DEFAULT_REMOTE_USER: &str = "root";

    /// 远程默认项目目录
    pub const DEFAULT_REMOTE_BASE_PATH: &str = "/opt/explorerllm";

    /// 目标主机 Docker 安装脚本
    pub const DOCKER_INSTALL_SCRIPT: &str = "curl -fsSL https://get.docker.com | sh";

    /// 同步项目目录时排除的条目
    pub const PROJECT_SYNC_EXCLUDES: [&str; 2] = [STAGING_DIR_NAME, super::backup::BACKUP_DIR_NAME];
}

/// SSH 相关常量
pub mod ssh {
    /// 禁用主机密钥交互的选项（运维便利，不是安全边界）
    pub const NON_INTERACTIVE_OPTIONS: [&str; 6] = [
        "-o",
        "BatchMode=yes",
        "-o",
        "StrictHostKeyChecking=no",
        "-o",
        "UserKnownHostsFile=/dev/null",
    ];

    /// 连接超时（秒）
    pub const CONNECT_TIMEOUT: u64 = 10;
}

/// 超时时间常量（秒）
pub mod timeout {
    /// Docker服务启动等待超时时间
    pub const SERVICE_START_TIMEOUT: u64 = 60;

    /// Docker服务状态检查间隔时间
    pub const SERVICE_CHECK_INTERVAL: u64 = 2;
}

/// 环境变量名
pub mod env {
    pub const REMOTE_USER: &str = "REMOTE_USER";
    pub const REMOTE_PATH: &str = "REMOTE_PATH";
    pub const SSH_KEY: &str = "SSH_KEY";
    pub const BACKUP_RETENTION_DAYS: &str = "BACKUP_RETENTION_DAYS";
    pub const LOG_FILE: &str = "EXPLORERLLM_LOG_FILE";
}

/// 应用配置相关常量
pub mod config {
    /// 配置文件名
    pub const CONFIG_FILE_NAME: &str = "config.toml";

    /// 按优先级查找的配置文件
    pub const CONFIG_SEARCH_ORDER: [&str; 3] = ["config.toml", "explorerllm.toml", ".explorerllm.toml"];
}

/// 技术版本信息常量
pub mod version {
    /// 核心库版本（自动同步）
    pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
}
