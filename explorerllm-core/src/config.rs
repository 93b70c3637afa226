use crate::constants::{backup, config, docker, env, migration, project, timeout};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 应用配置结构
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub project: ProjectConfig,
    pub volumes: VolumeConfig,
    pub backup: BackupConfig,
    pub health: HealthConfig,
    pub remote: RemoteConfig,
}

/// 项目配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
    pub compose_file: String,
}

/// 数据卷配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct VolumeConfig {
    pub webui: String,
    pub models: String,
    pub helper_image: String,
}

/// 备份相关配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BackupConfig {
    pub storage_dir: String,
    pub retention_days: u32,
}

/// 启动后健康检查配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct HealthConfig {
    pub start_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub models_service: String,
}

/// 迁移时远程主机的默认参数
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RemoteConfig {
    pub user: String,
    pub base_path: String,
    pub ssh_key: Option<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: project::PROJECT_NAME.to_string(),
            compose_file: docker::get_compose_file_path_str(),
        }
    }
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            webui: docker::DEFAULT_WEBUI_VOLUME.to_string(),
            models: docker::DEFAULT_MODELS_VOLUME.to_string(),
            helper_image: docker::DEFAULT_HELPER_IMAGE.to_string(),
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            storage_dir: backup::get_default_storage_dir()
                .to_string_lossy()
                .to_string(),
            retention_days: backup::DEFAULT_RETENTION_DAYS,
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            start_timeout_secs: timeout::SERVICE_START_TIMEOUT,
            poll_interval_secs: timeout::SERVICE_CHECK_INTERVAL,
            models_service: docker::DEFAULT_MODELS_SERVICE.to_string(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            user: migration::DEFAULT_REMOTE_USER.to_string(),
            base_path: migration::DEFAULT_REMOTE_BASE_PATH.to_string(),
            ssh_key: None,
        }
    }
}

impl AppConfig {
    /// 智能查找并加载配置文件
    /// 按优先级查找：config.toml -> explorerllm.toml -> .explorerllm.toml
    pub fn find_and_load_config() -> Result<Self> {
        for config_file in &config::CONFIG_SEARCH_ORDER {
            if Path::new(config_file).exists() {
                tracing::info!("找到配置文件: {}", config_file);
                return Self::load_from_file(config_file);
            }
        }

        // 没有配置文件时使用默认值，不在磁盘上生成（dry-run 也会走这里）
        tracing::debug!("未找到配置文件，使用默认配置");
        Ok(Self::default())
    }

    /// 从指定文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let config: AppConfig = toml::from_str(&content)?;

        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml_with_comments();
        fs::write(&path, content)?;
        Ok(())
    }

    /// 生成带注释的TOML配置
    fn to_toml_with_comments(&self) -> String {
        const TEMPLATE: &str = include_str!("../templates/config.toml.template");

        TEMPLATE
            .replace("{project_name}", &self.project.name)
            .replace("{compose_file}", &self.project.compose_file)
            .replace("{webui_volume}", &self.volumes.webui)
            .replace("{models_volume}", &self.volumes.models)
            .replace("{helper_image}", &self.volumes.helper_image)
            .replace("{backup_storage_dir}", &self.backup.storage_dir)
            .replace("{retention_days}", &self.backup.retention_days.to_string())
            .replace(
                "{start_timeout_secs}",
                &self.health.start_timeout_secs.to_string(),
            )
            .replace(
                "{poll_interval_secs}",
                &self.health.poll_interval_secs.to_string(),
            )
            .replace("{models_service}", &self.health.models_service)
            .replace("{remote_user}", &self.remote.user)
            .replace("{remote_base_path}", &self.remote.base_path)
    }

    /// 用进程环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// 用任意键值来源覆盖配置；空字符串视为未设置
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(user) = lookup(env::REMOTE_USER) {
            self.remote.user = user;
        }
        if let Some(path) = lookup(env::REMOTE_PATH) {
            self.remote.base_path = path;
        }
        if let Some(key) = lookup(env::SSH_KEY) {
            self.remote.ssh_key = Some(key);
        }
        if let Some(days) = lookup(env::BACKUP_RETENTION_DAYS) {
            match days.trim().parse::<u32>() {
                Ok(days) => self.backup.retention_days = days,
                Err(_) => tracing::warn!(
                    "忽略无效的 {}: {}",
                    env::BACKUP_RETENTION_DAYS,
                    days
                ),
            }
        }
    }

    /// 获取备份目录路径
    pub fn get_backup_dir(&self) -> PathBuf {
        PathBuf::from(&self.backup.storage_dir)
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.health.start_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.health.poll_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
[backup]
retention_days = 7
"#,
        )
        .unwrap();

        assert_eq!(config.backup.retention_days, 7);
        assert_eq!(config.backup.storage_dir, BackupConfig::default().storage_dir);
        assert_eq!(config.volumes.webui, docker::DEFAULT_WEBUI_VOLUME);
        assert_eq!(config.project.name, "explorerllm");
    }

    #[test]
    fn test_template_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.volumes.models = "custom_models".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (env::REMOTE_USER, "deploy"),
            (env::REMOTE_PATH, "/srv/llm"),
            (env::SSH_KEY, ""),
            (env::BACKUP_RETENTION_DAYS, "14"),
        ]);

        let mut config = AppConfig::default();
        config.apply_overrides_from(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.remote.user, "deploy");
        assert_eq!(config.remote.base_path, "/srv/llm");
        assert_eq!(config.remote.ssh_key, None);
        assert_eq!(config.backup.retention_days, 14);
    }

    #[test]
    fn test_invalid_retention_override_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides_from(|k| {
            (k == env::BACKUP_RETENTION_DAYS).then(|| "thirty".to_string())
        });
        assert_eq!(config.backup.retention_days, backup::DEFAULT_RETENTION_DAYS);
    }
}
