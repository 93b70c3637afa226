use crate::constants::{backup, docker};
use crate::{Result, StackError};
use chrono::{DateTime, Local, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// 备份集中文件的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactRole {
    Webui,
    Models,
    Config,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub role: ArtifactRole,
    pub file: String,
}

/// `backup_manifest.json`：备份时写入，恢复时优先读取
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupManifest {
    pub format_version: u32,
    pub id: String,
    pub project: String,
    pub created_at: DateTime<Local>,
    pub artifacts: Vec<Artifact>,
}

impl BackupManifest {
    fn file_for(&self, role: ArtifactRole) -> Result<Option<&str>> {
        let mut matches = self.artifacts.iter().filter(|a| a.role == role);
        let first = matches.next().map(|a| a.file.as_str());
        if matches.next().is_some() {
            return Err(StackError::invalid_backup_set(format!(
                "清单中 {role:?} 角色出现多次"
            )));
        }
        Ok(first)
    }
}

/// 一次备份产出的目录及其内容，写入后不再修改
///
/// 只能通过 [`BackupSet::new`] 或 [`BackupSet::resolve`] 构造，保证两个归档都存在。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSet {
    id: String,
    dir: String,
    webui_archive: String,
    models_archive: String,
    config_file: Option<String>,
    manifest_text: String,
}

impl BackupSet {
    pub fn new(
        id: impl Into<String>,
        dir: impl Into<String>,
        webui_archive: impl Into<String>,
        models_archive: impl Into<String>,
        config_file: Option<String>,
        manifest_text: impl Into<String>,
    ) -> Result<Self> {
        let webui_archive = webui_archive.into();
        let models_archive = models_archive.into();
        if webui_archive.trim().is_empty() || models_archive.trim().is_empty() {
            return Err(StackError::invalid_backup_set(
                "备份集必须同时包含 webui 归档和 models 归档",
            ));
        }
        Ok(Self {
            id: id.into(),
            dir: dir.into(),
            webui_archive,
            models_archive,
            config_file,
            manifest_text: manifest_text.into(),
        })
    }

    /// 从目录列表（以及可选的 JSON 清单）识别备份集
    ///
    /// 有清单时严格按清单中的角色查找；没有清单时退回到文件名子串匹配，
    /// 且 webui / models 归档都必须恰好匹配一个。
    pub fn resolve(
        dir: &str,
        listing: &[String],
        manifest_json: Option<&str>,
        manifest_text: Option<String>,
    ) -> Result<Self> {
        let id = dir
            .trim_end_matches('/')
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(dir)
            .to_string();
        let present = |file: &str| listing.iter().any(|name| name == file);

        let (webui, models, config) = match manifest_json {
            Some(json) => {
                let manifest: BackupManifest = serde_json::from_str(json).map_err(|e| {
                    StackError::invalid_backup_set(format!("{} 无法解析: {e}", backup::JSON_MANIFEST_NAME))
                })?;
                let webui = manifest.file_for(ArtifactRole::Webui)?.ok_or_else(|| {
                    StackError::invalid_backup_set("清单中没有 webui 归档")
                })?;
                let models = manifest.file_for(ArtifactRole::Models)?.ok_or_else(|| {
                    StackError::invalid_backup_set("清单中没有 models 归档")
                })?;
                for file in [webui, models] {
                    if !present(file) {
                        return Err(StackError::invalid_backup_set(format!(
                            "清单列出的文件不存在: {file}"
                        )));
                    }
                }
                let config = manifest
                    .file_for(ArtifactRole::Config)?
                    .filter(|file| present(file))
                    .map(str::to_string);
                (webui.to_string(), models.to_string(), config)
            }
            None => {
                let webui = single_match(listing, backup::WEBUI_MARKER)?;
                let models = single_match(listing, backup::MODELS_MARKER)?;
                let config = present(docker::COMPOSE_FILE_NAME)
                    .then(|| docker::COMPOSE_FILE_NAME.to_string());
                (webui, models, config)
            }
        };

        Self::new(
            id,
            dir,
            webui,
            models,
            config,
            manifest_text.unwrap_or_default(),
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &str {
        &self.dir
    }

    pub fn webui_archive(&self) -> &str {
        &self.webui_archive
    }

    pub fn models_archive(&self) -> &str {
        &self.models_archive
    }

    pub fn config_file(&self) -> Option<&str> {
        self.config_file.as_deref()
    }

    pub fn manifest_text(&self) -> &str {
        &self.manifest_text
    }

    /// 备份集中的全部文件名
    pub fn files(&self) -> Vec<&str> {
        let mut files = vec![self.webui_archive.as_str(), self.models_archive.as_str()];
        files.extend(self.config_file.as_deref());
        files
    }
}

fn single_match(listing: &[String], marker: &str) -> Result<String> {
    let matches: Vec<&String> = listing
        .iter()
        .filter(|name| name.contains(marker) && name.ends_with(backup::ARCHIVE_EXTENSION))
        .collect();
    match matches.as_slice() {
        [only] => Ok((*only).clone()),
        [] => Err(StackError::invalid_backup_set(format!(
            "没有找到包含 \"{marker}\" 的归档"
        ))),
        many => Err(StackError::invalid_backup_set(format!(
            "包含 \"{marker}\" 的归档不唯一: {}",
            many.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
        ))),
    }
}

/// 一次备份要产出的文件名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupNames {
    pub timestamp: String,
    pub id: String,
    pub webui_archive: String,
    pub models_archive: String,
}

impl BackupNames {
    pub fn at(project: &str, now: NaiveDateTime) -> Self {
        let timestamp = now.format(backup::TIMESTAMP_FORMAT).to_string();
        Self {
            id: format!("{project}_{timestamp}"),
            webui_archive: format!(
                "{}{timestamp}{}",
                backup::WEBUI_ARCHIVE_PREFIX,
                backup::ARCHIVE_EXTENSION
            ),
            models_archive: format!(
                "{}{timestamp}{}",
                backup::MODELS_ARCHIVE_PREFIX,
                backup::ARCHIVE_EXTENSION
            ),
            timestamp,
        }
    }
}

/// 生成 JSON 清单
pub fn build_manifest(
    project: &str,
    names: &BackupNames,
    config_file: Option<&str>,
    created_at: DateTime<Local>,
) -> BackupManifest {
    let mut artifacts = vec![
        Artifact {
            role: ArtifactRole::Webui,
            file: names.webui_archive.clone(),
        },
        Artifact {
            role: ArtifactRole::Models,
            file: names.models_archive.clone(),
        },
    ];
    if let Some(config) = config_file {
        artifacts.push(Artifact {
            role: ArtifactRole::Config,
            file: config.to_string(),
        });
    }
    BackupManifest {
        format_version: backup::MANIFEST_FORMAT_VERSION,
        id: names.id.clone(),
        project: project.to_string(),
        created_at,
        artifacts,
    }
}

/// 人类可读清单：列出确切文件名和恢复命令
pub fn render_text_manifest(
    manifest: &BackupManifest,
    dir: &str,
    webui_volume: &str,
    models_volume: &str,
    host: Option<&str>,
) -> String {
    let mut text = String::new();
    text.push_str(&format!("{} 备份清单\n", manifest.project));
    text.push_str(&"=".repeat(40));
    text.push('\n');
    text.push_str(&format!("备份 ID:   {}\n", manifest.id));
    text.push_str(&format!(
        "创建时间:  {}\n",
        manifest.created_at.format("%Y-%m-%d %H:%M:%S %z")
    ));
    if let Some(host) = host {
        text.push_str(&format!("主机:      {host}\n"));
    }
    text.push_str(&format!("备份目录:  {dir}\n\n"));
    text.push_str("内容:\n");
    for artifact in &manifest.artifacts {
        let description = match artifact.role {
            ArtifactRole::Webui => format!("OpenWebUI 数据 (数据卷 {webui_volume})"),
            ArtifactRole::Models => format!("Ollama 模型 (数据卷 {models_volume})"),
            ArtifactRole::Config => "docker compose 配置".to_string(),
        };
        text.push_str(&format!("  - {:<36} {}\n", artifact.file, description));
    }
    if !manifest.artifacts.iter().any(|a| a.role == ArtifactRole::Config) {
        text.push_str("  (未包含 docker compose 配置)\n");
    }
    text.push_str("\n恢复方法:\n");
    text.push_str(&format!("  explorerllm restore {dir}\n"));
    text.push_str("  服务运行中时加 --force；保留现有配置加 --skip-config；先预览加 --dry-run\n");
    text
}

/// 从备份集目录名解析时间戳：`<project>_<YYYYmmdd_HHMMSS>`
pub fn parse_set_timestamp(project: &str, name: &str) -> Option<NaiveDateTime> {
    let stamp = name.strip_prefix(project)?.strip_prefix('_')?;
    NaiveDateTime::parse_from_str(stamp, backup::TIMESTAMP_FORMAT).ok()
}

/// 找出超过保留期的备份集目录名
///
/// 保留期超出可表示的日期范围时视为永久保留。
pub fn expired_sets(
    project: &str,
    names: &[String],
    now: NaiveDateTime,
    retention_days: u32,
) -> Vec<String> {
    let Some(cutoff) = TimeDelta::try_days(i64::from(retention_days))
        .and_then(|window| now.checked_sub_signed(window))
    else {
        return Vec::new();
    };
    names
        .iter()
        .filter(|name| matches!(parse_set_timestamp(project, name), Some(ts) if ts < cutoff))
        .cloned()
        .collect()
}
