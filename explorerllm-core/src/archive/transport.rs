use crate::constants::docker::{BACKUP_MOUNT, SOURCE_MOUNT, TARGET_MOUNT};
use crate::process::{CommandSpec, Executor, RemoteTarget, join_remote};
use crate::{Result, StackError};
use std::path::Path;
use tracing::{debug, info, warn};

/// 数据卷快照/恢复以及备份目录的文件操作（本机或某台远程主机）
///
/// 所有路径都是目标主机上的路径；本机路径须为绝对路径，辅助容器要挂载它。
#[derive(Debug, Clone)]
pub struct ArchiveTransport {
    executor: Executor,
    host: Option<RemoteTarget>,
    helper_image: String,
}

impl ArchiveTransport {
    pub fn new(
        executor: Executor,
        host: Option<RemoteTarget>,
        helper_image: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            host,
            helper_image: helper_image.into(),
        }
    }

    pub fn join(&self, dir: &str, name: &str) -> String {
        match self.host {
            Some(_) => join_remote(dir, name),
            None => Path::new(dir).join(name).to_string_lossy().to_string(),
        }
    }

    fn shell(&self, script: String, mutating: bool) -> CommandSpec {
        let spec = if mutating {
            CommandSpec::mutate("sh")
        } else {
            CommandSpec::read("sh")
        };
        spec.args(["-c".to_string(), script]).on(self.host.as_ref())
    }

    /// 把数据卷内容打包为 `<dir>/<file>`
    ///
    /// 失败时删除可能残留的半成品，调用方不会看到不完整的归档。
    pub async fn snapshot(&self, volume: &str, dir: &str, file: &str) -> Result<()> {
        info!("📦 快照数据卷 {} -> {}", volume, self.join(dir, file));

        let spec = CommandSpec::mutate("docker")
            .args(["run", "--rm", "-v"])
            .arg(format!("{volume}:{SOURCE_MOUNT}:ro"))
            .arg("-v")
            .arg(format!("{dir}:{BACKUP_MOUNT}"))
            .arg(self.helper_image.as_str())
            .args(["tar", "czf"])
            .arg(format!("{BACKUP_MOUNT}/{file}"))
            .args(["-C", SOURCE_MOUNT, "."])
            .on(self.host.as_ref());

        let archive = self.join(dir, file);
        if let Err(e) = self.executor.run(spec).await {
            warn!("快照失败，清理残留归档: {}", archive);
            if let Err(cleanup) = self.remove_file(&archive).await {
                warn!("清理残留归档失败: {}", cleanup);
            }
            return Err(e);
        }

        if !self.executor.is_dry_run() && !self.exists(&archive).await? {
            return Err(StackError::transfer(format!(
                "快照命令成功但归档不存在: {archive}"
            )));
        }
        Ok(())
    }

    /// 清空数据卷后把 `<dir>/<file>` 解压进去
    pub async fn apply(&self, dir: &str, file: &str, volume: &str) -> Result<()> {
        info!("📤 恢复归档 {} -> 数据卷 {}", self.join(dir, file), volume);

        let clear = CommandSpec::mutate("docker")
            .args(["run", "--rm", "-v"])
            .arg(format!("{volume}:{TARGET_MOUNT}"))
            .arg(self.helper_image.as_str())
            .args(["find", TARGET_MOUNT, "-mindepth", "1", "-delete"])
            .on(self.host.as_ref());
        self.executor.run(clear).await?;

        let extract = CommandSpec::mutate("docker")
            .args(["run", "--rm", "-v"])
            .arg(format!("{volume}:{TARGET_MOUNT}"))
            .arg("-v")
            .arg(format!("{dir}:{BACKUP_MOUNT}:ro"))
            .arg(self.helper_image.as_str())
            .args(["tar", "xzf"])
            .arg(format!("{BACKUP_MOUNT}/{file}"))
            .args(["-C", TARGET_MOUNT])
            .on(self.host.as_ref());
        self.executor.run(extract).await?;
        Ok(())
    }

    /// 创建目录（含父目录）
    pub async fn ensure_dir(&self, dir: &str) -> Result<()> {
        match self.host {
            Some(_) => {
                self.executor
                    .run(self.shell(format!("mkdir -p {}", quote(dir)), true))
                    .await?;
            }
            None => {
                if self.executor.should_mutate(&format!("创建目录 {dir}")) {
                    tokio::fs::create_dir_all(dir).await?;
                }
            }
        }
        Ok(())
    }

    /// 列出目录中的条目名；目录不存在时返回空列表
    pub async fn list_dir(&self, dir: &str) -> Result<Vec<String>> {
        let mut names = match self.host {
            Some(_) => {
                let output = self
                    .executor
                    .probe(self.shell(format!("ls -1A {}", quote(dir)), false))
                    .await?;
                if !output.success() {
                    debug!("目录不存在或不可读: {}", dir);
                    return Ok(Vec::new());
                }
                output
                    .stdout
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            }
            None => {
                let mut entries = match tokio::fs::read_dir(dir).await {
                    Ok(entries) => entries,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                    Err(e) => return Err(e.into()),
                };
                let mut names = Vec::new();
                while let Some(entry) = entries.next_entry().await? {
                    names.push(entry.file_name().to_string_lossy().to_string());
                }
                names
            }
        };
        names.sort();
        Ok(names)
    }

    pub async fn exists(&self, path: &str) -> Result<bool> {
        match self.host {
            Some(_) => {
                let output = self
                    .executor
                    .probe(self.shell(format!("test -e {}", quote(path)), false))
                    .await?;
                Ok(output.success())
            }
            None => Ok(tokio::fs::try_exists(path).await?),
        }
    }

    /// 读取文本文件；不存在时返回 None
    pub async fn read_text(&self, path: &str) -> Result<Option<String>> {
        if !self.exists(path).await? {
            return Ok(None);
        }
        match self.host {
            Some(_) => {
                let output = self
                    .executor
                    .run(self.shell(format!("cat {}", quote(path)), false))
                    .await?;
                Ok(Some(output.stdout))
            }
            None => Ok(Some(tokio::fs::read_to_string(path).await?)),
        }
    }

    pub async fn write_text(&self, path: &str, content: &str) -> Result<()> {
        match self.host {
            Some(_) => {
                self.executor
                    .run(self.shell(format!("cat > {}", quote(path)), true).stdin(content))
                    .await?;
            }
            None => {
                if self.executor.should_mutate(&format!("写入文件 {path}")) {
                    tokio::fs::write(path, content).await?;
                }
            }
        }
        Ok(())
    }

    pub async fn copy_file(&self, from: &str, to: &str) -> Result<()> {
        match self.host {
            Some(_) => {
                self.executor
                    .run(self.shell(format!("cp -p {} {}", quote(from), quote(to)), true))
                    .await?;
            }
            None => {
                if self.executor.should_mutate(&format!("复制 {from} -> {to}")) {
                    tokio::fs::copy(from, to).await?;
                }
            }
        }
        Ok(())
    }

    pub async fn rename(&self, from: &str, to: &str) -> Result<()> {
        match self.host {
            Some(_) => {
                self.executor
                    .run(self.shell(format!("mv {} {}", quote(from), quote(to)), true))
                    .await?;
            }
            None => {
                if self.executor.should_mutate(&format!("重命名 {from} -> {to}")) {
                    tokio::fs::rename(from, to).await?;
                }
            }
        }
        Ok(())
    }

    pub async fn remove_dir(&self, dir: &str) -> Result<()> {
        match self.host {
            Some(_) => {
                self.executor
                    .run(self.shell(format!("rm -rf {}", quote(dir)), true))
                    .await?;
            }
            None => {
                if self.executor.should_mutate(&format!("删除目录 {dir}")) {
                    match tokio::fs::remove_dir_all(dir).await {
                        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        match self.host {
            Some(_) => {
                self.executor
                    .run(self.shell(format!("rm -f {}", quote(path)), true))
                    .await?;
            }
            None => {
                if self.executor.should_mutate(&format!("删除文件 {path}")) {
                    match tokio::fs::remove_file(path).await {
                        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }
}

fn quote(path: &str) -> String {
    crate::process::shell_quote(path)
}
