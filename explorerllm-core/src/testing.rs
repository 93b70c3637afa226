//! 测试用的假 docker：数据卷用临时目录模拟，tar 归档用 `tar`/`flate2` 真实生成
//!
//! 每台远程主机有独立的文件系统根目录和数据卷目录，`sh -c` 文件操作、
//! `docker run` 和 `rsync` 都落到这些目录上。

use crate::process::{CommandOutput, CommandSpec, ProcessRunner};
use crate::{Result, StackError};
use async_trait::async_trait;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

#[derive(Default)]
struct FakeState {
    running: bool,
    remote_running: HashMap<String, bool>,
    calls: Vec<CommandSpec>,
    missing: HashSet<String>,
    unreachable: HashSet<String>,
    compose_plugin_missing: bool,
    exit_on_start: bool,
    remote_without_docker: bool,
    models: usize,
    failures: Vec<String>,
}

pub(crate) struct FakeDocker {
    root: TempDir,
    state: Mutex<FakeState>,
}

impl FakeDocker {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
            state: Mutex::new(FakeState {
                models: 2,
                ..FakeState::default()
            }),
        }
    }

    pub fn set_running(&self, running: bool) {
        self.state.lock().unwrap().running = running;
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }

    pub fn is_remote_running(&self, host: &str) -> bool {
        *self.state.lock().unwrap().remote_running.get(host).unwrap_or(&false)
    }

    pub fn set_missing(&self, program: &str) {
        self.state.lock().unwrap().missing.insert(program.to_string());
    }

    pub fn set_unreachable(&self, host: &str) {
        self.state
            .lock()
            .unwrap()
            .unreachable
            .insert(host.to_string());
    }

    pub fn disable_compose_plugin(&self) {
        self.state.lock().unwrap().compose_plugin_missing = true;
    }

    pub fn set_containers_exit_on_start(&self, exit: bool) {
        self.state.lock().unwrap().exit_on_start = exit;
    }

    pub fn set_remote_without_docker(&self) {
        self.state.lock().unwrap().remote_without_docker = true;
    }

    /// 命令行包含 `needle` 的命令一律失败
    pub fn fail_when(&self, needle: &str) {
        self.state.lock().unwrap().failures.push(needle.to_string());
    }

    pub fn set_models(&self, models: usize) {
        self.state.lock().unwrap().models = models;
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<CommandSpec> {
        self.calls().into_iter().filter(|c| c.mutating).collect()
    }

    /// 数据卷对应的目录
    pub fn volume_dir(&self, volume: &str) -> PathBuf {
        self.volume_dir_on(None, volume)
    }

    fn volume_dir_on(&self, host: Option<&str>, volume: &str) -> PathBuf {
        let dir = match host {
            None => self.root.path().join("volumes").join(volume),
            Some(host) => self.root.path().join("remote-volumes").join(host).join(volume),
        };
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// 远程主机上的绝对路径在本地的位置
    pub fn remote_path(&self, host: &str, path: &str) -> PathBuf {
        self.root
            .path()
            .join("hosts")
            .join(host)
            .join(path.trim_start_matches('/'))
    }

    pub fn write_volume_file(&self, volume: &str, relative: &str, content: &[u8]) {
        write_file(&self.volume_dir(volume).join(relative), content);
    }

    pub fn read_volume_file(&self, volume: &str, relative: &str) -> Option<Vec<u8>> {
        fs::read(self.volume_dir(volume).join(relative)).ok()
    }

    pub fn write_remote_volume_file(&self, host: &str, volume: &str, relative: &str, content: &[u8]) {
        write_file(&self.volume_dir_on(Some(host), volume).join(relative), content);
    }

    pub fn read_remote_volume_file(&self, host: &str, volume: &str, relative: &str) -> Option<Vec<u8>> {
        fs::read(self.volume_dir_on(Some(host), volume).join(relative)).ok()
    }

    pub fn write_remote_file(&self, host: &str, path: &str, content: &[u8]) {
        write_file(&self.remote_path(host, path), content);
    }

    fn failed(spec: &CommandSpec, code: i32, stderr: &str) -> StackError {
        StackError::CommandFailed {
            command: spec.to_string(),
            code: Some(code),
            stderr: stderr.to_string(),
        }
    }

    fn ok(stdout: impl Into<String>) -> Result<CommandOutput> {
        Ok(CommandOutput {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        })
    }

    fn run_remote(&self, spec: &CommandSpec, host: &str) -> Result<CommandOutput> {
        {
            let state = self.state.lock().unwrap();
            if state.unreachable.contains(host) {
                return Err(Self::failed(spec, 255, "ssh: connect to host: Connection refused"));
            }
            let wants_docker = spec.program == "sh"
                && spec.args.iter().any(|a| a.contains("command -v docker"));
            if wants_docker && state.remote_without_docker {
                return Err(Self::failed(spec, 1, ""));
            }
        }

        match spec.program.as_str() {
            "docker" if spec.args.first().map(String::as_str) == Some("compose") => {
                self.run_compose(spec, Some(host))
            }
            "docker-compose" => self.run_compose(spec, Some(host)),
            "docker" if spec.args.first().map(String::as_str) == Some("run") => {
                self.run_container(spec, Some(host))
            }
            "sh" if spec.args.first().map(String::as_str) == Some("-c") => {
                let words = shell_words(spec.args.get(1).map(String::as_str).unwrap_or(""));
                self.run_file_command(spec, host, &words)
            }
            "mkdir" | "rm" => {
                let words: Vec<String> = std::iter::once(spec.program.clone())
                    .chain(spec.args.iter().cloned())
                    .collect();
                self.run_file_command(spec, host, &words)
            }
            _ => Self::ok(""),
        }
    }

    /// 远程主机上的 `mkdir/ls/test/cat/cp/mv/rm`
    fn run_file_command(
        &self,
        spec: &CommandSpec,
        host: &str,
        words: &[String],
    ) -> Result<CommandOutput> {
        let path = |index: usize| self.remote_path(host, &words[index]);
        let words: Vec<&str> = words.iter().map(String::as_str).collect();
        match words.as_slice() {
            ["mkdir", "-p", _] => fs::create_dir_all(path(2))?,
            ["ls", "-1A", _] => {
                let dir = path(2);
                if !dir.is_dir() {
                    return Err(Self::failed(spec, 2, "ls: cannot access: No such file or directory"));
                }
                let mut names = fs::read_dir(dir)?
                    .map(|e| e.map(|e| e.file_name().to_string_lossy().to_string()))
                    .collect::<std::io::Result<Vec<_>>>()?;
                names.sort();
                return Self::ok(names.join("\n"));
            }
            ["test", "-e", _] => {
                if !path(2).exists() {
                    return Err(Self::failed(spec, 1, ""));
                }
            }
            ["cat", ">", _] => {
                fs::write(path(2), spec.stdin.clone().unwrap_or_default())?;
            }
            ["cat", _] => match fs::read_to_string(path(1)) {
                Ok(content) => return Self::ok(content),
                Err(_) => return Err(Self::failed(spec, 1, "cat: No such file or directory")),
            },
            ["cp", "-p", _, _] => {
                fs::copy(path(2), path(3))?;
            }
            ["mv", _, _] => fs::rename(path(1), path(2))?,
            ["rm", "-rf", _] => {
                let target = path(2);
                if target.is_dir() {
                    fs::remove_dir_all(target)?;
                } else if target.exists() {
                    fs::remove_file(target)?;
                }
            }
            ["rm", "-f", _] => {
                let target = path(2);
                if target.exists() {
                    fs::remove_file(target)?;
                }
            }
            _ => {}
        }
        Self::ok("")
    }

    /// 模拟 `rsync [-e shell] [--exclude=x] [--delete] 源/ 目标/`；`--checksum` 时只比对
    fn run_rsync(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let mut excludes = Vec::new();
        let mut locations = Vec::new();
        let mut args = spec.args.iter();
        while let Some(arg) = args.next() {
            if arg == "-e" {
                args.next();
            } else if let Some(pattern) = arg.strip_prefix("--exclude=") {
                excludes.push(pattern.to_string());
            } else if !arg.starts_with('-') {
                locations.push(self.rsync_path(arg));
            }
        }
        let [from, to] = locations.as_slice() else {
            return Err(Self::failed(spec, 1, "rsync: syntax or usage error"));
        };
        if !from.is_dir() {
            return Err(Self::failed(spec, 23, "rsync: change_dir failed: No such file or directory"));
        }

        if spec.args.iter().any(|a| a == "--checksum") {
            let mut pending = Vec::new();
            diff_tree(from, to, Path::new(""), &mut pending)?;
            let lines: Vec<String> = pending
                .iter()
                .map(|p| format!("<f.st...... {}", p.display()))
                .collect();
            return Self::ok(lines.join("\n"));
        }

        if spec.args.iter().any(|a| a == "--delete") && to.exists() {
            fs::remove_dir_all(to)?;
        }
        copy_tree(from, to, &excludes)?;
        Self::ok("")
    }

    /// `user@host:/path` 或本机绝对路径
    fn rsync_path(&self, location: &str) -> PathBuf {
        match location.split_once(':') {
            Some((destination, path)) if !location.starts_with('/') => {
                let host = destination.rsplit('@').next().unwrap_or(destination);
                self.remote_path(host, path)
            }
            _ => PathBuf::from(location),
        }
    }

    fn run_compose(&self, spec: &CommandSpec, host: Option<&str>) -> Result<CommandOutput> {
        let has = |word: &str| spec.args.iter().any(|a| a == word);
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let running = match host {
            None => &mut state.running,
            Some(host) => state.remote_running.entry(host.to_string()).or_default(),
        };

        if has("version") {
            if spec.program == "docker" && state.compose_plugin_missing {
                return Err(Self::failed(spec, 1, "docker: 'compose' is not a docker command."));
            }
            return Self::ok("Docker Compose version v2.29.1");
        }
        if has("ps") {
            let (state_word, status) = if *running {
                ("running", "Up 2 minutes")
            } else {
                ("exited", "Exited (0) 1 minute ago")
            };
            let lines = ["ollama", "open-webui"]
                .iter()
                .map(|svc| {
                    format!(
                        r#"{{"Name":"explorerllm-{svc}-1","Service":"{svc}","State":"{state_word}","Status":"{status}"}}"#
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            return Self::ok(lines);
        }
        if has("stop") {
            *running = false;
            return Self::ok("");
        }
        if has("up") {
            *running = !state.exit_on_start;
            return Self::ok("");
        }
        if has("exec") {
            let mut listing = "NAME            ID              SIZE      MODIFIED\n".to_string();
            for i in 0..state.models {
                listing.push_str(&format!("model-{i}:latest  abc{i}  1.0 GB  1 day ago\n"));
            }
            return Self::ok(listing);
        }
        Self::ok("")
    }

    /// 模拟 `docker run --rm -v a:b ... image cmd...`
    fn run_container(&self, spec: &CommandSpec, host: Option<&str>) -> Result<CommandOutput> {
        let mut mounts: HashMap<String, PathBuf> = HashMap::new();
        let mut rest = spec.args.iter().skip(1).peekable();
        while let Some(arg) = rest.peek() {
            if *arg == "--rm" {
                rest.next();
            } else if *arg == "-v" {
                rest.next();
                let mount = rest.next().unwrap();
                let mut parts = mount.split(':');
                let source = parts.next().unwrap();
                let target = parts.next().unwrap();
                let host_path = match host {
                    _ if !source.starts_with('/') => self.volume_dir_on(host, source),
                    None => PathBuf::from(source),
                    Some(host) => self.remote_path(host, source),
                };
                mounts.insert(target.to_string(), host_path);
            } else {
                break;
            }
        }
        let _image = rest.next();
        let command: Vec<&String> = rest.collect();

        let resolve = |container_path: &str| -> PathBuf {
            let (mount, relative) = mounts
                .iter()
                .find_map(|(m, host)| {
                    container_path
                        .strip_prefix(m.as_str())
                        .map(|r| (host.clone(), r.trim_start_matches('/').to_string()))
                })
                .unwrap();
            if relative.is_empty() { mount } else { mount.join(relative) }
        };

        match command.first().map(|s| s.as_str()) {
            Some("tar") if command[1] == "czf" => {
                let archive = resolve(command[2]);
                let source = resolve(command[4]);
                create_archive(&source, &archive)?;
            }
            Some("tar") if command[1] == "xzf" => {
                let archive = resolve(command[2]);
                let target = resolve(command[4]);
                let mut unpacker = tar::Archive::new(GzDecoder::new(File::open(archive)?));
                unpacker.unpack(target)?;
            }
            Some("find") => {
                let target = resolve(command[1]);
                for entry in fs::read_dir(&target)? {
                    let path = entry?.path();
                    if path.is_dir() {
                        fs::remove_dir_all(path)?;
                    } else {
                        fs::remove_file(path)?;
                    }
                }
            }
            _ => {}
        }
        Self::ok("")
    }
}

fn write_file(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// 按 POSIX shell 规则拆分单引号转义过的命令行
fn shell_words(script: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;
    let mut chars = script.chars();
    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                quoted = !quoted;
                in_word = true;
            }
            '\\' if !quoted => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}

fn copy_tree(from: &Path, to: &Path, excludes: &[String]) -> std::io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let name = entry.file_name();
        if excludes.iter().any(|e| name.to_string_lossy() == e.as_str()) {
            continue;
        }
        let target = to.join(&name);
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target, excludes)?;
        } else {
            fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}

/// `from` 中内容与 `to` 不同或在 `to` 中缺失的文件
fn diff_tree(from: &Path, to: &Path, relative: &Path, pending: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let name = entry.file_name();
        if entry.file_type()?.is_dir() {
            diff_tree(&entry.path(), &to.join(&name), &relative.join(&name), pending)?;
        } else if fs::read(to.join(&name)).ok() != Some(fs::read(entry.path())?) {
            pending.push(relative.join(&name));
        }
    }
    Ok(())
}

fn create_archive(source: &Path, archive: &Path) -> Result<()> {
    let encoder = GzEncoder::new(File::create(archive)?, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(".", source)?;
    builder.into_inner()?.finish()?;
    Ok(())
}

#[async_trait]
impl ProcessRunner for FakeDocker {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        {
            let mut state = self.state.lock().unwrap();
            state.calls.push(spec.clone());
            let line = spec.to_string();
            if state.failures.iter().any(|needle| line.contains(needle)) {
                return Err(Self::failed(spec, 1, "simulated failure"));
            }
        }

        if let Some(host) = &spec.host {
            return self.run_remote(spec, &host.host);
        }

        match spec.program.as_str() {
            "docker" if spec.args.first().map(String::as_str) == Some("compose") => {
                self.run_compose(spec, None)
            }
            "docker-compose" => self.run_compose(spec, None),
            "docker" if spec.args.first().map(String::as_str) == Some("run") => {
                self.run_container(spec, None)
            }
            "rsync" => self.run_rsync(spec),
            _ => Self::ok(""),
        }
    }

    fn locate(&self, program: &str) -> bool {
        !self.state.lock().unwrap().missing.contains(program)
    }
}
