use std::fmt;

/// 迁移的一端：远程主机 + 登录方式 + 项目目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub host: String,
    pub user: String,
    pub ssh_key: Option<String>,
    pub base_path: String,
}

impl RemoteTarget {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        ssh_key: Option<String>,
        base_path: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            ssh_key,
            base_path: base_path.into(),
        }
    }

    /// ssh 目标：`user@host`，用户为空时只有主机名
    pub fn destination(&self) -> String {
        if self.user.is_empty() {
            self.host.clone()
        } else {
            format!("{}@{}", self.user, self.host)
        }
    }

    /// 项目目录下的路径（远程主机上固定使用 `/` 分隔）
    pub fn project_path(&self, relative: &str) -> String {
        join_remote(&self.base_path, relative)
    }
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.destination())
    }
}

/// 拼接远程路径
pub fn join_remote(base: &str, relative: &str) -> String {
    let relative = relative.trim_start_matches('/');
    if relative.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), relative)
}

/// 一次外部命令调用的描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// 为 None 时在本机执行，否则经 ssh 在远程主机执行
    pub host: Option<RemoteTarget>,
    pub stdin: Option<String>,
    /// 会改变系统状态的命令在 dry-run 下不会被执行
    pub mutating: bool,
}

impl CommandSpec {
    /// 只读命令（查询状态、列目录等）
    pub fn read(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            host: None,
            stdin: None,
            mutating: false,
        }
    }

    /// 有副作用的命令
    pub fn mutate(program: impl Into<String>) -> Self {
        Self {
            mutating: true,
            ..Self::read(program)
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn on(mut self, host: Option<&RemoteTarget>) -> Self {
        self.host = host.cloned();
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// 不含主机前缀的命令行
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Some(host) => write!(f, "[{}] {}", host, self.command_line()),
            None => write!(f, "{}", self.command_line()),
        }
    }
}

/// 命令执行结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// dry-run 下被跳过的命令的占位结果
    pub fn skipped() -> Self {
        Self {
            exit_code: Some(0),
            ..Self::default()
        }
    }
}
