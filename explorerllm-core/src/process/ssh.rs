use super::types::{CommandSpec, RemoteTarget};
use crate::constants::ssh;

/// POSIX shell 单引号转义；只含安全字符时原样返回
pub fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,@%+".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// 展开 `~/` 开头的密钥路径
fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path.to_string(),
    }
}

/// ssh 的公共选项（不含目标主机）
pub fn ssh_options(target: &RemoteTarget) -> Vec<String> {
    let mut args: Vec<String> = ssh::NON_INTERACTIVE_OPTIONS
        .iter()
        .map(|s| s.to_string())
        .collect();
    args.push("-o".to_string());
    args.push(format!("ConnectTimeout={}", ssh::CONNECT_TIMEOUT));
    if let Some(key) = target
        .ssh_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
    {
        args.push("-i".to_string());
        args.push(expand_home(key));
    }
    args
}

/// 将命令转换为实际要启动的程序和参数；远程命令包装为 ssh 调用
pub fn wrap(spec: &CommandSpec) -> (String, Vec<String>) {
    match &spec.host {
        None => (spec.program.clone(), spec.args.clone()),
        Some(target) => {
            let remote_command = std::iter::once(&spec.program)
                .chain(spec.args.iter())
                .map(|part| shell_quote(part))
                .collect::<Vec<_>>()
                .join(" ");

            let mut args = ssh_options(target);
            args.push(target.destination());
            args.push(remote_command);
            ("ssh".to_string(), args)
        }
    }
}

/// rsync `-e` 参数使用的远程 shell
pub fn rsync_remote_shell(target: &RemoteTarget) -> String {
    std::iter::once("ssh".to_string())
        .chain(ssh_options(target).iter().map(|s| shell_quote(s)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// rsync 使用的远程路径 `user@host:path`
pub fn rsync_location(target: &RemoteTarget, path: &str) -> String {
    format!("{}:{}", target.destination(), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(key: Option<&str>) -> RemoteTarget {
        RemoteTarget::new("gpu-01", "deploy", key.map(str::to_string), "/opt/explorerllm")
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/opt/explorerllm"), "/opt/explorerllm");
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_wrap_local_is_passthrough() {
        let spec = CommandSpec::read("docker").args(["compose", "version"]);
        let (program, args) = wrap(&spec);
        assert_eq!(program, "docker");
        assert_eq!(args, vec!["compose", "version"]);
    }

    #[test]
    fn test_wrap_remote_uses_ssh_with_quoted_command() {
        let remote = target(Some("/keys/id_ed25519"));
        let spec = CommandSpec::mutate("sh")
            .args(["-c", "echo hello world"])
            .on(Some(&remote));

        let (program, args) = wrap(&spec);
        assert_eq!(program, "ssh");
        assert!(args.contains(&"StrictHostKeyChecking=no".to_string()));
        assert!(args.windows(2).any(|w| w == ["-i", "/keys/id_ed25519"]));
        assert_eq!(args[args.len() - 2], "deploy@gpu-01");
        assert_eq!(args[args.len() - 1], "sh -c 'echo hello world'");
    }

    #[test]
    fn test_rsync_helpers() {
        let remote = target(None);
        assert_eq!(
            rsync_location(&remote, "/opt/explorerllm/"),
            "deploy@gpu-01:/opt/explorerllm/"
        );
        let shell = rsync_remote_shell(&remote);
        assert!(shell.starts_with("ssh -o BatchMode=yes"));
        assert!(!shell.contains("-i"));
    }
}
