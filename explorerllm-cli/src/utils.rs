use explorerllm_core::constants::env;

/// # ExplorerLLM CLI 日志系统使用说明
///
/// 1. **库代码只使用 `tracing` 宏**：`info!()`, `warn!()`, `error!()`, `debug!()`
/// 2. **应用入口控制日志配置**：在 `main.rs` 中调用 `setup_logging()`
///
/// ## 日志配置选项
/// - `-v, --verbose`：启用详细日志模式（DEBUG 级别）
/// - `RUST_LOG`：标准的日志级别控制，优先于 `-v`
/// - `EXPLORERLLM_LOG_FILE`：日志文件路径，设置后日志输出到文件而非终端
///
/// ```bash
/// # 详细日志输出到终端
/// explorerllm -v backup
///
/// # 日志输出到文件
/// EXPLORERLLM_LOG_FILE=explorerllm.log explorerllm migrate old-box new-box
///
/// # 只看编排流程的调试日志
/// RUST_LOG=explorerllm_core::pipeline=debug explorerllm restore ./backups/explorerllm_20250101_020000
/// ```
///
/// ## 日志格式
/// - **终端输出**：人类可读格式，不显示模块路径和时间戳
/// - **文件输出**：包含完整模块路径、线程名和行号
pub fn setup_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 日志文件打不开时退回到终端输出
    let log_file = std::env::var(env::LOG_FILE).ok().and_then(|path| {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("无法打开日志文件 {path}: {e}，日志输出到终端");
                None
            }
        }
    });

    if let Some(file) = log_file {
        fmt()
            .with_env_filter(env_filter)
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_names(true)
            .with_line_number(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false)
            .without_time()
            .compact()
            .init();
    }
}

/// 字节数的可读形式
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
