/// ExplorerLLM CLI 项目信息模块
///
/// explorerllm-cli 是面向用户的主程序，项目元数据统一在这里定义；
/// explorerllm-core 只提供技术性常量

/// 项目元数据（自动从 Cargo.toml 同步）
pub mod metadata {
    pub const PROJECT_NAME: &str = env!("CARGO_PKG_NAME");

    pub const PROJECT_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

    pub const PROJECT_AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

    /// 用户友好的显示名称（手动维护）
    pub mod display {
        pub const FRIENDLY_NAME: &str = "ExplorerLLM";

        /// 比 Cargo.toml 中的描述更详细
        pub const DESCRIPTION_LONG: &str = "Ollama + OpenWebUI docker compose 部署的运维工具：\
冷备份数据卷与配置、从备份集恢复、在两台主机之间迁移整个部署，并校验备份集的完整性";
    }
}

/// 版本信息
pub mod version_info {
    /// CLI 版本（自动从 Cargo.toml 同步）
    pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

    /// 核心库版本（从 explorerllm-core 获取）
    pub const CORE_VERSION: &str = explorerllm_core::constants::version::CORE_VERSION;
}

/// 获取版本信息字符串
pub fn get_version_string() -> String {
    format!(
        "{} v{} (core v{})",
        metadata::display::FRIENDLY_NAME,
        version_info::CLI_VERSION,
        version_info::CORE_VERSION
    )
}
