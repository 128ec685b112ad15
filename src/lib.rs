// ssh-wrapper - SSH/SFTP 会话封装
//
// 对外接口全部是阻塞调用，内部在全局 tokio 运行时上执行（见 ssh::SshManager），
// 因此不能在异步上下文中调用。

pub mod models;
pub mod output;
pub mod scope;
pub mod services;
pub mod ssh;

#[cfg(test)]
mod testing;

pub use models::{CommandOutput, ServerData};
pub use output::{ConsoleSink, LogEntry, LogLevel, OutputSink, StatusIndicator, TracingSink};
pub use scope::{Bracket, Scoped};
pub use services::sftp::Sftp;
pub use ssh::{
    Channel, ChannelState, Connection, ConnectionState, ExecOptions, ServiceState, ServiceWait,
    Ssh, SshError,
};

/// 初始化日志系统
///
/// 可以通过 RUST_LOG 环境变量控制日志级别，例如：RUST_LOG=debug。
/// 已经安装过全局 subscriber 时什么也不做。
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false) // 不显示 target（模块路径）
        .try_init();
}
