// SSH 连接模块
//
// 模块结构:
// - config: 连接配置 (SshConfig, AuthMethod)
// - error: 错误类型 (SshError)
// - transport: 协议协作者接口 (Connector, RemoteSession, ShellStream, SftpBackend)
// - handler: russh Handler 实现
// - client: 基于 russh 的连接器
// - session: russh 会话与交互式 Shell
// - manager: 全局 tokio 运行时
// - connection: 带重试的连接 (Connection)
// - channel: 交互式通道 (Channel)
// - remote: 命令执行入口 (Ssh)
// - service: systemd 服务等待

pub mod channel;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod manager;
pub mod remote;
pub mod service;
pub mod session;
pub mod transport;

// 公开导出
pub use channel::{Channel, ChannelState, POLL_INTERVAL, RECV_CHUNK};
pub use client::RusshConnector;
pub use config::{AuthMethod, KeepaliveConfig, PtyRequest, SshConfig};
pub use connection::{Connection, ConnectionState, RETRY_BACKOFF};
pub use error::{FailureKind, SshError};
pub use manager::SshManager;
pub use remote::{ExecOptions, Ssh};
pub use service::{ServiceState, ServiceWait, FINAL_LOG_LINES};
pub use session::{RusshSession, RusshShell};
pub use transport::{
    Connector, ExecOutput, RemoteSession, SessionHandle, SftpBackend, ShellStream,
};
