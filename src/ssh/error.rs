// SSH 错误类型定义

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// SSH 错误类型
///
/// 前置条件类错误（`NotConnected` / `ChannelNotOpen` / `SftpNotOpen`）带有
/// `显示名|地址` 标签，便于在多主机场景下定位。
#[derive(Debug, Error)]
pub enum SshError {
    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO 错误（网络连接等）
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 无法建立到主机的连接（拒绝、重置、不可达）
    #[error("Connection error: {0}")]
    Connect(std::io::Error),

    /// 认证失败
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// SSH 协议错误
    #[error("SSH protocol error: {0}")]
    Protocol(String),

    /// 密钥错误
    #[error("Key error: {0}")]
    Key(String),

    /// 连接超时
    #[error("Connection timeout after {0}s")]
    Timeout(u64),

    /// 通道错误
    #[error("Channel error: {0}")]
    Channel(String),

    /// SFTP 子系统错误
    #[error("SFTP error: {0}")]
    Sftp(String),

    /// 未知的文本编码
    #[error("Unknown text encoding: {0}")]
    Encoding(String),

    /// 会话尚未建立
    #[error("|{host}| Connection is not created")]
    NotConnected { host: String },

    /// 交互式通道尚未打开
    #[error("|{host}| Ssh channel is not opened")]
    ChannelNotOpen { host: String },

    /// SFTP 子会话尚未打开
    #[error("|{host}| Sftp channel not created")]
    SftpNotOpen { host: String },

    /// 本地文件不存在
    #[error("|{host}| Local file does not exist: {}", path.display())]
    LocalFileNotFound { host: String, path: PathBuf },

    /// 远程路径不是目录
    #[error("|{host}| Remote object is not a directory: {path}")]
    NotADirectory { host: String, path: String },

    /// 上传后远程文件大小与本地不一致
    #[error("|{host}| Size mismatch after upload of {path}: local {expected} bytes, remote {actual} bytes")]
    TransferMismatch {
        host: String,
        path: String,
        expected: u64,
        actual: u64,
    },

    /// 远程目录条目名包含路径分隔符或 `.` / `..`
    #[error("|{host}| Refusing remote entry {name:?} in {dir}")]
    UnsafeEntryName {
        host: String,
        dir: String,
        name: String,
    },

    /// 服务状态查询没有给出可识别的状态
    #[error("|{host}| Failed to query state of service {service}: {detail}")]
    ServiceQuery {
        host: String,
        service: String,
        detail: String,
    },

    /// 等待服务结束超时
    #[error("|{host}| Service {service} is still running after {waited:?}")]
    ServiceTimeout {
        host: String,
        service: String,
        waited: Duration,
    },
}

/// 连接失败的分类，用于重试日志
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// 认证失败
    Authentication,
    /// SSH 协议层错误
    Protocol,
    /// 传输层 / 连接错误
    Connectivity,
    /// 操作系统层面的网络错误
    Network,
}

impl FailureKind {
    /// 重试日志使用的前缀
    pub fn label(&self) -> &'static str {
        match self {
            Self::Authentication => "Authentication failed",
            Self::Protocol => "SSH error",
            Self::Connectivity => "Connection Error",
            Self::Network => "Network error",
        }
    }
}

impl SshError {
    /// 对建立连接过程中的失败进行分类
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Auth(_) | Self::Key(_) => FailureKind::Authentication,
            Self::Protocol(_) | Self::Channel(_) | Self::Sftp(_) => FailureKind::Protocol,
            Self::Connect(_) | Self::Timeout(_) | Self::NotConnected { .. } => {
                FailureKind::Connectivity
            }
            _ => FailureKind::Network,
        }
    }

    /// 是否属于"资源未就绪"类前置条件错误
    pub fn is_not_ready(&self) -> bool {
        matches!(
            self,
            Self::NotConnected { .. } | Self::ChannelNotOpen { .. } | Self::SftpNotOpen { .. }
        )
    }
}

impl From<russh::Error> for SshError {
    fn from(e: russh::Error) -> Self {
        match e {
            russh::Error::IO(io) => SshError::Connect(io),
            other => SshError::Protocol(other.to_string()),
        }
    }
}

impl From<russh::keys::Error> for SshError {
    fn from(e: russh::keys::Error) -> Self {
        SshError::Key(e.to_string())
    }
}

impl From<russh_sftp::client::error::Error> for SshError {
    fn from(e: russh_sftp::client::error::Error) -> Self {
        SshError::Sftp(e.to_string())
    }
}
