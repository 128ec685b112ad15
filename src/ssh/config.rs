// SSH 连接配置

use std::path::PathBuf;
use std::time::Duration;

use crate::models::ServerData;

/// SSH 连接配置（由 ServerData 派生）
#[derive(Clone, Debug)]
pub struct SshConfig {
    /// 目标主机
    pub host: String,
    /// 端口
    pub port: u16,
    /// 用户名
    pub username: String,
    /// 认证方式
    pub auth: AuthMethod,
    /// 心跳配置
    pub keepalive: KeepaliveConfig,
    /// 交互式 Shell 的 PTY 参数
    pub pty: PtyRequest,
}

impl SshConfig {
    /// 从主机描述构建
    ///
    /// 认证方式优先级：密码 > 私钥文件 > none
    pub fn from_server(server: &ServerData) -> Self {
        let auth = match (&server.password, &server.private_key_path) {
            (Some(password), _) => AuthMethod::Password(password.clone()),
            (None, Some(key_path)) => AuthMethod::PublicKey {
                key_path: key_path.clone(),
                passphrase: server.key_passphrase.clone(),
            },
            (None, None) => AuthMethod::None,
        };

        Self {
            host: server.address.clone(),
            port: server.port,
            username: server.username.clone(),
            auth,
            keepalive: KeepaliveConfig::default(),
            pty: PtyRequest::default(),
        }
    }

    /// 构建 russh 配置
    pub fn to_russh_config(&self) -> russh::client::Config {
        let mut config = russh::client::Config::default();
        // 会话建立后不设置不活动超时，服务等待可能持续很久
        config.inactivity_timeout = None;
        if self.keepalive.enabled {
            config.keepalive_interval = Some(Duration::from_secs(self.keepalive.interval));
            config.keepalive_max = self.keepalive.max_retries as usize;
        }
        config
    }
}

/// 认证方式
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthMethod {
    /// 密码认证
    Password(String),
    /// 公钥认证
    PublicKey {
        /// 私钥文件路径
        key_path: PathBuf,
        /// 私钥密码（如果有）
        passphrase: Option<String>,
    },
    /// 不提供凭据
    None,
}

/// 心跳配置
#[derive(Clone, Debug)]
pub struct KeepaliveConfig {
    /// 是否启用心跳
    pub enabled: bool,
    /// 心跳间隔（秒）
    pub interval: u64,
    /// 最大重试次数
    pub max_retries: u32,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: 60,
            max_retries: 3,
        }
    }
}

/// PTY 请求参数
#[derive(Clone, Debug)]
pub struct PtyRequest {
    /// 终端类型
    pub term: String,
    /// 列数
    pub col_width: u32,
    /// 行数
    pub row_height: u32,
}

impl Default for PtyRequest {
    fn default() -> Self {
        Self {
            term: "vt100".to_string(),
            col_width: 80,
            row_height: 24,
        }
    }
}
