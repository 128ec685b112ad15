// ServerData 数据结构

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// 默认 SSH 端口
pub const DEFAULT_PORT: u16 = 22;

/// 默认连接超时（秒）
pub const DEFAULT_CONNECTION_TIMEOUT: u64 = 300;

/// 目标主机描述（构造后不可变）
///
/// 所有作用于同一主机的组件通过 `Arc<ServerData>` 共享同一份描述，
/// 任何组件都不会修改它。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerData {
    /// 主机地址（IP 或域名）
    pub address: String,
    /// 端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 用户名
    pub username: String,
    /// 密码
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// 私钥文件路径（未设置密码时使用）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<PathBuf>,
    /// 私钥密码
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_passphrase: Option<String>,
    /// 显示名称，仅用于日志
    #[serde(default)]
    pub custom_name: String,
    /// 连接超时（秒），同时约束会话和交互式通道的建立重试
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connection_timeout() -> u64 {
    DEFAULT_CONNECTION_TIMEOUT
}

impl ServerData {
    /// 创建主机描述
    pub fn new(address: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            password: None,
            private_key_path: None,
            key_passphrase: None,
            custom_name: String::new(),
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_private_key(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: Option<String>,
    ) -> Self {
        self.private_key_path = Some(key_path.into());
        self.key_passphrase = passphrase;
        self
    }

    pub fn with_custom_name(mut self, name: impl Into<String>) -> Self {
        self.custom_name = name.into();
        self
    }

    pub fn with_connection_timeout(mut self, seconds: u64) -> Self {
        self.connection_timeout = seconds;
        self
    }

    /// 日志及错误信息中使用的主机标签：`显示名|地址`
    pub fn tag(&self) -> String {
        format!("{}|{}", self.custom_name, self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let server = ServerData::new("10.0.0.1", "root");
        assert_eq!(server.port, 22);
        assert_eq!(server.connection_timeout, 300);
        assert_eq!(server.tag(), "|10.0.0.1");
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let json = r#"{"address":"db.local","username":"admin","custom_name":"db"}"#;
        let server: ServerData = serde_json::from_str(json).unwrap();
        assert_eq!(server.port, DEFAULT_PORT);
        assert_eq!(server.connection_timeout, DEFAULT_CONNECTION_TIMEOUT);
        assert_eq!(server.password, None);
        assert_eq!(server.tag(), "db|db.local");
    }
}
