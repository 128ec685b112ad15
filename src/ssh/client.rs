// SSH 客户端核心实现
// 负责 TCP 连接、SSH 握手与认证，产出 RusshSession

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{AuthResult, Handle};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use super::config::{AuthMethod, SshConfig};
use super::error::SshError;
use super::handler::SshClientHandler;
use super::session::RusshSession;
use super::transport::{Connector, RemoteSession};
use crate::models::ServerData;

/// 基于 russh 的连接器
#[derive(Clone, Copy, Debug, Default)]
pub struct RusshConnector;

impl RusshConnector {
    pub fn new() -> Self {
        Self
    }

    /// 建立 TCP 连接、完成握手与认证
    async fn establish(&self, config: SshConfig) -> Result<RusshSession, SshError> {
        debug!(
            "[SSH] Connecting to {}@{}:{}",
            config.username, config.host, config.port
        );

        let tcp_stream = TcpStream::connect((config.host.as_str(), config.port))
            .await
            .map_err(classify_io)?;

        debug!("[SSH] TCP connection established, starting handshake");

        let russh_config = Arc::new(config.to_russh_config());
        let handler = SshClientHandler::new(config.host.clone(), config.port);
        let mut handle = russh::client::connect_stream(russh_config, tcp_stream, handler)
            .await
            .map_err(SshError::from)?;

        debug!("[SSH] Handshake completed, authenticating as '{}'", config.username);

        authenticate(&mut handle, &config).await?;

        Ok(RusshSession::new(handle, config))
    }
}

#[async_trait]
impl Connector for RusshConnector {
    async fn connect(
        &self,
        server: &ServerData,
        budget: Duration,
    ) -> Result<Box<dyn RemoteSession>, SshError> {
        let config = SshConfig::from_server(server);
        let session = timeout(budget, self.establish(config))
            .await
            .map_err(|_| SshError::Timeout(budget.as_secs()))??;
        Ok(Box::new(session))
    }
}

/// 区分"连不上"与其他系统网络错误
fn classify_io(e: std::io::Error) -> SshError {
    match e.kind() {
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::TimedOut => SshError::Connect(e),
        _ => SshError::Io(e),
    }
}

/// 执行认证
async fn authenticate(
    handle: &mut Handle<SshClientHandler>,
    config: &SshConfig,
) -> Result<(), SshError> {
    let auth_result = match &config.auth {
        AuthMethod::Password(password) => {
            debug!("[SSH] Using password authentication");
            handle
                .authenticate_password(&config.username, password)
                .await
                .map_err(SshError::from)?
        }
        AuthMethod::PublicKey {
            key_path,
            passphrase,
        } => {
            debug!("[SSH] Using public key authentication: {:?}", key_path);

            let key = load_private_key(key_path, passphrase.as_deref()).await?;
            let key_with_alg = russh::keys::PrivateKeyWithHashAlg::new(Arc::new(key), None);

            handle
                .authenticate_publickey(&config.username, key_with_alg)
                .await
                .map_err(SshError::from)?
        }
        AuthMethod::None => {
            debug!("[SSH] No credentials configured, trying 'none' authentication");
            handle
                .authenticate_none(&config.username)
                .await
                .map_err(SshError::from)?
        }
    };

    match auth_result {
        AuthResult::Success => Ok(()),
        AuthResult::Failure {
            partial_success: true,
            ..
        } => Err(SshError::Auth(
            "Partial authentication - additional auth required".to_string(),
        )),
        AuthResult::Failure {
            remaining_methods, ..
        } => Err(SshError::Auth(format!(
            "Server rejected credentials for '{}'. Server suggests: {:?}",
            config.username, remaining_methods
        ))),
    }
}

/// 加载私钥文件
async fn load_private_key(
    key_path: &Path,
    passphrase: Option<&str>,
) -> Result<russh::keys::PrivateKey, SshError> {
    let key_data = tokio::fs::read(key_path)
        .await
        .map_err(|e| SshError::Key(format!("Failed to read key file {:?}: {}", key_path, e)))?;

    russh::keys::decode_secret_key(&String::from_utf8_lossy(&key_data), passphrase)
        .map_err(|e| SshError::Key(format!("Failed to decode key {:?}: {}", key_path, e)))
}
