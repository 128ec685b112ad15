// SSH 客户端 Handler 实现
// 实现 russh::client::Handler trait

use russh::keys::PublicKey;
use std::future::Future;
use tracing::{debug, warn};

/// SSH 客户端 Handler
///
/// 主机密钥策略：未知主机直接接受；与 ~/.ssh/known_hosts 记录冲突的密钥拒绝。
pub struct SshClientHandler {
    /// 服务器主机名
    host: String,
    /// 端口
    port: u16,
}

impl SshClientHandler {
    /// 创建新的 Handler
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }

    fn accept_key(&self, server_public_key: &PublicKey) -> bool {
        match russh::keys::check_known_hosts(&self.host, self.port, server_public_key) {
            Ok(true) => {
                debug!("[SSH] Host key for {}:{} matches known_hosts", self.host, self.port);
                true
            }
            Ok(false) => {
                debug!("[SSH] Unknown host {}:{}, accepting key", self.host, self.port);
                true
            }
            Err(russh::keys::Error::KeyChanged { line }) => {
                warn!(
                    "[SSH] Host key for {}:{} does not match known_hosts line {}",
                    self.host, self.port, line
                );
                false
            }
            Err(e) => {
                debug!("[SSH] known_hosts check skipped: {}", e);
                true
            }
        }
    }
}

impl russh::client::Handler for SshClientHandler {
    type Error = russh::Error;

    /// 检查服务器公钥
    fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        let fingerprint = server_public_key.fingerprint(russh::keys::ssh_key::HashAlg::Sha256);
        debug!(
            "[SSH] Server key fingerprint for {}: {} ({})",
            self.host,
            fingerprint,
            server_public_key.algorithm()
        );

        let accepted = self.accept_key(server_public_key);
        async move { Ok(accepted) }
    }
}
