// SSH 连接
//
// 持有会话句柄，在 connection_timeout 内反复尝试认证，直到会话建立或超时。
// 超时后 create() 不返回错误，连接保持未建立状态，由后续受保护操作报告 NotConnected。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::client::RusshConnector;
use super::error::SshError;
use super::manager::SshManager;
use super::transport::{Connector, RemoteSession, SessionHandle};
use crate::models::ServerData;
use crate::output::{ConsoleSink, OutputSink};
use crate::scope::Bracket;

/// 每次失败后的固定等待时间
pub const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// 连接状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// 到一台主机的已认证连接
///
/// 克隆得到的是同一个连接（共享会话句柄），可交给 Sftp 复用。
/// 没有内部同步，同一时间只应由一个调用方驱动。
#[derive(Clone)]
pub struct Connection {
    server: Arc<ServerData>,
    connector: Arc<dyn Connector>,
    sink: Arc<dyn OutputSink>,
    handle: SessionHandle,
}

impl Connection {
    /// 使用 russh 连接器与终端输出创建连接
    pub fn new(server: ServerData) -> Self {
        Self::with_parts(
            Arc::new(server),
            Arc::new(RusshConnector::new()),
            Arc::new(ConsoleSink::new()),
        )
    }

    /// 指定连接器与输出目标
    pub fn with_parts(
        server: Arc<ServerData>,
        connector: Arc<dyn Connector>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            server,
            connector,
            sink,
            handle: SessionHandle::new(),
        }
    }

    pub fn server(&self) -> &Arc<ServerData> {
        &self.server
    }

    pub fn sink(&self) -> &Arc<dyn OutputSink> {
        &self.sink
    }

    /// 会话句柄（未连接时为空）
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// 建立会话，失败时按固定间隔重试直到 connection_timeout 耗尽
    pub fn create(&self) {
        SshManager::global().block_on(self.create_async())
    }

    pub(crate) async fn create_async(&self) {
        let budget = Duration::from_secs(self.server.connection_timeout);
        let started = Instant::now();
        let mut attempts = 0u32;

        while started.elapsed() < budget && !self.connection_check() {
            attempts += 1;
            let remaining = budget.saturating_sub(started.elapsed());
            debug!(
                "[SSH] [{}] Connection attempt {} ({:.1}s left)",
                self.server.tag(),
                attempts,
                remaining.as_secs_f64()
            );

            match self.connector.connect(&self.server, remaining).await {
                Ok(session) => {
                    self.handle.set(Arc::from(session));
                    info!(
                        "[SSH] [{}] Connected after {} attempt(s) in {:.2}s",
                        self.server.tag(),
                        attempts,
                        started.elapsed().as_secs_f64()
                    );
                }
                Err(e) => self.handle_error(&e).await,
            }
        }

        if !self.connection_check() {
            info!(
                "[SSH] [{}] Gave up connecting after {} attempt(s)",
                self.server.tag(),
                attempts
            );
        }
    }

    /// 会话是否已建立
    pub fn connection_check(&self) -> bool {
        self.handle.is_live()
    }

    pub fn state(&self) -> ConnectionState {
        if self.connection_check() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// 关闭会话；未连接时什么也不做
    pub fn delete(&self) {
        SshManager::global().block_on(self.delete_async())
    }

    pub(crate) async fn delete_async(&self) {
        if let Some(session) = self.handle.take() {
            if let Err(e) = session.close().await {
                debug!("[SSH] [{}] Error while closing session: {}", self.server.tag(), e);
            }
            info!("[SSH] [{}] Session closed", self.server.tag());
        }
    }

    /// 当前会话，未连接时返回 NotConnected
    pub(crate) fn live_session(&self) -> Result<Arc<dyn RemoteSession>, SshError> {
        self.handle.get().ok_or_else(|| SshError::NotConnected {
            host: self.server.tag(),
        })
    }

    async fn handle_error(&self, e: &SshError) {
        let message = match e {
            SshError::Auth(_) => e.failure_kind().label().to_string(),
            _ => format!("{}: {}", e.failure_kind().label(), e),
        };
        self.sink.error(
            &self.server,
            &format!("{}\nWaiting and retrying...", message),
        );
        tokio::time::sleep(RETRY_BACKOFF).await;
    }
}

impl Bracket for Connection {
    fn enter(&mut self) -> Result<(), SshError> {
        self.create();
        Ok(())
    }

    fn exit(&mut self) {
        self.delete();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("server", &self.server.tag())
            .field("state", &self.state())
            .finish()
    }
}
