// 交互式 Shell 通道
//
// 绑定在某个 Connection 的会话句柄上。exec_command 只做一次读取：
// 等到有数据可读后读取最多 RECV_CHUNK 字节。输出超过一个分块，
// 或在轮询间隔之后才到达的输出，可能被截断或错过。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use super::connection::{Connection, RETRY_BACKOFF};
use super::error::SshError;
use super::manager::SshManager;
use super::transport::{SessionHandle, ShellStream};
use crate::models::{decode_output, ServerData};
use crate::output::OutputSink;
use crate::scope::Bracket;

/// 等待输出时的轮询间隔
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// 单次读取的最大字节数
pub const RECV_CHUNK: usize = 1024;

/// 通道状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    Closed,
    Open,
}

/// 交互式 Shell 通道
pub struct Channel {
    server: Arc<ServerData>,
    handle: SessionHandle,
    sink: Arc<dyn OutputSink>,
    shell: Option<Box<dyn ShellStream>>,
}

impl Channel {
    /// 绑定到连接的会话句柄（连接可以稍后才建立）
    pub fn new(connection: &Connection) -> Self {
        Self {
            server: connection.server().clone(),
            handle: connection.handle().clone(),
            sink: connection.sink().clone(),
            shell: None,
        }
    }

    pub fn state(&self) -> ChannelState {
        if self.shell.is_some() {
            ChannelState::Open
        } else {
            ChannelState::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.shell.is_some()
    }

    /// 打开 Shell 通道，失败时重试直到 connection_timeout 耗尽
    ///
    /// 超时后通道保持关闭，后续操作返回 ChannelNotOpen。
    pub fn open(&mut self) {
        SshManager::global().block_on(self.open_async())
    }

    async fn open_async(&mut self) {
        let budget = Duration::from_secs(self.server.connection_timeout);
        let started = Instant::now();

        while started.elapsed() < budget && self.shell.is_none() {
            let attempt = match self.handle.get() {
                Some(session) => session.open_shell().await,
                None => Err(SshError::NotConnected {
                    host: self.server.tag(),
                }),
            };

            match attempt {
                Ok(shell) => {
                    debug!("[Channel] [{}] Shell channel opened", self.server.tag());
                    self.shell = Some(shell);
                }
                Err(e) => {
                    self.sink.error(
                        &self.server,
                        &format!("SSH error: {}. Waiting and retrying...", e),
                    );
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
            }
        }
    }

    /// 发送命令并读取一次可用输出
    ///
    /// 命令末尾自动追加换行；每 POLL_INTERVAL 检查一次是否有数据，
    /// 没有超时，由远程关闭通道时返回错误。
    pub fn exec_command(
        &mut self,
        command: &str,
        encoding: &str,
        show_output: bool,
    ) -> Result<String, SshError> {
        let host = self.server.tag();
        let Some(shell) = self.shell.as_mut() else {
            return Err(SshError::ChannelNotOpen { host });
        };
        if !self.handle.is_live() {
            return Err(SshError::NotConnected { host });
        }

        let bytes = SshManager::global().block_on(async {
            shell.send(format!("{}\n", command).as_bytes()).await?;
            while !shell.recv_ready().await? {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            shell.recv(RECV_CHUNK).await
        })?;

        let output = decode_output(&bytes, encoding)?;
        if show_output {
            self.sink.echo(&self.server, &output);
        }
        Ok(output)
    }

    /// 关闭通道；从未打开时返回 ChannelNotOpen
    pub fn close(&mut self) -> Result<(), SshError> {
        let Some(mut shell) = self.shell.take() else {
            return Err(SshError::ChannelNotOpen {
                host: self.server.tag(),
            });
        };
        debug!("[Channel] [{}] Closing shell channel", self.server.tag());
        SshManager::global().block_on(shell.close())
    }
}

impl Bracket for Channel {
    fn enter(&mut self) -> Result<(), SshError> {
        self.open();
        Ok(())
    }

    fn exit(&mut self) {
        if self.is_open() {
            if let Err(e) = self.close() {
                debug!("[Channel] [{}] Error while closing: {}", self.server.tag(), e);
            }
        }
    }
}
