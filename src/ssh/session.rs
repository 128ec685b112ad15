// SSH 会话
// 认证成功后的会话对象：一次性执行命令、交互式 Shell、SFTP 子会话

use async_trait::async_trait;
use futures::FutureExt;
use russh::client::{Handle, Msg};
use russh::ChannelMsg;
use tracing::debug;
use uuid::Uuid;

use super::config::SshConfig;
use super::error::SshError;
use super::handler::SshClientHandler;
use super::transport::{ExecOutput, RemoteSession, SftpBackend, ShellStream};
use crate::services::sftp::RusshSftp;

type RusshChannel = russh::Channel<Msg>;

/// 基于 russh Handle 的会话
pub struct RusshSession {
    /// 会话 ID（仅用于日志）
    id: String,
    handle: Handle<SshClientHandler>,
    config: SshConfig,
}

impl RusshSession {
    pub fn new(handle: Handle<SshClientHandler>, config: SshConfig) -> Self {
        let id = Uuid::new_v4().to_string();
        debug!(
            "[SSH] Session {} created for {}@{}",
            id, config.username, config.host
        );
        Self { id, handle, config }
    }

    /// 获取会话 ID
    pub fn id(&self) -> &str {
        &self.id
    }
}

#[async_trait]
impl RemoteSession for RusshSession {
    async fn exec(&self, command: &str) -> Result<ExecOutput, SshError> {
        let mut channel = self.handle.channel_open_session().await?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| SshError::Channel(e.to_string()))?;

        let mut output = ExecOutput::default();

        // 退出码可能在 EOF 之后才到达，读到 Close 为止
        while let Some(channel_msg) = channel.wait().await {
            match channel_msg {
                ChannelMsg::Data { data } => {
                    output.stdout.extend_from_slice(&data);
                }
                ChannelMsg::ExtendedData { data, ext } => {
                    if ext == 1 {
                        output.stderr.extend_from_slice(&data);
                    }
                }
                ChannelMsg::ExitStatus { exit_status } => {
                    output.exit_status = Some(exit_status);
                }
                ChannelMsg::Close => break,
                _ => {}
            }
        }

        Ok(output)
    }

    async fn open_shell(&self) -> Result<Box<dyn ShellStream>, SshError> {
        let channel = self.handle.channel_open_session().await?;

        let pty = &self.config.pty;
        channel
            .request_pty(false, &pty.term, pty.col_width, pty.row_height, 0, 0, &[])
            .await?;
        channel.request_shell(false).await?;

        debug!("[SSH] Interactive shell opened on session {}", self.id);
        Ok(Box::new(RusshShell::new(channel)))
    }

    async fn open_sftp(&self) -> Result<Box<dyn SftpBackend>, SshError> {
        let channel = self.handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;

        let sftp = russh_sftp::client::SftpSession::new(channel.into_stream()).await?;

        debug!("[SFTP] Subsystem opened on session {}", self.id);
        Ok(Box::new(RusshSftp::new(sftp)))
    }

    async fn close(&self) -> Result<(), SshError> {
        debug!("[SSH] Closing session {}", self.id);
        self.handle
            .disconnect(russh::Disconnect::ByApplication, "", "English")
            .await
            .map_err(SshError::from)
    }
}

/// Shell 输出缓冲
///
/// russh 的通道是消息流，这里把已到达的数据缓存起来，
/// 以提供"是否可读 / 读取若干字节"的语义。
#[derive(Debug, Default)]
struct ShellBuffer {
    pending: Vec<u8>,
    remote_closed: bool,
}

impl ShellBuffer {
    /// 处理一条通道消息，None 表示通道已结束
    fn absorb(&mut self, msg: Option<ChannelMsg>) {
        match msg {
            Some(ChannelMsg::Data { data }) => self.pending.extend_from_slice(&data),
            Some(ChannelMsg::ExtendedData { data, .. }) => self.pending.extend_from_slice(&data),
            Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => self.remote_closed = true,
            Some(_) => {}
        }
    }

    fn drain(&mut self, max_bytes: usize) -> Vec<u8> {
        let n = max_bytes.min(self.pending.len());
        self.pending.drain(..n).collect()
    }

    /// 有缓存数据时可读；远程已关闭且缓存为空时报错
    fn readiness(&self) -> Result<bool, SshError> {
        if self.pending.is_empty() && self.remote_closed {
            return Err(SshError::Channel("Shell closed by remote".to_string()));
        }
        Ok(!self.pending.is_empty())
    }

    fn is_waiting(&self) -> bool {
        self.pending.is_empty() && !self.remote_closed
    }
}

/// 交互式 Shell 通道
pub struct RusshShell {
    channel: RusshChannel,
    buffer: ShellBuffer,
}

impl RusshShell {
    fn new(channel: RusshChannel) -> Self {
        Self {
            channel,
            buffer: ShellBuffer::default(),
        }
    }
}

#[async_trait]
impl ShellStream for RusshShell {
    async fn send(&mut self, data: &[u8]) -> Result<(), SshError> {
        self.channel
            .data(data)
            .await
            .map_err(|e| SshError::Channel(e.to_string()))
    }

    async fn recv_ready(&mut self) -> Result<bool, SshError> {
        // 只取已经到达的消息，不等待
        while !self.buffer.remote_closed {
            match self.channel.wait().now_or_never() {
                Some(msg) => self.buffer.absorb(msg),
                None => break,
            }
        }
        self.buffer.readiness()
    }

    async fn recv(&mut self, max_bytes: usize) -> Result<Vec<u8>, SshError> {
        while self.buffer.is_waiting() {
            let msg = self.channel.wait().await;
            self.buffer.absorb(msg);
        }
        Ok(self.buffer.drain(max_bytes))
    }

    async fn close(&mut self) -> Result<(), SshError> {
        self.channel
            .close()
            .await
            .map_err(|e| SshError::Channel(e.to_string()))
    }
}
