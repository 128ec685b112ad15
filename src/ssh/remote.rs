// Ssh：连接 + 交互式通道的组合入口
//
// exec_command 走一次性执行路径（每条命令单独的 exec 通道），与交互式 Channel 无关。

use std::sync::Arc;

use tracing::debug;

use super::channel::Channel;
use super::connection::Connection;
use super::error::SshError;
use super::manager::SshManager;
use crate::models::{decode_output, CommandOutput, ServerData, DEFAULT_ENCODING};
use crate::output::OutputSink;
use crate::scope::Bracket;

/// exec_command 的可选参数
#[derive(Clone, Debug)]
pub struct ExecOptions {
    /// 输出编码
    pub encoding: String,
    /// 是否回显标准输出
    pub echo_stdout: bool,
    /// 是否回显标准错误
    pub echo_stderr: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            encoding: DEFAULT_ENCODING.to_string(),
            echo_stdout: true,
            echo_stderr: true,
        }
    }
}

impl ExecOptions {
    /// 不回显任何输出
    pub fn quiet() -> Self {
        Self {
            echo_stdout: false,
            echo_stderr: false,
            ..Self::default()
        }
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }
}

/// 远程命令执行入口
pub struct Ssh {
    connection: Connection,
    channel: Channel,
}

impl Ssh {
    /// 使用默认 russh 连接器
    pub fn new(server: ServerData) -> Self {
        Self::with_connection(Connection::new(server))
    }

    /// 复用已有连接
    pub fn with_connection(connection: Connection) -> Self {
        let channel = Channel::new(&connection);
        Self {
            connection,
            channel,
        }
    }

    pub fn server(&self) -> &Arc<ServerData> {
        self.connection.server()
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// 绑定在同一连接上的交互式通道
    pub fn channel(&mut self) -> &mut Channel {
        &mut self.channel
    }

    pub(crate) fn sink(&self) -> &Arc<dyn OutputSink> {
        self.connection.sink()
    }

    /// 建立连接（超时不报错，见 Connection::create）
    pub fn connect(&self) {
        self.connection.create();
    }

    /// 关闭连接；交互式通道若仍打开则先关闭
    pub fn close(&mut self) {
        if self.channel.is_open() {
            if let Err(e) = self.channel.close() {
                debug!("[SSH] [{}] Error while closing channel: {}", self.server().tag(), e);
            }
        }
        self.connection.delete();
    }

    /// 以默认参数执行命令（utf-8，回显 stdout/stderr）
    pub fn exec_command(&self, command: &str) -> Result<CommandOutput, SshError> {
        self.exec_command_with(command, &ExecOptions::default())
    }

    /// 执行命令，阻塞到远程命令结束且两路输出读完，没有超时
    pub fn exec_command_with(
        &self,
        command: &str,
        options: &ExecOptions,
    ) -> Result<CommandOutput, SshError> {
        SshManager::global().block_on(self.exec_async(command, options))
    }

    pub(crate) async fn exec_async(
        &self,
        command: &str,
        options: &ExecOptions,
    ) -> Result<CommandOutput, SshError> {
        let session = self.connection.live_session()?;

        debug!("[SSH] [{}] exec: {}", self.server().tag(), command);
        let raw = session.exec(command).await?;

        let output = CommandOutput {
            stdout: decode_output(&raw.stdout, &options.encoding)?
                .trim()
                .to_string(),
            stderr: decode_output(&raw.stderr, &options.encoding)?
                .trim()
                .to_string(),
            exit_code: raw.exit_status.map(|code| code as i32).unwrap_or(-1),
        };

        if options.echo_stdout && !output.stdout.is_empty() {
            self.sink().echo(self.server(), &output.stdout);
        }
        if options.echo_stderr && !output.stderr.is_empty() {
            self.sink().echo(self.server(), &output.stderr);
        }

        Ok(output)
    }
}

impl Bracket for Ssh {
    fn enter(&mut self) -> Result<(), SshError> {
        self.connect();
        Ok(())
    }

    fn exit(&mut self) {
        self.close();
    }
}
