// 协议协作方接口
//
// 握手、加密、通道复用和 SFTP 编码都由底层库负责，这里只定义本库需要调用的最小接口：
// - Connector: 认证并建立会话
// - RemoteSession: 一次性执行命令、打开交互式 Shell、打开 SFTP 子会话
// - ShellStream: 交互式 Shell 通道
// - SftpBackend: SFTP 子会话

use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use super::error::SshError;
use crate::models::{RemoteAttrs, RemoteEntry, ServerData};

/// 一次性执行命令的原始输出
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// 标准输出
    pub stdout: Vec<u8>,
    /// 标准错误
    pub stderr: Vec<u8>,
    /// 退出码（远程未报告时为 None）
    pub exit_status: Option<u32>,
}

/// 建立已认证的会话
#[async_trait]
pub trait Connector: Send + Sync {
    /// 进行一次连接和认证尝试，`budget` 为本次尝试允许占用的最长时间
    async fn connect(
        &self,
        server: &ServerData,
        budget: Duration,
    ) -> Result<Box<dyn RemoteSession>, SshError>;
}

/// 已认证的会话
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// 执行命令，读完 stdout/stderr 并等待退出码
    async fn exec(&self, command: &str) -> Result<ExecOutput, SshError>;

    /// 打开交互式 Shell 通道
    async fn open_shell(&self) -> Result<Box<dyn ShellStream>, SshError>;

    /// 打开 SFTP 子会话
    async fn open_sftp(&self) -> Result<Box<dyn SftpBackend>, SshError>;

    /// 关闭会话
    async fn close(&self) -> Result<(), SshError>;
}

/// 交互式 Shell 通道
#[async_trait]
pub trait ShellStream: Send {
    /// 发送数据
    async fn send(&mut self, data: &[u8]) -> Result<(), SshError>;

    /// 是否有可读数据（不阻塞）
    async fn recv_ready(&mut self) -> Result<bool, SshError>;

    /// 读取最多 `max_bytes` 字节
    async fn recv(&mut self, max_bytes: usize) -> Result<Vec<u8>, SshError>;

    /// 关闭通道
    async fn close(&mut self) -> Result<(), SshError>;
}

/// SFTP 子会话
#[async_trait]
pub trait SftpBackend: Send + Sync {
    /// 上传本地文件，返回写入的字节数
    async fn put(&self, local: &Path, remote: &str) -> Result<u64, SshError>;

    /// 下载远程文件，返回写入的字节数
    async fn get(&self, remote: &str, local: &Path) -> Result<u64, SshError>;

    /// 获取路径属性（不跟随符号链接）
    async fn lstat(&self, remote: &str) -> Result<RemoteAttrs, SshError>;

    /// 列出目录条目，顺序与服务器返回一致
    async fn read_dir(&self, remote: &str) -> Result<Vec<RemoteEntry>, SshError>;

    /// 关闭子会话
    async fn close(&self) -> Result<(), SshError>;
}

/// 会话句柄
///
/// 在 Connection 构造时创建，之后由同一主机上的 Channel / Sftp 共享。
/// 句柄内为空即表示未连接。
#[derive(Clone, Default)]
pub struct SessionHandle {
    slot: Arc<RwLock<Option<Arc<dyn RemoteSession>>>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前会话
    pub fn get(&self) -> Option<Arc<dyn RemoteSession>> {
        self.slot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_live(&self) -> bool {
        self.get().is_some()
    }

    pub(crate) fn set(&self, session: Arc<dyn RemoteSession>) {
        *self
            .slot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(session);
    }

    pub(crate) fn take(&self) -> Option<Arc<dyn RemoteSession>> {
        self.slot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("live", &self.is_live())
            .finish()
    }
}
