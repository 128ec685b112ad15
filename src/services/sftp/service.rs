// SFTP 服务 - 基于连接的文件上传与下载

use std::path::Path;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, info};

use crate::models::{join_path, ServerData};
use crate::output::OutputSink;
use crate::scope::Bracket;
use crate::ssh::transport::SftpBackend;
use crate::ssh::{Connection, SshError, SshManager};

/// SFTP 服务
///
/// 可以自己创建连接，也可以复用 Ssh 已建立的连接。
pub struct Sftp {
    connection: Connection,
    /// 连接是否由本对象创建（close 时一并关闭）
    owns_connection: bool,
    client: Option<Box<dyn SftpBackend>>,
    /// 是否输出传输日志
    verbose: bool,
}

impl Sftp {
    /// 创建独立连接
    pub fn new(server: ServerData) -> Self {
        Self::build(Connection::new(server), true)
    }

    /// 复用已有连接，close 时不会关闭该连接
    pub fn with_connection(connection: Connection) -> Self {
        Self::build(connection, false)
    }

    fn build(connection: Connection, owns_connection: bool) -> Self {
        Self {
            connection,
            owns_connection,
            client: None,
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn server(&self) -> &Arc<ServerData> {
        self.connection.server()
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }

    /// 必要时建立连接，然后打开 SFTP 子会话；已打开时什么也不做
    pub fn connect(&mut self) -> Result<(), SshError> {
        SshManager::global().block_on(self.connect_async())
    }

    async fn connect_async(&mut self) -> Result<(), SshError> {
        if self.client.is_some() {
            return Ok(());
        }
        if !self.connection.connection_check() {
            self.connection.create_async().await;
        }
        let session = self.connection.live_session()?;
        self.client = Some(session.open_sftp().await?);
        info!("[SFTP] [{}] SFTP session opened", self.server().tag());
        Ok(())
    }

    /// 关闭 SFTP 子会话；连接由本对象创建时一并关闭
    pub fn close(&mut self) {
        SshManager::global().block_on(async {
            if let Some(client) = self.client.take() {
                if let Err(e) = client.close().await {
                    debug!("[SFTP] [{}] Error while closing: {}", self.server().tag(), e);
                }
            }
            if self.owns_connection {
                self.connection.delete_async().await;
            }
        })
    }

    /// 上传文件，完成后比较远程文件大小
    ///
    /// 本地路径必须是普通文件，否则在任何远程操作之前返回 LocalFileNotFound。
    pub fn upload_file(&self, local: impl AsRef<Path>, remote: &str) -> Result<(), SshError> {
        let local = local.as_ref();
        let client = self.client()?;

        SshManager::global().block_on(async {
            let expected = match tokio::fs::metadata(local).await {
                Ok(meta) if meta.is_file() => meta.len(),
                _ => {
                    return Err(SshError::LocalFileNotFound {
                        host: self.server().tag(),
                        path: local.to_path_buf(),
                    })
                }
            };

            self.log(&format!("Uploading file: {} to {}", local.display(), remote));
            client.put(local, remote).await?;

            let actual = client.lstat(remote).await?.size;
            if actual != expected {
                return Err(SshError::TransferMismatch {
                    host: self.server().tag(),
                    path: remote.to_string(),
                    expected,
                    actual,
                });
            }
            Ok(())
        })
    }

    /// 下载文件或目录（按远程路径类型分派）
    pub fn download(&self, remote: &str, local: impl AsRef<Path>) -> Result<(), SshError> {
        let local = local.as_ref();
        let client = self.client()?;
        SshManager::global().block_on(async {
            if client.lstat(remote).await?.is_dir() {
                self.download_dir_async(client, remote, local).await
            } else {
                self.download_file_async(client, remote, local).await
            }
        })
    }

    /// 递归下载目录，本地目录已存在时覆盖同名文件
    pub fn download_dir(&self, remote: &str, local: impl AsRef<Path>) -> Result<(), SshError> {
        let client = self.client()?;
        SshManager::global().block_on(self.download_dir_async(client, remote, local.as_ref()))
    }

    /// 下载单个文件，自动创建本地父目录
    pub fn download_file(&self, remote: &str, local: impl AsRef<Path>) -> Result<(), SshError> {
        let client = self.client()?;
        SshManager::global().block_on(self.download_file_async(client, remote, local.as_ref()))
    }

    fn download_dir_async<'a>(
        &'a self,
        client: &'a dyn SftpBackend,
        remote: &'a str,
        local: &'a Path,
    ) -> BoxFuture<'a, Result<(), SshError>> {
        Box::pin(async move {
            if !client.lstat(remote).await?.is_dir() {
                return Err(SshError::NotADirectory {
                    host: self.server().tag(),
                    path: remote.to_string(),
                });
            }

            self.log(&format!("Downloading dir: {} to {}", remote, local.display()));
            tokio::fs::create_dir_all(local).await?;

            for entry in client.read_dir(remote).await? {
                if !is_plain_name(&entry.name) {
                    return Err(SshError::UnsafeEntryName {
                        host: self.server().tag(),
                        dir: remote.to_string(),
                        name: entry.name,
                    });
                }
                let remote_path = join_path(remote, &entry.name);
                let local_path = local.join(&entry.name);
                if entry.is_dir() {
                    self.download_dir_async(client, &remote_path, &local_path)
                        .await?;
                } else {
                    self.download_file_async(client, &remote_path, &local_path)
                        .await?;
                }
            }
            Ok(())
        })
    }

    async fn download_file_async(
        &self,
        client: &dyn SftpBackend,
        remote: &str,
        local: &Path,
    ) -> Result<(), SshError> {
        self.log(&format!("Downloading file: {} to {}", remote, local.display()));

        if let Some(parent) = local.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        client.get(remote, local).await?;
        Ok(())
    }

    fn client(&self) -> Result<&dyn SftpBackend, SshError> {
        self.client.as_deref().ok_or_else(|| SshError::SftpNotOpen {
            host: self.server().tag(),
        })
    }

    fn sink(&self) -> &Arc<dyn OutputSink> {
        self.connection.sink()
    }

    fn log(&self, message: &str) {
        debug!("[SFTP] [{}] {}", self.server().tag(), message);
        if self.verbose {
            self.sink().info(self.server(), message);
        }
    }
}

/// 目录条目名只能是单个路径分量
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}

impl Bracket for Sftp {
    fn enter(&mut self) -> Result<(), SshError> {
        self.connect()
    }

    fn exit(&mut self) {
        self.close();
    }
}
