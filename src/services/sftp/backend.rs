// russh-sftp 实现的 SFTP 子会话

use std::path::Path;

use async_trait::async_trait;
use russh_sftp::client::SftpSession;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::models::{RemoteAttrs, RemoteEntry};
use crate::ssh::transport::SftpBackend;
use crate::ssh::SshError;

/// 封装 russh-sftp 客户端会话
pub struct RusshSftp {
    sftp: SftpSession,
}

impl RusshSftp {
    pub fn new(sftp: SftpSession) -> Self {
        Self { sftp }
    }
}

#[async_trait]
impl SftpBackend for RusshSftp {
    async fn put(&self, local: &Path, remote: &str) -> Result<u64, SshError> {
        let mut source = tokio::fs::File::open(local).await?;
        // 目录也能以只读方式打开，必须在创建远程文件之前拒绝
        if !source.metadata().await?.is_file() {
            return Err(SshError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", local.display()),
            )));
        }
        let mut target = self.sftp.create(remote).await?;

        let written = tokio::io::copy(&mut source, &mut target).await?;
        target.shutdown().await?;

        debug!("[SFTP] Wrote {} bytes to {}", written, remote);
        Ok(written)
    }

    async fn get(&self, remote: &str, local: &Path) -> Result<u64, SshError> {
        let mut source = self.sftp.open(remote).await?;
        let mut target = tokio::fs::File::create(local).await?;

        let read = tokio::io::copy(&mut source, &mut target).await?;
        target.flush().await?;

        debug!("[SFTP] Read {} bytes from {}", read, remote);
        Ok(read)
    }

    async fn lstat(&self, remote: &str) -> Result<RemoteAttrs, SshError> {
        let attrs = self.sftp.symlink_metadata(remote).await?;
        Ok(RemoteAttrs::new(
            attrs.permissions.unwrap_or(0),
            attrs.size.unwrap_or(0),
        ))
    }

    async fn read_dir(&self, remote: &str) -> Result<Vec<RemoteEntry>, SshError> {
        let dir = self.sftp.read_dir(remote).await?;

        let mut entries = Vec::new();
        for entry in dir {
            let name = entry.file_name();
            // 跳过 . 和 ..
            if name == "." || name == ".." {
                continue;
            }
            let attrs = entry.metadata();
            entries.push(RemoteEntry::new(
                name,
                RemoteAttrs::new(attrs.permissions.unwrap_or(0), attrs.size.unwrap_or(0)),
            ));
        }

        debug!("[SFTP] Read {} entries from {}", entries.len(), remote);
        Ok(entries)
    }

    async fn close(&self) -> Result<(), SshError> {
        self.sftp.close().await?;
        Ok(())
    }
}
