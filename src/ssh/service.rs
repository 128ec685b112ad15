// systemd 服务状态查询与等待
//
// 通过一次性 exec 路径执行 `systemctl is-active` / `journalctl`，
// 只适用于使用 systemd 的 Linux 主机。

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::error::SshError;
use super::manager::SshManager;
use super::remote::{ExecOptions, Ssh};
use crate::output::StatusIndicator;

/// 等待结束后输出的日志行数
pub const FINAL_LOG_LINES: usize = 1000;

/// 进度展示中附带的日志行数
const PROGRESS_LOG_LINES: usize = 5;

/// wait_execute_service 的参数
#[derive(Clone, Debug)]
pub struct ServiceWait {
    /// 总等待时间上限，None 表示一直等
    pub timeout: Option<Duration>,
    /// 两次查询之间的间隔
    pub interval: Duration,
    /// 结束时是否输出服务日志
    pub echo_stdout: bool,
    /// 是否显示状态指示器
    pub show_progress: bool,
}

impl Default for ServiceWait {
    fn default() -> Self {
        Self {
            timeout: None,
            interval: Duration::from_secs(1),
            echo_stdout: true,
            show_progress: false,
        }
    }
}

impl ServiceWait {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_echo(mut self, echo_stdout: bool) -> Self {
        self.echo_stdout = echo_stdout;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}

/// `systemctl is-active` 的输出
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServiceState {
    Active,
    Activating,
    Reloading,
    Deactivating,
    Inactive,
    Failed,
    Unknown(String),
}

impl ServiceState {
    pub fn parse(output: &str) -> Self {
        match output.trim() {
            "active" => Self::Active,
            "activating" => Self::Activating,
            "reloading" => Self::Reloading,
            "deactivating" => Self::Deactivating,
            "inactive" => Self::Inactive,
            "failed" => Self::Failed,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// 服务进程是否仍在运行（包括启动、重载、停止过程中）
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            Self::Active | Self::Activating | Self::Reloading | Self::Deactivating
        )
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Active => "active",
            Self::Activating => "activating",
            Self::Reloading => "reloading",
            Self::Deactivating => "deactivating",
            Self::Inactive => "inactive",
            Self::Failed => "failed",
            Self::Unknown(other) => other.as_str(),
        };
        f.write_str(text)
    }
}

/// 单引号转义，普通的服务名原样返回
fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@._-:".contains(c));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

impl Ssh {
    /// 查询服务当前状态
    pub fn service_state(&self, service: &str) -> Result<ServiceState, SshError> {
        SshManager::global().block_on(self.service_state_async(service))
    }

    /// 最近 line_count 行服务日志（journalctl 的标准输出）
    pub fn get_service_log(&self, service: &str, line_count: usize) -> Result<String, SshError> {
        SshManager::global().block_on(self.service_log_async(service, line_count))
    }

    /// 等待服务停止运行
    ///
    /// 服务仍处于运行状态时按 interval 轮询；超过 timeout 返回 ServiceTimeout。
    /// 无论成功还是出错，都会停止状态指示器，并在 echo_stdout 时输出最后
    /// FINAL_LOG_LINES 行日志。
    pub fn wait_execute_service(&self, service: &str, wait: &ServiceWait) -> Result<(), SshError> {
        SshManager::global().block_on(self.wait_service_async(service, wait))
    }

    /// 没有输出可识别状态（stdout 为空，或 stderr 有内容）时返回 ServiceQuery
    async fn service_state_async(&self, service: &str) -> Result<ServiceState, SshError> {
        let command = format!("systemctl is-active {}", shell_quote(service));
        let output = self.exec_async(&command, &ExecOptions::quiet()).await?;
        let state = ServiceState::parse(&output.stdout);

        if let ServiceState::Unknown(raw) = &state {
            if raw.is_empty() || !output.stderr.is_empty() {
                let detail = if output.stderr.is_empty() {
                    format!("no state reported (exit code {})", output.exit_code)
                } else {
                    format!("{} (exit code {})", output.stderr, output.exit_code)
                };
                return Err(SshError::ServiceQuery {
                    host: self.server().tag(),
                    service: service.to_string(),
                    detail,
                });
            }
        }
        Ok(state)
    }

    async fn service_log_async(&self, service: &str, line_count: usize) -> Result<String, SshError> {
        let command = format!(
            "journalctl -u {} -n {} --no-pager",
            shell_quote(service),
            line_count
        );
        let output = self.exec_async(&command, &ExecOptions::quiet()).await?;
        Ok(output.stdout)
    }

    async fn wait_service_async(&self, service: &str, wait: &ServiceWait) -> Result<(), SshError> {
        let mut status = wait.show_progress.then(|| {
            let mut status = self.sink().status(self.server());
            status.start(&format!("Waiting for service {}", service));
            status
        });

        let result = self.poll_service(service, wait, status.as_mut()).await;

        if let Some(mut status) = status {
            status.stop();
        }
        if wait.echo_stdout {
            match self.service_log_async(service, FINAL_LOG_LINES).await {
                Ok(log) if !log.is_empty() => self.sink().echo(self.server(), &log),
                Ok(_) => {}
                Err(e) => debug!(
                    "[SSH] [{}] Failed to read log of {}: {}",
                    self.server().tag(),
                    service,
                    e
                ),
            }
        }

        result
    }

    async fn poll_service(
        &self,
        service: &str,
        wait: &ServiceWait,
        mut status: Option<&mut Box<dyn StatusIndicator>>,
    ) -> Result<(), SshError> {
        let started = Instant::now();

        loop {
            let state = self.service_state_async(service).await?;
            if !state.is_running() {
                info!(
                    "[SSH] [{}] Service {} is {} after {:.1}s",
                    self.server().tag(),
                    service,
                    state,
                    started.elapsed().as_secs_f64()
                );
                return Ok(());
            }

            if let Some(status) = status.as_mut() {
                let tail = self
                    .service_log_async(service, PROGRESS_LOG_LINES)
                    .await
                    .unwrap_or_default();
                status.update(&format!(
                    "{} is {} ({}s)\n{}",
                    service,
                    state,
                    started.elapsed().as_secs(),
                    tail
                ));
            }

            tokio::time::sleep(wait.interval).await;

            if let Some(timeout) = wait.timeout {
                if started.elapsed() > timeout {
                    return Err(SshError::ServiceTimeout {
                        host: self.server().tag(),
                        service: service.to_string(),
                        waited: started.elapsed(),
                    });
                }
            }
        }
    }
}
