// 输出模块
//
// 面向使用者的日志行与状态指示器。内部诊断信息走 tracing，
// 需要展示给使用者的内容（重试、传输进度、命令回显）走 OutputSink。

mod status;

use chrono::{DateTime, Local};
use owo_colors::OwoColorize;

use crate::models::ServerData;

pub use status::{NoopStatus, SpinnerStatus, StatusIndicator};

/// 日志级别
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// 日志条目
#[derive(Clone, Debug)]
pub struct LogEntry {
    /// 时间戳
    pub timestamp: DateTime<Local>,
    /// 日志级别
    pub level: LogLevel,
    /// 消息内容
    pub message: String,
}

impl LogEntry {
    /// 创建新的日志条目
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            message: message.into(),
        }
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    /// 带主机标签的展示文本：`|LEVEL|显示名|地址| 消息`
    pub fn format_for(&self, server: &ServerData) -> String {
        match self.level {
            LogLevel::Debug => format!("{}| {}", server.tag(), self.message),
            level => format!(
                "|{}|{}|{}| {}",
                level.as_str(),
                server.custom_name,
                server.address,
                self.message
            ),
        }
    }
}

/// 输出目标
///
/// 每条日志都带上来源主机，多主机并行操作时由实现方决定如何区分展示。
pub trait OutputSink: Send + Sync {
    /// 输出一条日志
    fn log(&self, server: &ServerData, entry: LogEntry);

    /// 原样回显远程输出
    fn echo(&self, server: &ServerData, text: &str);

    /// 创建一个状态指示器
    fn status(&self, server: &ServerData) -> Box<dyn StatusIndicator>;

    fn info(&self, server: &ServerData, message: &str) {
        self.log(server, LogEntry::info(message));
    }

    fn warn(&self, server: &ServerData, message: &str) {
        self.log(server, LogEntry::warn(message));
    }

    fn error(&self, server: &ServerData, message: &str) {
        self.log(server, LogEntry::error(message));
    }
}

/// 终端输出：INFO 绿色，WARNING/ERROR 红色
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleSink {
    /// 是否在行首输出时间
    pub show_timestamp: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timestamp(mut self) -> Self {
        self.show_timestamp = true;
        self
    }
}

impl OutputSink for ConsoleSink {
    fn log(&self, server: &ServerData, entry: LogEntry) {
        let line = entry.format_for(server);
        let line = match entry.level {
            LogLevel::Debug => line,
            LogLevel::Info => line.green().to_string(),
            LogLevel::Warn | LogLevel::Error => line.red().to_string(),
        };

        if self.show_timestamp {
            let ts = entry.timestamp.format("%H:%M:%S").to_string();
            println!("{} {}", ts.dimmed(), line);
        } else {
            println!("{}", line);
        }
    }

    fn echo(&self, _server: &ServerData, text: &str) {
        println!("{}", text);
    }

    fn status(&self, server: &ServerData) -> Box<dyn StatusIndicator> {
        Box::new(SpinnerStatus::new(server))
    }
}

/// 仅写入 tracing，不直接打印到终端（用于嵌入其他程序）
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn log(&self, server: &ServerData, entry: LogEntry) {
        let host = server.tag();
        match entry.level {
            LogLevel::Debug => tracing::debug!(host = %host, "{}", entry.message),
            LogLevel::Info => tracing::info!(host = %host, "{}", entry.message),
            LogLevel::Warn => tracing::warn!(host = %host, "{}", entry.message),
            LogLevel::Error => tracing::error!(host = %host, "{}", entry.message),
        }
    }

    fn echo(&self, server: &ServerData, text: &str) {
        tracing::info!(host = %server.tag(), "{}", text);
    }

    fn status(&self, _server: &ServerData) -> Box<dyn StatusIndicator> {
        Box::new(NoopStatus)
    }
}
