// 状态指示器

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::models::ServerData;

/// 刷新频率
const SPINNER_TICK_RATE_MS: u64 = 80;

/// 可启动、更新消息、停止的状态指示器
pub trait StatusIndicator: Send {
    fn start(&mut self, message: &str);
    fn update(&mut self, message: &str);
    fn stop(&mut self);
}

/// 基于 indicatif 的终端转圈指示器
pub struct SpinnerStatus {
    prefix: String,
    bar: Option<ProgressBar>,
}

impl SpinnerStatus {
    pub fn new(server: &ServerData) -> Self {
        Self {
            prefix: format!("[{}]", server.tag()),
            bar: None,
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold} {spinner:.cyan} {msg}")
            .map(|style| style.tick_chars("⣾⣽⣻⢿⡿⣟⣯⣷ "))
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

impl StatusIndicator for SpinnerStatus {
    fn start(&mut self, message: &str) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(Self::style());
        bar.set_prefix(self.prefix.clone());
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_RATE_MS));
        self.bar = Some(bar);
    }

    fn update(&mut self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(message.to_string());
        }
    }

    fn stop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for SpinnerStatus {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 不做任何展示
#[derive(Debug, Default)]
pub struct NoopStatus;

impl StatusIndicator for NoopStatus {
    fn start(&mut self, _message: &str) {}
    fn update(&mut self, _message: &str) {}
    fn stop(&mut self) {}
}
