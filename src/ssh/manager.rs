// 全局运行时管理
//
// 对外接口是阻塞式的，内部网络操作都是 async。
// 所有 facade 通过同一个 Tokio 运行时执行异步操作。

use std::future::Future;

use once_cell::sync::Lazy;
use tokio::runtime::Runtime;

/// 全局 SSH 管理器
/// 负责持有执行所有 SSH 异步任务的 Tokio 运行时
pub struct SshManager {
    /// Tokio 运行时
    runtime: Runtime,
}

impl SshManager {
    /// 创建新的 SSH 管理器
    fn new() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .worker_threads(2)
            .thread_name("ssh-worker")
            .build()
            .expect("Failed to create SSH Tokio runtime");

        Self { runtime }
    }

    /// 获取全局单例
    pub fn global() -> &'static SshManager {
        static MANAGER: Lazy<SshManager> = Lazy::new(SshManager::new);
        &MANAGER
    }

    /// 获取 Tokio 运行时引用
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// 阻塞当前线程直到 future 完成
    ///
    /// 不能在异步上下文中调用（Tokio 会 panic）。
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
