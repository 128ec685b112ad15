// 作用域资源获取
//
// Scoped 在创建时调用 enter()，在离开作用域时（包括提前返回与 panic 展开）调用 exit()。

use std::ops::{Deref, DerefMut};

use crate::ssh::SshError;

/// 可进入 / 退出的资源
pub trait Bracket {
    /// 获取资源（连接、打开通道等）
    fn enter(&mut self) -> Result<(), SshError>;

    /// 释放资源，不应失败
    fn exit(&mut self);
}

/// 作用域守卫
pub struct Scoped<T: Bracket> {
    inner: T,
}

impl<T: Bracket> Scoped<T> {
    /// 进入资源；enter 失败时先释放已获取的部分再返回错误
    pub fn enter(mut inner: T) -> Result<Self, SshError> {
        if let Err(e) = inner.enter() {
            inner.exit();
            return Err(e);
        }
        Ok(Self { inner })
    }
}

impl<T: Bracket> Deref for Scoped<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: Bracket> DerefMut for Scoped<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: Bracket> Drop for Scoped<T> {
    fn drop(&mut self) {
        self.inner.exit();
    }
}
