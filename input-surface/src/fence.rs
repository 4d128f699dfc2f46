// 同步栅栏
//
// 每个入队的工作单元可以带一个栅栏，队列线程转发前必须等待它就绪。

use common::PacerError;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// 可等待的同步栅栏
pub trait Fence: Send {
    /// 阻塞直到栅栏被触发
    fn wait(&self) -> Result<(), PacerError>;
}

/// 已触发的栅栏
#[derive(Debug, Clone, Copy, Default)]
pub struct SignaledFence;

impl Fence for SignaledFence {
    fn wait(&self) -> Result<(), PacerError> {
        Ok(())
    }
}

#[derive(Debug)]
enum FenceState {
    Pending,
    Signaled,
    Failed(String),
}

#[derive(Debug)]
struct FenceInner {
    state: Mutex<FenceState>,
    cond: Condvar,
}

impl FenceInner {
    fn settle(&self, state: FenceState) {
        let mut current = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*current, FenceState::Pending) {
            *current = state;
            self.cond.notify_all();
        }
    }
}

/// 由 [`FenceSignal`] 触发的栅栏
#[derive(Debug, Clone)]
pub struct ManualFence {
    inner: Arc<FenceInner>,
}

/// [`ManualFence`] 的触发端
///
/// 未触发就被丢弃时，栅栏以失败状态结束，等待方不会永久阻塞。
#[derive(Debug)]
pub struct FenceSignal {
    inner: Arc<FenceInner>,
}

/// 创建一对栅栏与触发端
pub fn manual_fence() -> (ManualFence, FenceSignal) {
    let inner = Arc::new(FenceInner {
        state: Mutex::new(FenceState::Pending),
        cond: Condvar::new(),
    });
    (
        ManualFence {
            inner: inner.clone(),
        },
        FenceSignal { inner },
    )
}

impl ManualFence {
    pub fn is_signaled(&self) -> bool {
        matches!(
            *self.inner.state.lock().unwrap_or_else(PoisonError::into_inner),
            FenceState::Signaled
        )
    }

    /// 限时等待，超时返回 Ok(false)
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool, PacerError> {
        let state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (state, _) = self
            .inner
            .cond
            .wait_timeout_while(state, timeout, |s| matches!(s, FenceState::Pending))
            .unwrap_or_else(PoisonError::into_inner);
        match &*state {
            FenceState::Pending => Ok(false),
            FenceState::Signaled => Ok(true),
            FenceState::Failed(reason) => Err(PacerError::FenceFailed(reason.clone())),
        }
    }
}

impl Fence for ManualFence {
    fn wait(&self) -> Result<(), PacerError> {
        let state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        let state = self
            .inner
            .cond
            .wait_while(state, |s| matches!(s, FenceState::Pending))
            .unwrap_or_else(PoisonError::into_inner);
        match &*state {
            FenceState::Failed(reason) => Err(PacerError::FenceFailed(reason.clone())),
            _ => Ok(()),
        }
    }
}

impl FenceSignal {
    pub fn signal(self) {
        self.inner.settle(FenceState::Signaled);
    }

    pub fn fail(self, reason: impl Into<String>) {
        self.inner.settle(FenceState::Failed(reason.into()));
    }
}

impl Drop for FenceSignal {
    fn drop(&mut self) {
        self.inner
            .settle(FenceState::Failed("fence signal dropped".to_string()));
    }
}
