// 帧队列线程
//
// 生产者线程调用 queue() 非阻塞入队，单个后台线程按固定轮询间隔取出整队，
// 逐个等待栅栏后一次性转发给下游。
//
// # 时序
//
// 1. 队列为空，或距上次转发不足一个间隔时，在条件变量上限时等待
// 2. 否则取走当前全部工作单元并释放锁
// 3. 锁外按入队顺序等待每个栅栏，再转换并转发
// 4. 记录本轮开始时间为上次转发时间，限时等待后继续
//
// 析构时设置结束标志并唤醒线程，未转发的工作单元随队列一起释放。

use common::{ConfigUpdate, Dataspace, PacerError, QueuedWork};
use serde::Serialize;
use std::collections::VecDeque;
use std::mem;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::color::color_aspects_from_dataspace;
use crate::config::FrameQueueConfig;
use crate::fence::Fence;
use crate::priority;
use crate::sink::FrameSink;

/// 队列统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameQueueStats {
    /// 累计入队数
    pub queued: u64,
    /// 成功转发的工作单元数
    pub forwarded_items: u64,
    /// 成功转发的批次数
    pub batches: u64,
    /// 被丢弃的批次数（接收端释放、转换失败或被拒绝）
    pub discarded_batches: u64,
    /// 被丢弃批次中的工作单元数
    pub discarded_items: u64,
    /// 栅栏等待失败次数
    pub fence_errors: u64,
    /// 当前排队数
    pub pending: u64,
}

struct Item<W> {
    work: W,
    fence: Option<Box<dyn Fence>>,
    config_updates: Vec<ConfigUpdate>,
}

struct QueueState<W> {
    items: VecDeque<Item<W>>,
    pending_config_update: Vec<ConfigUpdate>,
    last_forwarded: Option<Instant>,
    pending_priority: Option<i32>,
    done: bool,
    stats: FrameQueueStats,
}

struct Shared<W> {
    state: Mutex<QueueState<W>>,
    cond: Condvar,
}

impl<W> Shared<W> {
    fn lock(&self) -> MutexGuard<'_, QueueState<W>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(
        &self,
        guard: MutexGuard<'a, QueueState<W>>,
        timeout: Duration,
    ) -> MutexGuard<'a, QueueState<W>> {
        self.cond
            .wait_timeout(guard, timeout)
            .unwrap_or_else(PoisonError::into_inner)
            .0
    }
}

enum BatchOutcome {
    Forwarded,
    Discarded,
}

/// 帧队列线程
///
/// 每个实例独占一个后台线程；接收端以弱引用持有，不延长其生命周期。
pub struct FrameQueueThread<S: FrameSink> {
    shared: Arc<Shared<S::Work>>,
    handle: Option<JoinHandle<()>>,
}

impl<S: FrameSink> FrameQueueThread<S> {
    /// 创建队列并立即启动后台线程
    pub fn new(sink: Weak<S>, config: FrameQueueConfig) -> Result<Self, PacerError> {
        config.validate()?;

        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                pending_config_update: Vec::new(),
                last_forwarded: None,
                pending_priority: None,
                done: false,
                stats: FrameQueueStats::default(),
            }),
            cond: Condvar::new(),
        });

        let thread_shared = shared.clone();
        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || run_loop(thread_shared, sink, config))
            .map_err(|e| PacerError::ThreadSpawn(e.to_string()))?;

        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// 入队一个工作单元（非阻塞）
    ///
    /// 若有待附加的配置更新，全部附着到该工作单元上并清空。
    pub fn queue(&self, work: S::Work, fence: Option<Box<dyn Fence>>) {
        let mut state = self.shared.lock();
        let config_updates = mem::take(&mut state.pending_config_update);
        if !config_updates.is_empty() {
            trace!("Attaching {} config update(s) to queued work", config_updates.len());
        }
        state.items.push_back(Item {
            work,
            fence,
            config_updates,
        });
        state.stats.queued += 1;
        self.shared.cond.notify_one();
    }

    /// 追加数据空间变更（及可推导的颜色描述）到待附加的配置更新
    pub fn set_dataspace(&self, dataspace: Dataspace) {
        let mut updates = vec![ConfigUpdate::Dataspace {
            stream: 0,
            dataspace,
        }];
        match color_aspects_from_dataspace(dataspace) {
            Some(aspects) => updates.push(ConfigUpdate::ColorAspects { stream: 0, aspects }),
            None => debug!(
                "Dataspace {} has no color aspects mapping, sending dataspace only",
                dataspace
            ),
        }

        let mut state = self.shared.lock();
        state.pending_config_update.extend(updates);
    }

    /// 设置后台线程的调度优先级
    ///
    /// 只校验取值，实际设置由后台线程在下一轮完成，失败仅记录日志。
    pub fn set_priority(&self, priority: i32) -> Result<(), PacerError> {
        priority::validate_priority(priority)?;
        let mut state = self.shared.lock();
        state.pending_priority = Some(priority);
        self.shared.cond.notify_one();
        Ok(())
    }

    pub fn stats(&self) -> FrameQueueStats {
        let state = self.shared.lock();
        let mut stats = state.stats;
        stats.pending = state.items.len() as u64;
        stats
    }
}

impl<S: FrameSink> Drop for FrameQueueThread<S> {
    fn drop(&mut self) {
        {
            let mut state = self.shared.lock();
            state.done = true;
            self.shared.cond.notify_all();
        }

        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                // 在接收端回调中析构，不能 join 自己
                warn!("FrameQueueThread dropped on its own thread, detaching");
            } else if handle.join().is_err() {
                error!("Frame queue thread panicked");
            }
        }

        let mut state = self.shared.lock();
        let discarded = state.items.len();
        state.items.clear();
        state.pending_config_update.clear();
        info!(
            "FrameQueueThread stopped: forwarded {} work(s) in {} batch(es), {} discarded on shutdown",
            state.stats.forwarded_items, state.stats.batches, discarded
        );
    }
}

fn apply_priority(priority: i32) {
    match priority::set_current_thread_priority(priority) {
        Ok(()) => debug!("Frame queue thread priority set to {}", priority),
        Err(e) => warn!("Failed to set frame queue thread priority: {}", e),
    }
}

fn run_loop<S: FrameSink>(shared: Arc<Shared<S::Work>>, sink: Weak<S>, config: FrameQueueConfig) {
    debug!(
        "Frame queue thread started (interval={:?}, wait={:?})",
        config.interval,
        config.wait_after_forward()
    );

    if let Some(p) = config.initial_priority {
        apply_priority(p);
    }

    let interval = config.interval;
    let wait_after_forward = config.wait_after_forward();

    let mut state = shared.lock();
    while !state.done {
        // 系统调用不占用队列锁
        if let Some(p) = state.pending_priority.take() {
            drop(state);
            apply_priority(p);
            state = shared.lock();
            continue;
        }

        let now = Instant::now();
        let since_last = state.last_forwarded.map(|t| now.saturating_duration_since(t));
        let throttled = matches!(since_last, Some(elapsed) if elapsed < interval);

        if state.items.is_empty() || throttled {
            let timeout = match since_last {
                Some(elapsed) if elapsed < interval => interval - elapsed,
                _ => interval,
            };
            state = shared.wait(state, timeout);
            continue;
        }

        let batch = mem::take(&mut state.items);
        drop(state);

        let count = batch.len() as u64;
        trace!("Draining batch of {} work(s)", count);
        let (outcome, fence_errors) = forward_batch(&sink, batch);

        state = shared.lock();
        state.stats.fence_errors += fence_errors;
        match outcome {
            BatchOutcome::Forwarded => {
                state.stats.forwarded_items += count;
                state.stats.batches += 1;
            }
            BatchOutcome::Discarded => {
                state.stats.discarded_items += count;
                state.stats.discarded_batches += 1;
            }
        }
        state.last_forwarded = Some(now);

        if !state.done {
            state = shared.wait(state, wait_after_forward);
        }
    }
    drop(state);

    debug!("Frame queue thread exiting");
}

fn forward_batch<S: FrameSink>(
    sink: &Weak<S>,
    batch: VecDeque<Item<S::Work>>,
) -> (BatchOutcome, u64) {
    let mut fence_errors = 0;
    let mut works = Vec::with_capacity(batch.len());
    for item in batch {
        if let Some(fence) = item.fence {
            if let Err(e) = fence.wait() {
                warn!("Fence wait failed, forwarding anyway: {}", e);
                fence_errors += 1;
            }
        }
        works.push(QueuedWork {
            work: item.work,
            config_updates: item.config_updates,
        });
    }

    let count = works.len();
    let Some(sink) = sink.upgrade() else {
        warn!(
            "Dropping batch of {} work(s): {}",
            count,
            PacerError::SinkUnavailable
        );
        return (BatchOutcome::Discarded, fence_errors);
    };

    let bundle = match S::to_bundle(works) {
        Ok(bundle) => bundle,
        Err(e) => {
            error!("Failed to convert batch of {} work(s): {}", count, e);
            return (BatchOutcome::Discarded, fence_errors);
        }
    };

    if let Err(e) = sink.queue(bundle) {
        warn!("Sink rejected batch of {} work(s): {}", count, e);
        return (BatchOutcome::Discarded, fence_errors);
    }

    (BatchOutcome::Forwarded, fence_errors)
}
