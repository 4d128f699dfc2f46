// 合成帧生产者
//
// 按配置帧率产生带时间戳的帧，先经丢帧器决策，再连同栅栏入队；
// 栅栏在模拟的渲染延迟后由独立任务触发。

use anyhow::{Context, Result};
use bytes::Bytes;
use common::{Dataspace, FrameWork};
use input_surface::{manual_fence, FrameDropper, FrameQueueThread, FrameSink};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ProducerConfig;

/// 模拟器轮换使用的数据空间
const DATASPACES: [Dataspace; 4] = [
    Dataspace::V0_BT709,
    Dataspace::BT2020_PQ,
    Dataspace::BT2020_HLG,
    Dataspace::ADOBE_RGB,
];

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProducerStats {
    pub produced: u64,
    pub dropped: u64,
    pub accepted: u64,
    pub dataspace_changes: u64,
}

/// 帧周期，无法表示或不足 1 微秒时返回错误
fn frame_period(fps: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(1.0 / fps)
        .ok()
        .filter(|period| period.as_micros() > 0)
        .with_context(|| format!("Producer frame rate {} has no usable frame period", fps))
}

/// 产生全部帧；被取消时 stats 保留已完成的部分
pub async fn run<S>(
    config: &ProducerConfig,
    queue: &FrameQueueThread<S>,
    dropper: &mut FrameDropper,
    stats: &mut ProducerStats,
) -> Result<()>
where
    S: FrameSink<Work = FrameWork>,
{
    let period = frame_period(config.fps)?;
    let period_us = i64::try_from(period.as_micros()).context("Frame period too long")?;
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut rng = StdRng::seed_from_u64(config.seed);

    info!(
        "Producing {} frame(s) at {:.2} fps (period {}us)",
        config.frames, config.fps, period_us
    );

    for index in 0..config.frames {
        ticker.tick().await;

        let jitter = if config.jitter_us > 0 {
            rng.gen_range(-config.jitter_us..=config.jitter_us)
        } else {
            0
        };
        let timestamp_us = (index as i64 * period_us + jitter).max(0);
        stats.produced += 1;

        if let Some(every) = config.dataspace_switch_every.filter(|&n| n > 0) {
            if index % every == 0 {
                let dataspace = DATASPACES[((index / every) as usize) % DATASPACES.len()];
                debug!("Switching dataspace to {} at frame {}", dataspace, index);
                queue.set_dataspace(dataspace);
                stats.dataspace_changes += 1;
            }
        }

        if dropper.should_drop(timestamp_us) {
            stats.dropped += 1;
            continue;
        }

        let (fence, signal) = manual_fence();
        let delay = config.render_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            signal.signal();
        });

        let data = Bytes::from(vec![(index & 0xff) as u8; config.payload_size]);
        queue.queue(
            FrameWork::new(index, timestamp_us, data),
            Some(Box::new(fence)),
        );
        stats.accepted += 1;
    }

    info!(
        "Producer finished: {} produced, {} accepted, {} dropped",
        stats.produced, stats.accepted, stats.dropped
    );
    Ok(())
}

/// 等待队列清空，返回是否在超时前完成
pub async fn drain<S: FrameSink>(queue: &FrameQueueThread<S>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        let stats = queue.stats();
        if stats.pending == 0 && stats.forwarded_items + stats.discarded_items == stats.queued {
            return true;
        }
        if Instant::now() >= deadline {
            warn!(
                "Frame queue did not drain within {:?}: {} pending, {} in flight",
                timeout,
                stats.pending,
                stats.queued - stats.pending - stats.forwarded_items - stats.discarded_items
            );
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
