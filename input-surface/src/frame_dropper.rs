// 帧丢弃器
//
// 按最大帧率对单调时间戳序列做丢帧决策：
// - 允许 2ms 的抖动，略早到达的帧不会被丢弃
// - 长时间空档后一次性追上调度，不会连续放行追赶中的帧

use common::PacerError;
use tracing::{info, trace, warn};

/// 抖动容忍（微秒）
pub const MAX_JITTER_US: i64 = 2_000;

/// 帧丢弃器
///
/// 每个编码会话一个实例。`desired_min_time_us` 一旦设置就只增不减。
#[derive(Debug, Clone)]
pub struct FrameDropper {
    /// 下一帧最早可接受的时间戳，-1 表示尚未见过帧
    desired_min_time_us: i64,
    /// 帧最小间隔，0 表示未设置，-1 表示禁用
    min_interval_us: i64,
}

impl Default for FrameDropper {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDropper {
    pub fn new() -> Self {
        Self {
            desired_min_time_us: -1,
            min_interval_us: 0,
        }
    }

    /// 设置最大帧率
    ///
    /// - 负数：禁用丢帧
    /// - 0（或非数值）：无效，保持原配置
    /// - 正数：最小间隔 = round(1e6 / rate) 微秒
    pub fn set_max_frame_rate(&mut self, max_frame_rate: f32) {
        if max_frame_rate < 0.0 {
            info!("Frame dropping disabled (max_frame_rate={})", max_frame_rate);
            self.min_interval_us = -1;
            return;
        }

        if !(max_frame_rate > 0.0) {
            warn!(
                "{}, keeping interval {}us",
                PacerError::InvalidFrameRate(f64::from(max_frame_rate)),
                self.min_interval_us
            );
            return;
        }

        self.min_interval_us = (1_000_000.0 / f64::from(max_frame_rate)).round() as i64;
        info!(
            "Max frame rate set to {:.2} fps (min interval {}us)",
            max_frame_rate, self.min_interval_us
        );
    }

    /// 判断该时间戳的帧是否应被丢弃
    pub fn should_drop(&mut self, timestamp_us: i64) -> bool {
        if self.min_interval_us <= 0 {
            return false;
        }

        if self.desired_min_time_us < 0 {
            self.desired_min_time_us = timestamp_us.saturating_add(self.min_interval_us);
            trace!(
                "First frame at {}us accepted, next slot {}us",
                timestamp_us,
                self.desired_min_time_us
            );
            return false;
        }

        if timestamp_us < self.desired_min_time_us.saturating_sub(MAX_JITTER_US) {
            trace!(
                "Dropping frame at {}us (next slot {}us)",
                timestamp_us,
                self.desired_min_time_us
            );
            return true;
        }

        // 非负：上面已排除过早到达的帧
        let n = timestamp_us
            .saturating_sub(self.desired_min_time_us)
            .saturating_add(MAX_JITTER_US)
            / self.min_interval_us;
        self.desired_min_time_us = self
            .desired_min_time_us
            .saturating_add(n.saturating_add(1).saturating_mul(self.min_interval_us));
        trace!(
            "Frame at {}us accepted, next slot {}us",
            timestamp_us,
            self.desired_min_time_us
        );
        false
    }

    pub fn disabled(&self) -> bool {
        self.min_interval_us == -1
    }

    pub fn min_interval_us(&self) -> i64 {
        self.min_interval_us
    }

    /// 下一帧最早可接受时间，尚未见过帧时为 None
    pub fn desired_min_time_us(&self) -> Option<i64> {
        (self.desired_min_time_us >= 0).then_some(self.desired_min_time_us)
    }
}
