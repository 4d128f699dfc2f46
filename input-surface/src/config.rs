use common::PacerError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::priority::{MAX_PRIORITY, MIN_PRIORITY};

/// 轮询间隔上限
pub const MAX_INTERVAL: Duration = Duration::from_secs(10);

/// 等待倍数上限
pub const MAX_WAIT_MULTIPLIER: u32 = 100;

/// 帧队列线程配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameQueueConfig {
    /// 轮询间隔，同时限制批次转发频率
    #[serde(serialize_with = "crate::serde_helpers::serialize_duration")]
    #[serde(deserialize_with = "crate::serde_helpers::deserialize_duration")]
    pub interval: Duration,

    /// 转发后的等待时长 = interval * wait_multiplier
    pub wait_multiplier: u32,

    /// 后台线程名
    pub thread_name: String,

    /// 线程启动时设置的调度优先级（nice 值）
    pub initial_priority: Option<i32>,
}

impl Default for FrameQueueConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(10),
            wait_multiplier: 2,
            thread_name: "frame-queue".to_string(),
            initial_priority: None,
        }
    }
}

impl FrameQueueConfig {
    pub fn wait_after_forward(&self) -> Duration {
        self.interval.saturating_mul(self.wait_multiplier)
    }

    pub fn validate(&self) -> Result<(), PacerError> {
        if self.interval.is_zero() {
            return Err(PacerError::Config(
                "Frame queue interval must be greater than 0".to_string(),
            ));
        }

        if self.interval > MAX_INTERVAL {
            return Err(PacerError::Config(format!(
                "Frame queue interval {:?} exceeds {:?}",
                self.interval, MAX_INTERVAL
            )));
        }

        if self.wait_multiplier == 0 {
            return Err(PacerError::Config(
                "Wait multiplier must be greater than 0".to_string(),
            ));
        }

        if self.wait_multiplier > MAX_WAIT_MULTIPLIER {
            return Err(PacerError::Config(format!(
                "Wait multiplier {} exceeds {}",
                self.wait_multiplier, MAX_WAIT_MULTIPLIER
            )));
        }

        if let Some(priority) = self.initial_priority {
            if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
                return Err(PacerError::Config(format!(
                    "Initial priority {} out of range [{}, {}]",
                    priority, MIN_PRIORITY, MAX_PRIORITY
                )));
            }
        }

        Ok(())
    }
}
