use crate::error::PacerError;
use crate::types::*;
use serde::{Deserialize, Serialize};

/// 下游接收的单个工作单元
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireWork {
    pub frame_index: u64,
    pub timestamp_us: i64,
    pub config_updates: Vec<ConfigUpdate>,
    pub payload_len: usize,
}

/// 一次转发的批次（按入队顺序）
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkBundle {
    pub works: Vec<WireWork>,
}

impl WorkBundle {
    /// 将队列批次转换为下游格式
    ///
    /// 任一工作单元不携带输入数据时整批转换失败。
    pub fn from_batch(batch: Vec<QueuedWork<FrameWork>>) -> Result<Self, PacerError> {
        let mut works = Vec::with_capacity(batch.len());
        for queued in batch {
            if queued.work.data.is_empty() {
                return Err(PacerError::Conversion(format!(
                    "frame {} carries no input buffer",
                    queued.work.frame_index
                )));
            }
            works.push(WireWork {
                frame_index: queued.work.frame_index,
                timestamp_us: queued.work.timestamp_us,
                config_updates: queued.config_updates,
                payload_len: queued.work.data.len(),
            });
        }
        Ok(Self { works })
    }

    pub fn len(&self) -> usize {
        self.works.len()
    }

    pub fn is_empty(&self) -> bool {
        self.works.is_empty()
    }
}
