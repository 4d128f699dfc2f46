use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use input_surface::FrameQueueStats;
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

use crate::producer::ProducerStats;
use crate::sink::SinkLedger;

/// 一次模拟运行的报告
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub producer_fps: f64,
    pub max_fps: f32,
    pub min_interval_us: i64,
    pub drained: bool,
    pub producer: ProducerStats,
    pub queue: FrameQueueStats,
    pub sink: SinkLedger,
}

impl RunReport {
    /// 实际下发帧率（按下游收到的时间戳跨度计算）
    pub fn delivered_fps(&self) -> Option<f64> {
        let first = self.sink.first_timestamp_us?;
        let last = self.sink.last_timestamp_us?;
        if last <= first || self.sink.works < 2 {
            return None;
        }
        Some((self.sink.works - 1) as f64 * 1_000_000.0 / (last - first) as f64)
    }

    /// 写入文件，未指定路径时打印到标准输出
    pub async fn write(&self, path: Option<&Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        match path {
            Some(path) => tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write report to {:?}", path))?,
            None => println!("{}", json),
        }
        Ok(())
    }
}
