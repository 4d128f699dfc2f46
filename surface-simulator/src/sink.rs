use common::{PacerError, WorkBundle};
use input_surface::BundleSink;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, trace, warn};

/// 接收端收到的批次汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct SinkLedger {
    pub bundles: u64,
    pub works: u64,
    pub config_updates: u64,
    /// 帧序号倒退的次数，正常应为 0
    pub out_of_order: u64,
    /// 批次大小 -> 次数
    pub batch_sizes: BTreeMap<usize, u64>,
    pub first_timestamp_us: Option<i64>,
    pub last_timestamp_us: Option<i64>,
    #[serde(skip)]
    pub(crate) last_frame_index: Option<u64>,
}

/// 记录型接收端，模拟编码组件
#[derive(Default)]
pub struct RecordingSink {
    ledger: Mutex<SinkLedger>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> SinkLedger {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl BundleSink for RecordingSink {
    fn queue_bundle(&self, bundle: WorkBundle) -> Result<(), PacerError> {
        if tracing::enabled!(tracing::Level::TRACE) {
            trace!("Bundle: {}", serde_json::to_string(&bundle)?);
        }

        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        ledger.bundles += 1;
        *ledger.batch_sizes.entry(bundle.len()).or_insert(0) += 1;

        for work in &bundle.works {
            if let Some(last) = ledger.last_frame_index {
                if work.frame_index <= last {
                    warn!(
                        "Frame {} received after frame {}",
                        work.frame_index, last
                    );
                    ledger.out_of_order += 1;
                }
            }
            ledger.last_frame_index = Some(work.frame_index);
            ledger.first_timestamp_us.get_or_insert(work.timestamp_us);
            ledger.last_timestamp_us = Some(work.timestamp_us);
            ledger.works += 1;
            ledger.config_updates += work.config_updates.len() as u64;
        }

        debug!(
            "Received bundle of {} work(s), {} total",
            bundle.len(),
            ledger.works
        );
        Ok(())
    }
}
