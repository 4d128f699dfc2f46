// 编码器输入面的帧节奏控制
//
// # 核心组件
//
// - `FrameDropper`: 按最大帧率做丢帧决策
// - `FrameQueueThread`: 后台线程批量等待栅栏并转发给下游
//
// 丢帧决策位于入队之前，两者相互独立。

pub mod color;
pub mod config;
pub mod fence;
pub mod frame_dropper;
pub mod frame_queue;
pub mod priority;
pub mod serde_helpers;
pub mod sink;

#[cfg(test)]
mod frame_queue_test;

pub use color::color_aspects_from_dataspace;
pub use config::FrameQueueConfig;
pub use fence::{manual_fence, Fence, FenceSignal, ManualFence, SignaledFence};
pub use frame_dropper::{FrameDropper, MAX_JITTER_US};
pub use frame_queue::{FrameQueueStats, FrameQueueThread};
pub use sink::{BundleSink, FrameSink};
