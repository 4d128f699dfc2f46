use common::{FrameWork, PacerError, QueuedWork, WorkBundle};

/// 下游接收端
///
/// 队列线程只持有弱引用，每次转发前重新解析；接收端释放后批次直接丢弃。
pub trait FrameSink: Send + Sync + 'static {
    /// 入队的工作单元类型
    type Work: Send + 'static;
    /// 下游格式
    type Bundle;

    /// 将批次转换为下游格式（纯函数）
    fn to_bundle(batch: Vec<QueuedWork<Self::Work>>) -> Result<Self::Bundle, PacerError>;

    /// 接收一个批次，失败不会重试
    fn queue(&self, bundle: Self::Bundle) -> Result<(), PacerError>;
}

/// 以 [`WorkBundle`] 为下游格式的接收端
pub trait BundleSink: Send + Sync + 'static {
    fn queue_bundle(&self, bundle: WorkBundle) -> Result<(), PacerError>;
}

impl<T: BundleSink> FrameSink for T {
    type Work = FrameWork;
    type Bundle = WorkBundle;

    fn to_bundle(batch: Vec<QueuedWork<FrameWork>>) -> Result<WorkBundle, PacerError> {
        WorkBundle::from_batch(batch)
    }

    fn queue(&self, bundle: WorkBundle) -> Result<(), PacerError> {
        self.queue_bundle(bundle)
    }
}
