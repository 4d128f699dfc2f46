#[cfg(test)]
mod tests {
    use crate::config::FrameQueueConfig;
    use crate::fence::{manual_fence, Fence, SignaledFence};
    use crate::frame_queue::FrameQueueThread;
    use crate::sink::{BundleSink, FrameSink};
    use bytes::Bytes;
    use common::{ConfigUpdate, Dataspace, FrameWork, PacerError, QueuedWork, WorkBundle};
    use std::sync::{Arc, Condvar, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    const TIMEOUT: Duration = Duration::from_secs(2);

    /// 记录收到的批次及到达时间
    #[derive(Default)]
    struct RecordingSink {
        bundles: Mutex<Vec<(Instant, WorkBundle)>>,
        cond: Condvar,
        reject: bool,
    }

    impl RecordingSink {
        fn rejecting() -> Self {
            Self {
                reject: true,
                ..Default::default()
            }
        }

        fn wait_for_works(&self, count: usize, timeout: Duration) -> Vec<WorkBundle> {
            let guard = self.bundles.lock().unwrap();
            let (guard, _) = self
                .cond
                .wait_timeout_while(guard, timeout, |b| {
                    b.iter().map(|(_, bundle)| bundle.len()).sum::<usize>() < count
                })
                .unwrap();
            guard.iter().map(|(_, bundle)| bundle.clone()).collect()
        }

        fn arrivals(&self) -> Vec<Instant> {
            self.bundles.lock().unwrap().iter().map(|(t, _)| *t).collect()
        }

        fn bundles(&self) -> Vec<WorkBundle> {
            self.bundles
                .lock()
                .unwrap()
                .iter()
                .map(|(_, bundle)| bundle.clone())
                .collect()
        }
    }

    impl BundleSink for RecordingSink {
        fn queue_bundle(&self, bundle: WorkBundle) -> Result<(), PacerError> {
            if self.reject {
                return Err(PacerError::SinkRejected("component stopped".to_string()));
            }
            self.bundles.lock().unwrap().push((Instant::now(), bundle));
            self.cond.notify_all();
            Ok(())
        }
    }

    fn frame(index: u64) -> FrameWork {
        FrameWork::new(index, index as i64 * 33_333, Bytes::from_static(b"frame"))
    }

    fn signaled() -> Option<Box<dyn Fence>> {
        Some(Box::new(SignaledFence))
    }

    fn config(interval_ms: u64) -> FrameQueueConfig {
        FrameQueueConfig {
            interval: Duration::from_millis(interval_ms),
            ..Default::default()
        }
    }

    fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        cond()
    }

    fn frame_indices(bundles: &[WorkBundle]) -> Vec<u64> {
        bundles
            .iter()
            .flat_map(|b| b.works.iter().map(|w| w.frame_index))
            .collect()
    }

    #[test]
    fn test_single_item_forwarded() {
        let sink = Arc::new(RecordingSink::default());
        let queue = FrameQueueThread::new(Arc::downgrade(&sink), config(10)).unwrap();

        queue.queue(frame(7), signaled());
        let bundles = sink.wait_for_works(1, TIMEOUT);

        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].works[0].frame_index, 7);
        assert_eq!(bundles[0].works[0].timestamp_us, 7 * 33_333);
        assert!(bundles[0].works[0].config_updates.is_empty());

        let stats = queue.stats();
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.forwarded_items, 1);
        assert_eq!(stats.batches, 1);
        assert_eq!(stats.pending, 0);
    }

    #[test]
    fn test_burst_forms_single_batch() {
        let sink = Arc::new(RecordingSink::default());
        let queue = FrameQueueThread::new(Arc::downgrade(&sink), config(50)).unwrap();

        // 先用未触发的栅栏把后台线程挡在第一批上
        let (fence, signal) = manual_fence();
        queue.queue(frame(0), Some(Box::new(fence)));
        assert!(wait_until(TIMEOUT, || queue.stats().pending == 0));

        for i in 1..=5 {
            queue.queue(frame(i), signaled());
        }
        assert_eq!(queue.stats().pending, 5);
        signal.signal();

        let bundles = sink.wait_for_works(6, TIMEOUT);
        assert_eq!(bundles.len(), 2);
        assert_eq!(frame_indices(&bundles[..1]), vec![0]);
        assert_eq!(frame_indices(&bundles[1..]), vec![1, 2, 3, 4, 5]);

        // 不会重复转发
        thread::sleep(Duration::from_millis(120));
        assert_eq!(sink.bundles().len(), 2);
        assert_eq!(queue.stats().forwarded_items, 6);
    }

    #[test]
    fn test_config_update_attached_to_next_item_only() {
        let sink = Arc::new(RecordingSink::default());
        let queue = FrameQueueThread::new(Arc::downgrade(&sink), config(10)).unwrap();

        queue.set_dataspace(Dataspace::V0_BT709);
        queue.queue(frame(0), signaled());
        queue.queue(frame(1), signaled());

        let bundles = sink.wait_for_works(2, TIMEOUT);
        let works: Vec<_> = bundles.iter().flat_map(|b| b.works.iter()).collect();
        assert_eq!(works.len(), 2);

        let updates = &works[0].config_updates;
        assert_eq!(updates.len(), 2);
        assert!(matches!(
            updates[0],
            ConfigUpdate::Dataspace { stream: 0, dataspace } if dataspace == Dataspace::V0_BT709
        ));
        assert!(matches!(updates[1], ConfigUpdate::ColorAspects { stream: 0, .. }));
        assert!(works[1].config_updates.is_empty());
    }

    #[test]
    fn test_repeated_dataspace_accumulates_until_queue() {
        let sink = Arc::new(RecordingSink::default());
        let queue = FrameQueueThread::new(Arc::downgrade(&sink), config(10)).unwrap();

        queue.set_dataspace(Dataspace::V0_BT709);
        queue.set_dataspace(Dataspace::BT2020_PQ);
        queue.queue(frame(0), signaled());

        let bundles = sink.wait_for_works(1, TIMEOUT);
        let updates = &bundles[0].works[0].config_updates;
        assert_eq!(updates.len(), 4);
        assert!(matches!(
            updates[2],
            ConfigUpdate::Dataspace { dataspace, .. } if dataspace == Dataspace::BT2020_PQ
        ));
        assert!(updates.iter().all(|u| u.stream() == 0));
    }

    #[test]
    fn test_unmappable_dataspace_sends_dataspace_only() {
        let sink = Arc::new(RecordingSink::default());
        let queue = FrameQueueThread::new(Arc::downgrade(&sink), config(10)).unwrap();

        queue.set_dataspace(Dataspace::ADOBE_RGB);
        queue.queue(frame(0), signaled());

        let bundles = sink.wait_for_works(1, TIMEOUT);
        let updates = &bundles[0].works[0].config_updates;
        assert_eq!(updates.len(), 1);
        assert!(matches!(updates[0], ConfigUpdate::Dataspace { .. }));
    }

    #[test]
    fn test_released_sink_discards_batches() {
        let sink = Arc::new(RecordingSink::default());
        let queue = FrameQueueThread::new(Arc::downgrade(&sink), config(10)).unwrap();
        drop(sink);

        queue.queue(frame(0), signaled());
        assert!(wait_until(TIMEOUT, || queue.stats().discarded_batches == 1));

        let stats = queue.stats();
        assert_eq!(stats.forwarded_items, 0);
        assert_eq!(stats.discarded_items, 1);
    }

    #[test]
    fn test_conversion_failure_discards_only_that_batch() {
        let sink = Arc::new(RecordingSink::default());
        let queue = FrameQueueThread::new(Arc::downgrade(&sink), config(10)).unwrap();

        queue.queue(FrameWork::new(0, 0, Bytes::new()), signaled());
        assert!(wait_until(TIMEOUT, || queue.stats().discarded_batches == 1));

        queue.queue(frame(1), signaled());
        let bundles = sink.wait_for_works(1, TIMEOUT);
        assert_eq!(frame_indices(&bundles), vec![1]);
    }

    #[test]
    fn test_sink_rejection_is_not_retried() {
        let sink = Arc::new(RecordingSink::rejecting());
        let queue = FrameQueueThread::new(Arc::downgrade(&sink), config(10)).unwrap();

        queue.queue(frame(0), signaled());
        assert!(wait_until(TIMEOUT, || queue.stats().discarded_batches == 1));
        thread::sleep(Duration::from_millis(50));

        let stats = queue.stats();
        assert_eq!(stats.discarded_batches, 1);
        assert_eq!(stats.batches, 0);
    }

    #[test]
    fn test_failed_fence_still_forwards() {
        let sink = Arc::new(RecordingSink::default());
        let queue = FrameQueueThread::new(Arc::downgrade(&sink), config(10)).unwrap();

        let (fence, signal) = manual_fence();
        signal.fail("producer aborted");
        queue.queue(frame(0), Some(Box::new(fence)));
        queue.queue(frame(1), None);

        let bundles = sink.wait_for_works(2, TIMEOUT);
        assert_eq!(frame_indices(&bundles), vec![0, 1]);
        assert_eq!(queue.stats().fence_errors, 1);
    }

    #[test]
    fn test_batches_respect_polling_interval() {
        let interval = Duration::from_millis(30);
        let sink = Arc::new(RecordingSink::default());
        let queue = FrameQueueThread::new(Arc::downgrade(&sink), config(30)).unwrap();

        for i in 0..100 {
            queue.queue(frame(i), signaled());
            thread::sleep(Duration::from_millis(2));
        }
        let bundles = sink.wait_for_works(100, TIMEOUT);
        assert_eq!(frame_indices(&bundles), (0..100).collect::<Vec<_>>());
        assert!(bundles.len() < 100);

        let arrivals = sink.arrivals();
        for pair in arrivals.windows(2) {
            let gap = pair[1].duration_since(pair[0]);
            assert!(
                gap + Duration::from_millis(5) >= interval,
                "batches forwarded {:?} apart",
                gap
            );
        }
    }

    #[test]
    fn test_multiple_producers_keep_their_order() {
        let sink = Arc::new(RecordingSink::default());
        let queue = Arc::new(FrameQueueThread::new(Arc::downgrade(&sink), config(5)).unwrap());

        let producers: Vec<_> = (0..4u64)
            .map(|p| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..50u64 {
                        queue.queue(frame(p * 1_000 + i), signaled());
                        if i % 10 == 0 {
                            thread::sleep(Duration::from_millis(1));
                        }
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        let bundles = sink.wait_for_works(200, TIMEOUT);
        let indices = frame_indices(&bundles);
        assert_eq!(indices.len(), 200);
        for p in 0..4u64 {
            let own: Vec<u64> = indices
                .iter()
                .copied()
                .filter(|i| i / 1_000 == p)
                .collect();
            assert_eq!(own, (0..50).map(|i| p * 1_000 + i).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_drop_discards_pending_items() {
        let sink = Arc::new(RecordingSink::default());
        let queue = FrameQueueThread::new(Arc::downgrade(&sink), config(10)).unwrap();

        let (fence, signal) = manual_fence();
        queue.queue(frame(0), Some(Box::new(fence)));
        assert!(wait_until(TIMEOUT, || queue.stats().pending == 0));
        for i in 1..=3 {
            queue.queue(frame(i), signaled());
        }

        let signaller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            signal.signal();
        });

        let start = Instant::now();
        drop(queue);
        assert!(start.elapsed() < Duration::from_secs(1));
        signaller.join().unwrap();

        // 只有已在处理中的批次被转发
        assert_eq!(frame_indices(&sink.bundles()), vec![0]);
    }

    #[test]
    fn test_idle_drop_is_prompt() {
        let sink = Arc::new(RecordingSink::default());
        let queue = FrameQueueThread::new(Arc::downgrade(&sink), config(10)).unwrap();
        thread::sleep(Duration::from_millis(25));

        let start = Instant::now();
        drop(queue);
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[test]
    fn test_set_priority() {
        let sink = Arc::new(RecordingSink::default());
        let queue = FrameQueueThread::new(Arc::downgrade(&sink), config(10)).unwrap();

        assert!(matches!(queue.set_priority(100), Err(PacerError::Priority(_))));
        assert!(queue.set_priority(10).is_ok());

        // 优先级设置不影响转发
        queue.queue(frame(0), signaled());
        assert_eq!(sink.wait_for_works(1, TIMEOUT).len(), 1);
    }

    #[test]
    fn test_priority_changes_do_not_stall_producers() {
        let sink = Arc::new(RecordingSink::default());
        let queue = Arc::new(FrameQueueThread::new(Arc::downgrade(&sink), config(5)).unwrap());

        let changer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..50 {
                    queue.set_priority(i % 20).unwrap();
                    thread::sleep(Duration::from_millis(1));
                }
            })
        };

        let mut slowest = Duration::ZERO;
        for i in 0..20 {
            let start = Instant::now();
            queue.queue(frame(i), signaled());
            slowest = slowest.max(start.elapsed());
            thread::sleep(Duration::from_millis(2));
        }
        changer.join().unwrap();

        assert!(slowest < Duration::from_millis(50), "queue() blocked for {:?}", slowest);
        let indices: Vec<u64> = sink
            .wait_for_works(20, TIMEOUT)
            .iter()
            .flat_map(|bundle| bundle.works.iter().map(|w| w.frame_index))
            .collect();
        assert_eq!(indices, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let sink = Arc::new(RecordingSink::default());
        let result = FrameQueueThread::new(
            Arc::downgrade(&sink),
            FrameQueueConfig {
                interval: Duration::ZERO,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(PacerError::Config(_))));
    }

    /// 自定义工作单元与下游格式
    #[derive(Default)]
    struct SumSink {
        totals: Mutex<Vec<u32>>,
    }

    impl FrameSink for SumSink {
        type Work = u32;
        type Bundle = u32;

        fn to_bundle(batch: Vec<QueuedWork<u32>>) -> Result<u32, PacerError> {
            Ok(batch.into_iter().map(|q| q.work).sum())
        }

        fn queue(&self, bundle: u32) -> Result<(), PacerError> {
            self.totals.lock().unwrap().push(bundle);
            Ok(())
        }
    }

    #[test]
    fn test_custom_work_type() {
        let sink = Arc::new(SumSink::default());
        let queue = FrameQueueThread::new(Arc::downgrade(&sink), config(10)).unwrap();

        for value in [1, 2, 3, 4] {
            queue.queue(value, None);
        }
        assert!(wait_until(TIMEOUT, || queue.stats().forwarded_items == 4));
        assert_eq!(sink.totals.lock().unwrap().iter().sum::<u32>(), 10);
    }
}
