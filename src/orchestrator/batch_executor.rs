//! 批量执行器 - 编排层
//!
//! ## 职责
//!
//! 1. **分批**：按 `max_concurrent` 把条目切成若干批
//! 2. **并发**：批内每个条目一个 `tokio::spawn` 任务
//! 3. **隔离**：单个条目的错误、panic、超时都只记为该条目失败
//! 4. **限速**：相邻两批之间等待 `rate_limit_delay`，最后一批之后不等待
//! 5. **汇总**：每批全部结束后再把结果计入 [`ResultAggregator`]
//!
//! 执行器不认识具体的评分规则，只通过 [`ItemScorer`] 和 [`GradeWriter`] 工作。

use crate::config::RunOptions;
use crate::models::batch_result::{BatchResult, FailedResult, ItemOutcome};
use crate::models::entry::Gradable;
use crate::orchestrator::result_aggregator::ResultAggregator;
use crate::services::{GradeWriter, ItemScorer};
use crate::utils::logging::{log_batch_complete, log_batch_start, log_items_loaded};
use crate::workflow::{GradingFlow, ItemCtx};
use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{error, info};

/// 批量执行器
pub struct BatchExecutor {
    options: RunOptions,
}

impl BatchExecutor {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    /// 对全部条目执行评分（并在非 dry run 时写回）
    ///
    /// # 参数
    /// - `items`: 待评分条目
    /// - `scorer`: 评分策略
    /// - `writer`: 成绩写回能力
    ///
    /// # 返回
    /// 整批汇总结果；单个条目的失败不会让整批失败
    pub async fn run<I>(
        &self,
        items: Vec<I>,
        scorer: Arc<dyn ItemScorer<I>>,
        writer: Arc<dyn GradeWriter>,
    ) -> BatchResult
    where
        I: Gradable + Send + Sync + 'static,
    {
        let options = &self.options;
        let flow = Arc::new(GradingFlow::new(
            scorer,
            writer,
            options.dry_run,
            options.item_timeout,
        ));

        let total = items.len();
        let batch_size = options.max_concurrent.max(1);
        let total_batches = total.div_ceil(batch_size);
        let mut aggregator = ResultAggregator::new(options.sample_limit, options.dry_run);

        log_items_loaded(total, batch_size);

        let mut remaining = items.into_iter();
        for batch_num in 1..=total_batches {
            let batch: Vec<I> = remaining.by_ref().take(batch_size).collect();
            let start = aggregator.processed() + 1;
            let end = start + batch.len() - 1;

            log_batch_start(batch_num, total_batches, start, end, total);

            let outcomes = self.run_batch(&flow, batch, batch_num, start, total).await;

            let (mut graded, mut skipped, mut failed) = (0, 0, 0);
            for outcome in outcomes {
                match outcome {
                    ItemOutcome::Graded(_) => graded += 1,
                    ItemOutcome::Skipped { .. } => skipped += 1,
                    ItemOutcome::Failed(_) => failed += 1,
                }
                aggregator.record(outcome);
            }

            log_batch_complete(batch_num, graded, skipped, failed);

            if batch_num < total_batches && !options.rate_limit_delay.is_zero() {
                info!("⏳ 等待 {}ms 后开始下一批", options.rate_limit_delay.as_millis());
                tokio::time::sleep(options.rate_limit_delay).await;
            }
        }

        aggregator.finish()
    }

    /// 处理单个批次，等待批内全部任务结束
    async fn run_batch<I>(
        &self,
        flow: &Arc<GradingFlow<I>>,
        batch: Vec<I>,
        batch_num: usize,
        start: usize,
        total: usize,
    ) -> Vec<ItemOutcome>
    where
        I: Gradable + Send + Sync + 'static,
    {
        let handles = batch.into_iter().enumerate().map(|(idx, item)| {
            let owner_id = item.owner_id();
            let ctx = ItemCtx::new(batch_num, start + idx, total, owner_id);
            let flow = flow.clone();

            let handle = tokio::spawn(async move { flow.run(&item, &ctx).await });
            async move { (owner_id, handle.await) }
        });

        join_all(handles)
            .await
            .into_iter()
            .map(|(owner_id, joined)| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    let error = join_error_message(e);
                    error!("[学生 {}] ❌ 任务执行失败: {}", owner_id, error);
                    ItemOutcome::Failed(FailedResult { owner_id, error })
                }
            })
            .collect()
    }
}

fn join_error_message(err: JoinError) -> String {
    if !err.is_panic() {
        return format!("评分任务被取消: {}", err);
    }

    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "未知错误".to_string());
    format!("评分任务 panic: {}", message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::UserId;
    use crate::models::outcome::{GradeOutcome, WritePayload};
    use crate::services::FnScorer;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct RecordingWriter {
        writes: Mutex<Vec<UserId>>,
        fail_for: Vec<UserId>,
    }

    #[async_trait]
    impl GradeWriter for RecordingWriter {
        async fn write(&self, owner_id: UserId, _payload: &WritePayload) -> anyhow::Result<()> {
            if self.fail_for.contains(&owner_id) {
                anyhow::bail!("LMS 拒绝写回学生 {}", owner_id);
            }
            self.writes.lock().unwrap().push(owner_id);
            Ok(())
        }
    }

    #[derive(Clone, Debug)]
    struct Item(UserId);

    impl Gradable for Item {
        fn owner_id(&self) -> UserId {
            self.0
        }
    }

    fn items(n: u64) -> Vec<Item> {
        (1..=n).map(Item).collect()
    }

    fn options(max_concurrent: usize, dry_run: bool) -> RunOptions {
        RunOptions {
            max_concurrent,
            rate_limit_delay: Duration::ZERO,
            dry_run,
            item_timeout: Duration::from_secs(5),
            sample_limit: 10,
        }
    }

    fn constant_scorer(score: f64) -> Arc<dyn ItemScorer<Item>> {
        Arc::new(FnScorer::new(move |item: Item| async move {
            Ok::<_, anyhow::Error>(Some(GradeOutcome::simple(item.0, score, Vec::new())))
        }))
    }

    #[tokio::test]
    async fn test_one_write_failure_does_not_stop_batch() {
        let writer = Arc::new(RecordingWriter {
            fail_for: vec![3],
            ..Default::default()
        });

        let result = BatchExecutor::new(options(2, false))
            .run(items(5), constant_scorer(10.0), writer.clone())
            .await;

        assert_eq!(result.total, 5);
        assert_eq!(result.graded, 4);
        assert_eq!(result.failed, 1);
        assert_eq!(result.failed_results[0].owner_id, 3);
        assert!(!result.failed_results[0].error.is_empty());
        assert!(result.is_reconciled());

        let mut written = writer.writes.lock().unwrap().clone();
        written.sort();
        assert_eq!(written, vec![1, 2, 4, 5]);
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_writes() {
        let writer = Arc::new(RecordingWriter::default());

        let result = BatchExecutor::new(options(3, true))
            .run(items(10), constant_scorer(7.5), writer.clone())
            .await;

        assert_eq!(result.graded, 10);
        assert!(result.dry_run);
        assert_eq!(result.average_score, 7.5);
        assert!(writer.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_skips_and_scorer_errors() {
        let scorer: Arc<dyn ItemScorer<Item>> = Arc::new(FnScorer::new(|item: Item| async move {
            match item.0 % 3 {
                0 => Err(anyhow::anyhow!("无法评分: {}", item.0)),
                1 => Ok(None),
                _ => Ok(Some(GradeOutcome::simple(item.0, 1.0, Vec::new()))),
            }
        }));
        let writer = Arc::new(RecordingWriter::default());

        let result = BatchExecutor::new(options(4, false))
            .run(items(6), scorer, writer.clone())
            .await;

        assert_eq!(result.skipped, 2);
        assert_eq!(result.graded, 2);
        assert_eq!(result.failed, 2);
        assert!(result.is_reconciled());
        assert_eq!(writer.writes.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let scorer: Arc<dyn ItemScorer<Item>> = Arc::new(FnScorer::new(|item: Item| async move {
            if item.0 == 2 {
                panic!("评分崩溃");
            }
            Ok::<_, anyhow::Error>(Some(GradeOutcome::simple(item.0, 1.0, Vec::new())))
        }));

        let result = BatchExecutor::new(options(3, true))
            .run(items(3), scorer, Arc::new(RecordingWriter::default()))
            .await;

        assert_eq!(result.graded, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.failed_results[0].owner_id, 2);
        assert!(result.failed_results[0].error.contains("评分崩溃"));
    }

    #[tokio::test]
    async fn test_concurrency_bounded_by_batch_size() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let scorer = {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            FnScorer::new(move |item: Item| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, anyhow::Error>(Some(GradeOutcome::simple(item.0, 1.0, Vec::new())))
                }
            })
        };

        let result = BatchExecutor::new(options(2, true))
            .run(items(7), Arc::new(scorer), Arc::new(RecordingWriter::default()))
            .await;

        assert_eq!(result.graded, 7);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_delay_between_batches_only() {
        let mut opts = options(1, true);
        opts.rate_limit_delay = Duration::from_millis(50);
        let executor = BatchExecutor::new(opts);

        let started = Instant::now();
        executor
            .run(items(3), constant_scorer(1.0), Arc::new(RecordingWriter::default()))
            .await;
        assert!(started.elapsed() >= Duration::from_millis(100));

        let mut opts = options(1, true);
        opts.rate_limit_delay = Duration::from_millis(500);
        let started = Instant::now();
        BatchExecutor::new(opts)
            .run(items(1), constant_scorer(1.0), Arc::new(RecordingWriter::default()))
            .await;
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let result = BatchExecutor::new(options(5, false))
            .run(Vec::<Item>::new(), constant_scorer(1.0), Arc::new(RecordingWriter::default()))
            .await;

        assert_eq!(result.total, 0);
        assert_eq!(result.average_score, 0.0);
        assert!(result.is_reconciled());
    }
}
