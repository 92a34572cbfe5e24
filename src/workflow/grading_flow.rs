//! 条目评分流程 - 流程层
//!
//! 核心职责：定义"一个学生"的完整处理流程
//!
//! 流程顺序：
//! 1. 评分策略给出结果（或跳过）
//! 2. 非 dry run 时写回 LMS
//!
//! 两步共用一个超时；任何一步出错都只影响当前条目。

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::models::batch_result::{FailedResult, ItemOutcome};
use crate::models::entry::Gradable;
use crate::models::outcome::{format_score, GradeOutcome};
use crate::services::{GradeWriter, ItemScorer};
use crate::workflow::item_ctx::ItemCtx;

/// 条目评分流程
///
/// - 不关心批次、并发和限速
/// - 只依赖业务能力（scorer / writer）
pub struct GradingFlow<I> {
    scorer: Arc<dyn ItemScorer<I>>,
    writer: Arc<dyn GradeWriter>,
    dry_run: bool,
    item_timeout: Duration,
}

impl<I> GradingFlow<I>
where
    I: Gradable + Send + Sync + 'static,
{
    /// # 参数
    /// - `scorer`: 评分策略
    /// - `writer`: 成绩写回能力（dry run 时不会被调用）
    /// - `dry_run`: 只计算不写回
    /// - `item_timeout`: 单个条目（评分 + 写回）的超时
    pub fn new(
        scorer: Arc<dyn ItemScorer<I>>,
        writer: Arc<dyn GradeWriter>,
        dry_run: bool,
        item_timeout: Duration,
    ) -> Self {
        Self {
            scorer,
            writer,
            dry_run,
            item_timeout,
        }
    }

    /// 处理一个条目，永远返回一个结果而不是错误
    pub async fn run(&self, item: &I, ctx: &ItemCtx) -> ItemOutcome {
        let owner_id = item.owner_id();

        match timeout(self.item_timeout, self.grade(item, ctx)).await {
            Ok(Ok(Some(outcome))) => ItemOutcome::Graded(outcome),
            Ok(Ok(None)) => {
                info!("{} ⏭️ 跳过", ctx);
                ItemOutcome::Skipped { owner_id }
            }
            Ok(Err(e)) => {
                let error = format!("{:#}", e);
                warn!("{} ❌ 处理失败: {}", ctx, error);
                ItemOutcome::Failed(FailedResult { owner_id, error })
            }
            Err(_) => {
                let error = format!("处理超时 ({}s)", self.item_timeout.as_secs_f64());
                warn!("{} ⏱️ {}", ctx, error);
                ItemOutcome::Failed(FailedResult { owner_id, error })
            }
        }
    }

    async fn grade(&self, item: &I, ctx: &ItemCtx) -> Result<Option<GradeOutcome>> {
        let Some(outcome) = self.scorer.score(item).await? else {
            return Ok(None);
        };

        if self.dry_run {
            info!(
                "{} 🧪 [DRY RUN] 得分 {}，未写回",
                ctx,
                format_score(outcome.score)
            );
            return Ok(Some(outcome));
        }

        self.writer.write(ctx.owner_id, &outcome.payload()).await?;
        info!("{} ✓ 已写回成绩 {}", ctx, format_score(outcome.score));

        Ok(Some(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::UserId;
    use crate::models::outcome::WritePayload;
    use crate::services::FnScorer;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingWriter {
        writes: Mutex<Vec<UserId>>,
        fail_for: Option<UserId>,
    }

    #[async_trait]
    impl GradeWriter for RecordingWriter {
        async fn write(&self, owner_id: UserId, _payload: &WritePayload) -> Result<()> {
            if self.fail_for == Some(owner_id) {
                anyhow::bail!("写回被拒绝: 学生 {}", owner_id);
            }
            self.writes.lock().unwrap().push(owner_id);
            Ok(())
        }
    }

    #[derive(Clone)]
    struct Item(UserId);

    impl Gradable for Item {
        fn owner_id(&self) -> UserId {
            self.0
        }
    }

    fn flow(writer: Arc<RecordingWriter>, dry_run: bool) -> GradingFlow<Item> {
        let scorer = FnScorer::new(|item: Item| async move {
            Ok::<_, anyhow::Error>(Some(GradeOutcome::simple(item.0, 8.5, vec!["ok".into()])))
        });
        GradingFlow::new(Arc::new(scorer), writer, dry_run, Duration::from_secs(5))
    }

    fn ctx(owner_id: UserId) -> ItemCtx {
        ItemCtx::new(1, 1, 1, owner_id)
    }

    #[tokio::test]
    async fn test_graded_and_written() {
        let writer = Arc::new(RecordingWriter::default());
        let outcome = flow(writer.clone(), false).run(&Item(7), &ctx(7)).await;

        assert!(matches!(outcome, ItemOutcome::Graded(ref o) if o.score == 8.5));
        assert_eq!(*writer.writes.lock().unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn test_dry_run_never_writes() {
        let writer = Arc::new(RecordingWriter::default());
        let outcome = flow(writer.clone(), true).run(&Item(7), &ctx(7)).await;

        assert!(matches!(outcome, ItemOutcome::Graded(_)));
        assert!(writer.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_becomes_failed() {
        let writer = Arc::new(RecordingWriter {
            fail_for: Some(7),
            ..Default::default()
        });
        let outcome = flow(writer, false).run(&Item(7), &ctx(7)).await;

        match outcome {
            ItemOutcome::Failed(failure) => {
                assert_eq!(failure.owner_id, 7);
                assert!(failure.error.contains("写回被拒绝"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_becomes_failed() {
        let scorer = FnScorer::new(|item: Item| async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, anyhow::Error>(Some(GradeOutcome::simple(item.0, 1.0, Vec::new())))
        });
        let flow = GradingFlow::new(
            Arc::new(scorer),
            Arc::new(RecordingWriter::default()),
            false,
            Duration::from_millis(50),
        );

        let outcome = flow.run(&Item(3), &ctx(3)).await;
        assert!(matches!(outcome, ItemOutcome::Failed(ref f) if f.error.contains("超时")));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_skip_is_logged_at_info() {
        let logs = LogBuffer::default();
        let sink = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let scorer = FnScorer::new(|_item: Item| async move {
            Ok::<Option<GradeOutcome>, anyhow::Error>(None)
        });
        let flow = GradingFlow::new(
            Arc::new(scorer),
            Arc::new(RecordingWriter::default()),
            false,
            Duration::from_secs(5),
        );

        let outcome = flow.run(&Item(4), &ctx(4)).await;
        assert!(matches!(outcome, ItemOutcome::Skipped { owner_id: 4 }));

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("INFO"));
        assert!(output.contains("学生 4"));
        assert!(output.contains("跳过"));
    }
}
