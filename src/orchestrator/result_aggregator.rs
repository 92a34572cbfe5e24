//! 结果汇总器 - 编排层
//!
//! 把逐条的 [`ItemOutcome`] 折叠成一份 [`BatchResult`]。
//! 只在批次结束后被调用，本身不涉及并发。

use crate::models::batch_result::{BatchResult, ItemOutcome};

/// 结果汇总器
pub struct ResultAggregator {
    sample_limit: usize,
    result: BatchResult,
    score_sum: f64,
}

impl ResultAggregator {
    /// # 参数
    /// - `sample_limit`: 保留的详细样本数量；失败记录不受此限制
    /// - `dry_run`: 本次运行是否为 dry run
    pub fn new(sample_limit: usize, dry_run: bool) -> Self {
        Self {
            sample_limit,
            result: BatchResult {
                dry_run,
                ..Default::default()
            },
            score_sum: 0.0,
        }
    }

    /// 一次性汇总全部结果
    pub fn aggregate(
        outcomes: impl IntoIterator<Item = ItemOutcome>,
        sample_limit: usize,
        dry_run: bool,
    ) -> BatchResult {
        let mut aggregator = Self::new(sample_limit, dry_run);
        for outcome in outcomes {
            aggregator.record(outcome);
        }
        aggregator.finish()
    }

    /// 计入一个条目的结果
    pub fn record(&mut self, outcome: ItemOutcome) {
        let result = &mut self.result;
        result.total += 1;

        match outcome {
            ItemOutcome::Graded(outcome) => {
                result.graded += 1;
                self.score_sum += outcome.score;

                let summary = &mut result.summary;
                match outcome.has_initial_post {
                    Some(true) => summary.with_initial_post += 1,
                    Some(false) => summary.without_initial_post += 1,
                    None => {}
                }
                match outcome.met_peer_review_requirement {
                    Some(true) => summary.peer_review_met += 1,
                    Some(false) => summary.peer_review_unmet += 1,
                    None => {}
                }
                if outcome.is_late() {
                    summary.late_count += 1;
                }

                if result.sample_outcomes.len() < self.sample_limit {
                    result.sample_outcomes.push(outcome);
                }
            }
            ItemOutcome::Skipped { .. } => result.skipped += 1,
            ItemOutcome::Failed(failure) => {
                result.failed += 1;
                result.failed_results.push(failure);
            }
        }
    }

    /// 当前已计入的条目数
    pub fn processed(&self) -> usize {
        self.result.total
    }

    /// 结束汇总，计算平均分
    pub fn finish(mut self) -> BatchResult {
        self.result.average_score = if self.result.graded == 0 {
            0.0
        } else {
            self.score_sum / self.result.graded as f64
        };
        self.result
    }
}
