use crate::models::entry::UserId;
use crate::models::outcome::GradeOutcome;
use serde::Serialize;

/// 单个条目的最终结果
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    /// 已评分（dry run 时表示"本应写回"）
    Graded(GradeOutcome),
    /// 评分函数选择跳过，不写回
    Skipped { owner_id: UserId },
    /// 评分或写回失败
    Failed(FailedResult),
}

impl ItemOutcome {
    pub fn owner_id(&self) -> UserId {
        match self {
            ItemOutcome::Graded(outcome) => outcome.owner_id,
            ItemOutcome::Skipped { owner_id } => *owner_id,
            ItemOutcome::Failed(failure) => failure.owner_id,
        }
    }
}

/// 失败记录
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedResult {
    pub owner_id: UserId,
    pub error: String,
}

/// 分类统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub with_initial_post: usize,
    pub without_initial_post: usize,
    pub peer_review_met: usize,
    pub peer_review_unmet: usize,
    /// 被迟交扣分的数量
    pub late_count: usize,
}

/// 整批运行的汇总结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub total: usize,
    pub graded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub average_score: f64,
    pub dry_run: bool,
    pub summary: BatchSummary,
    /// 前 N 个详细结果
    pub sample_outcomes: Vec<GradeOutcome>,
    /// 全部失败记录，不截断
    pub failed_results: Vec<FailedResult>,
}

impl BatchResult {
    /// total == graded + skipped + failed
    pub fn is_reconciled(&self) -> bool {
        self.total == self.graded + self.skipped + self.failed
            && self.failed == self.failed_results.len()
    }
}
