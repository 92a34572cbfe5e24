//! 评分策略 - 业务能力层
//!
//! 批量执行器只认识 [`ItemScorer`]：给一个条目，返回评分结果或"跳过"。
//! 内置两种声明式策略，也可以用 [`FnScorer`] 包装任意异步闭包。

use crate::models::criteria::{Criteria, SubmissionCriteria};
use crate::models::entry::Submission;
use crate::models::outcome::GradeOutcome;
use crate::models::participation::ParticipationRecord;
use crate::services::score_calculator;
use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use tracing::debug;

/// 评分策略
///
/// 返回 `Ok(None)` 表示跳过该条目（不计分、不写回）。
#[async_trait]
pub trait ItemScorer<I: Send + Sync>: Send + Sync {
    async fn score(&self, item: &I) -> Result<Option<GradeOutcome>>;
}

/// 讨论参与度评分
pub struct DiscussionScorer {
    criteria: Criteria,
}

impl DiscussionScorer {
    pub fn new(criteria: Criteria) -> Self {
        Self { criteria }
    }
}

#[async_trait]
impl ItemScorer<ParticipationRecord> for DiscussionScorer {
    async fn score(&self, item: &ParticipationRecord) -> Result<Option<GradeOutcome>> {
        Ok(Some(score_calculator::score(item, &self.criteria)))
    }
}

/// 作业完成度评分
pub struct SubmissionScorer {
    criteria: SubmissionCriteria,
    regrade: bool,
}

impl SubmissionScorer {
    /// # 参数
    /// - `criteria`: 已校验的作业评分标准
    /// - `regrade`: 是否覆盖已有成绩
    pub fn new(criteria: SubmissionCriteria, regrade: bool) -> Self {
        Self { criteria, regrade }
    }
}

#[async_trait]
impl ItemScorer<Submission> for SubmissionScorer {
    async fn score(&self, item: &Submission) -> Result<Option<GradeOutcome>> {
        if !item.is_submitted() {
            debug!("[学生 {}] 未提交，跳过", item.user_id);
            return Ok(None);
        }
        if item.has_existing_grade() && !self.regrade {
            debug!("[学生 {}] 已有成绩，跳过", item.user_id);
            return Ok(None);
        }

        Ok(Some(score_calculator::score_submission(item, &self.criteria)))
    }
}

/// 把异步闭包包装成评分策略
///
/// ```no_run
/// # use bulk_grader::models::{GradeOutcome, Submission};
/// # use bulk_grader::services::FnScorer;
/// let scorer = FnScorer::new(|submission: Submission| async move {
///     Ok::<_, anyhow::Error>(Some(GradeOutcome::simple(submission.user_id, 1.0, vec![])))
/// });
/// ```
pub struct FnScorer<F> {
    func: F,
}

impl<F> FnScorer<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<I, F, Fut> ItemScorer<I> for FnScorer<F>
where
    I: Clone + Send + Sync + 'static,
    F: Fn(I) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<GradeOutcome>>> + Send,
{
    async fn score(&self, item: &I) -> Result<Option<GradeOutcome>> {
        (self.func)(item.clone()).await
    }
}
