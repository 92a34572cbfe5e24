//! 成绩写回 - 业务能力层
//!
//! 只负责"把一个学生的成绩写进 LMS"，不关心批次和并发

use crate::clients::LmsClient;
use crate::models::entry::UserId;
use crate::models::outcome::WritePayload;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// 成绩写回能力
#[async_trait]
pub trait GradeWriter: Send + Sync {
    async fn write(&self, owner_id: UserId, payload: &WritePayload) -> Result<()>;
}

/// 写回 LMS 某个作业的成绩
pub struct LmsGradeWriter {
    client: Arc<LmsClient>,
    course_id: u64,
    assignment_id: u64,
}

impl LmsGradeWriter {
    pub fn new(client: Arc<LmsClient>, course_id: u64, assignment_id: u64) -> Self {
        Self {
            client,
            course_id,
            assignment_id,
        }
    }
}

#[async_trait]
impl GradeWriter for LmsGradeWriter {
    async fn write(&self, owner_id: UserId, payload: &WritePayload) -> Result<()> {
        debug!(
            "写回成绩: 课程 {} | 作业 {} | 学生 {}",
            self.course_id, self.assignment_id, owner_id
        );

        self.client
            .update_submission(self.course_id, self.assignment_id, owner_id, payload)
            .await
            .with_context(|| format!("写回学生 {} 的成绩失败", owner_id))
    }
}
