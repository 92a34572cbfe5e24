//! 分页拉取 - 业务能力层
//!
//! 负责把一次评分需要的源数据完整拉下来：作业提交、讨论帖及其回复、课程学生名单。
//! 顶层集合拉取失败是致命错误；单个帖子的回复拉取失败只记日志并跳过。

use crate::clients::LmsClient;
use crate::error::AppResult;
use crate::models::entry::{CourseUser, DiscussionEntry, DiscussionTopic, Submission, UserId};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// 回复拉取的默认并发数
const DEFAULT_REPLY_CONCURRENCY: usize = 4;

/// 分页拉取服务
pub struct PaginatedFetcher {
    client: Arc<LmsClient>,
    page_size: u32,
    reply_concurrency: usize,
}

impl PaginatedFetcher {
    pub fn new(client: Arc<LmsClient>, page_size: u32) -> Self {
        Self {
            client,
            page_size: page_size.max(1),
            reply_concurrency: DEFAULT_REPLY_CONCURRENCY,
        }
    }

    pub fn with_reply_concurrency(mut self, concurrency: usize) -> Self {
        self.reply_concurrency = concurrency.max(1);
        self
    }

    /// 拉取任意分页集合
    pub async fn fetch_collection<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> AppResult<Vec<T>> {
        self.client.get_paginated(path, self.page_size).await
    }

    /// 拉取某个作业的全部提交
    pub async fn fetch_submissions(
        &self,
        course_id: u64,
        assignment_id: u64,
    ) -> AppResult<Vec<Submission>> {
        let path = format!(
            "/api/v1/courses/{}/assignments/{}/submissions",
            course_id, assignment_id
        );
        let submissions: Vec<Submission> = self.fetch_collection(&path).await?;
        info!("✓ 获取到 {} 份作业提交", submissions.len());
        Ok(submissions)
    }

    /// 拉取讨论主题信息
    pub async fn fetch_topic(&self, course_id: u64, topic_id: u64) -> AppResult<DiscussionTopic> {
        let path = format!("/api/v1/courses/{}/discussion_topics/{}", course_id, topic_id);
        self.client.get_json(&path).await
    }

    /// 拉取讨论区全部帖子（首帖 + 每个首帖下的回复），返回扁平列表
    pub async fn fetch_discussion_entries(
        &self,
        course_id: u64,
        topic_id: u64,
    ) -> AppResult<Vec<DiscussionEntry>> {
        let base = format!(
            "/api/v1/courses/{}/discussion_topics/{}/entries",
            course_id, topic_id
        );

        let top_level: Vec<DiscussionEntry> = self.fetch_collection(&base).await?;
        info!("✓ 获取到 {} 条首帖，开始拉取回复...", top_level.len());

        let reply_results: Vec<(u64, AppResult<Vec<DiscussionEntry>>)> =
            stream::iter(top_level.iter().map(|entry| entry.id))
                .map(|entry_id| {
                    let path = format!("{}/{}/replies", base, entry_id);
                    async move { (entry_id, self.fetch_collection(&path).await) }
                })
                .buffered(self.reply_concurrency)
                .collect()
                .await;

        let mut seen: HashSet<u64> = top_level.iter().map(|entry| entry.id).collect();
        let mut entries = top_level;
        let mut failed_threads = 0;

        for (entry_id, result) in reply_results {
            match result {
                Ok(replies) => {
                    for mut reply in replies {
                        if !seen.insert(reply.id) {
                            continue;
                        }
                        // 回复列表里缺 parent_id 的，挂到拉取它的首帖下
                        reply.parent_id.get_or_insert(entry_id);
                        entries.push(reply);
                    }
                }
                Err(e) => {
                    failed_threads += 1;
                    warn!("⚠️ 帖子 #{} 的回复拉取失败，跳过: {}", entry_id, e);
                }
            }
        }

        if failed_threads > 0 {
            warn!("⚠️ 共 {} 个帖子的回复未能拉取，相关学生的互评可能偏低", failed_threads);
        }
        info!("✓ 讨论区共 {} 条帖子", entries.len());

        Ok(entries)
    }

    /// 拉取课程学生名单
    pub async fn fetch_student_ids(&self, course_id: u64) -> AppResult<Vec<UserId>> {
        let path = format!("/api/v1/courses/{}/users?enrollment_type[]=student", course_id);
        let users: Vec<CourseUser> = self.fetch_collection(&path).await?;
        Ok(users.into_iter().map(|user| user.id).collect())
    }
}
