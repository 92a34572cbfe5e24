//! 应用入口 - 编排层
//!
//! ## 核心流程
//!
//! 1. **初始化**：加载并校验评分标准、校验运行参数、创建 LMS 客户端
//! 2. **拉取**：按评分模式拉取讨论帖或作业提交
//! 3. **重建**：讨论模式下从扁平帖子重建每个学生的参与记录
//! 4. **执行**：交给 [`BatchExecutor`] 分批评分并写回
//! 5. **输出**：打印统计并写出 JSON 报告（写失败只告警，不影响已写回的成绩）
//!
//! 评分标准或配置有误时在第 1 步失败，不会发出任何请求。

use crate::clients::LmsClient;
use crate::config::{Config, GradingMode, RunOptions};
use crate::error::AppError;
use crate::models::batch_result::BatchResult;
use crate::models::criteria::{Criteria, SubmissionCriteria};
use crate::models::loaders::load_criteria_file;
use crate::models::participation::ParticipationRecord;
use crate::orchestrator::batch_executor::BatchExecutor;
use crate::services::criteria_validator::{validate, validate_submission};
use crate::services::thread_reconstructor::{pad_with_roster, reconstruct_with_stats};
use crate::services::{DiscussionScorer, LmsGradeWriter, PaginatedFetcher, SubmissionScorer};
use crate::utils::logging::{log_startup, print_final_stats};
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// 已校验的评分计划
#[derive(Debug, Clone)]
enum GradingPlan {
    Discussion(Criteria),
    Submission(SubmissionCriteria),
}

/// 应用主结构
pub struct App {
    config: Config,
    options: RunOptions,
    plan: GradingPlan,
    client: Arc<LmsClient>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let options = config.run_options()?;
        config.require_course_id()?;

        let criteria_path = Path::new(&config.criteria_file);
        let criteria_file = load_criteria_file(criteria_path)
            .await
            .with_context(|| format!("无法加载评分标准: {}", config.criteria_file))?;

        let plan = match config.grading_mode {
            GradingMode::Discussion => {
                config.require_topic_id()?;
                let criteria = validate(criteria_file.discussion()?)
                    .context("讨论评分标准校验失败，本次不做任何评分")?;
                info!("✓ 讨论评分标准校验通过: {:?}", criteria);
                GradingPlan::Discussion(criteria)
            }
            GradingMode::Submission => {
                config.require_assignment_id()?;
                let criteria = validate_submission(criteria_file.submission()?)
                    .context("作业评分标准校验失败，本次不做任何评分")?;
                info!("✓ 作业评分标准校验通过: {:?}", criteria);
                GradingPlan::Submission(criteria)
            }
        };

        let client = Arc::new(LmsClient::new(&config)?);

        Ok(Self {
            config,
            options,
            plan,
            client,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<BatchResult> {
        let course_id = self.config.require_course_id()?;

        let result = match &self.plan {
            GradingPlan::Discussion(criteria) => {
                self.grade_discussion(course_id, criteria.clone()).await?
            }
            GradingPlan::Submission(criteria) => {
                self.grade_submissions(course_id, criteria.clone()).await?
            }
        };

        print_final_stats(&result, &self.config.output_log_file);
        // 成绩已写回，报告写不出来只告警
        if let Err(e) = self.write_report(&result).await {
            warn!("⚠️ 评分报告未保存: {:#}", e);
        }

        Ok(result)
    }

    fn fetcher(&self) -> PaginatedFetcher {
        PaginatedFetcher::new(self.client.clone(), self.config.page_size)
            .with_reply_concurrency(self.config.reply_concurrency)
    }

    /// 讨论参与度评分
    async fn grade_discussion(&self, course_id: u64, criteria: Criteria) -> Result<BatchResult> {
        let topic_id = self.config.require_topic_id()?;
        let fetcher = self.fetcher();

        let assignment_id = match self.config.assignment_id {
            Some(id) => id,
            None => {
                info!("📎 未配置 ASSIGNMENT_ID，从讨论主题 {} 读取", topic_id);
                let topic = fetcher
                    .fetch_topic(course_id, topic_id)
                    .await
                    .context("获取讨论主题失败")?;
                topic.assignment_id.ok_or_else(|| {
                    anyhow!("讨论主题 {} 没有关联评分作业，请设置 ASSIGNMENT_ID", topic_id)
                })?
            }
        };

        info!("\n📥 正在拉取讨论区帖子...");
        let entries = fetcher
            .fetch_discussion_entries(course_id, topic_id)
            .await
            .context("拉取讨论区帖子失败")?;

        let (mut records, stats) = reconstruct_with_stats(&entries);
        info!(
            "✓ 重建完成: {} 名学生 | 首帖 {} | 回复 {}",
            records.len(),
            stats.top_level,
            stats.replies
        );
        if stats.orphan_replies > 0 || stats.duplicate_entries > 0 {
            warn!(
                "⚠️ 孤立回复 {} 条，重复帖子 {} 条，均未计分",
                stats.orphan_replies, stats.duplicate_entries
            );
        }

        if self.config.include_non_participants {
            let roster = fetcher
                .fetch_student_ids(course_id)
                .await
                .context("拉取学生名单失败")?;
            let added = pad_with_roster(&mut records, &roster);
            info!("👥 名单补齐: 新增 {} 名未发帖学生", added);
        }

        let items: Vec<ParticipationRecord> = records.into_values().collect();
        let writer = LmsGradeWriter::new(self.client.clone(), course_id, assignment_id);

        Ok(BatchExecutor::new(self.options.clone())
            .run(
                items,
                Arc::new(DiscussionScorer::new(criteria)),
                Arc::new(writer),
            )
            .await)
    }

    /// 作业完成度评分
    async fn grade_submissions(
        &self,
        course_id: u64,
        criteria: SubmissionCriteria,
    ) -> Result<BatchResult> {
        let assignment_id = self.config.require_assignment_id()?;

        info!("\n📥 正在拉取作业提交...");
        let submissions = self
            .fetcher()
            .fetch_submissions(course_id, assignment_id)
            .await
            .context("拉取作业提交失败")?;

        let writer = LmsGradeWriter::new(self.client.clone(), course_id, assignment_id);

        Ok(BatchExecutor::new(self.options.clone())
            .run(
                submissions,
                Arc::new(SubmissionScorer::new(criteria, self.config.regrade)),
                Arc::new(writer),
            )
            .await)
    }

    /// 写出 JSON 报告
    async fn write_report(&self, result: &BatchResult) -> Result<()> {
        let path = &self.config.output_report_file;
        let json = serde_json::to_string_pretty(result).context("序列化评分报告失败")?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| AppError::file_write_failed(path.as_str(), e))?;
        info!("📄 评分报告已保存至: {}", path);
        Ok(())
    }
}
