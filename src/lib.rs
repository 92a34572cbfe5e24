//! # Bulk Grader
//!
//! 批量评分工具：从 LMS 拉取讨论帖或作业提交，按评分标准计算分数并写回成绩
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 与 LMS REST API 通信，处理分页、限流重试和错误分类
//! - `LmsClient` - 唯一持有 HTTP 连接的模块
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `PaginatedFetcher` - 拉取提交、讨论帖、学生名单
//! - `thread_reconstructor` - 从扁平帖子重建每个学生的参与记录
//! - `criteria_validator` / `score_calculator` - 校验评分标准、计算分数
//! - `ItemScorer` / `GradeWriter` - 评分策略与写回能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个学生"的完整处理流程
//! - `ItemCtx` - 上下文封装（批次 + 序号 + 学生）
//! - `GradingFlow` - 流程编排（score → write → outcome，带超时）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_executor` - 分批并发执行、限速、dry run
//! - `orchestrator/result_aggregator` - 汇总结果
//! - `orchestrator/app` - 端到端运行
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod logger;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::LmsClient;
pub use config::{Config, GradingMode, RunOptions};
pub use error::{AppError, AppResult};
pub use models::{BatchResult, GradeOutcome, ItemOutcome};
pub use orchestrator::{App, BatchExecutor, ResultAggregator};
pub use services::{FnScorer, GradeWriter, ItemScorer};
pub use workflow::{GradingFlow, ItemCtx};
