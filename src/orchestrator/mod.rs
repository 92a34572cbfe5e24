//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 加载并校验评分标准（失败则整批不执行）
//! - 按评分模式拉取数据、重建讨论参与记录
//! - 输出统计和 JSON 报告
//!
//! ### `batch_executor` - 批量执行器
//! - 按 `max_concurrent` 分批，批内并发
//! - 批次之间限速等待
//! - 单个条目失败不影响其他条目
//!
//! ### `result_aggregator` - 结果汇总器
//! - 把逐条结果折叠成 `BatchResult`
//!
//! ## 层次关系
//!
//! ```text
//! app (拉取 → 重建 → 执行 → 报告)
//!     ↓
//! batch_executor (处理 Vec<I>)
//!     ↓
//! workflow::GradingFlow (处理单个条目)
//!     ↓
//! services (能力层：fetch / score / write)
//!     ↓
//! clients (LmsClient)
//! ```

pub mod app;
pub mod batch_executor;
pub mod result_aggregator;

// 重新导出主要类型
pub use app::App;
pub use batch_executor::BatchExecutor;
pub use result_aggregator::ResultAggregator;
