pub mod grading_flow;
pub mod item_ctx;

pub use grading_flow::GradingFlow;
pub use item_ctx::ItemCtx;
