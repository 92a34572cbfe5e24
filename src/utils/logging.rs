use anyhow::{Context, Result};
/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use std::fs;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::batch_result::BatchResult;
use crate::models::outcome::format_score;

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
///
/// # 返回
/// 写入文件头失败时返回错误
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n批量评分日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法初始化日志文件: {}", log_file_path))?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量评分模式: {}", config.grading_mode);
    info!("📊 最大并发数: {}", config.max_concurrent);
    info!("⏱️ 批次间隔: {}ms", config.rate_limit_delay_ms);
    if config.dry_run {
        info!("🧪 DRY RUN: 只计算不写回");
    }
    info!("{}", "=".repeat(60));
}

/// 记录条目加载信息
///
/// # 参数
/// - `total`: 条目总数
/// - `max_concurrent`: 最大并发数
pub fn log_items_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 共 {} 个待评分条目", total);
    info!("📋 将以每批 {} 个的方式处理", max_concurrent);
    info!("💡 每批完成后再开始下一批\n");
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `total_batches`: 批次总数
/// - `start`: 起始条目编号
/// - `end`: 结束条目编号
/// - `total`: 条目总数
pub fn log_batch_start(
    batch_num: usize,
    total_batches: usize,
    start: usize,
    end: usize,
    total: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批条目: {}-{} / 共 {} 个", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, graded: usize, skipped: usize, failed: usize) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 第 {} 批完成: 评分 {} | 跳过 {} | 失败 {}",
        batch_num, graded, skipped, failed
    );
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `result`: 整批汇总结果
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(result: &BatchResult, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已评分: {}/{}", result.graded, result.total);
    info!("⏭️ 跳过: {}", result.skipped);
    info!("❌ 失败: {}", result.failed);
    info!("📈 平均分: {}", format_score(result.average_score));
    info!(
        "📝 首帖: 有 {} / 无 {} | 互评达标: {} / 未达标 {} | 迟交: {}",
        result.summary.with_initial_post,
        result.summary.without_initial_post,
        result.summary.peer_review_met,
        result.summary.peer_review_unmet,
        result.summary.late_count
    );
    if result.dry_run {
        info!("🧪 DRY RUN: 未写回任何成绩");
    }
    for failure in &result.failed_results {
        warn!(
            "[学生 {}] ❌ {}",
            failure.owner_id,
            truncate_text(&failure.error, 120)
        );
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
