//! 条目处理上下文
//!
//! 封装"我正在处理第几批的第几个学生"这一信息

use crate::models::entry::UserId;
use std::fmt::Display;

/// 条目处理上下文
///
/// 只用于日志定位，不参与评分
#[derive(Debug, Clone, Copy)]
pub struct ItemCtx {
    /// 批次号（从1开始）
    pub batch_num: usize,

    /// 条目在整批中的序号（从1开始）
    pub item_index: usize,

    /// 条目总数
    pub total: usize,

    /// 学生ID
    pub owner_id: UserId,
}

impl ItemCtx {
    pub fn new(batch_num: usize, item_index: usize, total: usize, owner_id: UserId) -> Self {
        Self {
            batch_num,
            item_index,
            total,
            owner_id,
        }
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[批次 {} | {}/{} | 学生 {}]",
            self.batch_num, self.item_index, self.total, self.owner_id
        )
    }
}
