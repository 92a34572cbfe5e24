//! 讨论串重建 - 业务能力层
//!
//! 输入是扁平的帖子列表（每条只知道自己的 parent_id），输出是按学生归并的参与记录。
//!
//! ## 规则
//!
//! - 首帖：该学生最早的顶层帖（时间相同取 ID 较小者），与返回顺序无关
//! - 互评：回复沿父链找到顶层祖先，祖先作者即被互评的同学
//! - 回复自己的首帖不算互评
//! - 对同一位同学的多次回复只算一次
//! - 找不到顶层祖先（父帖缺失、作者已删除、父链成环）的回复视为孤儿，跳过

use crate::models::entry::{DiscussionEntry, UserId};
use crate::models::participation::ParticipationRecord;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// id → 帖子 的只读索引，建一次，之后只查询
pub struct ThreadIndex<'a> {
    by_id: HashMap<u64, &'a DiscussionEntry>,
}

impl<'a> ThreadIndex<'a> {
    pub fn build(entries: &'a [DiscussionEntry]) -> Self {
        let mut by_id = HashMap::with_capacity(entries.len());
        for entry in entries {
            by_id.entry(entry.id).or_insert(entry);
        }
        Self { by_id }
    }

    pub fn get(&self, id: u64) -> Option<&'a DiscussionEntry> {
        self.by_id.get(&id).copied()
    }

    /// 沿父链迭代查找顶层祖先；父链断裂或成环时返回 None
    pub fn root_of(&self, entry: &DiscussionEntry) -> Option<&'a DiscussionEntry> {
        let mut current = entry.parent_id?;

        // 步数上限为索引大小，超过即说明成环
        for _ in 0..=self.by_id.len() {
            let parent = self.get(current)?;
            match parent.parent_id {
                None => return Some(parent),
                Some(next) => current = next,
            }
        }

        None
    }
}

/// 重建统计（仅用于日志）
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconstructStats {
    pub top_level: usize,
    pub replies: usize,
    pub orphan_replies: usize,
    pub self_replies: usize,
    pub duplicate_entries: usize,
}

/// 从扁平帖子列表重建每个学生的参与记录
pub fn reconstruct(entries: &[DiscussionEntry]) -> BTreeMap<UserId, ParticipationRecord> {
    reconstruct_with_stats(entries).0
}

/// 同 [`reconstruct`]，额外返回统计信息
pub fn reconstruct_with_stats(
    entries: &[DiscussionEntry],
) -> (BTreeMap<UserId, ParticipationRecord>, ReconstructStats) {
    let index = ThreadIndex::build(entries);
    let mut stats = ReconstructStats::default();
    let mut records: BTreeMap<UserId, ParticipationRecord> = BTreeMap::new();

    // 一次遍历：去重、计数、分出首帖和回复
    let mut seen = HashSet::with_capacity(entries.len());
    let mut top_level = Vec::new();
    let mut replies = Vec::new();

    for entry in entries {
        if !seen.insert(entry.id) {
            stats.duplicate_entries += 1;
            continue;
        }

        if let Some(author) = entry.author() {
            records
                .entry(author)
                .or_insert_with(|| ParticipationRecord::new(author))
                .total_posts += 1;
        }

        if entry.is_top_level() {
            top_level.push(entry);
        } else {
            replies.push(entry);
        }
    }

    stats.top_level = top_level.len();
    stats.replies = replies.len();

    for post in top_level {
        let Some(author) = post.author() else {
            continue;
        };
        let Some(record) = records.get_mut(&author) else {
            continue;
        };

        let is_earlier = match (record.initial_post_at, record.initial_post_id) {
            (Some(at), Some(id)) => (post.created_at, post.id) < (at, id),
            _ => true,
        };
        if is_earlier {
            record.initial_post_at = Some(post.created_at);
            record.initial_post_id = Some(post.id);
        }
    }

    for reply in replies {
        let Some(author) = reply.author() else {
            continue;
        };

        match index.root_of(reply).and_then(|root| root.author()) {
            None => {
                debug!("孤儿回复 #{}（作者 {}），跳过", reply.id, author);
                stats.orphan_replies += 1;
            }
            Some(root_owner) if root_owner == author => {
                stats.self_replies += 1;
            }
            Some(root_owner) => {
                if let Some(record) = records.get_mut(&author) {
                    record.reviewed_peers.insert(root_owner);
                }
            }
        }
    }

    debug!("讨论串重建完成: {:?}", stats);
    (records, stats)
}

/// 为名单中没有任何发帖的学生补一条空记录
///
/// # 返回
/// 新增的记录数
pub fn pad_with_roster(
    records: &mut BTreeMap<UserId, ParticipationRecord>,
    roster: &[UserId],
) -> usize {
    let mut added = 0;
    for &student in roster {
        if !records.contains_key(&student) {
            records.insert(student, ParticipationRecord::new(student));
            added += 1;
        }
    }
    added
}
