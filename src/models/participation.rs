use crate::models::entry::{Gradable, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// 单个学生在讨论区中的参与记录
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationRecord {
    pub owner_id: UserId,
    /// 最早首帖的 ID
    pub initial_post_id: Option<u64>,
    /// 最早首帖的时间
    pub initial_post_at: Option<DateTime<Utc>>,
    /// 回复过的同学（去重，不含自己）
    pub reviewed_peers: BTreeSet<UserId>,
    /// 发帖总数（首帖 + 回复）
    pub total_posts: usize,
}

impl ParticipationRecord {
    pub fn new(owner_id: UserId) -> Self {
        Self {
            owner_id,
            initial_post_id: None,
            initial_post_at: None,
            reviewed_peers: BTreeSet::new(),
            total_posts: 0,
        }
    }

    pub fn has_initial_post(&self) -> bool {
        self.initial_post_at.is_some()
    }

    pub fn peer_review_count(&self) -> usize {
        self.reviewed_peers.len()
    }
}

impl Gradable for ParticipationRecord {
    fn owner_id(&self) -> UserId {
        self.owner_id
    }
}
