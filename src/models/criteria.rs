//! 评分标准
//!
//! `*Config` 是从文件读出的原始配置，所有字段都可能缺失；
//! `Criteria` / `SubmissionCriteria` 只能由 `services::criteria_validator` 构造，
//! 因此计算器拿到的一定是校验过的标准。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 迟交扣分规则（原始配置）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatePenaltyConfig {
    pub deadline: Option<DateTime<Utc>>,
    #[serde(alias = "penaltyPercent")]
    pub penalty_percent: Option<f64>,
}

/// 讨论评分标准（原始配置）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CriteriaConfig {
    #[serde(alias = "initialPostPoints")]
    pub initial_post_points: Option<f64>,
    #[serde(alias = "peerReviewPointsEach")]
    pub peer_review_points_each: Option<f64>,
    #[serde(alias = "requiredPeerReviews")]
    pub required_peer_reviews: Option<i64>,
    #[serde(alias = "maxPeerReviewPoints")]
    pub max_peer_review_points: Option<f64>,
    #[serde(alias = "latePenalty")]
    pub late_penalty: Option<LatePenaltyConfig>,
}

/// 作业评分标准（原始配置）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionCriteriaConfig {
    #[serde(alias = "pointsPossible")]
    pub points_possible: Option<f64>,
    #[serde(alias = "requireAttachment")]
    pub require_attachment: Option<bool>,
    #[serde(alias = "latePenalty")]
    pub late_penalty: Option<LatePenaltyConfig>,
}

/// 迟交扣分规则
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatePenalty {
    pub deadline: DateTime<Utc>,
    /// 扣分比例，范围 [0, 1]
    pub penalty_percent: f64,
}

impl LatePenalty {
    pub fn is_late(&self, at: DateTime<Utc>) -> bool {
        at > self.deadline
    }
}

/// 已校验的讨论评分标准
#[derive(Debug, Clone, PartialEq)]
pub struct Criteria {
    pub(crate) initial_post_points: f64,
    pub(crate) peer_review_points_each: f64,
    pub(crate) required_peer_reviews: u32,
    pub(crate) max_peer_review_points: Option<f64>,
    pub(crate) late_penalty: Option<LatePenalty>,
}

impl Criteria {
    pub fn initial_post_points(&self) -> f64 {
        self.initial_post_points
    }

    pub fn peer_review_points_each(&self) -> f64 {
        self.peer_review_points_each
    }

    pub fn required_peer_reviews(&self) -> u32 {
        self.required_peer_reviews
    }

    pub fn max_peer_review_points(&self) -> Option<f64> {
        self.max_peer_review_points
    }

    pub fn late_penalty(&self) -> Option<&LatePenalty> {
        self.late_penalty.as_ref()
    }
}

/// 已校验的作业评分标准
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionCriteria {
    pub(crate) points_possible: f64,
    pub(crate) require_attachment: bool,
    pub(crate) late_penalty: Option<LatePenalty>,
}

impl SubmissionCriteria {
    pub fn points_possible(&self) -> f64 {
        self.points_possible
    }

    pub fn require_attachment(&self) -> bool {
        self.require_attachment
    }

    pub fn late_penalty(&self) -> Option<&LatePenalty> {
        self.late_penalty.as_ref()
    }
}
