//! 评分标准校验 - 业务能力层
//!
//! 把会悄悄产生错误分数的配置挡在计算之前。校验失败时整批不执行、不写回。

use crate::error::CriteriaError;
use crate::models::criteria::{
    Criteria, CriteriaConfig, LatePenalty, LatePenaltyConfig, SubmissionCriteria,
    SubmissionCriteriaConfig,
};

/// 校验讨论评分标准
///
/// 拒绝以下配置：
/// - 必填字段缺失（不会默认为 0）
/// - 任意分值为负或不是有限数
/// - 互评次数超出 u32 范围
/// - 要求互评次数 > 0 但每次互评 0 分
/// - 互评总分上限低于单次互评分值
/// - 迟交扣分比例不在 [0, 1]
pub fn validate(config: &CriteriaConfig) -> Result<Criteria, CriteriaError> {
    let initial_post_points = require_points("initial_post_points", config.initial_post_points)?;
    let peer_review_points_each =
        require_points("peer_review_points_each", config.peer_review_points_each)?;

    let required = config
        .required_peer_reviews
        .ok_or_else(|| missing("required_peer_reviews"))?;
    if required < 0 {
        return Err(CriteriaError::NegativeValue {
            field: "required_peer_reviews".to_string(),
            value: required as f64,
        });
    }
    let required_peer_reviews =
        u32::try_from(required).map_err(|_| CriteriaError::ValueTooLarge {
            field: "required_peer_reviews".to_string(),
            value: required,
            max: u64::from(u32::MAX),
        })?;

    let max_peer_review_points = config
        .max_peer_review_points
        .map(|cap| check_points("max_peer_review_points", cap))
        .transpose()?;

    if peer_review_points_each == 0.0 && required_peer_reviews > 0 {
        return Err(CriteriaError::ZeroPeerReviewPoints {
            required: required_peer_reviews,
        });
    }

    if let Some(cap) = max_peer_review_points {
        if cap < peer_review_points_each {
            return Err(CriteriaError::CapBelowPerReview {
                cap,
                each: peer_review_points_each,
            });
        }
    }

    let late_penalty = validate_late_penalty(config.late_penalty.as_ref())?;

    Ok(Criteria {
        initial_post_points,
        peer_review_points_each,
        required_peer_reviews,
        max_peer_review_points,
        late_penalty,
    })
}

/// 校验作业评分标准
pub fn validate_submission(
    config: &SubmissionCriteriaConfig,
) -> Result<SubmissionCriteria, CriteriaError> {
    let points_possible = require_points("points_possible", config.points_possible)?;
    let late_penalty = validate_late_penalty(config.late_penalty.as_ref())?;

    Ok(SubmissionCriteria {
        points_possible,
        require_attachment: config.require_attachment.unwrap_or(false),
        late_penalty,
    })
}

fn validate_late_penalty(
    config: Option<&LatePenaltyConfig>,
) -> Result<Option<LatePenalty>, CriteriaError> {
    let Some(config) = config else {
        return Ok(None);
    };

    let deadline = config
        .deadline
        .ok_or_else(|| missing("late_penalty.deadline"))?;
    let penalty_percent = config
        .penalty_percent
        .ok_or_else(|| missing("late_penalty.penalty_percent"))?;

    if !penalty_percent.is_finite() || !(0.0..=1.0).contains(&penalty_percent) {
        return Err(CriteriaError::PenaltyOutOfRange {
            percent: penalty_percent,
        });
    }

    Ok(Some(LatePenalty {
        deadline,
        penalty_percent,
    }))
}

fn require_points(field: &str, value: Option<f64>) -> Result<f64, CriteriaError> {
    let value = value.ok_or_else(|| missing(field))?;
    check_points(field, value)
}

fn check_points(field: &str, value: f64) -> Result<f64, CriteriaError> {
    if !value.is_finite() {
        return Err(CriteriaError::NonFinite {
            field: field.to_string(),
        });
    }
    if value < 0.0 {
        return Err(CriteriaError::NegativeValue {
            field: field.to_string(),
            value,
        });
    }
    Ok(value)
}

fn missing(field: &str) -> CriteriaError {
    CriteriaError::MissingField {
        field: field.to_string(),
    }
}
