//! 分数计算 - 业务能力层
//!
//! 纯函数：同样的 (记录, 标准) 永远得到同样的结果，不做 I/O。

use crate::models::criteria::{Criteria, LatePenalty, SubmissionCriteria};
use crate::models::entry::Submission;
use crate::models::outcome::{format_score, GradeOutcome, ScoreBreakdown};
use crate::models::participation::ParticipationRecord;
use chrono::{DateTime, Utc};

/// 计算讨论参与分
///
/// - 首帖分：有首帖得满分，否则 0
/// - 互评分：`min(互评人数, 上限/单次分值) * 单次分值`，再受总分上限约束
/// - 迟交扣分：首帖晚于截止时间时扣 `(首帖分 + 互评分) * 比例`
/// - 最终分数不低于 0
pub fn score(record: &ParticipationRecord, criteria: &Criteria) -> GradeOutcome {
    let mut notes = Vec::new();

    let base_points = if record.has_initial_post() {
        notes.push(format!("首帖: +{}", format_score(criteria.initial_post_points)));
        criteria.initial_post_points
    } else {
        notes.push("未发布首帖: +0".to_string());
        0.0
    };

    let peer_count = record.peer_review_count();
    let peer_review_points = peer_review_points(peer_count, criteria);
    notes.push(format!(
        "互评 {} 位同学: +{}",
        peer_count,
        format_score(peer_review_points)
    ));
    if let Some(cap) = criteria.max_peer_review_points {
        if (peer_count as f64) * criteria.peer_review_points_each > cap {
            notes.push(format!("互评分已达上限 {}", format_score(cap)));
        }
    }

    let met_requirement = peer_count as u64 >= u64::from(criteria.required_peer_reviews);
    if !met_requirement {
        notes.push(format!(
            "互评次数不足: {}/{}",
            peer_count, criteria.required_peer_reviews
        ));
    }

    let subtotal = base_points + peer_review_points;
    let penalty = late_penalty(
        subtotal,
        record.initial_post_at,
        criteria.late_penalty.as_ref(),
        "首帖",
        &mut notes,
    );

    let breakdown = finalize(base_points, peer_review_points, penalty, &mut notes);

    GradeOutcome {
        owner_id: record.owner_id,
        score: breakdown.final_score,
        breakdown,
        notes,
        has_initial_post: Some(record.has_initial_post()),
        met_peer_review_requirement: Some(met_requirement),
        rubric_assessment: None,
    }
}

/// 计算作业完成分
///
/// 已提交得满分；要求附件但没有附件时得 0；提交时间晚于截止时间按比例扣分。
/// 是否跳过（未提交、已有成绩）由调用方决定。
pub fn score_submission(submission: &Submission, criteria: &SubmissionCriteria) -> GradeOutcome {
    let mut notes = Vec::new();

    let base_points = if criteria.require_attachment && submission.attachments.is_empty() {
        notes.push("缺少附件: +0".to_string());
        0.0
    } else {
        notes.push(format!("已提交: +{}", format_score(criteria.points_possible)));
        criteria.points_possible
    };

    let penalty = late_penalty(
        base_points,
        submission.submitted_at,
        criteria.late_penalty.as_ref(),
        "提交",
        &mut notes,
    );

    let breakdown = finalize(base_points, 0.0, penalty, &mut notes);

    GradeOutcome {
        owner_id: submission.user_id,
        score: breakdown.final_score,
        breakdown,
        notes,
        has_initial_post: None,
        met_peer_review_requirement: None,
        rubric_assessment: None,
    }
}

fn peer_review_points(peer_count: usize, criteria: &Criteria) -> f64 {
    let each = criteria.peer_review_points_each;
    if each <= 0.0 {
        return 0.0;
    }

    let count = peer_count as f64;
    match criteria.max_peer_review_points {
        Some(cap) => (count.min(cap / each) * each).min(cap),
        None => count * each,
    }
}

fn late_penalty(
    subtotal: f64,
    at: Option<DateTime<Utc>>,
    rule: Option<&LatePenalty>,
    label: &str,
    notes: &mut Vec<String>,
) -> f64 {
    match (rule, at) {
        (Some(rule), Some(at)) if rule.is_late(at) => {
            let penalty = subtotal * rule.penalty_percent;
            notes.push(format!(
                "{}晚于截止时间 {}: -{} ({}%)",
                label,
                rule.deadline.format("%Y-%m-%d %H:%M"),
                format_score(penalty),
                format_score(rule.penalty_percent * 100.0)
            ));
            penalty
        }
        _ => 0.0,
    }
}

fn finalize(
    base_points: f64,
    peer_review_points: f64,
    penalty: f64,
    notes: &mut Vec<String>,
) -> ScoreBreakdown {
    let raw = (base_points + peer_review_points - penalty).max(0.0);
    let final_score = (raw * 100.0).round() / 100.0;
    notes.push(format!("总分: {}", format_score(final_score)));

    ScoreBreakdown {
        base_points,
        peer_review_points,
        penalty,
        final_score,
    }
}
