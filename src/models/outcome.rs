use crate::models::entry::UserId;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// 分数明细
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    /// 首帖分（讨论模式）或提交完成分（作业模式）
    pub base_points: f64,
    pub peer_review_points: f64,
    /// 迟交扣分
    pub penalty: f64,
    pub final_score: f64,
}

/// 单个评分项的量规评分
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionAssessment {
    pub points: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

/// 单个学生的评分结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeOutcome {
    pub owner_id: UserId,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    /// 每一项得分/扣分的说明，写回时作为评语
    pub notes: Vec<String>,
    /// 是否有首帖；作业模式为 None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_initial_post: Option<bool>,
    /// 是否达到互评最低次数；作业模式为 None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub met_peer_review_requirement: Option<bool>,
    /// 按量规逐项写回时使用
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rubric_assessment: Option<BTreeMap<String, CriterionAssessment>>,
}

impl GradeOutcome {
    /// 只有分数和评语的简单结果（供自定义评分函数使用）
    pub fn simple(owner_id: UserId, score: f64, notes: Vec<String>) -> Self {
        Self {
            owner_id,
            score,
            breakdown: ScoreBreakdown {
                base_points: score,
                final_score: score,
                ..Default::default()
            },
            notes,
            has_initial_post: None,
            met_peer_review_requirement: None,
            rubric_assessment: None,
        }
    }

    pub fn with_rubric(mut self, rubric: BTreeMap<String, CriterionAssessment>) -> Self {
        self.rubric_assessment = Some(rubric);
        self
    }

    pub fn is_late(&self) -> bool {
        self.breakdown.penalty > 0.0
    }

    /// 生成写回载荷
    pub fn payload(&self) -> WritePayload {
        let comment = if self.notes.is_empty() {
            None
        } else {
            Some(self.notes.join("\n"))
        };

        match &self.rubric_assessment {
            Some(assessments) => WritePayload::Rubric {
                assessments: assessments.clone(),
                comment,
            },
            None => WritePayload::Grade {
                posted_grade: self.score,
                comment,
            },
        }
    }
}

/// 写回外部系统的载荷
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WritePayload {
    /// 数值成绩 + 评语
    Grade {
        posted_grade: f64,
        comment: Option<String>,
    },
    /// 按评分项的量规评分
    Rubric {
        assessments: BTreeMap<String, CriterionAssessment>,
        comment: Option<String>,
    },
}

impl WritePayload {
    /// 转换为 LMS 提交更新接口的请求体
    pub fn to_request_body(&self) -> Value {
        let (mut body, comment) = match self {
            WritePayload::Grade {
                posted_grade,
                comment,
            } => (
                json!({ "submission": { "posted_grade": format_score(*posted_grade) } }),
                comment,
            ),
            WritePayload::Rubric {
                assessments,
                comment,
            } => (json!({ "rubric_assessment": assessments }), comment),
        };

        if let Some(text) = comment {
            body["comment"] = json!({ "text_comment": text });
        }
        body
    }
}

/// 分数格式化：保留两位小数，整数不带小数点
pub fn format_score(score: f64) -> String {
    let rounded = (score * 100.0).round() / 100.0;
    format!("{}", rounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(15.0), "15");
        assert_eq!(format_score(7.5), "7.5");
        assert_eq!(format_score(2.0 / 3.0), "0.67");
    }

    #[test]
    fn test_grade_payload_body() {
        let outcome = GradeOutcome::simple(5, 12.5, vec!["首帖: +10".into(), "互评: +2.5".into()]);
        let body = outcome.payload().to_request_body();

        assert_eq!(body["submission"]["posted_grade"], "12.5");
        assert_eq!(body["comment"]["text_comment"], "首帖: +10\n互评: +2.5");
    }

    #[test]
    fn test_rubric_payload_body() {
        let mut rubric = BTreeMap::new();
        rubric.insert(
            "crit_1".to_string(),
            CriterionAssessment {
                points: 4.0,
                comments: Some("结构清晰".to_string()),
            },
        );
        let outcome = GradeOutcome::simple(5, 4.0, Vec::new()).with_rubric(rubric);
        let body = outcome.payload().to_request_body();

        assert_eq!(body["rubric_assessment"]["crit_1"]["points"], 4.0);
        assert_eq!(body["rubric_assessment"]["crit_1"]["comments"], "结构清晰");
        assert!(body.get("comment").is_none());
        assert!(body.get("submission").is_none());
    }
}
