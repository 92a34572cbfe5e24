use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// LMS 用户 ID
pub type UserId = u64;

/// 可被批量评分的条目：必须能说出"这条属于谁"
pub trait Gradable {
    fn owner_id(&self) -> UserId;
}

/// 讨论区中的一条帖子（首帖或回复）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscussionEntry {
    pub id: u64,
    /// 已删除的帖子没有作者
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// 为空表示首帖（top-level）
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted: bool,
}

impl DiscussionEntry {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }

    /// 有效作者（已删除的帖子不计入任何人）
    pub fn author(&self) -> Option<UserId> {
        if self.deleted {
            None
        } else {
            self.user_id
        }
    }
}

/// 作业附件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: u64,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "content-type")]
    pub content_type: Option<String>,
}

/// 一份作业提交
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub user_id: UserId,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub workflow_state: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub attachments: Vec<Attachment>,
    /// 已有分数
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub grade: Option<String>,
}

impl Submission {
    /// 是否真正提交过
    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some() && self.workflow_state.as_deref() != Some("unsubmitted")
    }

    /// 外部系统中是否已有成绩
    pub fn has_existing_grade(&self) -> bool {
        self.score.is_some() || self.grade.is_some()
    }
}

impl Gradable for Submission {
    fn owner_id(&self) -> UserId {
        self.user_id
    }
}

/// 讨论主题（只取写回成绩所需的字段）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscussionTopic {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub assignment_id: Option<u64>,
}

/// 课程成员
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseUser {
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
}

// LMS 对空数组有时返回 null
fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
