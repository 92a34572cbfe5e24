use crate::error::{AppError, AppResult, CriteriaError, FileError};
use crate::models::criteria::{CriteriaConfig, SubmissionCriteriaConfig};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

/// 评分标准文件
///
/// ```toml
/// [discussion]
/// initial_post_points = 10
/// peer_review_points_each = 5
/// required_peer_reviews = 2
/// max_peer_review_points = 10
///
/// [discussion.late_penalty]
/// deadline = "2025-03-01T23:59:00Z"
/// penalty_percent = 0.1
///
/// [submission]
/// points_possible = 20
/// require_attachment = true
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CriteriaFile {
    pub discussion: Option<CriteriaConfig>,
    pub submission: Option<SubmissionCriteriaConfig>,
}

impl CriteriaFile {
    pub fn discussion(&self) -> AppResult<&CriteriaConfig> {
        self.discussion.as_ref().ok_or_else(|| {
            CriteriaError::MissingCriteria {
                section: "discussion".to_string(),
            }
            .into()
        })
    }

    pub fn submission(&self) -> AppResult<&SubmissionCriteriaConfig> {
        self.submission.as_ref().ok_or_else(|| {
            CriteriaError::MissingCriteria {
                section: "submission".to_string(),
            }
            .into()
        })
    }
}

/// 从 TOML 文件加载评分标准
pub async fn load_criteria_file(path: &Path) -> AppResult<CriteriaFile> {
    let display = path.display().to_string();

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(display.clone(), e))?;

    parse_criteria(&content).map_err(|source| {
        FileError::TomlParseFailed {
            path: display,
            source,
        }
        .into()
    })
}

/// 解析评分标准文本
pub fn parse_criteria(content: &str) -> Result<CriteriaFile, toml::de::Error> {
    toml::from_str(content)
}
