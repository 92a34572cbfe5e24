use crate::error::{AppError, AppResult, ConfigError};
use std::str::FromStr;
use std::time::Duration;

/// 评分模式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GradingMode {
    /// 讨论区参与度评分
    Discussion,
    /// 作业提交评分
    Submission,
}

impl GradingMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "discussion" | "discussions" => Some(GradingMode::Discussion),
            "submission" | "submissions" | "assignment" => Some(GradingMode::Submission),
            _ => None,
        }
    }
}

impl std::fmt::Display for GradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradingMode::Discussion => write!(f, "讨论参与度"),
            GradingMode::Submission => write!(f, "作业提交"),
        }
    }
}

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- LMS API 配置 ---
    pub lms_api_base_url: String,
    pub lms_api_token: String,
    pub course_id: Option<u64>,
    pub assignment_id: Option<u64>,
    pub topic_id: Option<u64>,
    pub grading_mode: GradingMode,
    /// 评分标准 TOML 文件
    pub criteria_file: String,
    // --- 批量执行配置 ---
    /// 每批同时处理的条目数量
    pub max_concurrent: usize,
    /// 批次之间的等待时间（毫秒）
    pub rate_limit_delay_ms: u64,
    /// 只计算分数，不写回
    pub dry_run: bool,
    pub page_size: u32,
    pub request_timeout_secs: u64,
    /// 单个条目（评分 + 写回）的超时时间
    pub item_timeout_secs: u64,
    /// 遇到 429 时的最大重试次数
    pub max_retries: usize,
    /// 结果中保留的详细样本数量
    pub sample_limit: usize,
    /// 拉取讨论回复时的并发数
    pub reply_concurrency: usize,
    /// 讨论模式下是否为未发帖的学生也打分
    pub include_non_participants: bool,
    /// 作业模式下是否覆盖已有成绩
    pub regrade: bool,
    // --- 输出 ---
    pub output_report_file: String,
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lms_api_base_url: "http://localhost:3000".to_string(),
            lms_api_token: String::new(),
            course_id: None,
            assignment_id: None,
            topic_id: None,
            grading_mode: GradingMode::Discussion,
            criteria_file: "criteria.toml".to_string(),
            max_concurrent: 5,
            rate_limit_delay_ms: 1000,
            dry_run: false,
            page_size: 100,
            request_timeout_secs: 30,
            item_timeout_secs: 60,
            max_retries: 3,
            sample_limit: 10,
            reply_concurrency: 4,
            include_non_participants: false,
            regrade: false,
            output_report_file: "grading_report.json".to_string(),
            output_log_file: "grading.log".to_string(),
        }
    }
}

impl Config {
    /// 从环境变量读取配置
    ///
    /// 未设置的变量取默认值；已设置但无法解析的变量直接报错，不会退回默认值。
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 从任意键值来源读取配置
    ///
    /// # 参数
    /// - `lookup`: 按变量名返回原始字符串，未设置时返回 `None`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let default = Self::default();
        let env = EnvReader { lookup: &lookup };

        Ok(Self {
            lms_api_base_url: env.string("LMS_API_BASE_URL", default.lms_api_base_url),
            lms_api_token: env.string("LMS_API_TOKEN", default.lms_api_token),
            course_id: env.optional("COURSE_ID", "u64")?,
            assignment_id: env.optional("ASSIGNMENT_ID", "u64")?,
            topic_id: env.optional("TOPIC_ID", "u64")?,
            grading_mode: match lookup("GRADING_MODE") {
                Some(value) => GradingMode::parse(&value)
                    .ok_or_else(|| parse_failed("GRADING_MODE", &value, "discussion | submission"))?,
                None => default.grading_mode,
            },
            criteria_file: env.string("CRITERIA_FILE", default.criteria_file),
            max_concurrent: env.parse("MAX_CONCURRENT", default.max_concurrent, "正整数")?,
            rate_limit_delay_ms: env.parse("RATE_LIMIT_DELAY_MS", default.rate_limit_delay_ms, "u64")?,
            dry_run: env.flag("DRY_RUN", default.dry_run)?,
            page_size: env.parse("PAGE_SIZE", default.page_size, "u32")?,
            request_timeout_secs: env.parse("REQUEST_TIMEOUT_SECS", default.request_timeout_secs, "u64")?,
            item_timeout_secs: env.parse("ITEM_TIMEOUT_SECS", default.item_timeout_secs, "u64")?,
            max_retries: env.parse("MAX_RETRIES", default.max_retries, "usize")?,
            sample_limit: env.parse("SAMPLE_LIMIT", default.sample_limit, "usize")?,
            reply_concurrency: env.parse("REPLY_CONCURRENCY", default.reply_concurrency, "正整数")?,
            include_non_participants: env.flag("INCLUDE_NON_PARTICIPANTS", default.include_non_participants)?,
            regrade: env.flag("REGRADE", default.regrade)?,
            output_report_file: env.string("OUTPUT_REPORT_FILE", default.output_report_file),
            output_log_file: env.string("OUTPUT_LOG_FILE", default.output_log_file),
        })
    }

    /// 课程 ID（必填）
    pub fn require_course_id(&self) -> AppResult<u64> {
        self.course_id.ok_or_else(|| {
            ConfigError::EnvVarNotFound {
                var_name: "COURSE_ID".to_string(),
            }
            .into()
        })
    }

    /// 作业 ID（作业模式必填；讨论模式可由讨论主题推导）
    pub fn require_assignment_id(&self) -> AppResult<u64> {
        self.assignment_id.ok_or_else(|| {
            ConfigError::EnvVarNotFound {
                var_name: "ASSIGNMENT_ID".to_string(),
            }
            .into()
        })
    }

    /// 讨论主题 ID（讨论模式必填）
    pub fn require_topic_id(&self) -> AppResult<u64> {
        self.topic_id.ok_or_else(|| {
            ConfigError::EnvVarNotFound {
                var_name: "TOPIC_ID".to_string(),
            }
            .into()
        })
    }

    /// 生成批量执行参数
    pub fn run_options(&self) -> AppResult<RunOptions> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_CONCURRENT".to_string(),
                reason: "必须为正整数".to_string(),
            }
            .into());
        }
        if self.reply_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                name: "REPLY_CONCURRENCY".to_string(),
                reason: "必须为正整数".to_string(),
            }
            .into());
        }

        Ok(RunOptions {
            max_concurrent: self.max_concurrent,
            rate_limit_delay: Duration::from_millis(self.rate_limit_delay_ms),
            dry_run: self.dry_run,
            item_timeout: Duration::from_secs(self.item_timeout_secs),
            sample_limit: self.sample_limit,
        })
    }
}

/// 批量执行参数
#[derive(Clone, Debug)]
pub struct RunOptions {
    /// 每批的条目数（即批内最大并发数）
    pub max_concurrent: usize,
    /// 相邻两批之间的等待时间
    pub rate_limit_delay: Duration,
    /// 是否跳过写回
    pub dry_run: bool,
    /// 单个条目的超时时间
    pub item_timeout: Duration,
    /// 样本结果上限
    pub sample_limit: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            rate_limit_delay: Duration::from_millis(1000),
            dry_run: false,
            item_timeout: Duration::from_secs(60),
            sample_limit: 10,
        }
    }
}

// ========== 环境变量解析 ==========

struct EnvReader<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<'_, F> {
    fn string(&self, name: &str, default: String) -> String {
        (self.lookup)(name).unwrap_or(default)
    }

    fn parse<T: FromStr>(&self, name: &str, default: T, expected_type: &str) -> AppResult<T> {
        match (self.lookup)(name) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| parse_failed(name, &value, expected_type)),
            None => Ok(default),
        }
    }

    fn optional<T: FromStr>(&self, name: &str, expected_type: &str) -> AppResult<Option<T>> {
        match (self.lookup)(name) {
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| parse_failed(name, &value, expected_type)),
            None => Ok(None),
        }
    }

    fn flag(&self, name: &str, default: bool) -> AppResult<bool> {
        match (self.lookup)(name) {
            Some(value) => {
                parse_bool(&value).ok_or_else(|| parse_failed(name, &value, "bool (true/false/1/0/yes/no)"))
            }
            None => Ok(default),
        }
    }
}

/// 布尔值：大小写不敏感地接受 true/false、1/0、yes/no、on/off
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_failed(name: &str, value: &str, expected_type: &str) -> AppError {
    ConfigError::EnvVarParseFailed {
        var_name: name.to_string(),
        value: value.to_string(),
        expected_type: expected_type.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_grading_mode_parse() {
        assert_eq!(GradingMode::parse("Discussion"), Some(GradingMode::Discussion));
        assert_eq!(GradingMode::parse(" submissions "), Some(GradingMode::Submission));
        assert_eq!(GradingMode::parse("quiz"), None);
    }

    #[test]
    fn test_run_options_rejects_zero_concurrency() {
        let config = Config {
            max_concurrent: 0,
            ..Default::default()
        };
        assert!(config.run_options().is_err());
    }

    #[test]
    fn test_required_ids() {
        let config = Config {
            course_id: Some(7),
            ..Default::default()
        };
        assert_eq!(config.require_course_id().unwrap(), 7);
        let err = config.require_topic_id().unwrap_err();
        assert!(err.to_string().contains("TOPIC_ID"));
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.max_concurrent, 5);
        assert!(!config.dry_run);
        assert_eq!(config.reply_concurrency, 4);
        assert_eq!(config.course_id, None);
    }

    #[test]
    fn test_dry_run_accepts_common_spellings() {
        for value in ["1", "TRUE", "yes", "True", " on "] {
            let config = Config::from_lookup(lookup_from(&[("DRY_RUN", value)])).unwrap();
            assert!(config.dry_run, "DRY_RUN={:?}", value);
        }
        for value in ["0", "False", "NO"] {
            let config = Config::from_lookup(lookup_from(&[("DRY_RUN", value)])).unwrap();
            assert!(!config.dry_run, "DRY_RUN={:?}", value);
        }
    }

    #[test]
    fn test_unparseable_dry_run_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[("DRY_RUN", "maybe")])).unwrap_err();
        assert!(matches!(
            err,
            AppError::Config(ConfigError::EnvVarParseFailed { ref var_name, .. }) if var_name == "DRY_RUN"
        ));
    }

    #[test]
    fn test_garbage_max_concurrent_is_an_error() {
        for value in ["-3", "abc", "2.5"] {
            let err = Config::from_lookup(lookup_from(&[("MAX_CONCURRENT", value)])).unwrap_err();
            assert!(matches!(
                err,
                AppError::Config(ConfigError::EnvVarParseFailed { ref var_name, .. })
                    if var_name == "MAX_CONCURRENT"
            ));
        }

        let config = Config::from_lookup(lookup_from(&[("MAX_CONCURRENT", "0")])).unwrap();
        assert!(config.run_options().is_err());
    }

    #[test]
    fn test_unknown_grading_mode_and_bad_ids_fail() {
        assert!(Config::from_lookup(lookup_from(&[("GRADING_MODE", "quiz")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("COURSE_ID", "abc")])).is_err());

        let config = Config::from_lookup(lookup_from(&[
            ("COURSE_ID", "12"),
            ("GRADING_MODE", "submission"),
        ]))
        .unwrap();
        assert_eq!(config.course_id, Some(12));
        assert_eq!(config.grading_mode, GradingMode::Submission);
    }
}
