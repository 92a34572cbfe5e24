use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 评分标准错误
    #[error("评分标准错误: {0}")]
    Criteria(#[from] CriteriaError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 请求超时
    #[error("API请求超时: {endpoint}")]
    Timeout { endpoint: String },
    /// 请求频率限制
    #[error("API请求频率限制 ({endpoint}), 建议等待: {retry_after:?}秒")]
    RateLimited {
        endpoint: String,
        retry_after: Option<u64>,
    },
    /// 未认证（token 无效或缺失）
    #[error("API认证失败: {endpoint}")]
    Unauthorized { endpoint: String },
    /// 无权限
    #[error("API无权限访问: {endpoint}")]
    Forbidden { endpoint: String },
    /// 资源不存在
    #[error("API资源不存在: {endpoint}")]
    NotFound { endpoint: String },
    /// API 返回错误响应
    #[error("API返回错误响应 ({endpoint}): status={status}, message={message:?}")]
    BadResponse {
        endpoint: String,
        status: u16,
        message: Option<String>,
    },
    /// JSON 解析失败
    #[error("JSON解析失败 ({endpoint}): {source}")]
    JsonParseFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApiError {
    /// 是否为暂时性错误（限流、超时、服务端 5xx）
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Timeout { .. } | ApiError::RateLimited { .. } => true,
            ApiError::BadResponse { status, .. } => *status >= 500,
            ApiError::RequestFailed { .. } => true,
            _ => false,
        }
    }
}

/// 评分标准校验错误
#[derive(Debug, Error, PartialEq)]
pub enum CriteriaError {
    /// 评分标准文件中缺少对应模式的配置
    #[error("缺少评分标准配置: [{section}]")]
    MissingCriteria { section: String },
    /// 必填字段缺失
    #[error("必填字段缺失: {field}")]
    MissingField { field: String },
    /// 分值为负数
    #[error("字段 {field} 不能为负数 (当前值: {value})")]
    NegativeValue { field: String, value: f64 },
    /// 整数超出可表示范围
    #[error("字段 {field} 超出范围 (当前值: {value}, 上限: {max})")]
    ValueTooLarge { field: String, value: i64, max: u64 },
    /// 分值不是有限数
    #[error("字段 {field} 必须是有限数值")]
    NonFinite { field: String },
    /// 要求互评但互评分值为 0
    #[error("要求至少 {required} 次互评，但每次互评分值为 0")]
    ZeroPeerReviewPoints { required: u32 },
    /// 互评总分上限低于单次互评分值
    #[error("互评总分上限 {cap} 低于单次互评分值 {each}")]
    CapBelowPerReview { cap: f64, each: f64 },
    /// 迟交扣分比例越界
    #[error("迟交扣分比例 {percent} 超出范围 [0, 1]")]
    PenaltyOutOfRange { percent: f64 },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 环境变量不存在
    #[error("环境变量 {var_name} 不存在")]
    EnvVarNotFound { var_name: String },
    /// 配置值不合法
    #[error("配置项 {name} 不合法: {reason}")]
    InvalidValue { name: String, reason: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建API请求失败错误
    pub fn api_request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
