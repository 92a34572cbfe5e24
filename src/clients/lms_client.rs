/// LMS API 客户端
///
/// 封装所有与 LMS REST API 相关的调用逻辑：认证、分页、限流重试、错误分类
use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::entry::UserId;
use crate::models::outcome::WritePayload;
use regex::Regex;
use reqwest::header::{HeaderMap, LINK, RETRY_AFTER};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// 服务端要求的等待时间上限
const MAX_RETRY_WAIT: Duration = Duration::from_secs(30);

/// LMS 客户端
pub struct LmsClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    max_retries: usize,
    retry_backoff: Duration,
}

impl LmsClient {
    /// 根据配置创建客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        Self::with_options(
            &config.lms_api_base_url,
            &config.lms_api_token,
            Duration::from_secs(config.request_timeout_secs),
            config.max_retries,
            Duration::from_secs(2),
        )
    }

    /// 创建自定义参数的客户端
    pub fn with_options(
        base_url: &str,
        token: &str,
        request_timeout: Duration,
        max_retries: usize,
        retry_backoff: Duration,
    ) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AppError::api_request_failed(base_url, e))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            max_retries,
            retry_backoff,
        })
    }

    /// 拼接完整 URL（分页链接已经是完整 URL，直接返回）
    pub fn endpoint_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// GET 单个 JSON 资源
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let url = self.endpoint_url(path);
        let response = self.send_with_retry(&url, || self.http.get(&url)).await?;
        Self::decode(&url, response).await
    }

    /// GET 分页集合，沿 `Link: rel="next"` 一直取到最后一页
    ///
    /// # 参数
    /// - `path`: 资源路径
    /// - `page_size`: 每页条数
    ///
    /// # 返回
    /// 按服务端顺序拼接的完整列表
    pub async fn get_paginated<T: DeserializeOwned>(
        &self,
        path: &str,
        page_size: u32,
    ) -> AppResult<Vec<T>> {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut next_url = Some(self.endpoint_url(&format!(
            "{}{}per_page={}",
            path, separator, page_size
        )));
        let mut items = Vec::new();
        let mut page = 0;

        while let Some(url) = next_url.take() {
            page += 1;
            debug!("获取第 {} 页: {}", page, url);

            let response = self.send_with_retry(&url, || self.http.get(&url)).await?;
            next_url = Self::next_page_url(response.headers()).map(|next| self.endpoint_url(&next));

            let mut page_items: Vec<T> = Self::decode(&url, response).await?;
            items.append(&mut page_items);
        }

        debug!("分页完成: {} 页, 共 {} 条", page, items.len());
        Ok(items)
    }

    /// 更新某个学生的作业成绩
    ///
    /// # 参数
    /// - `course_id`: 课程ID
    /// - `assignment_id`: 作业ID
    /// - `user_id`: 学生ID
    /// - `payload`: 成绩或量规评分
    pub async fn update_submission(
        &self,
        course_id: u64,
        assignment_id: u64,
        user_id: UserId,
        payload: &WritePayload,
    ) -> AppResult<()> {
        let url = self.endpoint_url(&format!(
            "/api/v1/courses/{}/assignments/{}/submissions/{}",
            course_id, assignment_id, user_id
        ));
        let body = payload.to_request_body();

        debug!("写回成绩 Payload: {}", body);

        self.send_with_retry(&url, || self.http.put(&url).json(&body))
            .await?;

        Ok(())
    }

    /// 发送请求；429 时按 Retry-After 等待并重试
    async fn send_with_retry<F>(&self, endpoint: &str, build: F) -> AppResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;

        loop {
            let response = build()
                .bearer_auth(&self.token)
                .send()
                .await
                .map_err(|e| Self::map_transport_error(endpoint, e))?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = Self::retry_after_secs(response.headers());
                if attempt < self.max_retries {
                    attempt += 1;
                    let wait = retry_after
                        .map(Duration::from_secs)
                        .unwrap_or(self.retry_backoff)
                        .min(MAX_RETRY_WAIT);
                    warn!(
                        "API 请求频繁限制 (尝试 {}/{}), 等待 {:?} 后重试...",
                        attempt, self.max_retries, wait
                    );
                    sleep(wait).await;
                    continue;
                }

                return Err(ApiError::RateLimited {
                    endpoint: endpoint.to_string(),
                    retry_after,
                }
                .into());
            }

            let message = response.text().await.ok().filter(|body| !body.is_empty());
            return Err(Self::classify_status(endpoint, status, message).into());
        }
    }

    async fn decode<T: DeserializeOwned>(endpoint: &str, response: Response) -> AppResult<T> {
        let text = response
            .text()
            .await
            .map_err(|e| Self::map_transport_error(endpoint, e))?;

        serde_json::from_str(&text).map_err(|e| {
            ApiError::JsonParseFailed {
                endpoint: endpoint.to_string(),
                source: Box::new(e),
            }
            .into()
        })
    }

    fn map_transport_error(endpoint: &str, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            ApiError::Timeout {
                endpoint: endpoint.to_string(),
            }
            .into()
        } else {
            AppError::api_request_failed(endpoint, err)
        }
    }

    /// 将 HTTP 状态码映射为具体错误
    fn classify_status(endpoint: &str, status: StatusCode, message: Option<String>) -> ApiError {
        let endpoint = endpoint.to_string();
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized { endpoint },
            StatusCode::FORBIDDEN => ApiError::Forbidden { endpoint },
            StatusCode::NOT_FOUND => ApiError::NotFound { endpoint },
            _ => ApiError::BadResponse {
                endpoint,
                status: status.as_u16(),
                message,
            },
        }
    }

    fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
        headers
            .get(RETRY_AFTER)?
            .to_str()
            .ok()?
            .trim()
            .parse()
            .ok()
    }

    /// 从 Link 头中提取下一页地址
    pub fn next_page_url(headers: &HeaderMap) -> Option<String> {
        let link = headers.get(LINK)?.to_str().ok()?;
        parse_next_link(link)
    }
}

/// 解析 `<url>; rel="next"` 形式的链接
pub fn parse_next_link(link_header: &str) -> Option<String> {
    let re = Regex::new(r#"<([^>]+)>\s*;\s*rel="?next"?"#).ok()?;
    link_header
        .split(',')
        .find_map(|part| re.captures(part.trim()))
        .and_then(|cap| cap.get(1).map(|m| m.as_str().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tokio_test::assert_err;
    use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer, max_retries: usize) -> LmsClient {
        LmsClient::with_options(
            &server.uri(),
            "test-token",
            Duration::from_secs(5),
            max_retries,
            Duration::from_millis(10),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_next_link() {
        let header = r#"<https://lms.test/api/v1/x?page=1>; rel="current", <https://lms.test/api/v1/x?page=2>; rel="next", <https://lms.test/api/v1/x?page=5>; rel="last""#;
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://lms.test/api/v1/x?page=2")
        );
        assert_eq!(parse_next_link(r#"<https://lms.test/x>; rel="last""#), None);
    }

    #[tokio::test]
    async fn test_get_paginated_follows_links() {
        let server = MockServer::start().await;
        let next = format!("{}/api/v1/items?page=2&per_page=2", server.uri());

        Mock::given(method("GET"))
            .and(path("/api/v1/items"))
            .and(query_param_is_missing("page"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{ "id": 1 }, { "id": 2 }]))
                    .insert_header("Link", format!(r#"<{}>; rel="next""#, next).as_str()),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/items"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 3 }])))
            .mount(&server)
            .await;

        let client = test_client(&server, 0);
        let items: Vec<Value> = client.get_paginated("/api/v1/items", 2).await.unwrap();

        let ids: Vec<u64> = items.iter().filter_map(|v| v["id"].as_u64()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_distinct_http_errors() {
        let server = MockServer::start().await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(path("/denied"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(path("/forbidden"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = test_client(&server, 0);

        let missing = client.get_json::<Value>("/missing").await;
        assert!(matches!(missing, Err(AppError::Api(ApiError::NotFound { .. }))));
        let denied = client.get_json::<Value>("/denied").await;
        assert!(matches!(denied, Err(AppError::Api(ApiError::Unauthorized { .. }))));
        let forbidden = client.get_json::<Value>("/forbidden").await;
        assert!(matches!(forbidden, Err(AppError::Api(ApiError::Forbidden { .. }))));
    }

    #[tokio::test]
    async fn test_rate_limit_retried_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(path("/busy"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(path("/busy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .mount(&server)
            .await;

        let client = test_client(&server, 2);
        let value: Value = client.get_json("/busy").await.unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_rate_limit_exhausted() {
        let server = MockServer::start().await;
        Mock::given(path("/busy"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .mount(&server)
            .await;

        let client = test_client(&server, 1);
        let result = client.get_json::<Value>("/busy").await;
        assert_err!(&result);
        match result {
            Err(AppError::Api(err @ ApiError::RateLimited { .. })) => assert!(err.is_transient()),
            other => panic!("应为限流错误: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_submission_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v1/courses/1/assignments/2/submissions/3"))
            .and(body_json(json!({
                "submission": { "posted_grade": "15" },
                "comment": { "text_comment": "首帖: +10" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 99 })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server, 0);
        let payload = WritePayload::Grade {
            posted_grade: 15.0,
            comment: Some("首帖: +10".to_string()),
        };
        client.update_submission(1, 2, 3, &payload).await.unwrap();
    }
}
