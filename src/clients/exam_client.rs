//! 考试服务 API 客户端
//!
//! 封装所有与考试服务相关的 HTTP 调用。
//! 服务端统一返回 `{status, message, data, code}` 信封，code == 200 为成功。

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clients::ExamService;
use crate::config::Config;
use crate::error::{ApiError, AppResult};
use crate::models::{Answer, CompletionSummary, ExamAttempt, SectionQuestions};

/// 小节提交请求
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSectionRequest {
    pub answers: Vec<Answer>,
    pub time_spent: u64,
}

/// 整卷提交请求
///
/// auto_submit 区分学员主动提交与到时自动提交
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    pub answers: Vec<Answer>,
    pub time_spent: u64,
    pub auto_submit: bool,
}

/// 小节提交响应
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionProgress {
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub time_spent: u64,
    pub has_more_sections: bool,
    #[serde(default)]
    pub remaining_sections_count: usize,
    #[serde(default)]
    pub total_sections: usize,
    #[serde(default)]
    pub completed_sections_count: usize,
}

/// 服务端响应信封
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
    code: u64,
}

/// 拆信封：code 必须为 200 且 data 非空
fn unwrap_envelope<T>(endpoint: &str, envelope: Envelope<T>) -> AppResult<T> {
    if envelope.code != 200 {
        return Err(ApiError::BadResponse {
            endpoint: endpoint.to_string(),
            code: Some(envelope.code),
            message: envelope.message,
        }
        .into());
    }

    envelope.data.ok_or_else(|| {
        ApiError::EmptyResponse { endpoint: endpoint.to_string() }.into()
    })
}

/// 考试服务 API 客户端
pub struct ExamClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ExamClient {
    /// 创建新的考试服务客户端
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.exam_api_base_url.trim_end_matches('/').to_string(),
            token: config.exam_api_token.clone(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.token.is_empty() {
            request
        } else {
            request.bearer_auth(&self.token)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> AppResult<T> {
        let response = self
            .with_auth(self.http.get(self.url(endpoint)))
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed { endpoint: endpoint.to_string(), source: e })?;

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ApiError::RequestFailed { endpoint: endpoint.to_string(), source: e })?;

        debug!("GET {} -> code={} status={:?}", endpoint, envelope.code, envelope.status);

        unwrap_envelope(endpoint, envelope)
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: Option<&B>,
    ) -> AppResult<T> {
        let mut request = self.with_auth(self.http.post(self.url(endpoint)));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed { endpoint: endpoint.to_string(), source: e })?;

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ApiError::RequestFailed { endpoint: endpoint.to_string(), source: e })?;

        debug!("POST {} -> code={} status={:?}", endpoint, envelope.code, envelope.status);

        unwrap_envelope(endpoint, envelope)
    }
}

#[async_trait]
impl ExamService for ExamClient {
    async fn start_exam(&self, exam_id: &str) -> AppResult<ExamAttempt> {
        let endpoint = format!("/v1/api/exam/{}/start", exam_id);
        self.post_json::<ExamAttempt, ()>(&endpoint, None).await
    }

    async fn section_questions(
        &self,
        attempt_id: &str,
        section_id: &str,
    ) -> AppResult<SectionQuestions> {
        let endpoint = format!("/v1/api/exam/exam-attempts/{}/section/{}", attempt_id, section_id);
        self.get_json(&endpoint).await
    }

    async fn submit_section(
        &self,
        attempt_id: &str,
        section_id: &str,
        request: &SubmitSectionRequest,
    ) -> AppResult<SectionProgress> {
        let endpoint =
            format!("/v1/api/exam/exam-attempts/{}/section/{}/submit", attempt_id, section_id);
        self.post_json(&endpoint, Some(request)).await
    }

    async fn complete_attempt(
        &self,
        attempt_id: &str,
        request: &CompleteRequest,
    ) -> AppResult<CompletionSummary> {
        let endpoint = format!("/v1/api/exam/exam-attempts/{}/submit", attempt_id);
        self.post_json(&endpoint, Some(request)).await
    }

    async fn attempt_result(&self, attempt_id: &str) -> AppResult<ExamAttempt> {
        let endpoint = format!("/v1/api/exam/exam-attempts/{}", attempt_id);
        self.get_json(&endpoint).await
    }
}
