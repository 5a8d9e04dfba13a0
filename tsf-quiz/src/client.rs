//! Query service client
//!
//! [`QuizBackend`] is the seam between the quiz flow and the network, so the
//! flow can be driven against an in-memory backend in tests.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tsf_common::api::{
    BulkProgrammesRequest, ErrorBody, FilterRequest, FilterResponse, ProgrammeSummary,
    ProgrammesResponse, QuestionsResponse, QuizQuestion, QuizResultsRequest, ReconcileReport,
    ReconcileRequest,
};
use tsf_common::config::ClientConfig;

use crate::error::{QuizError, QuizResult};

const USER_AGENT: &str = concat!("tsf-quiz/", env!("CARGO_PKG_VERSION"));

/// Operations the quiz needs from the query service
#[async_trait]
pub trait QuizBackend: Send + Sync {
    async fn filter(&self, request: &FilterRequest) -> QuizResult<FilterResponse>;

    async fn questions(&self, level: u8) -> QuizResult<Vec<QuizQuestion>>;

    async fn programmes(&self, ids: &[i64]) -> QuizResult<Vec<ProgrammeSummary>>;

    async fn reconcile(&self, account: i64, result_ids: &[i64]) -> QuizResult<ReconcileReport>;

    async fn save_results(&self, account: i64, result_ids: &[i64]) -> QuizResult<()>;
}

/// HTTP implementation talking to tsf-query
pub struct HttpBackend {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> QuizResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| QuizError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> QuizResult<Self> {
        Self::new(
            &config.base_url,
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> QuizResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| QuizError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error.message)
            .unwrap_or(text);

        Err(QuizError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> QuizResult<T> {
        let url = self.url(path);
        tracing::debug!(url = %url, "GET");

        let response = self.send(self.http_client.get(&url)).await?;
        response
            .json()
            .await
            .map_err(|e| QuizError::Parse(e.to_string()))
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> QuizResult<T> {
        let url = self.url(path);
        tracing::debug!(url = %url, "POST");

        let response = self.send(self.http_client.post(&url).json(body)).await?;
        response
            .json()
            .await
            .map_err(|e| QuizError::Parse(e.to_string()))
    }
}

#[async_trait]
impl QuizBackend for HttpBackend {
    async fn filter(&self, request: &FilterRequest) -> QuizResult<FilterResponse> {
        self.post_json("/api/quiz/filter", request).await
    }

    async fn questions(&self, level: u8) -> QuizResult<Vec<QuizQuestion>> {
        let response: QuestionsResponse = self.get_json(&format!("/api/quiz/level/{}", level)).await?;
        Ok(response.questions)
    }

    async fn programmes(&self, ids: &[i64]) -> QuizResult<Vec<ProgrammeSummary>> {
        let body = BulkProgrammesRequest { ids: ids.to_vec() };
        let response: ProgrammesResponse = self
            .post_json("/api/quiz/study-programmes/bulk", &body)
            .await?;
        Ok(response.study_programmes)
    }

    async fn reconcile(&self, account: i64, result_ids: &[i64]) -> QuizResult<ReconcileReport> {
        let body = ReconcileRequest {
            result_ids: result_ids.to_vec(),
        };
        self.post_json(&format!("/api/accounts/{}/reconcile", account), &body)
            .await
    }

    async fn save_results(&self, account: i64, result_ids: &[i64]) -> QuizResult<()> {
        let url = self.url(&format!("/api/accounts/{}/results", account));
        let body = QuizResultsRequest {
            result_ids: result_ids.to_vec(),
        };
        tracing::debug!(url = %url, "PUT");

        self.send(self.http_client.put(&url).json(&body)).await?;
        Ok(())
    }
}
