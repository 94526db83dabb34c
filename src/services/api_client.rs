use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use url::Url;

use crate::config::Config;
use crate::dto::api_dto::{CourseQuizzesPayload, GradingResponse, SubmitAnswersRequest};
use crate::error::{Error, Result};
use crate::middleware::auth::BearerToken;
use crate::models::{Quiz, SelectedAnswer};
use crate::services::quiz_api::QuizApi;

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    grading_timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: Url, fetch_timeout: Duration, grading_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url,
            grading_timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.api_base_url.clone(),
            config.fetch_timeout(),
            config.grading_timeout(),
        )
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Internal(format!("Invalid upstream path {}: {}", path, e)))
    }

    async fn check_status(response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::warn!("Upstream {} failed with {}: {}", what, status, body);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Unauthorized(format!(
                "Upstream rejected credentials for {}",
                what
            ))),
            StatusCode::NOT_FOUND => Err(Error::NotFound(format!("Upstream {} not found", what))),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Err(
                Error::UpstreamTimeout(format!("{} returned {}", what, status)),
            ),
            _ => Err(Error::Upstream(format!("{} returned {}", what, status))),
        }
    }
}

#[async_trait]
impl QuizApi for ApiClient {
    async fn fetch_course_quizzes(&self, token: &BearerToken, course_id: i64) -> Result<Vec<Quiz>> {
        let url = self.endpoint(&format!("courses/{}/quizzes", course_id))?;
        tracing::debug!("Fetching quizzes from: {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(token.as_str())
            .send()
            .await?;
        let response = Self::check_status(response, "quiz list").await?;
        let payload = response.json::<CourseQuizzesPayload>().await?;
        Ok(payload.into_quizzes())
    }

    async fn submit_answers(
        &self,
        token: &BearerToken,
        quiz_id: i64,
        answers: &[SelectedAnswer],
    ) -> Result<GradingResponse> {
        let url = self.endpoint(&format!("quizzes/{}/submit", quiz_id))?;
        let body = SubmitAnswersRequest {
            answers: answers.to_vec(),
        };
        tracing::info!(quiz_id, answers = answers.len(), "Submitting answers for grading");

        let response = self
            .client
            .post(url)
            .bearer_auth(token.as_str())
            .timeout(self.grading_timeout)
            .json(&body)
            .send()
            .await?;
        let response = Self::check_status(response, "grading").await?;
        Ok(response.json::<GradingResponse>().await?)
    }
}
