pub mod config;
pub mod dto;
pub mod engine;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::services::{
    api_client::ApiClient,
    attempt_service::AttemptService,
    completion::{CompletionSink, LogCompletionSink, WebhookCompletionSink},
    quiz_api::QuizApi,
};
use reqwest::Client;

#[derive(Clone)]
pub struct AppState {
    pub attempt_service: AttemptService,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let api = ApiClient::from_config(config)?;
        let completion: Arc<dyn CompletionSink> = match &config.completion_webhook_url {
            Some(url) => {
                let http_client = Client::builder()
                    .timeout(Duration::from_secs(10))
                    .build()
                    .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;
                Arc::new(WebhookCompletionSink::new(http_client, url.clone()))
            }
            None => Arc::new(LogCompletionSink),
        };
        Ok(Self::with_api(Arc::new(api), completion, config.grading_timeout()))
    }

    pub fn with_api(
        api: Arc<dyn QuizApi>,
        completion: Arc<dyn CompletionSink>,
        grading_timeout: Duration,
    ) -> Self {
        Self {
            attempt_service: AttemptService::new(api, completion, grading_timeout),
        }
    }
}
