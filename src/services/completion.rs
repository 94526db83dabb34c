use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionReport {
    pub attempt_id: Uuid,
    pub course_id: i64,
    pub quiz_id: i64,
    pub attempt_number: u32,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
}

#[async_trait]
pub trait CompletionSink: Send + Sync {
    async fn report(&self, report: &CompletionReport);
}

#[derive(Debug, Clone, Default)]
pub struct LogCompletionSink;

#[async_trait]
impl CompletionSink for LogCompletionSink {
    async fn report(&self, report: &CompletionReport) {
        tracing::info!(
            attempt_id = %report.attempt_id,
            course_id = report.course_id,
            quiz_id = report.quiz_id,
            score = report.correct_answers,
            total = report.total_questions,
            passed = report.passed,
            "Quiz attempt completed"
        );
    }
}

/// Posts every completion to a webhook. Delivery failures are logged only.
#[derive(Clone)]
pub struct WebhookCompletionSink {
    client: Client,
    webhook_url: String,
}

impl WebhookCompletionSink {
    pub fn new(client: Client, webhook_url: String) -> Self {
        tracing::info!("Completion webhook enabled: {}", webhook_url);
        Self {
            client,
            webhook_url,
        }
    }
}

#[async_trait]
impl CompletionSink for WebhookCompletionSink {
    async fn report(&self, report: &CompletionReport) {
        LogCompletionSink.report(report).await;
        match self.client.post(&self.webhook_url).json(report).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!(attempt_id = %report.attempt_id, "Completion webhook delivered");
            }
            Ok(resp) => {
                tracing::warn!(
                    attempt_id = %report.attempt_id,
                    "Completion webhook returned {}",
                    resp.status()
                );
            }
            Err(e) => {
                tracing::warn!(attempt_id = %report.attempt_id, "Completion webhook failed: {}", e);
            }
        }
    }
}
