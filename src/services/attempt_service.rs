use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::dto::attempt_dto::{CourseQuizzesResponse, QuizSummary, StartAttemptRequest};
use crate::error::{Error, Result};
use crate::middleware::auth::BearerToken;
use crate::models::Quiz;
use crate::services::completion::CompletionSink;
use crate::services::quiz_api::QuizApi;
use crate::services::quiz_session::QuizSession;
use crate::services::session_registry::SessionRegistry;

#[derive(Clone)]
pub struct AttemptService {
    api: Arc<dyn QuizApi>,
    completion: Arc<dyn CompletionSink>,
    sessions: SessionRegistry,
    grading_timeout: Duration,
}

impl AttemptService {
    pub fn new(
        api: Arc<dyn QuizApi>,
        completion: Arc<dyn CompletionSink>,
        grading_timeout: Duration,
    ) -> Self {
        Self {
            api,
            completion,
            sessions: SessionRegistry::new(),
            grading_timeout,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub async fn list_course_quizzes(
        &self,
        token: &BearerToken,
        course_id: i64,
    ) -> Result<CourseQuizzesResponse> {
        let quizzes = self.api.fetch_course_quizzes(token, course_id).await?;
        tracing::debug!(course_id, count = quizzes.len(), "Fetched course quizzes");
        Ok(CourseQuizzesResponse {
            course_id,
            quizzes: quizzes.iter().map(QuizSummary::from).collect(),
        })
    }

    async fn find_quiz(&self, token: &BearerToken, course_id: i64, quiz_id: i64) -> Result<Quiz> {
        self.api
            .fetch_course_quizzes(token, course_id)
            .await?
            .into_iter()
            .find(|q| q.id == quiz_id)
            .ok_or_else(|| {
                Error::NotFound(format!("Quiz {} not found in course {}", quiz_id, course_id))
            })
    }

    pub async fn start_attempt(
        &self,
        token: BearerToken,
        req: StartAttemptRequest,
    ) -> Result<Arc<QuizSession>> {
        let quiz = self.find_quiz(&token, req.course_id, req.quiz_id).await?;
        let session = QuizSession::start(
            Arc::new(quiz),
            token,
            self.api.clone(),
            self.completion.clone(),
            self.grading_timeout,
        )
        .await?;
        self.sessions.insert(session.clone()).await;
        Ok(session)
    }

    /// Looks up an attempt opened with the same token; others are reported missing.
    pub async fn get(&self, attempt_id: Uuid, token: &BearerToken) -> Result<Arc<QuizSession>> {
        let session = self.sessions.get(attempt_id).await?;
        if !session.is_owned_by(token) {
            tracing::warn!(attempt_id = %attempt_id, "Attempt requested with a foreign token");
            return Err(Error::NotFound(format!("Quiz attempt {} not found", attempt_id)));
        }
        Ok(session)
    }

    pub async fn close(&self, attempt_id: Uuid, token: &BearerToken) -> Result<()> {
        self.get(attempt_id, token).await?;
        self.sessions.close(attempt_id).await
    }

    pub async fn sweep_idle(&self, ttl: Duration) -> usize {
        self.sessions.sweep_idle(ttl).await
    }
}
