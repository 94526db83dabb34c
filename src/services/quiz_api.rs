use async_trait::async_trait;

use crate::dto::api_dto::GradingResponse;
use crate::error::Result;
use crate::middleware::auth::BearerToken;
use crate::models::{Quiz, SelectedAnswer};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizApi: Send + Sync {
    async fn fetch_course_quizzes(&self, token: &BearerToken, course_id: i64) -> Result<Vec<Quiz>>;

    async fn submit_answers(
        &self,
        token: &BearerToken,
        quiz_id: i64,
        answers: &[SelectedAnswer],
    ) -> Result<GradingResponse>;
}
