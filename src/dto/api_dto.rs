//! Payloads exchanged with the upstream e-learning API.

use serde::{Deserialize, Serialize};

use crate::models::{Quiz, QuizResult, SelectedAnswer};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CourseQuizzesPayload {
    Wrapped { quizzes: Vec<Quiz> },
    Bare(Vec<Quiz>),
}

impl CourseQuizzesPayload {
    pub fn into_quizzes(self) -> Vec<Quiz> {
        match self {
            CourseQuizzesPayload::Wrapped { quizzes } => quizzes,
            CourseQuizzesPayload::Bare(quizzes) => quizzes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswersRequest {
    pub answers: Vec<SelectedAnswer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingResponse {
    pub correct_answers: u32,
    pub total_questions: u32,
    #[serde(default)]
    pub passed: Option<bool>,
}

impl GradingResponse {
    /// Score as the gateway reports it; the server's `passed` flag is dropped.
    pub fn result(&self) -> QuizResult {
        QuizResult::new(self.correct_answers, self.total_questions)
    }
}
