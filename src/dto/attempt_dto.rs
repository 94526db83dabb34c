use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::engine::{AttemptPhase, QuizAttempt};
use crate::models::{Question, Quiz, QuizResult};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StartAttemptRequest {
    #[validate(range(min = 1))]
    pub course_id: i64,
    #[validate(range(min = 1))]
    pub quiz_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SelectOptionRequest {
    #[validate(length(min = 1))]
    pub option: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JumpRequest {
    pub index: usize,
}

/// Question as shown to a student: the correct answer is never included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: i64,
    pub text: String,
    pub options: Vec<String>,
}

impl From<&Question> for QuestionView {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            text: q.text.clone(),
            options: q.options.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSummary {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub question_count: usize,
    pub time_limit_seconds: u32,
    pub questions: Vec<QuestionView>,
}

impl From<&Quiz> for QuizSummary {
    fn from(quiz: &Quiz) -> Self {
        let question_count = quiz.question_count();
        Self {
            id: quiz.id,
            course_id: quiz.course_id,
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            question_count,
            time_limit_seconds: u32::try_from(question_count)
                .unwrap_or(u32::MAX)
                .saturating_mul(crate::engine::SECONDS_PER_QUESTION),
            questions: quiz.questions.iter().map(QuestionView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseQuizzesResponse {
    pub course_id: i64,
    pub quizzes: Vec<QuizSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Submitting,
    ResultsShown,
    Closed,
}

impl From<AttemptPhase> for AttemptStatus {
    fn from(phase: AttemptPhase) -> Self {
        match phase {
            AttemptPhase::InProgress => AttemptStatus::InProgress,
            AttemptPhase::Submitting => AttemptStatus::Submitting,
            AttemptPhase::ResultsShown(_) => AttemptStatus::ResultsShown,
            AttemptPhase::Closed => AttemptStatus::Closed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultView {
    pub correct_answers: u32,
    pub total_questions: u32,
    pub percentage: f64,
    pub score_label: String,
    pub percentage_label: String,
    pub passed: bool,
    pub can_retry: bool,
}

impl From<QuizResult> for ResultView {
    fn from(result: QuizResult) -> Self {
        let passed = result.passed();
        Self {
            correct_answers: result.correct_answers,
            total_questions: result.total_questions,
            percentage: result.percentage(),
            score_label: result.score_label(),
            percentage_label: result.percentage_label(),
            passed,
            can_retry: !passed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptView {
    pub attempt_id: Uuid,
    pub quiz_id: i64,
    pub course_id: i64,
    pub title: String,
    pub status: AttemptStatus,
    pub attempt_number: u32,
    pub current_index: usize,
    pub total_questions: usize,
    pub question: QuestionView,
    pub selected_option: Option<String>,
    pub answered_count: usize,
    pub remaining_seconds: u32,
    pub result: Option<ResultView>,
    pub last_error: Option<String>,
}

impl AttemptView {
    pub fn build(attempt_id: Uuid, attempt: &QuizAttempt, last_error: Option<String>) -> Self {
        let quiz = attempt.quiz();
        Self {
            attempt_id,
            quiz_id: quiz.id,
            course_id: quiz.course_id,
            title: quiz.title.clone(),
            status: attempt.phase().into(),
            attempt_number: attempt.attempt_number(),
            current_index: attempt.current_index(),
            total_questions: attempt.total_questions(),
            question: QuestionView::from(attempt.current_question()),
            selected_option: attempt.selected_option().map(str::to_string),
            answered_count: attempt.answered_count(),
            remaining_seconds: attempt.remaining_seconds(),
            result: attempt.result().map(ResultView::from),
            last_error,
        }
    }
}
