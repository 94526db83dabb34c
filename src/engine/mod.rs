//! Quiz-taking engine: the attempt state machine and its countdown.

pub mod attempt;
pub mod timer;

pub use attempt::{AttemptPhase, QuizAttempt, Submission, SubmitTrigger, Tick, SECONDS_PER_QUESTION};
pub use timer::{spawn_countdown, CountdownHandle};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttemptError {
    #[error("Quiz has no questions")]
    EmptyQuiz,

    #[error("Quiz attempt is not in progress")]
    NotInProgress,

    #[error("Answers are already being submitted")]
    AlreadySubmitting,

    #[error("No submission is in flight")]
    NoSubmissionInFlight,

    #[error("Only a failed attempt can be retried")]
    NotRetryable,

    #[error("Quiz attempt has been closed")]
    Closed,

    #[error("Option is not offered for this question: {0}")]
    UnknownOption(String),
}
