pub mod answer;
pub mod question;
pub mod quiz;
pub mod quiz_result;

pub use answer::SelectedAnswer;
pub use question::Question;
pub use quiz::Quiz;
pub use quiz_result::{QuizResult, PASS_THRESHOLD_PERCENT};
