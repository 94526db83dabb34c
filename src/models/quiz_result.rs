use serde::{Deserialize, Serialize};

pub const PASS_THRESHOLD_PERCENT: u32 = 70;

/// Pass/fail is always derived from the counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub correct_answers: u32,
    pub total_questions: u32,
}

impl QuizResult {
    pub fn new(correct_answers: u32, total_questions: u32) -> Self {
        Self {
            correct_answers,
            total_questions,
        }
    }

    pub fn passed(&self) -> bool {
        if self.total_questions == 0 {
            return false;
        }
        u64::from(self.correct_answers) * 100
            >= u64::from(self.total_questions) * u64::from(PASS_THRESHOLD_PERCENT)
    }

    pub fn percentage(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        f64::from(self.correct_answers) / f64::from(self.total_questions) * 100.0
    }

    pub fn score_label(&self) -> String {
        format!("{}/{}", self.correct_answers, self.total_questions)
    }

    pub fn percentage_label(&self) -> String {
        format!("{:.1}%", self.percentage())
    }
}
