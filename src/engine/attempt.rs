use std::collections::HashMap;
use std::sync::Arc;

use super::AttemptError;
use crate::models::{Question, Quiz, QuizResult, SelectedAnswer};

/// Time allotted per question, fixed when the attempt starts.
pub const SECONDS_PER_QUESTION: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    InProgress,
    Submitting,
    ResultsShown(QuizResult),
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    TimeExpired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub quiz_id: i64,
    pub answers: Vec<SelectedAnswer>,
    pub trigger: SubmitTrigger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    Running(u32),
    Expired(Submission),
}

/// Never talks to the network: `begin_submit` hands out the payload and the
/// caller reports back with `complete_submit` or `fail_submit`.
#[derive(Debug, Clone)]
pub struct QuizAttempt {
    quiz: Arc<Quiz>,
    current_index: usize,
    answers: HashMap<i64, String>,
    remaining_seconds: u32,
    phase: AttemptPhase,
    attempt_number: u32,
}

impl QuizAttempt {
    pub fn new(quiz: Arc<Quiz>) -> Result<Self, AttemptError> {
        if quiz.questions.is_empty() {
            return Err(AttemptError::EmptyQuiz);
        }
        let remaining_seconds = time_limit(&quiz);
        Ok(Self {
            quiz,
            current_index: 0,
            answers: HashMap::new(),
            remaining_seconds,
            phase: AttemptPhase::InProgress,
            attempt_number: 1,
        })
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn phase(&self) -> AttemptPhase {
        self.phase
    }

    pub fn is_in_progress(&self) -> bool {
        self.phase == AttemptPhase::InProgress
    }

    pub fn submission_in_flight(&self) -> bool {
        self.phase == AttemptPhase::Submitting
    }

    pub fn result(&self) -> Option<QuizResult> {
        match self.phase {
            AttemptPhase::ResultsShown(result) => Some(result),
            _ => None,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn total_questions(&self) -> usize {
        self.quiz.questions.len()
    }

    pub fn current_question(&self) -> &Question {
        &self.quiz.questions[self.current_index]
    }

    pub fn selected_option(&self) -> Option<&str> {
        self.answers
            .get(&self.current_question().id)
            .map(String::as_str)
    }

    pub fn answer_for(&self, question_id: i64) -> Option<&str> {
        self.answers.get(&question_id).map(String::as_str)
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    fn ensure_in_progress(&self) -> Result<(), AttemptError> {
        match self.phase {
            AttemptPhase::InProgress => Ok(()),
            AttemptPhase::Submitting => Err(AttemptError::AlreadySubmitting),
            AttemptPhase::ResultsShown(_) => Err(AttemptError::NotInProgress),
            AttemptPhase::Closed => Err(AttemptError::Closed),
        }
    }

    pub fn select_option(&mut self, option: &str) -> Result<(), AttemptError> {
        self.ensure_in_progress()?;
        let question = self.current_question();
        if !question.has_option(option) {
            return Err(AttemptError::UnknownOption(option.to_string()));
        }
        let question_id = question.id;
        self.answers.insert(question_id, option.to_string());
        Ok(())
    }

    pub fn go_to_next(&mut self) -> Result<usize, AttemptError> {
        let target = self.current_index.saturating_add(1);
        self.jump_to(target)
    }

    pub fn go_to_previous(&mut self) -> Result<usize, AttemptError> {
        let target = self.current_index.saturating_sub(1);
        self.jump_to(target)
    }

    /// Moves the cursor, clamping to the first/last question.
    pub fn jump_to(&mut self, index: usize) -> Result<usize, AttemptError> {
        self.ensure_in_progress()?;
        let last = self.total_questions() - 1;
        self.current_index = index.min(last);
        Ok(self.current_index)
    }

    /// Reaching zero moves the attempt to `Submitting` and yields the submission.
    pub fn tick(&mut self) -> Result<Tick, AttemptError> {
        self.ensure_in_progress()?;
        if self.remaining_seconds == 0 {
            return Ok(Tick::Running(0));
        }
        self.remaining_seconds -= 1;
        if self.remaining_seconds == 0 {
            let submission = self.begin_submit(SubmitTrigger::TimeExpired)?;
            return Ok(Tick::Expired(submission));
        }
        Ok(Tick::Running(self.remaining_seconds))
    }

    pub fn begin_submit(&mut self, trigger: SubmitTrigger) -> Result<Submission, AttemptError> {
        self.ensure_in_progress()?;
        self.phase = AttemptPhase::Submitting;
        Ok(Submission {
            quiz_id: self.quiz.id,
            answers: self.collect_answers(),
            trigger,
        })
    }

    pub fn complete_submit(&mut self, result: QuizResult) -> Result<QuizResult, AttemptError> {
        match self.phase {
            AttemptPhase::Submitting => {
                self.phase = AttemptPhase::ResultsShown(result);
                Ok(result)
            }
            AttemptPhase::Closed => Err(AttemptError::Closed),
            _ => Err(AttemptError::NoSubmissionInFlight),
        }
    }

    /// Returns to `InProgress` after a failed grading call; answers are kept.
    pub fn fail_submit(&mut self) -> Result<(), AttemptError> {
        match self.phase {
            AttemptPhase::Submitting => {
                self.phase = AttemptPhase::InProgress;
                Ok(())
            }
            AttemptPhase::Closed => Err(AttemptError::Closed),
            _ => Err(AttemptError::NoSubmissionInFlight),
        }
    }

    pub fn retry(&mut self) -> Result<(), AttemptError> {
        match self.phase {
            AttemptPhase::ResultsShown(result) if !result.passed() => {
                self.current_index = 0;
                self.answers.clear();
                self.remaining_seconds = time_limit(&self.quiz);
                self.phase = AttemptPhase::InProgress;
                self.attempt_number += 1;
                Ok(())
            }
            AttemptPhase::Closed => Err(AttemptError::Closed),
            _ => Err(AttemptError::NotRetryable),
        }
    }

    pub fn close(&mut self) {
        self.phase = AttemptPhase::Closed;
    }

    fn collect_answers(&self) -> Vec<SelectedAnswer> {
        self.quiz
            .questions
            .iter()
            .filter_map(|q| {
                self.answers.get(&q.id).map(|answer| SelectedAnswer {
                    question_id: q.id,
                    answer: answer.clone(),
                })
            })
            .collect()
    }
}

fn time_limit(quiz: &Quiz) -> u32 {
    let count = u32::try_from(quiz.questions.len()).unwrap_or(u32::MAX);
    count.saturating_mul(SECONDS_PER_QUESTION)
}
