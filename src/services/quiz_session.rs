use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::dto::attempt_dto::AttemptView;
use crate::engine::{spawn_countdown, CountdownHandle, QuizAttempt, Submission, SubmitTrigger, Tick};
use crate::error::{Error, Result};
use crate::middleware::auth::BearerToken;
use crate::models::{Quiz, QuizResult};
use crate::services::completion::{CompletionReport, CompletionSink};
use crate::services::quiz_api::QuizApi;

const TICK_PERIOD: Duration = Duration::from_secs(1);

type TickFuture = Pin<Box<dyn Future<Output = ControlFlow<()>> + Send>>;

struct SessionInner {
    attempt: QuizAttempt,
    countdown: Option<CountdownHandle>,
    // ticks from an older ticker are ignored
    ticker_generation: u64,
    last_error: Option<String>,
}

impl SessionInner {
    fn stop_countdown(&mut self) {
        if let Some(handle) = self.countdown.take() {
            handle.cancel();
        }
    }
}

/// The countdown task only holds a weak reference to the session.
pub struct QuizSession {
    id: Uuid,
    token: BearerToken,
    api: Arc<dyn QuizApi>,
    completion: Arc<dyn CompletionSink>,
    grading_timeout: Duration,
    inner: Mutex<SessionInner>,
    last_activity: StdMutex<Instant>,
}

impl QuizSession {
    pub async fn start(
        quiz: Arc<Quiz>,
        token: BearerToken,
        api: Arc<dyn QuizApi>,
        completion: Arc<dyn CompletionSink>,
        grading_timeout: Duration,
    ) -> Result<Arc<Self>> {
        let attempt = QuizAttempt::new(quiz)?;
        let session = Arc::new(Self {
            id: Uuid::new_v4(),
            token,
            api,
            completion,
            grading_timeout,
            inner: Mutex::new(SessionInner {
                attempt,
                countdown: None,
                ticker_generation: 0,
                last_error: None,
            }),
            last_activity: StdMutex::new(Instant::now()),
        });
        {
            let mut inner = session.inner.lock().await;
            session.spawn_ticker(&mut inner);
            tracing::info!(
                attempt_id = %session.id,
                quiz_id = inner.attempt.quiz().id,
                remaining_seconds = inner.attempt.remaining_seconds(),
                "Quiz attempt started"
            );
        }
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_owned_by(&self, token: &BearerToken) -> bool {
        &self.token == token
    }

    pub async fn quiz_id(&self) -> i64 {
        self.inner.lock().await.attempt.quiz().id
    }

    pub fn idle_for(&self) -> Duration {
        let last = *self.last_activity.lock().unwrap_or_else(|e| e.into_inner());
        Instant::now().saturating_duration_since(last)
    }

    /// Idle past `ttl` with neither a running countdown nor grading in flight.
    pub async fn is_abandoned(&self, ttl: Duration) -> bool {
        if self.idle_for() <= ttl {
            return false;
        }
        let inner = self.inner.lock().await;
        let attempt = &inner.attempt;
        let live = attempt.submission_in_flight()
            || (attempt.is_in_progress() && attempt.remaining_seconds() > 0);
        !live
    }

    fn touch(&self) {
        *self.last_activity.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    fn spawn_ticker(self: &Arc<Self>, inner: &mut SessionInner) {
        inner.stop_countdown();
        inner.ticker_generation += 1;
        let generation = inner.ticker_generation;
        let weak: Weak<Self> = Arc::downgrade(self);
        inner.countdown = Some(spawn_countdown(TICK_PERIOD, move || -> TickFuture {
            match weak.upgrade() {
                Some(session) => session.on_tick(generation),
                None => Box::pin(async { ControlFlow::Break(()) }),
            }
        }));
    }

    fn on_tick(self: Arc<Self>, generation: u64) -> TickFuture {
        Box::pin(async move {
            let submission = {
                let mut inner = self.inner.lock().await;
                if inner.ticker_generation != generation {
                    return ControlFlow::Break(());
                }
                match inner.attempt.tick() {
                    Ok(Tick::Running(0)) | Err(_) => {
                        inner.countdown = None;
                        return ControlFlow::Break(());
                    }
                    Ok(Tick::Running(_)) => return ControlFlow::Continue(()),
                    Ok(Tick::Expired(submission)) => {
                        inner.countdown = None;
                        submission
                    }
                }
            };
            tracing::info!(attempt_id = %self.id, "Time is up, submitting automatically");
            if let Err(e) = self.grade(submission).await {
                tracing::warn!(attempt_id = %self.id, "Automatic submission failed: {}", e);
            }
            ControlFlow::Break(())
        })
    }

    pub async fn view(&self) -> AttemptView {
        self.touch();
        let inner = self.inner.lock().await;
        AttemptView::build(self.id, &inner.attempt, inner.last_error.clone())
    }

    pub async fn select_option(&self, option: &str) -> Result<AttemptView> {
        self.touch();
        let mut inner = self.inner.lock().await;
        inner.attempt.select_option(option)?;
        Ok(AttemptView::build(self.id, &inner.attempt, inner.last_error.clone()))
    }

    pub async fn go_to_next(&self) -> Result<AttemptView> {
        self.navigate(|attempt| attempt.go_to_next()).await
    }

    pub async fn go_to_previous(&self) -> Result<AttemptView> {
        self.navigate(|attempt| attempt.go_to_previous()).await
    }

    pub async fn jump_to(&self, index: usize) -> Result<AttemptView> {
        self.navigate(|attempt| attempt.jump_to(index)).await
    }

    async fn navigate<F>(&self, step: F) -> Result<AttemptView>
    where
        F: FnOnce(&mut QuizAttempt) -> std::result::Result<usize, crate::engine::AttemptError>,
    {
        self.touch();
        let mut inner = self.inner.lock().await;
        step(&mut inner.attempt)?;
        Ok(AttemptView::build(self.id, &inner.attempt, inner.last_error.clone()))
    }

    /// Manual submission. A second call while grading is in flight fails with
    /// `AlreadySubmitting` and sends nothing.
    pub async fn submit(self: &Arc<Self>) -> Result<AttemptView> {
        self.touch();
        let submission = {
            let mut inner = self.inner.lock().await;
            let submission = inner.attempt.begin_submit(SubmitTrigger::Manual)?;
            inner.stop_countdown();
            submission
        };
        self.grade(submission).await?;
        Ok(self.view().await)
    }

    async fn grade(self: &Arc<Self>, submission: Submission) -> Result<QuizResult> {
        let outcome = tokio::time::timeout(
            self.grading_timeout,
            self.api
                .submit_answers(&self.token, submission.quiz_id, &submission.answers),
        )
        .await
        .unwrap_or_else(|_| {
            Err(Error::UpstreamTimeout(format!(
                "grading did not answer within {}s",
                self.grading_timeout.as_secs()
            )))
        });

        // a finished grading round counts as activity
        self.touch();
        let mut inner = self.inner.lock().await;
        match outcome {
            Ok(response) => {
                let result = response.result();
                if let Some(server_passed) = response.passed {
                    if server_passed != result.passed() {
                        tracing::warn!(
                            attempt_id = %self.id,
                            server_passed,
                            "Grading service pass flag disagrees with score, using score"
                        );
                    }
                }
                inner.attempt.complete_submit(result)?;
                inner.last_error = None;
                let report = CompletionReport {
                    attempt_id: self.id,
                    course_id: inner.attempt.quiz().course_id,
                    quiz_id: submission.quiz_id,
                    attempt_number: inner.attempt.attempt_number(),
                    correct_answers: result.correct_answers,
                    total_questions: result.total_questions,
                    passed: result.passed(),
                    completed_at: Utc::now(),
                };
                drop(inner);
                tracing::info!(
                    attempt_id = %self.id,
                    trigger = ?submission.trigger,
                    score = %result.score_label(),
                    "Quiz graded"
                );
                let sink = self.completion.clone();
                tokio::spawn(async move { sink.report(&report).await });
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(attempt_id = %self.id, "Grading failed: {}", e);
                if inner.attempt.fail_submit().is_ok() {
                    inner.last_error = Some(e.to_string());
                    if inner.attempt.remaining_seconds() > 0 {
                        self.spawn_ticker(&mut inner);
                    }
                }
                Err(e)
            }
        }
    }

    pub async fn retry(self: &Arc<Self>) -> Result<AttemptView> {
        self.touch();
        let mut inner = self.inner.lock().await;
        inner.attempt.retry()?;
        inner.last_error = None;
        self.spawn_ticker(&mut inner);
        tracing::info!(
            attempt_id = %self.id,
            attempt_number = inner.attempt.attempt_number(),
            "Quiz attempt restarted"
        );
        Ok(AttemptView::build(self.id, &inner.attempt, inner.last_error.clone()))
    }

    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.stop_countdown();
        inner.attempt.close();
        tracing::info!(attempt_id = %self.id, "Quiz attempt closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::api_dto::GradingResponse;
    use crate::dto::attempt_dto::AttemptStatus;
    use crate::engine::attempt::tests::sample_quiz;
    use crate::engine::AttemptError;
    use crate::services::completion::LogCompletionSink;
    use crate::services::quiz_api::MockQuizApi;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn token() -> BearerToken {
        BearerToken::new("student-token")
    }

    async fn open(api: MockQuizApi, questions: usize) -> Arc<QuizSession> {
        QuizSession::start(
            sample_quiz(questions),
            token(),
            Arc::new(api),
            Arc::new(LogCompletionSink),
            Duration::from_secs(15),
        )
        .await
        .unwrap()
    }

    fn graded(correct: u32, total: u32) -> GradingResponse {
        GradingResponse {
            correct_answers: correct,
            total_questions: total,
            passed: None,
        }
    }

    #[derive(Default)]
    struct CountingSink {
        reports: AtomicU32,
    }

    #[async_trait::async_trait]
    impl CompletionSink for CountingSink {
        async fn report(&self, _report: &CompletionReport) {
            self.reports.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_runs_out_and_submits_once() {
        let mut api = MockQuizApi::new();
        api.expect_submit_answers()
            .times(1)
            .returning(|_, _, answers| {
                assert!(answers.is_empty());
                Ok(graded(0, 2))
            });
        let session = open(api, 2).await;
        assert_eq!(session.view().await.remaining_seconds, 180);

        tokio::time::sleep(Duration::from_millis(179_500)).await;
        let view = session.view().await;
        assert_eq!(view.remaining_seconds, 1);
        assert_eq!(view.status, AttemptStatus::InProgress);

        tokio::time::sleep(Duration::from_secs(5)).await;
        let view = session.view().await;
        assert_eq!(view.remaining_seconds, 0);
        assert_eq!(view.status, AttemptStatus::ResultsShown);
        assert_eq!(view.result.unwrap().score_label, "0/2");
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_does_not_pause_countdown() {
        let session = open(MockQuizApi::new(), 3).await;
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        session.go_to_next().await.unwrap();
        session.jump_to(0).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(session.view().await.remaining_seconds, 270 - 15);
        session.close().await;
    }

    #[derive(Default)]
    struct SlowGrader {
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl QuizApi for SlowGrader {
        async fn fetch_course_quizzes(&self, _: &BearerToken, _: i64) -> Result<Vec<Quiz>> {
            Ok(Vec::new())
        }

        async fn submit_answers(
            &self,
            _: &BearerToken,
            _: i64,
            answers: &[crate::models::SelectedAnswer],
        ) -> Result<GradingResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok(graded(answers.len() as u32, 1))
        }
    }

    async fn open_slow(grader: Arc<SlowGrader>, questions: usize) -> Arc<QuizSession> {
        QuizSession::start(
            sample_quiz(questions),
            token(),
            grader,
            Arc::new(LogCompletionSink),
            Duration::from_secs(15),
        )
        .await
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_submits_send_one_request() {
        let grader = Arc::new(SlowGrader::default());
        let session = open_slow(grader.clone(), 1).await;
        session.select_option("a").await.unwrap();

        let (first, second) = tokio::join!(session.submit(), session.submit());
        assert_eq!(grader.calls.load(Ordering::SeqCst), 1);
        let failures: Vec<_> = [first, second].into_iter().filter_map(|r| r.err()).collect();
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], Error::Attempt(AttemptError::AlreadySubmitting)));
        assert_eq!(session.view().await.status, AttemptStatus::ResultsShown);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_just_before_expiry_wins() {
        let grader = Arc::new(SlowGrader::default());
        let session = open_slow(grader.clone(), 1).await;
        session.select_option("b").await.unwrap();

        tokio::time::sleep(Duration::from_millis(89_500)).await;
        let manual = tokio::spawn({
            let session = session.clone();
            async move { session.submit().await }
        });
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(manual.await.unwrap().is_ok());
        assert_eq!(grader.calls.load(Ordering::SeqCst), 1);
        let view = session.view().await;
        assert_eq!(view.status, AttemptStatus::ResultsShown);
        assert_eq!(view.remaining_seconds, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_during_automatic_grading_is_refused() {
        let grader = Arc::new(SlowGrader::default());
        let session = open_slow(grader.clone(), 1).await;

        tokio::time::sleep(Duration::from_millis(91_500)).await;
        assert_eq!(session.view().await.status, AttemptStatus::Submitting);
        let err = session.submit().await.unwrap_err();
        assert!(matches!(err, Error::Attempt(AttemptError::AlreadySubmitting)));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(grader.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.view().await.status, AttemptStatus::ResultsShown);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_stops_the_countdown() {
        let mut api = MockQuizApi::new();
        api.expect_submit_answers()
            .times(1)
            .returning(|_, _, _| Ok(graded(1, 1)));
        let session = open(api, 1).await;
        session.select_option("b").await.unwrap();
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        let view = session.submit().await.unwrap();
        assert_eq!(view.remaining_seconds, 80);
        assert!(view.result.as_ref().unwrap().passed);

        tokio::time::sleep(Duration::from_secs(200)).await;
        let view = session.view().await;
        assert_eq!(view.remaining_seconds, 80);
        assert_eq!(view.status, AttemptStatus::ResultsShown);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_grading_keeps_answers_and_resumes() {
        let mut api = MockQuizApi::new();
        let mut seq = mockall::Sequence::new();
        api.expect_submit_answers()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(Error::Upstream("connection refused".into())));
        api.expect_submit_answers()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, answers| {
                assert_eq!(answers.len(), 1);
                Ok(graded(1, 2))
            });
        let session = open(api, 2).await;
        session.select_option("c").await.unwrap();

        let err = session.submit().await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        let view = session.view().await;
        assert_eq!(view.status, AttemptStatus::InProgress);
        assert_eq!(view.selected_option.as_deref(), Some("c"));
        assert!(view.last_error.is_some());

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(session.view().await.remaining_seconds, 177);

        let view = session.submit().await.unwrap();
        assert_eq!(view.status, AttemptStatus::ResultsShown);
        assert!(view.last_error.is_none());
        assert!(view.result.unwrap().can_retry);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_grading_times_out() {
        struct StalledApi;

        #[async_trait::async_trait]
        impl QuizApi for StalledApi {
            async fn fetch_course_quizzes(&self, _: &BearerToken, _: i64) -> Result<Vec<Quiz>> {
                Ok(Vec::new())
            }

            async fn submit_answers(
                &self,
                _: &BearerToken,
                _: i64,
                _: &[crate::models::SelectedAnswer],
            ) -> Result<GradingResponse> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(graded(0, 0))
            }
        }

        let session = QuizSession::start(
            sample_quiz(1),
            token(),
            Arc::new(StalledApi),
            Arc::new(LogCompletionSink),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        session.select_option("a").await.unwrap();
        let err = session.submit().await.unwrap_err();
        assert!(matches!(err, Error::UpstreamTimeout(_)));
        assert_eq!(session.view().await.status, AttemptStatus::InProgress);
        session.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_failure_resets_everything() {
        let mut api = MockQuizApi::new();
        api.expect_submit_answers()
            .returning(|_, _, _| Ok(graded(3, 5)));
        let sink = Arc::new(CountingSink::default());
        let session = QuizSession::start(
            sample_quiz(5),
            token(),
            Arc::new(api),
            sink.clone(),
            Duration::from_secs(15),
        )
        .await
        .unwrap();
        for index in [0, 1, 2, 4] {
            session.jump_to(index).await.unwrap();
            session.select_option("a").await.unwrap();
        }
        let view = session.submit().await.unwrap();
        let result = view.result.unwrap();
        assert_eq!(result.score_label, "3/5");
        assert_eq!(result.percentage_label, "60.0%");
        assert!(!result.passed);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(sink.reports.load(Ordering::SeqCst), 1);
        let view = session.retry().await.unwrap();
        assert_eq!(view.current_index, 0);
        assert_eq!(view.answered_count, 0);
        assert_eq!(view.remaining_seconds, 450);
        assert_eq!(view.attempt_number, 2);

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(session.view().await.remaining_seconds, 448);
        session.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_completion_sink_does_not_hold_the_result() {
        struct SlowSink {
            reports: AtomicU32,
        }

        #[async_trait::async_trait]
        impl CompletionSink for SlowSink {
            async fn report(&self, _report: &CompletionReport) {
                tokio::time::sleep(Duration::from_secs(600)).await;
                self.reports.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut api = MockQuizApi::new();
        api.expect_submit_answers()
            .returning(|_, _, _| Ok(graded(1, 1)));
        let sink = Arc::new(SlowSink { reports: AtomicU32::new(0) });
        let session = QuizSession::start(
            sample_quiz(1),
            token(),
            Arc::new(api),
            sink.clone(),
            Duration::from_secs(15),
        )
        .await
        .unwrap();
        session.select_option("a").await.unwrap();

        let started = Instant::now();
        let view = session.submit().await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(view.status, AttemptStatus::ResultsShown);
        assert_eq!(sink.reports.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(601)).await;
        assert_eq!(sink.reports.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn running_or_grading_sessions_are_never_abandoned() {
        let grader = Arc::new(SlowGrader::default());
        let session = open_slow(grader.clone(), 2).await;
        let ttl = Duration::from_secs(30);

        tokio::time::sleep(Duration::from_millis(100_500)).await;
        assert!(session.idle_for() > ttl);
        assert!(!session.is_abandoned(ttl).await);

        // countdown expires at 180 s and grading takes 3 s
        tokio::time::sleep(Duration::from_secs(80)).await;
        assert!(session.inner.lock().await.attempt.submission_in_flight());
        assert!(!session.is_abandoned(ttl).await);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!session.is_abandoned(ttl).await);
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(session.is_abandoned(ttl).await);
    }

    #[tokio::test(start_paused = true)]
    async fn close_stops_ticks() {
        let session = open(MockQuizApi::new(), 1).await;
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        session.close().await;
        tokio::time::sleep(Duration::from_secs(300)).await;
        let view = session.view().await;
        assert_eq!(view.status, AttemptStatus::Closed);
        assert_eq!(view.remaining_seconds, 88);
        assert!(session.select_option("a").await.is_err());
    }
}
