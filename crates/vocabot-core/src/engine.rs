//! The driver loop.
//!
//! Polls a [`QuestionSource`] for questions, asks an [`AnswerOracle`] for an
//! answer, submits it, and keeps running tallies until a budget runs out.
//! Everything is sequential: one question is in flight at a time.

use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use rand::Rng;

use crate::config::RunConfig;
use crate::error::SessionError;
use crate::model::{Answer, Question, Reconciliation};
use crate::session::SessionState;
use crate::statistics::RunStats;
use crate::traits::{AnswerOracle, QuestionSource, SubmitOutcome};

/// Configuration for the driver loop.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Stop once the session has this many points.
    pub point_cap: u64,
    /// Stop once this much time has been spent pausing between questions.
    pub sleep_budget: Duration,
    /// Multiplier on the random 1 to 5 s pause. 0 disables pausing.
    pub sleep_scale: f64,
    /// Extra attempts after a failed fetch before the run is aborted.
    pub fetch_retries: u32,
    /// Pause before each fetch retry.
    pub retry_delay: Duration,
    /// Optional cap on answers submitted this run.
    pub max_questions: Option<u64>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::from(&RunConfig::default())
    }
}

impl From<&RunConfig> for DriverConfig {
    fn from(run: &RunConfig) -> Self {
        Self {
            point_cap: run.point_cap,
            sleep_budget: Duration::from_secs(run.sleep_budget_secs),
            sleep_scale: run.sleep_scale,
            fetch_retries: run.fetch_retries,
            retry_delay: Duration::from_millis(run.retry_delay_ms),
            max_questions: None,
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    PointCapReached,
    SleepBudgetExhausted,
    QuestionLimitReached,
    /// The service reported a logged-out balance.
    Unauthenticated,
    /// No question could be fetched, even after retrying.
    FetchFailed,
    /// The oracle could not produce an answer.
    OracleFailed,
}

impl StopReason {
    /// Returns `true` if the run ended because something went wrong.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            StopReason::Unauthenticated | StopReason::FetchFailed | StopReason::OracleFailed
        )
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: RunStats,
    pub points: u64,
    pub errors: u64,
    pub stop: StopReason,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_status(&self, stats: &RunStats, state: &SessionState);
    fn on_answer(&self, question: &Question, answer: &Answer, outcome: &SubmitOutcome);
    fn on_warning(&self, message: &str);
    fn on_finish(&self, summary: &RunSummary);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_status(&self, _: &RunStats, _: &SessionState) {}
    fn on_answer(&self, _: &Question, _: &Answer, _: &SubmitOutcome) {}
    fn on_warning(&self, _: &str) {}
    fn on_finish(&self, _: &RunSummary) {}
}

/// The question/answer loop.
pub struct Driver {
    config: DriverConfig,
}

impl Driver {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    /// Run until a budget is exhausted or the session becomes unusable.
    pub async fn run<S>(
        &self,
        source: &mut S,
        oracle: &dyn AnswerOracle,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunSummary>
    where
        S: QuestionSource + ?Sized,
    {
        let start = Instant::now();
        let started_at = Utc::now();
        let mut stats = RunStats::default();
        let mut total_sleep = Duration::ZERO;
        let mut started = false;

        let stop = loop {
            if source.state().total_points >= self.config.point_cap {
                break StopReason::PointCapReached;
            }
            if total_sleep >= self.config.sleep_budget {
                break StopReason::SleepBudgetExhausted;
            }
            if self
                .config
                .max_questions
                .is_some_and(|max| stats.answered() >= max)
            {
                break StopReason::QuestionLimitReached;
            }

            reporter.on_status(&stats, source.state());

            if started {
                let pause = self.pause();
                if !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                    total_sleep += pause;
                }
            }
            started = true;

            match self.acquire_question(source, reporter).await {
                Ok(true) => {}
                Ok(false) => break StopReason::FetchFailed,
                Err(_) => break StopReason::Unauthenticated,
            }

            let Some(question) = source.state().pending_question().cloned() else {
                tracing::debug!("no pending question after fetch, polling again");
                continue;
            };

            let answer = match oracle.ask(&question).await {
                Ok(answer) => answer,
                Err(e) => {
                    tracing::error!(oracle = oracle.name(), "oracle failed: {e:#}");
                    reporter.on_warning(&format!("oracle '{}' failed: {e:#}", oracle.name()));
                    break StopReason::OracleFailed;
                }
            };

            let (answer, reconciliation) = answer.reconcile(&question);
            match reconciliation {
                Reconciliation::ExactCode => {}
                Reconciliation::MatchedText => {
                    tracing::debug!(
                        code = %answer.chosen.answer_code,
                        "oracle code not offered, matched choice by text"
                    );
                }
                Reconciliation::Unmatched => {
                    tracing::warn!(
                        code = %answer.chosen.answer_code,
                        text = %answer.chosen.display_text,
                        "oracle answer matches no offered choice, submitting as-is"
                    );
                    reporter.on_warning("oracle answer matches no offered choice");
                }
            }

            match source.submit_answer(&answer).await {
                Ok(outcome) => {
                    match outcome.verdict() {
                        Some(correct) => stats.record(correct),
                        None => tracing::info!("round ended before the answer was judged"),
                    }
                    reporter.on_answer(&question, &answer, &outcome);
                }
                Err(e) if e.is_fatal() => {
                    tracing::error!("{e}");
                    break StopReason::Unauthenticated;
                }
                Err(e) => {
                    tracing::warn!("failed to submit answer: {e}");
                    reporter.on_warning(&format!("failed to submit answer: {e}"));
                }
            }
        };

        let summary = RunSummary {
            stats,
            points: source.state().total_points,
            errors: source.state().total_errors,
            stop,
            started_at,
            elapsed: start.elapsed(),
        };
        reporter.on_finish(&summary);
        Ok(summary)
    }

    /// Make sure the source holds a fresh question, retrying a failed fetch
    /// up to `fetch_retries` times. The attempt count is per question, not
    /// cumulative over the run.
    ///
    /// `Ok(false)` means every attempt failed. `Err` is always fatal.
    async fn acquire_question<S>(
        &self,
        source: &mut S,
        reporter: &dyn ProgressReporter,
    ) -> std::result::Result<bool, SessionError>
    where
        S: QuestionSource + ?Sized,
    {
        let attempts = self.config.fetch_retries + 1;
        for attempt in 1..=attempts {
            if attempt > 1 {
                reporter.on_warning(&format!(
                    "failed to fetch question, retrying ({attempt}/{attempts})"
                ));
                tokio::time::sleep(self.config.retry_delay).await;
            }

            let result = if source.state().has_session() {
                source.fetch_question_or_recover().await
            } else {
                source.start_random_list().await.map(|_| true)
            };

            let fetched = match result {
                Ok(fetched) => fetched,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!("failed to fetch question: {e}");
                    false
                }
            };

            if fetched {
                return Ok(true);
            }
        }
        tracing::error!("failed to fetch a question after {attempts} attempt(s)");
        Ok(false)
    }

    fn pause(&self) -> Duration {
        if self.config.sleep_scale <= 0.0 {
            return Duration::ZERO;
        }
        let secs: f64 = rand::rng().random_range(1.0..5.0);
        Duration::from_millis((secs * self.config.sleep_scale * 1000.0).round() as u64)
    }
}
