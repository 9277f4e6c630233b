//! Trait seams between the driver loop and its collaborators.
//!
//! `AnswerOracle` is implemented by `vocabot-oracle`, `QuestionSource` by
//! `vocabot-client`. The driver only sees these traits, so it can be tested
//! against in-memory fakes.

use async_trait::async_trait;

use crate::error::SessionError;
use crate::model::{Answer, Question};
use crate::session::SessionState;

// ---------------------------------------------------------------------------
// Answer oracle
// ---------------------------------------------------------------------------

/// Something that picks an answer for a question.
#[async_trait]
pub trait AnswerOracle: Send + Sync {
    /// Human-readable oracle name (e.g. "ollama").
    fn name(&self) -> &str;

    /// Choose an answer for `question`.
    async fn ask(&self, question: &Question) -> anyhow::Result<Answer>;
}

// ---------------------------------------------------------------------------
// Question source
// ---------------------------------------------------------------------------

/// Result of starting a list or fetching the next question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A new question is stored as the current question.
    Question,
    /// The active list ended. A new list may already have been started,
    /// in which case its first question is the current question.
    ListFinished,
}

/// Result of submitting an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The answer was recorded and the list continues.
    Answered { correct: bool, points: u64 },
    /// The answer was recorded and the list is over; a new list was started.
    ListFinished { correct: bool, points: u64 },
    /// The service ended the round before judging the answer.
    RoundOver,
}

impl SubmitOutcome {
    /// The service's verdict, or `None` when the answer was never judged.
    pub fn verdict(&self) -> Option<bool> {
        match self {
            SubmitOutcome::Answered { correct, .. } | SubmitOutcome::ListFinished { correct, .. } => {
                Some(*correct)
            }
            SubmitOutcome::RoundOver => None,
        }
    }

    pub fn was_correct(&self) -> bool {
        self.verdict().unwrap_or(false)
    }

    /// Points awarded for this answer (zero when wrong or unjudged).
    pub fn points(&self) -> u64 {
        match self {
            SubmitOutcome::Answered { points, .. } | SubmitOutcome::ListFinished { points, .. } => {
                *points
            }
            SubmitOutcome::RoundOver => 0,
        }
    }
}

/// A stateful supplier of practice questions.
#[async_trait]
pub trait QuestionSource: Send {
    /// Current session state, for reporting.
    fn state(&self) -> &SessionState;

    /// Start a practice session on a randomly chosen candidate list.
    async fn start_random_list(&mut self) -> Result<FetchOutcome, SessionError>;

    /// Fetch the next question, starting a new list if the current one is
    /// finished.
    ///
    /// Recoverable failures come back as `Ok(false)`; only fatal errors
    /// (see [`SessionError::is_fatal`]) are returned as `Err`.
    async fn fetch_question_or_recover(&mut self) -> Result<bool, SessionError>;

    /// Submit an answer for the current question.
    async fn submit_answer(&mut self, answer: &Answer) -> Result<SubmitOutcome, SessionError>;
}
