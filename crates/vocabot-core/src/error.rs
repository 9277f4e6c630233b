//! Error types shared across the workspace.
//!
//! `SessionError` lives in `vocabot-core` so the driver loop can classify
//! failures coming out of any `QuestionSource` without string matching.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while turning a question payload into a [`Question`](crate::model::Question).
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The base64 payload could not be decoded.
    #[error("invalid base64 question payload: {0}")]
    InvalidPayload(String),

    /// The decoded payload was not UTF-8.
    #[error("question payload is not valid UTF-8")]
    InvalidUtf8,

    /// A multiple-choice question had no choices block.
    #[error("question markup has no choices block")]
    MissingChoices,

    /// A terminal-reveal question had no revealed answer.
    #[error("question markup has no revealed answer")]
    MissingRevealedAnswer,

    /// A choice element lacked a required attribute.
    #[error("choice {index} is missing attribute '{attribute}'")]
    MissingAttribute {
        index: usize,
        attribute: &'static str,
    },
}

/// Failures reading or writing local session files.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse progress file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize session state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from one exchange with the remote question service.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The service answered with a non-200 status.
    #[error("service returned HTTP {status} for {endpoint}")]
    Transport { endpoint: String, status: u16 },

    /// The account balance was below the sanity threshold, so the
    /// session cookies are no longer logged in.
    #[error("session is not authenticated (point balance {balance} below {threshold})")]
    Unauthenticated { balance: u64, threshold: u64 },

    /// The response was missing a field the protocol requires.
    #[error("unexpected response from {endpoint}: {message}")]
    Protocol { endpoint: String, message: String },

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The question markup could not be parsed.
    #[error("failed to parse question: {0}")]
    Extract(#[from] ExtractError),

    /// Session state could not be persisted.
    #[error(transparent)]
    State(#[from] StateError),
}

impl SessionError {
    /// Returns `true` if the run cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Unauthenticated { .. })
    }
}
