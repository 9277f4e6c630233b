//! Wire types for the practice service.
//!
//! The service is undocumented and not entirely consistent: numbers
//! sometimes arrive as strings, and the question payload may sit at the top
//! level or under a nested `question` object. Fields that vary are kept as
//! raw JSON and read through the helpers here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version sent with every request.
pub const PROTOCOL_VERSION: u32 = 3;

/// Error code the service uses when the practice round is over.
pub const ROUND_OVER_ERROR: &str = "RestartChallengeException";

#[derive(Debug, Serialize)]
pub struct StartRequest<'a> {
    pub v: u32,
    pub activitytype: &'a str,
    pub wordlistid: u64,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub secret: &'a str,
}

#[derive(Debug, Serialize)]
pub struct NextQuestionRequest<'a> {
    pub secret: &'a str,
    pub v: u32,
}

#[derive(Debug, Serialize)]
pub struct SaveAnswerRequest<'a> {
    pub secret: &'a str,
    pub v: u32,
    pub rt: u64,
    pub a: &'a str,
}

/// Body shared by the start, next-question and save-answer responses.
#[derive(Debug, Default, Deserialize)]
pub struct ChallengeResponse {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub pdata: Option<Value>,
    #[serde(default)]
    pub qtype: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub question: Option<Value>,
    #[serde(default)]
    pub game: Option<Value>,
    #[serde(default)]
    pub answer: Option<AnswerVerdict>,
    #[serde(default)]
    pub error: Option<String>,
}

/// The `answer` object of a save-answer response.
#[derive(Debug, Default, Deserialize)]
pub struct AnswerVerdict {
    #[serde(default)]
    pub correct: Option<bool>,
    #[serde(default)]
    pub points: Option<Value>,
    #[serde(default)]
    pub word: Option<String>,
}

impl AnswerVerdict {
    /// Points awarded, zero when absent or unreadable.
    pub fn points(&self) -> u64 {
        self.points
            .as_ref()
            .and_then(as_number)
            .map(|p| p.max(0.0) as u64)
            .unwrap_or(0)
    }
}

/// Response of the `auth/me.json` endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct MeResponse {
    #[serde(default)]
    pub auth: Option<AuthStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthStatus {
    #[serde(default)]
    pub loggedin: bool,
}

impl ChallengeResponse {
    /// Account point balance from `pdata.points`.
    pub fn balance(&self) -> Option<u64> {
        self.pdata
            .as_ref()
            .and_then(|p| p.get("points"))
            .and_then(as_number)
            .map(|p| p.max(0.0) as u64)
    }

    /// List progress from `game.progress`, if present and numeric.
    pub fn progress(&self) -> Option<f64> {
        self.game
            .as_ref()
            .and_then(|g| g.get("progress"))
            .and_then(as_number)
    }

    /// Question type code and base64 payload, from the top level or from a
    /// nested `question` object.
    pub fn question_payload(&self) -> Option<(String, String)> {
        if let (Some(qtype), Some(code)) = (&self.qtype, &self.code) {
            return Some((qtype.clone(), code.clone()));
        }
        let nested = self.question.as_ref()?;
        let qtype = nested.get("type")?.as_str()?;
        let code = nested.get("code")?.as_str()?;
        Some((qtype.to_string(), code.to_string()))
    }

    pub fn is_round_over(&self) -> bool {
        self.error.as_deref() == Some(ROUND_OVER_ERROR)
    }
}

/// Read a JSON number, or a string holding one.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
