//! Session state and its on-disk form.
//!
//! The state is owned by exactly one client and written back after every
//! exchange that changes it. Two files are involved: a JSON progress file
//! that is overwritten in place, and a plain-text answer log that is only
//! ever appended to.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cookies::CookieJar;
use crate::error::StateError;
use crate::model::{Answer, Question, QuestionContext, QuestionType};

/// Everything needed to resume a practice session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Rotating token sent with every request. Empty before the first start.
    pub session_secret: String,
    /// Last parsed question.
    pub current_question: Option<Question>,
    /// Type of `current_question`.
    pub question_type: Option<QuestionType>,
    /// Points earned by correct answers.
    pub total_points: u64,
    /// Non-200 responses seen this run.
    pub total_errors: u64,
    /// Fraction of the active word list completed, in `[0, 1]`.
    pub list_progress: f64,
    pub cookies: CookieJar,
}

impl SessionState {
    /// Whether a session has been started (or resumed).
    pub fn has_session(&self) -> bool {
        !self.session_secret.is_empty()
    }

    /// Whether the active list is finished.
    pub fn list_finished(&self) -> bool {
        self.list_progress >= 1.0
    }

    /// The current question if it still needs an answer.
    pub fn pending_question(&self) -> Option<&Question> {
        self.current_question.as_ref().filter(|q| !q.completed)
    }
}

/// Serialized shape of the progress file.
#[derive(Debug, Serialize, Deserialize)]
struct ProgressFile {
    #[serde(default)]
    current_question: Option<Question>,
    #[serde(default)]
    points: u64,
    #[serde(default)]
    question_type: String,
    #[serde(default)]
    r_secret: String,
    #[serde(default)]
    cookies: String,
}

impl From<&SessionState> for ProgressFile {
    fn from(state: &SessionState) -> Self {
        Self {
            current_question: state.current_question.clone(),
            points: state.total_points,
            question_type: state
                .question_type
                .as_ref()
                .map(|t| t.code().to_string())
                .unwrap_or_default(),
            r_secret: state.session_secret.clone(),
            cookies: state.cookies.header(),
        }
    }
}

impl From<ProgressFile> for SessionState {
    fn from(file: ProgressFile) -> Self {
        Self {
            session_secret: file.r_secret,
            current_question: file.current_question.filter(|q| !q.is_blank()),
            question_type: (!file.question_type.is_empty())
                .then(|| QuestionType::from_code(&file.question_type)),
            total_points: file.points,
            total_errors: 0,
            list_progress: 0.0,
            cookies: CookieJar::from_header(&file.cookies),
        }
    }
}

/// Locations of the progress file and the answer log.
#[derive(Debug, Clone)]
pub struct SessionStore {
    progress_path: PathBuf,
    answer_log_path: PathBuf,
}

impl SessionStore {
    pub fn new(progress_path: impl Into<PathBuf>, answer_log_path: impl Into<PathBuf>) -> Self {
        Self {
            progress_path: progress_path.into(),
            answer_log_path: answer_log_path.into(),
        }
    }

    pub fn progress_path(&self) -> &Path {
        &self.progress_path
    }

    pub fn answer_log_path(&self) -> &Path {
        &self.answer_log_path
    }

    /// Load saved state, or `None` if no progress file exists yet.
    pub fn load(&self) -> Result<Option<SessionState>, StateError> {
        if !self.progress_path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.progress_path).map_err(|source| {
            StateError::Io {
                path: self.progress_path.clone(),
                source,
            }
        })?;
        let file: ProgressFile =
            serde_json::from_str(&content).map_err(|source| StateError::Parse {
                path: self.progress_path.clone(),
                source,
            })?;
        Ok(Some(file.into()))
    }

    /// Overwrite the progress file with `state`.
    pub fn save(&self, state: &SessionState) -> Result<(), StateError> {
        let json = serde_json::to_string(&ProgressFile::from(state))?;
        let io_err = |source| StateError::Io {
            path: self.progress_path.clone(),
            source,
        };
        if let Some(parent) = self.progress_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        std::fs::write(&self.progress_path, json).map_err(io_err)
    }

    /// Append one `context|prompt|choices|answer` record for a correctly
    /// answered question.
    pub fn append_answer(&self, question: &Question, answer: &Answer) -> Result<(), StateError> {
        let line = format_answer_record(question, answer)?;
        let io_err = |source| StateError::Io {
            path: self.answer_log_path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.answer_log_path)
            .map_err(io_err)?;
        writeln!(file, "{line}").map_err(io_err)
    }
}

/// Render the answer-log line for a question and the answer given to it.
pub fn format_answer_record(question: &Question, answer: &Answer) -> Result<String, StateError> {
    let context = match &question.context {
        None => String::new(),
        Some(QuestionContext::Sentence(s)) => s.clone(),
        Some(sentences) => serde_json::to_string(sentences)?,
    };
    Ok(format!(
        "{}|{}|{}|{}",
        context,
        question.prompt,
        serde_json::to_string(&question.choices)?,
        serde_json::to_string(answer)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Choice;

    fn sample_state() -> SessionState {
        SessionState {
            session_secret: "S1".into(),
            current_question: Some(Question {
                context: Some(QuestionContext::Sentence("ctx".into())),
                prompt: "p".into(),
                choices: vec![Choice::new("a", "1")],
                completed: false,
            }),
            question_type: Some(QuestionType::Synonym),
            total_points: 42,
            total_errors: 3,
            list_progress: 0.5,
            cookies: CookieJar::from_header("guid=g; AWSALB=x"),
        }
    }

    #[test]
    fn missing_progress_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("progress.json"), dir.path().join("data.txt"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load_restores_resumable_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("progress.json"), dir.path().join("data.txt"));
        store.save(&sample_state()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.progress_path()).unwrap()).unwrap();
        assert_eq!(raw["r_secret"], "S1");
        assert_eq!(raw["points"], 42);
        assert_eq!(raw["question_type"], "S");
        assert_eq!(raw["cookies"], "AWSALB=x; guid=g");

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.session_secret, "S1");
        assert_eq!(loaded.total_points, 42);
        assert_eq!(loaded.question_type, Some(QuestionType::Synonym));
        assert_eq!(loaded.current_question.unwrap().prompt, "p");
        assert_eq!(loaded.cookies.get("guid"), Some("g"));
        // Run-scoped counters start fresh.
        assert_eq!(loaded.total_errors, 0);
    }

    #[test]
    fn loads_placeholder_question_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(
            &path,
            r#"{"current_question": {}, "points": 0, "question_type": "", "r_secret": "", "cookies": ""}"#,
        )
        .unwrap();
        let store = SessionStore::new(&path, dir.path().join("data.txt"));
        let state = store.load().unwrap().unwrap();
        assert!(state.current_question.is_none());
        assert!(state.question_type.is_none());
        assert!(!state.has_session());
    }

    #[test]
    fn corrupt_progress_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "not json").unwrap();
        let store = SessionStore::new(&path, dir.path().join("data.txt"));
        assert!(matches!(store.load(), Err(StateError::Parse { .. })));
    }

    #[test]
    fn answer_log_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("progress.json"), dir.path().join("data.txt"));
        let question = sample_state().current_question.unwrap();
        let answer = Answer::pick(&question, Choice::new("a", "1"));

        store.append_answer(&question, &answer).unwrap();
        store.append_answer(&question, &answer).unwrap();

        let log = std::fs::read_to_string(store.answer_log_path()).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ctx|p|[{"));
        assert_eq!(lines[0].split('|').count(), 4);
    }

    #[test]
    fn pending_question_skips_completed() {
        let mut state = sample_state();
        assert!(state.pending_question().is_some());
        if let Some(q) = state.current_question.as_mut() {
            q.completed = true;
        }
        assert!(state.pending_question().is_none());
    }
}
