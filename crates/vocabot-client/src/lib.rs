//! vocabot-client: HTTP session client for the practice service.
//!
//! Drives the start / next-question / save-answer exchanges, feeds question
//! markup through the extractor, and keeps the session state (secret,
//! cookies, points) current on disk.

pub mod protocol;

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, ORIGIN, SET_COOKIE, USER_AGENT};
use serde::Serialize;
use tracing::instrument;

use vocabot_core::config::VocabotConfig;
use vocabot_core::cookies::CookieJar;
use vocabot_core::extract::{decode_payload, extract_question};
use vocabot_core::model::{Answer, QuestionType};
use vocabot_core::session::{SessionState, SessionStore};
use vocabot_core::traits::{FetchOutcome, QuestionSource, SubmitOutcome};

pub use vocabot_core::error::SessionError;

use crate::protocol::{
    ChallengeResponse, MeResponse, NextQuestionRequest, SaveAnswerRequest, StartRequest,
    PROTOCOL_VERSION,
};

const START_PATH: &str = "/challenge/start.json";
const NEXT_QUESTION_PATH: &str = "/challenge/nextquestion.json";
const SAVE_ANSWER_PATH: &str = "/challenge/saveanswer.json";
const ME_PATH: &str = "/auth/me.json";

/// Practice mode; "c" would be a timed challenge.
const ACTIVITY_PRACTICE: &str = "p";

/// Simulated answer time range, in seconds.
const RESPONSE_TIME_SECS: std::ops::Range<f64> = 3.0..7.0;

/// Request body encoding.
enum Body<'a, T: Serialize> {
    Json(&'a T),
    Form(&'a T),
}

/// Raw result of one exchange: status plus body text.
struct Reply {
    status: u16,
    body: String,
}

/// Client for one practice session.
pub struct VocabClient {
    http: reqwest::Client,
    base_url: String,
    auth_threshold: u64,
    list_candidates: Vec<u64>,
    state: SessionState,
    store: SessionStore,
}

impl VocabClient {
    /// Build a client from configuration, resuming the saved session if the
    /// progress file exists.
    pub fn new(config: &VocabotConfig) -> anyhow::Result<Self> {
        let store = SessionStore::new(&config.paths.progress_file, &config.paths.answer_log);
        let state = store
            .load()
            .context("failed to load saved session")?
            .unwrap_or_default();
        Self::with_state(config, store, state)
    }

    /// Build a client around an explicit state.
    pub fn with_state(
        config: &VocabotConfig,
        store: SessionStore,
        mut state: SessionState,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !config.run.list_candidates.is_empty(),
            "at least one word list candidate is required"
        );

        if state.cookies.is_empty() {
            state.cookies = CookieJar::from_header(&config.cookie);
        }

        let base_url = config.service.base_url.trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.service.user_agent).context("invalid user agent")?,
        );
        headers.insert(
            ORIGIN,
            HeaderValue::from_str(&base_url).context("invalid service base URL")?,
        );
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url,
            auth_threshold: config.service.auth_threshold,
            list_candidates: config.run.list_candidates.clone(),
            state,
            store,
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Pick a word list from the candidate pool.
    pub fn random_list_id(&self) -> u64 {
        self.list_candidates
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or_default()
    }

    /// Ask the service whether the configured cookies belong to a logged-in
    /// account. Any failure counts as "not logged in".
    #[instrument(skip(self))]
    pub async fn check_login(&mut self) -> bool {
        let url = self.url(ME_PATH);
        let mut request = self.http.get(&url);
        if !self.state.cookies.is_empty() {
            request = request.header(COOKIE, self.state.cookies.header());
        }
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("login check failed: {e}");
                return false;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(status = response.status().as_u16(), "login check rejected");
            return false;
        }
        match response.json::<MeResponse>().await {
            Ok(me) => me.auth.is_some_and(|a| a.loggedin),
            Err(e) => {
                tracing::warn!("unreadable login status: {e}");
                false
            }
        }
    }

    /// Begin a practice session on `list_id`, or resume the stored one.
    #[instrument(skip(self))]
    pub async fn start_list(&mut self, list_id: u64) -> Result<FetchOutcome, SessionError> {
        let secret = self.state.session_secret.clone();
        if secret.is_empty() {
            tracing::info!("starting new practice session");
        } else {
            tracing::info!("continuing previous practice session");
        }

        let request = StartRequest {
            v: PROTOCOL_VERSION,
            activitytype: ACTIVITY_PRACTICE,
            wordlistid: list_id,
            secret: &secret,
        };
        let reply = self.exchange(START_PATH, Body::Json(&request)).await?;
        let Some(response) = self.accept(START_PATH, reply)? else {
            return Ok(FetchOutcome::ListFinished);
        };
        // Progress resets only once the service has accepted the start.
        self.state.list_progress = 0.0;

        self.store_question(START_PATH, &response)?;
        if let Some(progress) = response.progress() {
            self.state.list_progress = progress;
        }
        self.persist()?;
        Ok(FetchOutcome::Question)
    }

    /// Request the next question. When the service reports the list as
    /// complete, a new random list is started instead.
    #[instrument(skip(self))]
    pub async fn fetch_next(&mut self) -> Result<FetchOutcome, SessionError> {
        let secret = self.state.session_secret.clone();
        let request = NextQuestionRequest {
            secret: &secret,
            v: PROTOCOL_VERSION,
        };
        let reply = self.exchange(NEXT_QUESTION_PATH, Body::Json(&request)).await?;
        let Some(response) = self.accept(NEXT_QUESTION_PATH, reply)? else {
            return Ok(FetchOutcome::ListFinished);
        };

        if response.progress() == Some(1.0) {
            tracing::info!("word list complete, switching lists");
            self.state.list_progress = 1.0;
            let list_id = self.random_list_id();
            self.start_list(list_id).await?;
            return Ok(FetchOutcome::ListFinished);
        }

        self.store_question(NEXT_QUESTION_PATH, &response)?;
        if let Some(progress) = response.progress() {
            self.state.list_progress = progress;
        }
        self.persist()?;
        Ok(FetchOutcome::Question)
    }

    /// Submit `answer` for the current question.
    #[instrument(skip(self, answer), fields(code = %answer.chosen.answer_code))]
    pub async fn submit_answer(&mut self, answer: &Answer) -> Result<SubmitOutcome, SessionError> {
        let secret = self.state.session_secret.clone();
        let request = SaveAnswerRequest {
            secret: &secret,
            v: PROTOCOL_VERSION,
            rt: random_response_time_ms(),
            a: &answer.chosen.answer_code,
        };
        let reply = self.exchange(SAVE_ANSWER_PATH, Body::Form(&request)).await?;
        let Some(response) = self.accept(SAVE_ANSWER_PATH, reply)? else {
            return Ok(SubmitOutcome::RoundOver);
        };

        let verdict = response.answer.as_ref().ok_or_else(|| SessionError::Protocol {
            endpoint: SAVE_ANSWER_PATH.to_string(),
            message: "missing answer verdict".into(),
        })?;
        let correct = verdict.correct.ok_or_else(|| SessionError::Protocol {
            endpoint: SAVE_ANSWER_PATH.to_string(),
            message: "missing answer.correct".into(),
        })?;
        let points = if correct { verdict.points() } else { 0 };
        if let Some(word) = &verdict.word {
            tracing::debug!(word = %word, correct, "answer judged");
        }

        let answered = self.state.current_question.as_mut().map(|q| {
            q.completed = true;
            q.clone()
        });

        let list_finished = match response.progress() {
            Some(progress) => {
                self.state.list_progress = progress;
                false
            }
            None => {
                tracing::info!("no list progress in answer response, starting a new list");
                let list_id = self.random_list_id();
                if let Err(e) = self.start_list(list_id).await {
                    if e.is_fatal() {
                        return Err(e);
                    }
                    tracing::warn!(list_id, "failed to start new list: {e}");
                }
                true
            }
        };

        if correct {
            self.state.total_points += points;
            if let Some(question) = &answered {
                if let Err(e) = self.store.append_answer(question, answer) {
                    tracing::warn!("failed to append answer log: {e}");
                }
            }
        }
        self.persist()?;

        Ok(if list_finished {
            SubmitOutcome::ListFinished { correct, points }
        } else {
            SubmitOutcome::Answered { correct, points }
        })
    }

    /// Fetch a question, starting a new list if the current one is done.
    ///
    /// Returns `Ok(false)` on recoverable failures so the caller can retry.
    /// Fatal errors are returned as `Err`.
    pub async fn fetch_question_or_recover(&mut self) -> Result<bool, SessionError> {
        let result = if self.state.list_finished() {
            let list_id = self.random_list_id();
            self.start_list(list_id).await
        } else {
            self.fetch_next().await
        };

        match result {
            Ok(_) => Ok(true),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!("failed to fetch question: {e}");
                Ok(false)
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send one request with the current cookies and fold any returned
    /// allow-listed cookies back into the jar.
    async fn exchange<T: Serialize>(
        &mut self,
        path: &str,
        body: Body<'_, T>,
    ) -> Result<Reply, SessionError> {
        let mut request = self.http.post(self.url(path));
        request = match body {
            Body::Json(b) => request.json(b),
            Body::Form(b) => request.form(b),
        };
        if !self.state.cookies.is_empty() {
            request = request.header(COOKIE, self.state.cookies.header());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                SessionError::Network(format!("service not reachable at {}", self.base_url))
            } else {
                SessionError::Network(e.to_string())
            }
        })?;

        for value in response.headers().get_all(SET_COOKIE) {
            if let Ok(raw) = value.to_str() {
                self.state.cookies.merge_set_cookie(raw);
            }
        }

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;
        tracing::debug!(path, status, "exchange complete");
        Ok(Reply { status, body })
    }

    /// Check status, secret and authentication on a reply.
    ///
    /// `Ok(None)` means the service ended the round; the state has already
    /// been updated so the next fetch starts a fresh list.
    fn accept(&mut self, path: &str, reply: Reply) -> Result<Option<ChallengeResponse>, SessionError> {
        if reply.status != 200 {
            if reply.status == 400 {
                let parsed: ChallengeResponse =
                    serde_json::from_str(&reply.body).unwrap_or_default();
                if parsed.is_round_over() {
                    tracing::info!(path, "practice round is over");
                    self.state.session_secret.clear();
                    self.state.current_question = None;
                    self.state.list_progress = 1.0;
                    self.persist()?;
                    return Ok(None);
                }
            }
            self.state.total_errors += 1;
            return Err(SessionError::Transport {
                endpoint: path.to_string(),
                status: reply.status,
            });
        }

        let response: ChallengeResponse =
            serde_json::from_str(&reply.body).map_err(|e| SessionError::Protocol {
                endpoint: path.to_string(),
                message: format!("invalid JSON: {e}"),
            })?;

        let secret = response.secret.clone().ok_or_else(|| SessionError::Protocol {
            endpoint: path.to_string(),
            message: "missing secret".into(),
        })?;
        self.state.session_secret = secret;

        let balance = response.balance().ok_or_else(|| SessionError::Protocol {
            endpoint: path.to_string(),
            message: "missing pdata.points".into(),
        })?;
        if balance < self.auth_threshold {
            return Err(SessionError::Unauthenticated {
                balance,
                threshold: self.auth_threshold,
            });
        }

        Ok(Some(response))
    }

    /// Decode, parse and store the question carried by `response`.
    fn store_question(&mut self, path: &str, response: &ChallengeResponse) -> Result<(), SessionError> {
        let (code, payload) = response
            .question_payload()
            .ok_or_else(|| SessionError::Protocol {
                endpoint: path.to_string(),
                message: "missing question payload".into(),
            })?;
        let question_type = QuestionType::from_code(&code);
        tracing::info!(question_type = %question_type, "parsing question");

        self.state.question_type = Some(question_type.clone());
        let html = decode_payload(&payload)?;
        let question = extract_question(&html, &question_type)?;
        self.state.current_question = Some(question);
        Ok(())
    }

    fn persist(&self) -> Result<(), SessionError> {
        self.store.save(&self.state)?;
        Ok(())
    }
}

/// Simulated time spent answering, in whole milliseconds.
fn random_response_time_ms() -> u64 {
    let secs: f64 = rand::rng().random_range(RESPONSE_TIME_SECS);
    (secs * 1000.0).round() as u64
}

#[async_trait]
impl QuestionSource for VocabClient {
    fn state(&self) -> &SessionState {
        &self.state
    }

    async fn start_random_list(&mut self) -> Result<FetchOutcome, SessionError> {
        let list_id = self.random_list_id();
        self.start_list(list_id).await
    }

    async fn fetch_question_or_recover(&mut self) -> Result<bool, SessionError> {
        VocabClient::fetch_question_or_recover(self).await
    }

    async fn submit_answer(&mut self, answer: &Answer) -> Result<SubmitOutcome, SessionError> {
        VocabClient::submit_answer(self, answer).await
    }
}
