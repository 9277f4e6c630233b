//! Configuration loading.
//!
//! Everything the run needs to know about endpoints, budgets and files comes
//! from a `vocabot.toml`. Every field has a default, so an empty file (or
//! no file at all) gives the stock tuning.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable holding a `Cookie` header for a logged-in browser
/// session. Overrides `cookie` from the file.
pub const COOKIE_ENV_VAR: &str = "VOCABOT_COOKIE";

/// Top-level vocabot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VocabotConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    /// Seed `Cookie` header used when no saved session provides one.
    #[serde(default)]
    pub cookie: String,
}

/// The remote question service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Account balances below this mean the session is logged out.
    #[serde(default = "default_auth_threshold")]
    pub auth_threshold: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_service_url(),
            user_agent: default_user_agent(),
            auth_threshold: default_auth_threshold(),
        }
    }
}

/// The local text-generation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            model: default_model(),
            system_prompt: default_system_prompt(),
            timeout_secs: default_oracle_timeout(),
        }
    }
}

/// Driver loop budgets and the pool of word lists to draw from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Stop once the session total reaches this many points.
    #[serde(default = "default_point_cap")]
    pub point_cap: u64,
    /// Stop once this many seconds have been spent sleeping between questions.
    #[serde(default = "default_sleep_budget")]
    pub sleep_budget_secs: u64,
    /// Multiplier on the 1 to 5 s pause between questions. 0 disables pausing.
    #[serde(default)]
    pub sleep_scale: f64,
    /// Extra fetch attempts before the run is aborted.
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: u32,
    /// Pause before a fetch retry, in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Word-list ids a new list is picked from.
    #[serde(default = "default_list_candidates")]
    pub list_candidates: Vec<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            point_cap: default_point_cap(),
            sleep_budget_secs: default_sleep_budget(),
            sleep_scale: 0.0,
            fetch_retries: default_fetch_retries(),
            retry_delay_ms: default_retry_delay(),
            list_candidates: default_list_candidates(),
        }
    }
}

/// Local files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_progress_file")]
    pub progress_file: PathBuf,
    #[serde(default = "default_answer_log")]
    pub answer_log: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            progress_file: default_progress_file(),
            answer_log: default_answer_log(),
        }
    }
}

fn default_service_url() -> String {
    "https://www.vocabulary.com".to_string()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36".to_string()
}
fn default_auth_threshold() -> u64 {
    100_000
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "llama3.1:8b-instruct-q5_K_S".to_string()
}
fn default_system_prompt() -> String {
    "You're a vocabulary teacher that answers my questions about vocabulary. \
     Do not modify the question, and keep the question and answers exactly as received."
        .to_string()
}
fn default_oracle_timeout() -> u64 {
    300
}
fn default_point_cap() -> u64 {
    100_000
}
fn default_sleep_budget() -> u64 {
    7200
}
fn default_fetch_retries() -> u32 {
    1
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_list_candidates() -> Vec<u64> {
    vec![
        8340291, 8995949, 9048293, 9336685, 148703, 151274, 148713, 148732, 148845, 149637,
        149640, 149642, 149643, 151263, 151274, 151399, 151404, 151465, 151466, 156619, 156622,
        158007, 158769, 158781, 158782, 161539,
    ]
}
fn default_progress_file() -> PathBuf {
    PathBuf::from("progress.json")
}
fn default_answer_log() -> PathBuf {
    PathBuf::from("data.txt")
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        // Substituted values are copied verbatim, never rescanned.
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `vocabot.toml` in the current directory
/// 2. `~/.config/vocabot/config.toml`
///
/// `VOCABOT_COOKIE` overrides the seed cookie header.
pub fn load_config() -> Result<VocabotConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<VocabotConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("vocabot.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => VocabotConfig::default(),
    };

    if let Ok(cookie) = std::env::var(COOKIE_ENV_VAR) {
        config.cookie = cookie;
    }

    Ok(config)
}

/// Parse a TOML string, resolving `${VAR}` references and validating the result.
pub fn parse_config(content: &str) -> Result<VocabotConfig> {
    let mut config: VocabotConfig = toml::from_str(content)?;
    config.cookie = resolve_env_vars(&config.cookie);
    config.service.base_url = resolve_env_vars(&config.service.base_url);
    config.oracle.base_url = resolve_env_vars(&config.oracle.base_url);
    config.validate()?;
    Ok(config)
}

impl VocabotConfig {
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.run.list_candidates.is_empty(),
            "run.list_candidates must name at least one word list"
        );
        anyhow::ensure!(
            self.run.sleep_scale >= 0.0,
            "run.sleep_scale must not be negative"
        );
        anyhow::ensure!(
            !self.oracle.model.trim().is_empty(),
            "oracle.model must not be empty"
        );
        Ok(())
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("vocabot"))
}
