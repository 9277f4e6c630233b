//! The `vocabot check-login` command.

use std::path::PathBuf;

use anyhow::Result;

use vocabot_client::VocabClient;
use vocabot_core::config::{load_config_from, COOKIE_ENV_VAR};

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let mut client = VocabClient::new(&config)?;

    if client.state().cookies.is_empty() {
        tracing::warn!(
            "no session cookies configured; set `cookie` in vocabot.toml or {COOKIE_ENV_VAR}"
        );
    }

    if client.check_login().await {
        println!("Logged in to {}", config.service.base_url);
        Ok(())
    } else {
        anyhow::bail!(
            "not logged in to {}; refresh the session cookies",
            config.service.base_url
        )
    }
}
