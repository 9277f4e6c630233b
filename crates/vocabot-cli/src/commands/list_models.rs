//! The `vocabot list-models` command.

use std::path::PathBuf;

use anyhow::Result;

use vocabot_core::config::load_config_from;
use vocabot_oracle::OllamaOracle;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let oracle = OllamaOracle::new(&config.oracle)?;
    let models = oracle.list_models_async().await?;

    if models.is_empty() {
        println!(
            "No models found at {}. Pull one with: ollama pull {}",
            config.oracle.base_url, config.oracle.model
        );
        return Ok(());
    }

    println!("Ollama at {}:", config.oracle.base_url);
    for model in &models {
        let marker = if model.name == config.oracle.model {
            " (configured)"
        } else {
            ""
        };
        println!(
            "  {} ({:.1} GB){marker}",
            model.name,
            model.size as f64 / 1_000_000_000.0
        );
    }

    if !models.iter().any(|m| m.name == config.oracle.model) {
        println!(
            "\nConfigured model '{}' is not available. Pull it with: ollama pull {}",
            config.oracle.model, config.oracle.model
        );
    }

    Ok(())
}
