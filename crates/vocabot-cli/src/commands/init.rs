//! The `vocabot init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("vocabot.toml").exists() {
        println!("vocabot.toml already exists, skipping.");
    } else {
        std::fs::write("vocabot.toml", SAMPLE_CONFIG)?;
        println!("Created vocabot.toml");
    }

    println!("\nNext steps:");
    println!("  1. Copy the Cookie header of a logged-in browser session into vocabot.toml");
    println!("  2. Run: vocabot check-login");
    println!("  3. Run: ollama pull llama3.1:8b-instruct-q5_K_S");
    println!("  4. Run: vocabot run");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# vocabot configuration

# Cookie header of a logged-in browser session. VOCABOT_COOKIE overrides it.
cookie = "${VOCABOT_COOKIE}"

[service]
base_url = "https://www.vocabulary.com"
# Balances below this mean the session is logged out.
auth_threshold = 100000

[oracle]
base_url = "http://localhost:11434"
model = "llama3.1:8b-instruct-q5_K_S"
timeout_secs = 300

[run]
point_cap = 100000
sleep_budget_secs = 7200
# Multiplier on the 1-5 s pause between questions. 0 disables pausing.
sleep_scale = 0.0
fetch_retries = 1
retry_delay_ms = 1000

[paths]
progress_file = "progress.json"
answer_log = "data.txt"
"#;
