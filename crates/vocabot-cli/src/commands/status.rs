//! The `vocabot status` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use vocabot_core::config::load_config_from;
use vocabot_core::cookies::ALLOWED_COOKIES;
use vocabot_core::session::SessionStore;

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let store = SessionStore::new(&config.paths.progress_file, &config.paths.answer_log);

    let Some(state) = store.load()? else {
        println!(
            "No saved session at {}. Run `vocabot run` to start one.",
            store.progress_path().display()
        );
        return Ok(());
    };

    let logged_answers = std::fs::read_to_string(store.answer_log_path())
        .map(|log| log.lines().filter(|l| !l.trim().is_empty()).count())
        .unwrap_or(0);

    let cookies: Vec<&str> = ALLOWED_COOKIES
        .iter()
        .copied()
        .filter(|name| state.cookies.get(name).is_some())
        .collect();

    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec![
        Cell::new("Session"),
        Cell::new(if state.has_session() { "active" } else { "none" }),
    ]);
    table.add_row(vec![Cell::new("Points"), Cell::new(state.total_points)]);
    table.add_row(vec![
        Cell::new("Question type"),
        Cell::new(
            state
                .question_type
                .as_ref()
                .map(|t| t.code().to_string())
                .unwrap_or_else(|| "-".into()),
        ),
    ]);
    table.add_row(vec![
        Cell::new("Pending question"),
        Cell::new(
            state
                .pending_question()
                .map(|q| q.prompt.clone())
                .unwrap_or_else(|| "-".into()),
        ),
    ]);
    table.add_row(vec![
        Cell::new("Cookies"),
        Cell::new(if cookies.is_empty() {
            "-".to_string()
        } else {
            cookies.join(", ")
        }),
    ]);
    table.add_row(vec![Cell::new("Logged answers"), Cell::new(logged_answers)]);

    println!("{table}");
    Ok(())
}
