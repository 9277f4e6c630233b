//! The `vocabot run` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use vocabot_client::VocabClient;
use vocabot_core::config::load_config_from;
use vocabot_core::engine::{Driver, DriverConfig, ProgressReporter, RunSummary, StopReason};
use vocabot_core::model::{Answer, Question};
use vocabot_core::session::SessionState;
use vocabot_core::statistics::{status_line, RunStats};
use vocabot_core::traits::SubmitOutcome;
use vocabot_oracle::OllamaOracle;

/// Command-line overrides applied on top of the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub max_questions: Option<u64>,
    pub point_cap: Option<u64>,
    pub sleep_scale: Option<f64>,
    pub model: Option<String>,
}

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_status(&self, stats: &RunStats, state: &SessionState) {
        eprintln!("{}", status_line(stats, state));
    }

    fn on_answer(&self, question: &Question, answer: &Answer, outcome: &SubmitOutcome) {
        let verdict = match outcome.verdict() {
            Some(true) => format!("correct (+{})", outcome.points()),
            Some(false) => "wrong".to_string(),
            None => "not judged, round over".to_string(),
        };
        eprintln!(
            "  {} -> {} [{verdict}]",
            question.prompt, answer.chosen.display_text
        );
        if matches!(outcome, SubmitOutcome::ListFinished { .. }) {
            eprintln!("  Word list finished, moved to a new list.");
        }
    }

    fn on_warning(&self, message: &str) {
        eprintln!("  WARN: {message}");
    }

    fn on_finish(&self, summary: &RunSummary) {
        eprintln!(
            "\nStopped: {} after {} answers ({:.1}s)",
            describe(summary.stop),
            summary.stats.answered(),
            summary.elapsed.as_secs_f64()
        );
    }
}

fn describe(stop: StopReason) -> &'static str {
    match stop {
        StopReason::PointCapReached => "point cap reached",
        StopReason::SleepBudgetExhausted => "sleep budget exhausted",
        StopReason::QuestionLimitReached => "question limit reached",
        StopReason::Unauthenticated => "session is not logged in",
        StopReason::FetchFailed => "could not fetch a question",
        StopReason::OracleFailed => "oracle failed",
    }
}

pub async fn execute(config_path: Option<PathBuf>, overrides: Overrides) -> Result<()> {
    let mut config = load_config_from(config_path.as_deref())?;
    if let Some(cap) = overrides.point_cap {
        config.run.point_cap = cap;
    }
    if let Some(scale) = overrides.sleep_scale {
        anyhow::ensure!(scale >= 0.0, "sleep scale must not be negative");
        config.run.sleep_scale = scale;
    }
    if let Some(model) = overrides.model {
        config.oracle.model = model;
    }
    if let Some(max) = overrides.max_questions {
        anyhow::ensure!(max >= 1, "max questions must be at least 1");
    }

    let mut client = VocabClient::new(&config)?;
    let oracle = OllamaOracle::new(&config.oracle).context("failed to set up oracle")?;

    let mut driver_config = DriverConfig::from(&config.run);
    driver_config.max_questions = overrides.max_questions;
    let driver = Driver::new(driver_config);

    eprintln!(
        "vocabot v{}: answering with {} via {}",
        env!("CARGO_PKG_VERSION"),
        oracle.model(),
        config.oracle.base_url
    );
    if client.state().has_session() {
        eprintln!("Resuming saved session ({} points).", client.state().total_points);
    }
    eprintln!();

    let summary = driver.run(&mut client, &oracle, &ConsoleReporter).await?;
    print_summary(&summary);

    anyhow::ensure!(
        !summary.stop.is_failure(),
        "run stopped: {}",
        describe(summary.stop)
    );
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec![
        "Started",
        "Correct",
        "Wrong",
        "Correct %",
        "Errors",
        "Points",
        "Duration",
    ]);
    table.add_row(vec![
        Cell::new(summary.started_at.format("%Y-%m-%d %H:%M:%S")),
        Cell::new(summary.stats.correct),
        Cell::new(summary.stats.wrong),
        Cell::new(format!("{:.2}%", summary.stats.accuracy_percent())),
        Cell::new(summary.errors),
        Cell::new(summary.points),
        Cell::new(format!("{:.1}s", summary.elapsed.as_secs_f64())),
    ]);

    eprintln!("\n{table}");
}
