//! vocabot CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vocabot", version, about = "Vocabulary practice runner backed by a local model")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer practice questions until a budget runs out
    Run {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Stop after this many answers
        #[arg(long)]
        max_questions: Option<u64>,

        /// Override the session point cap
        #[arg(long)]
        point_cap: Option<u64>,

        /// Override the pause multiplier between questions
        #[arg(long)]
        sleep_scale: Option<f64>,

        /// Override the model to ask
        #[arg(long)]
        model: Option<String>,
    },

    /// Show the saved session
    Status {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check whether the configured cookies are logged in
    CheckLogin {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List models available on the Ollama instance
    ListModels {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter vocabot.toml
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vocabot=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            max_questions,
            point_cap,
            sleep_scale,
            model,
        } => {
            let overrides = commands::run::Overrides {
                max_questions,
                point_cap,
                sleep_scale,
                model,
            };
            commands::run::execute(config, overrides).await
        }
        Commands::Status { config } => commands::status::execute(config),
        Commands::CheckLogin { config } => commands::check_login::execute(config).await,
        Commands::ListModels { config } => commands::list_models::execute(config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
