//! Specrun CLI - Main Entry Point
//!
//! Runs and lints declarative YAML test scenarios.

use clap::{Parser, Subcommand};

mod commands;
mod output;
mod xunit;

use commands::{lint, run};

/// Specrun - declarative YAML functional testing
#[derive(Parser)]
#[command(name = "specrun")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "human", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenario files or suite directories
    Run(run::RunArgs),

    /// Parse scenario files and report errors without running them
    Lint(lint::LintArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    specrun_core::register_builtin_plugins();

    let code = match cli.command {
        Commands::Run(args) => run::execute(args, cli.format).await?,
        Commands::Lint(args) => lint::execute(args)?,
    };
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
