use anyhow::Result;
use clap::Parser;

// Core modules
mod cli;
mod commands;
mod config;
mod trigger;

// Domain / infrastructure / orchestration
mod domain;
mod error;
mod infrastructure;
mod observability;
mod services;
mod tools;
mod ui;

#[cfg(test)]
mod fakes;

use cli::{Cli, Commands};
use commands::{check, cycle, load_config, promote, pull};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with LOGGING env var support
    // LOGGING=debug,info,warn,error or just LOGGING=debug
    let log_level = std::env::var("LOGGING")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .unwrap_or_else(|_| {
            if cli.verbose {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false)
        .init();

    let config = load_config(cli.pipeline, cli.config.as_deref())?;

    match cli.command {
        Commands::Pull {
            event,
            continue_on_error,
        } => {
            pull::execute(config, event, continue_on_error).await?;
        }
        Commands::Promote { event } => {
            promote::execute(config, event).await?;
        }
        Commands::Check => {
            check::execute(config).await?;
        }
        Commands::Cycle {
            settle_secs,
            continue_on_error,
        } => {
            cycle::execute(config, settle_secs, continue_on_error).await?;
        }
    }

    Ok(())
}
