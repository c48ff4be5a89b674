// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk — command-line entry point.
//
// Stands in for the browser front end: every subcommand opens its inputs in
// an editing session, applies the requested edits and writes the result next
// to the input (or where told).

mod cli;
mod commands;
mod data_dir;

use std::process::ExitCode;

use blattwerk_core::AppConfig;
use blattwerk_core::error::Result;
use blattwerk_core::human_errors::humanize_error;
use clap::Parser;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            let human = humanize_error(&err);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.unwrap_or_else(data_dir::config_path);
    let config = AppConfig::load(&config_path)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Blattwerk starting");

    let written = match cli.command {
        Commands::Organize(args) => commands::organize(&config, args).await?,
        Commands::Split(args) => commands::split(&config, args)?,
        Commands::Sign(args) => commands::sign(&config, args).await?,
        Commands::Redact(args) => commands::redact(&config, args).await?,
        Commands::Remote(args) => commands::remote(&config, args).await?,
        Commands::Config { init } => {
            if init && !config_path.exists() {
                config.save(&config_path)?;
                tracing::info!(path = %config_path.display(), "default configuration written");
            }
            println!("{}", config_path.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            return Ok(());
        }
    };

    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}
