//! USB HID Analyzer CLI
//!
//! Lists HID devices and exchanges input, output and feature reports with
//! one of them, printing every transaction.

use anyhow::Result;
use clap::Parser;
use tracing::debug;

// CLI definitions
mod cli;
use cli::{Cli, Commands};

// Command handlers
mod commands;
use commands::Context;

use hid_analyzer::config::AnalyzerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr; stdout carries the transaction log
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.unwrap_or_else(AnalyzerConfig::default_path);
    debug!("Loading config from {:?}", config_path);
    let config = AnalyzerConfig::load(&config_path)?;
    let ctx = Context::new(config, config_path, cli.no_color);

    match cli.command {
        Commands::List { filter, json } => commands::utility::list(&ctx, filter, json).await,
        Commands::Monitor { device } => commands::report::monitor(&ctx, &device).await,
        Commands::WriteOutput {
            device,
            id,
            payload,
        } => commands::report::write_output(&ctx, &device, id, &payload).await,
        Commands::ReadFeature { device, id } => {
            commands::report::read_feature(&ctx, &device, id).await
        }
        Commands::WriteFeature {
            device,
            id,
            payload,
        } => commands::report::write_feature(&ctx, &device, id, &payload).await,
        Commands::Shell { device } => commands::shell::shell(&ctx, &device).await,
        Commands::Config { save } => commands::utility::config(&ctx, save),
    }
}
