use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod db;

use commands::{ConfigCommand, ExportCommand, ImportCommand, LinkCommand, LogCommand};
use config::Config;
use db::open_repos;

#[derive(Parser)]
#[command(name = "worklog")]
#[command(version)]
#[command(about = "Track time per project and share it as links", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record and review work-log entries
    Log(LogCommand),

    /// Publish, push and view shareable links
    Link(LinkCommand),

    /// Write the full work log as JSON
    Export(ExportCommand),

    /// Load entries from a JSON dump
    Import(ImportCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worklog=warn,worklog_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let cli_config_path = cli.config.clone();
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Log(cmd)) => {
            let repos = open_repos(&config.database_path.value).await?;
            cmd.run(&repos.entries, &config).await?;
        }
        Some(Commands::Link(cmd)) => {
            let repos = open_repos(&config.database_path.value).await?;
            cmd.run(&repos, &config).await?;
        }
        Some(Commands::Export(cmd)) => {
            let repos = open_repos(&config.database_path.value).await?;
            cmd.run(&repos.entries).await?;
        }
        Some(Commands::Import(cmd)) => {
            let repos = open_repos(&config.database_path.value).await?;
            cmd.run(&repos.entries).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config, cli_config_path)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
