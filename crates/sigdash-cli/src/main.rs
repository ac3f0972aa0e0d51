//! Signal dashboard client - Entry Point

use anyhow::Result;
use clap::Parser;
use sigdash_cli::{min_frequency, print_notice, AppConfig, Application, Cli, Command};
use std::path::Path;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The offline calculator needs neither config nor backend.
    if let Command::MinFrequency {
        all,
        coins,
        proxies,
    } = cli.command
    {
        println!("{} min", min_frequency(all, coins, proxies));
        return Ok(());
    }

    // Determine config path: CLI arg > SIGDASH_CONFIG env var > default
    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var("SIGDASH_CONFIG").ok())
        .unwrap_or_else(|| sigdash_cli::DEFAULT_CONFIG_PATH.to_string());

    let config = AppConfig::load(Path::new(&config_path))?;
    sigdash_telemetry::init_logging(&config.logging)?;

    info!("Starting sigdash v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config_path = %config_path,
        base_url = %config.api.base_url,
        listing = ?config.api.listing,
        "Configuration loaded"
    );

    let app = Application::new(config)?;
    let mut notices = app.notices().subscribe();

    let output = match cli.command {
        Command::MinFrequency { .. } => None,
        Command::Settings { action } => Some(app.settings(action).await),
        Command::Signals(args) => Some(app.signals(args).await),
        Command::Latest { limit } => Some(app.latest(limit).await),
        Command::Dashboard => Some(app.dashboard().await),
        Command::Strategies { action } => Some(app.strategies(action).await),
        Command::Backtest { action } => Some(app.backtest(action).await),
        Command::Theme { action } => Some(app.theme(action)),
        Command::Watch(args) => return Ok(app.watch(args).await?),
    };

    while let Ok(notice) = notices.try_recv() {
        print_notice(&notice);
    }

    if let Some(output) = output {
        print!("{}", output?);
    }
    Ok(())
}
