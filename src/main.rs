use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{info, warn};
use std::fs;
use std::sync::Arc;

use tagloop::config::Config;
use tagloop::gateway::{Gateway, HttpGateway};
use tagloop::poller::{cycle, PollSummary, Poller, StopReason, WriteDispatcher};

mod cli;

use cli::Cli;
use cli::commands::Commands;

fn setup_logging(config: &Config) -> Result<()> {
    let level = config.log_level.as_deref().unwrap_or("info");
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));

    if let Some(log_file) = &config.log_file {
        if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create log directory")?;
        }
        let target = Box::new(
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)
                .context("Failed to open log file")?,
        );
        builder.target(env_logger::Target::Pipe(target));
    }

    builder.init();

    if let Some(log_file) = &config.log_file {
        info!("Logging initialized, writing to: {}", log_file.display());
    }
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        None | Some(Commands::Run) => handle_run_command(config).await,
        Some(Commands::Once) => handle_once_command(config).await,
        Some(Commands::Read) => handle_read_command(config).await,
        Some(Commands::Config) => handle_config_command(config),
    }
}

fn connect(config: &Config) -> Result<Arc<HttpGateway>> {
    let gateway = HttpGateway::new(&config.gateway).context("Failed to create gateway client")?;
    Ok(Arc::new(gateway))
}

async fn handle_run_command(config: &Config) -> Result<()> {
    let gateway = connect(config)?;
    println!(
        "{} {} every {}ms",
        "Polling".cyan(),
        gateway.base_url(),
        config.poll.interval_ms
    );

    let handle = Poller::from_config(gateway, config).start();

    let signal = handle.signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.stop(StopReason::Cancelled);
        }
    });

    let summary = handle.join().await.context("Poll loop failed")?;
    print_summary(&summary);
    Ok(())
}

async fn handle_once_command(config: &Config) -> Result<()> {
    let gateway = connect(config)?;
    let sample = cycle::read_sample(gateway.as_ref(), &config.tags)
        .await
        .context("Read failed")?;

    let mut dispatcher = WriteDispatcher::new(gateway);
    dispatcher.dispatch(cycle::write_request(&config.tags, &sample));
    let writes = dispatcher.drain().await;

    println!("{} {} + {} = {}", "Sum:".green(), sample.tag1, sample.tag2, sample.sum);
    if writes.failed > 0 {
        println!("{} {}", "Write failed:".red(), config.tags.sum);
    } else {
        println!("{} {}", "Written to:".green(), config.tags.sum);
    }
    if sample.should_exit() {
        println!("{}", "Exit tag is set".yellow());
    }
    Ok(())
}

async fn handle_read_command(config: &Config) -> Result<()> {
    let gateway = connect(config)?;
    let response = gateway
        .read(&config.tags.read_ids())
        .await
        .context("Read failed")?;

    for reading in &response.read_results {
        let value = reading.v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
        let stamp = reading.timestamp().map(|t| t.to_rfc3339()).unwrap_or_default();
        if reading.is_bad_quality() {
            println!("{} {} {}", reading.id, value.red(), reading.r.as_deref().unwrap_or(""));
        } else {
            println!("{} {} {}", reading.id, value.green(), stamp);
        }
    }
    Ok(())
}

fn handle_config_command(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    print!("{}", yaml);
    Ok(())
}

fn print_summary(summary: &PollSummary) {
    let reason = summary
        .stop_reason
        .map(|r| r.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!("{} {}", "Exited:".green(), reason);
    println!(
        "  ticks: {}  reads ok: {}  reads failed: {}",
        summary.ticks, summary.reads_ok, summary.reads_failed
    );
    println!(
        "  writes ok: {}  writes failed: {}",
        summary.writes.succeeded, summary.writes.failed
    );
    if let Some(sum) = summary.last_sum {
        println!("  last sum: {}", sum);
    }
    println!("  elapsed: {:.1}s", summary.elapsed().as_secs_f64());
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration, then layer flags and environment on top
    let loaded = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let mut config = loaded.config;
    let overrides = cli.overrides();
    config.apply_overrides(&overrides);
    config.validate().context("Invalid configuration")?;

    setup_logging(&config).context("Failed to setup logging")?;

    for (path, reason) in &loaded.skipped {
        warn!("Ignoring config file {}: {}", path.display(), reason);
    }
    match &loaded.source {
        Some(path) => info!("Loaded config from: {}", path.display()),
        None => info!("No config file found, using defaults"),
    }
    if !overrides.is_empty() {
        info!("Applied command-line/environment overrides: {:?}", overrides.redacted());
    }

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
