//! LiveQ - Adaptive admission queue for rate-limited upstreams
//!
//! CLI entry point for inspecting configuration and driving the queue
//! with a synthetic workload.

use std::time::Duration;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use eyre::{Context, Result};
use rand::Rng;
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use liveq::cli::{Cli, Command, SimArgs};
use liveq::config::QueueConfig;
use liveq::{QueueEvent, QueueManager, WorkError, work_fn};

fn setup_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    // Diagnostics go to stderr so the event stream on stdout stays clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .init();

    info!(verbose, "Logging initialized");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to initialize logging")?;

    let config = QueueConfig::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate()?;

    info!(
        "liveq loaded config: max_concurrent={}, age_threshold_ms={}, initial_cooldown_ms={}",
        config.max_concurrent, config.age_threshold_ms, config.initial_cooldown_ms
    );

    match cli.command {
        Some(Command::Sim(args)) => cmd_sim(config, args).await,
        Some(Command::Config) => cmd_config(&config),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

/// Show the effective configuration as YAML
fn cmd_config(config: &QueueConfig) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to render configuration")?;
    print!("{}", yaml);
    Ok(())
}

/// Drive the queue with a synthetic workload and print its event stream
async fn cmd_sim(config: QueueConfig, args: SimArgs) -> Result<()> {
    println!(
        "Submitting {} tasks (max {} concurrent, ~{}ms upstream latency)",
        args.tasks, config.max_concurrent, args.latency_ms
    );
    println!();

    let manager = QueueManager::new(config);
    let mut events = manager.subscribe();

    // The printer owns the subscription and signals once every task has
    // reached a terminal state; rate-limit retries stay in flight until
    // they complete or fail for real
    let expected = args.tasks as u64;
    let (done_tx, mut done_rx) = tokio::sync::mpsc::channel::<()>(1);
    let printer = tokio::spawn(async move {
        let mut finished: u64 = 0;
        loop {
            match events.recv().await {
                Ok(event) => {
                    print_event(&event);
                    match event {
                        QueueEvent::TaskCompleted { .. } | QueueEvent::TaskFailed { .. } => {
                            finished += 1;
                            if finished == expected {
                                let _ = done_tx.send(()).await;
                            }
                        }
                        _ => {}
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    eprintln!("(printer lagged, {} events dropped)", missed);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    for i in 0..args.tasks {
        let priority = rand::rng().random::<f64>() < args.priority_ratio;
        let latency = args.latency_ms;
        let rate_limit_chance = args.rate_limit_chance;
        let failure_chance = args.failure_chance;

        let work = work_fn(move || async move {
            tokio::time::sleep(Duration::from_millis(latency)).await;
            // Re-rolled on every run, so a rate-limited task can
            // succeed on retry
            let roll = rand::rng().random::<f64>();
            if roll < rate_limit_chance {
                Err(WorkError::rate_limited("simulated 429"))
            } else if roll < rate_limit_chance + failure_chance {
                Err(WorkError::other("simulated upstream error"))
            } else {
                Ok(())
            }
        });

        manager.submit(work, priority, serde_json::json!({ "task": i })).await;
        tokio::time::sleep(Duration::from_millis(args.spacing_ms)).await;
    }

    if expected > 0 {
        let _ = done_rx.recv().await;
    }

    let status = manager.status().await;
    println!();
    println!("{} All {} tasks reached a terminal state", "✓".green(), args.tasks);
    println!("  Processed: {}", status.total_processed);
    println!("  Failed: {}", status.total_failed);
    println!("  Failure rate: {:.1}%", status.failure_rate);
    if let Some(avg) = status.avg_processing_ms {
        println!("  Avg latency: {:.0}ms", avg);
    }
    println!(
        "  Cooldown: {}ms{}",
        status.cooldown_ms,
        if status.in_cooldown { " (active)" } else { "" }
    );

    manager.shutdown().await;
    printer.abort();
    Ok(())
}

fn print_event(event: &QueueEvent) {
    match event {
        QueueEvent::TaskCompleted { task, latency_ms } => {
            println!("{} {} done in {}ms", "✓".green(), task.id, latency_ms);
        }
        QueueEvent::TaskFailed { task, error } => {
            println!("{} {} failed: {}", "✗".red(), task.id, error);
        }
        QueueEvent::RateLimitHit { cooldown_ms } => {
            println!("{} rate limit hit, cooldown now {}ms", "⚠".yellow(), cooldown_ms);
        }
        QueueEvent::CooldownChanged { cooldown_ms } => {
            println!("{} cooldown adjusted to {}ms", "~".yellow(), cooldown_ms);
        }
        QueueEvent::TasksAged { count } => {
            println!("{} {} task(s) promoted after aging", "↑".cyan(), count);
        }
        QueueEvent::StatusChanged { status } => {
            println!(
                "{} active={} queued={}+{} avg={}ms",
                "·".dimmed(),
                status.active,
                status.priority_queued,
                status.normal_queued,
                status.avg_processing_ms.map_or(0, |a| a as u64),
            );
        }
    }
}
