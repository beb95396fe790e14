//! Command-line surface for the `lq` binary

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// LiveQ - Adaptive queue for rate-limited upstreams
#[derive(Parser)]
#[command(
    name = "lq",
    about = "Adaptive admission queue for rate-limited upstreams",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run a synthetic workload against the queue and print the event stream
    Sim(SimArgs),

    /// Show the effective configuration
    Config,
}

/// Parameters for the `sim` workload
#[derive(Args)]
pub struct SimArgs {
    /// Number of tasks to submit
    #[arg(short = 'n', long, default_value = "20")]
    pub tasks: u32,

    /// Fraction of tasks submitted as priority
    #[arg(long, default_value = "0.2")]
    pub priority_ratio: f64,

    /// Chance that a task hits a simulated rate limit
    #[arg(long, default_value = "0.15")]
    pub rate_limit_chance: f64,

    /// Chance that a task fails outright
    #[arg(long, default_value = "0.05")]
    pub failure_chance: f64,

    /// Simulated upstream latency in milliseconds
    #[arg(long, default_value = "400")]
    pub latency_ms: u64,

    /// Gap between submissions in milliseconds
    #[arg(long, default_value = "50")]
    pub spacing_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_invocation_has_no_command() {
        let cli = Cli::parse_from(["lq"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parse_sim_defaults() {
        let cli = Cli::parse_from(["lq", "sim"]);
        if let Some(Command::Sim(args)) = cli.command {
            assert_eq!(args.tasks, 20);
            assert_eq!(args.latency_ms, 400);
            assert_eq!(args.spacing_ms, 50);
        } else {
            panic!("Expected Sim command");
        }
    }

    #[test]
    fn test_cli_parse_sim_overrides() {
        let cli = Cli::parse_from(["lq", "sim", "-n", "100", "--rate-limit-chance", "0.5", "--latency-ms", "10"]);
        if let Some(Command::Sim(args)) = cli.command {
            assert_eq!(args.tasks, 100);
            assert_eq!(args.rate_limit_chance, 0.5);
            assert_eq!(args.latency_ms, 10);
            assert_eq!(args.priority_ratio, 0.2);
        } else {
            panic!("Expected Sim command");
        }
    }

    #[test]
    fn test_cli_parse_config() {
        let cli = Cli::parse_from(["lq", "config"]);
        assert!(matches!(cli.command, Some(Command::Config)));
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["lq", "-c", "/tmp/liveq.yml", "config"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/liveq.yml")));
    }
}
