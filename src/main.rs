use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use sweepd::commands::{config, health, run};
use sweepd::config::SweepdConfig;
use sweepd::logging;
use sweepd::models::Frequency;

#[derive(Parser)]
#[command(name = "sweepd")]
#[command(about = "Spectrum sweep orchestration for HackRF-style sweep binaries", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a config file (default: <config dir>/sweepd/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level for stderr output (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep one or more frequencies, streaming events as JSON lines
    Run {
        /// Center frequency, e.g. 2400, 2.4GHz, 433920kHz (bare numbers are MHz).
        /// Repeat to cycle between frequencies.
        #[arg(short, long = "freq", required = true)]
        frequencies: Vec<Frequency>,

        /// Dwell time per frequency in milliseconds
        #[arg(short = 't', long)]
        cycle_time: Option<u64>,

        /// Settle time between frequencies in milliseconds
        #[arg(short, long)]
        switching_time: Option<u64>,

        /// Sweep binary to run instead of the configured one
        #[arg(short, long)]
        binary: Option<PathBuf>,
    },

    /// Probe the sweep hardware
    Health {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level)?;
    let config = SweepdConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            frequencies,
            cycle_time,
            switching_time,
            binary,
        } => run::execute(
            config,
            run::RunOptions {
                frequencies,
                cycle_time_ms: cycle_time,
                switching_time_ms: switching_time,
                binary,
            },
        ),
        Commands::Health { json } => health::execute(config, json),
        Commands::Config => config::execute(&config),
    }
}
