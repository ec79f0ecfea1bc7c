//! Event Registry CLI Application
//!
//! Replays scripted scenarios against the event-registry library:
//! - Named listeners that record every call they receive
//! - Named recording delegates, optionally sharing hooks with each other
//! - A report of listener invocations, delegate traffic and final registrations

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

mod replay;
mod report;
mod scenario;

/// Event Registry - replay listener/delegate scenarios
#[derive(Parser, Debug)]
#[command(name = "event-registry-cli")]
#[command(about = "Replay event registry scenarios (TOML)", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the scenario file to replay
    #[arg(short, long, value_name = "FILE")]
    scenario: PathBuf,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("Event Registry CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using registry library v{}", event_registry::VERSION);

    log::info!("Loading scenario from: {:?}", args.scenario);
    let scenario = scenario::load_scenario(&args.scenario)?;
    log::debug!("Scenario loaded: {} step(s)", scenario.steps.len());

    let report = replay::run(&scenario)
        .with_context(|| format!("Invalid scenario: {:?}", args.scenario))?;

    match args.format {
        ReportFormat::Text => print!("{}", report.to_text()),
        ReportFormat::Json => println!("{}", report.to_json()?),
    }

    if let Some(error) = &report.error {
        anyhow::bail!("Replay stopped early: {}", error);
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
