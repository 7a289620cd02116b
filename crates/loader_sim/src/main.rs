//! Replays a loader scenario on a virtual clock and reports when each batch settles.
mod runner;
mod scenario;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use loader_engine::LoaderSettings;
use loader_logging::{loader_info, loader_warn, LogDestination};
use log::LevelFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "loader-sim", about = "Replay a resource loading scenario")]
struct Cli {
    /// Scenario file (RON).
    scenario: PathBuf,

    /// Loader settings file (RON). Overrides settings embedded in the scenario.
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "terminal")]
    log: LogTarget,

    /// Log debug output, including every probe and injection.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    loader_logging::initialize(cli.log.into(), level);

    let scenario = scenario::load_scenario(&cli.scenario)?;
    let settings = match (&cli.settings, &scenario.settings) {
        (Some(path), embedded) => {
            if embedded.is_some() {
                loader_warn!("{:?} overrides the settings embedded in the scenario", path);
            }
            LoaderSettings::load(path)
                .with_context(|| format!("loading settings from {}", path.display()))?
        }
        (None, Some(embedded)) => {
            embedded.validate().context("embedded scenario settings")?;
            embedded.clone()
        }
        (None, None) => LoaderSettings::default(),
    };
    loader_info!(
        "replaying {} batch(es) from {}",
        scenario.batches.len(),
        cli.scenario.display()
    );

    let report = runner::run(&scenario, settings).context("invalid loader settings")?;
    for outcome in &report.outcomes {
        match outcome.settled_at_ms {
            Some(at) => println!("batch {} settled at {}ms", outcome.label, at),
            None => println!(
                "batch {} never settled (pending: {})",
                outcome.label,
                outcome.pending_urls.join(", ")
            ),
        }
    }
    println!(
        "{} injection(s), stopped at {}ms",
        report.injections, report.finished_at_ms
    );
    Ok(())
}
