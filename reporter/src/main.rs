use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use parley_model::load_run_report;
use parley_reporter::render_text;

/// Re-render a saved run report as the human-readable text form.
#[derive(Parser)]
#[command(about, long_about = None)]
struct ReporterCli {
    /// Path to a run report JSON file produced by an acceptance run
    report: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = ReporterCli::parse();
    let file = File::open(&cli.report)
        .with_context(|| format!("Failed to open report file: {}", cli.report.display()))?;
    let report = load_run_report(file)?;
    log::debug!("Loaded report for run {}", report.run_id);

    print!("{}", render_text(&report));

    Ok(())
}
