use std::fs::File;

use anyhow::Context;
use chrono::Utc;
use parley_model::{append_scenario_result, load_corpus, store_run_report};
use parley_reporter::{build_run_report, render_text};
use parley_runner::prelude::{init, run, ParleyResult};

fn main() -> ParleyResult<()> {
    let cli = init();

    let scenarios = load_corpus(&cli.corpus)?;
    if scenarios.is_empty() {
        log::warn!("Corpus {} contains no scenarios", cli.corpus.display());
    }

    let outcome = run(&cli, scenarios)?;

    std::fs::create_dir_all(&cli.report_dir).with_context(|| {
        format!(
            "Failed to create report directory: {}",
            cli.report_dir.display()
        )
    })?;

    let results_path = cli.report_dir.join("results.jsonl");
    for result in &outcome.results {
        append_scenario_result(result, &results_path)?;
    }

    let report = build_run_report(
        &outcome.run_id,
        &outcome.results,
        outcome.duration,
        outcome.concurrency,
    );

    let stamp = Utc::now().format("%Y-%m-%dT%H.%M.%S%.fZ");
    let report_path = cli.report_dir.join(format!("report-{stamp}.json"));
    let mut report_file = File::create_new(&report_path)?;
    store_run_report(&report, &mut report_file)?;

    let text = render_text(&report);
    let text_path = cli.report_dir.join(format!("report-{stamp}.txt"));
    std::fs::write(&text_path, &text)?;

    print!("{text}");
    log::info!(
        "Reports written to {} and {}",
        report_path.display(),
        text_path.display()
    );

    if report.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
