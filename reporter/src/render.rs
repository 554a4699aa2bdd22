use std::fmt::Write;

use parley_model::{RunReport, ScenarioReport};

/// Flatten a run report into the human-readable text form: a header with the
/// counts, then failures, then warnings, or an all-passed marker when both
/// sections are empty.
pub fn render_text(report: &RunReport) -> String {
    let mut out = String::new();

    writeln!(out, "=== Acceptance run {} ===", report.run_id).unwrap();
    writeln!(out, "{}", report.timestamp).unwrap();
    writeln!(
        out,
        "Scenarios: {} | pass {} | warn {} | fail {} | pass rate {:.1}%",
        report.total, report.passed, report.warned, report.failed, report.pass_rate
    )
    .unwrap();
    writeln!(
        out,
        "Duration: {:.1}s | concurrency {}",
        report.duration_sec, report.concurrency
    )
    .unwrap();

    if report.failures.is_empty() && report.warnings.is_empty() {
        writeln!(out).unwrap();
        writeln!(out, "All scenarios passed.").unwrap();
        return out;
    }

    if !report.failures.is_empty() {
        writeln!(out).unwrap();
        writeln!(out, "FAILURES ({})", report.failures.len()).unwrap();
        for scenario in &report.failures {
            render_scenario(&mut out, scenario);
        }
    }

    if !report.warnings.is_empty() {
        writeln!(out).unwrap();
        writeln!(out, "WARNINGS ({})", report.warnings.len()).unwrap();
        for scenario in &report.warnings {
            render_scenario(&mut out, scenario);
        }
    }

    out
}

fn render_scenario(out: &mut String, scenario: &ScenarioReport) {
    writeln!(
        out,
        "- {}: {} [{}] ({}ms)",
        scenario.id, scenario.name, scenario.category, scenario.total_time_ms
    )
    .unwrap();

    if let Some(error) = &scenario.error {
        writeln!(out, "  error: {error}").unwrap();
    }

    for turn in &scenario.turns {
        writeln!(out, "  turn {}: \"{}\"", turn.turn, turn.message).unwrap();
        writeln!(out, "    reply: \"{}\"", turn.reply).unwrap();
        if let Some(intent) = &turn.intent {
            writeln!(out, "    intent: {intent}").unwrap();
        }
        for rule in &turn.failed_rules {
            let marker = if rule.critical { "CRITICAL" } else { "warning" };
            writeln!(out, "    [{marker}] {}: {}", rule.rule, rule.message).unwrap();
        }
    }
}
