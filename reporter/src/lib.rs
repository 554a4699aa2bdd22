use std::time::Duration;

use chrono::Utc;
use parley_model::{
    RuleResult, RunReport, ScenarioReport, ScenarioResult, ScenarioStatus, TurnReport,
};

mod render;

pub use render::render_text;

/// Replies embedded in reports are cut to this many characters.
const REPORT_REPLY_MAX_CHARS: usize = 200;

/// Build the aggregate report for a finished run.
///
/// Pure given its inputs; writing the report to disk or rendering it as text
/// is the caller's concern. Failures carry every failed rule; warnings carry
/// non-critical failed rules only.
pub fn build_run_report(
    run_id: &str,
    results: &[ScenarioResult],
    duration: Duration,
    concurrency: usize,
) -> RunReport {
    let total = results.len();
    let passed = count_status(results, ScenarioStatus::Pass);
    let warned = count_status(results, ScenarioStatus::Warn);
    let failed = count_status(results, ScenarioStatus::Fail);

    let pass_rate = if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64 * 100.0
    };

    let failures = results
        .iter()
        .filter(|r| r.status == ScenarioStatus::Fail)
        .map(|r| scenario_report(r, false))
        .collect();

    let warnings = results
        .iter()
        .filter(|r| r.status == ScenarioStatus::Warn)
        .map(|r| scenario_report(r, true))
        .collect();

    RunReport {
        run_id: run_id.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        total,
        passed,
        warned,
        failed,
        pass_rate,
        duration_sec: duration.as_secs_f64(),
        concurrency,
        failures,
        warnings,
    }
}

fn count_status(results: &[ScenarioResult], status: ScenarioStatus) -> usize {
    results.iter().filter(|r| r.status == status).count()
}

fn scenario_report(result: &ScenarioResult, non_critical_only: bool) -> ScenarioReport {
    let turns = result
        .turn_outcomes
        .iter()
        .filter_map(|(turn, outcome)| {
            let failed_rules: Vec<RuleResult> = outcome
                .rule_results
                .iter()
                .filter(|r| !r.passed && !(non_critical_only && r.critical))
                .cloned()
                .collect();

            if failed_rules.is_empty() {
                return None;
            }

            Some(TurnReport {
                turn: *turn,
                message: outcome.message.clone(),
                reply: truncate_reply(&outcome.reply),
                intent: outcome.intent.clone(),
                failed_rules,
            })
        })
        .collect();

    ScenarioReport {
        id: result.scenario_id.clone(),
        name: result.scenario_name.clone(),
        category: result.category.clone(),
        total_time_ms: result.total_time_ms,
        error: result.error.clone(),
        turns,
    }
}

fn truncate_reply(reply: &str) -> String {
    if reply.chars().count() <= REPORT_REPLY_MAX_CHARS {
        return reply.to_string();
    }

    let truncated: String = reply.chars().take(REPORT_REPLY_MAX_CHARS).collect();
    format!("{truncated}...")
}
