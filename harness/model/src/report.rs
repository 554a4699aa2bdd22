use std::collections::BTreeMap;
use std::io::{BufRead, Read, Write};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::scenario::Scenario;

/// The outcome of evaluating one validation rule against one turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleResult {
    /// Label of the rule that produced this result, e.g. `contains_any`.
    pub rule: String,
    pub passed: bool,
    pub message: String,
    pub critical: bool,
}

/// Everything recorded about one validated turn of a scenario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The user message that was sent.
    pub message: String,
    /// The assistant reply that came back.
    pub reply: String,
    pub intent: Option<String>,
    pub routed_action: Option<String>,
    pub source: Option<String>,
    pub response_time_ms: u64,
    pub rule_results: Vec<RuleResult>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Pass,
    Warn,
    Fail,
}

impl ScenarioStatus {
    /// Derive a scenario's status from its accumulated rule results.
    ///
    /// `Fail` if any critical rule failed, `Warn` if any non-critical rule
    /// failed, `Pass` otherwise. A transport or internal error overrides this
    /// and is handled by [ScenarioResult::failed].
    pub fn derive<'a>(results: impl IntoIterator<Item = &'a RuleResult>) -> Self {
        let mut status = ScenarioStatus::Pass;
        for result in results {
            if !result.passed {
                if result.critical {
                    return ScenarioStatus::Fail;
                }
                status = ScenarioStatus::Warn;
            }
        }
        status
    }
}

impl std::fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioStatus::Pass => write!(f, "pass"),
            ScenarioStatus::Warn => write!(f, "warn"),
            ScenarioStatus::Fail => write!(f, "fail"),
        }
    }
}

/// The frozen result of simulating one scenario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScenarioResult {
    pub run_id: String,
    pub scenario_id: String,
    pub scenario_name: String,
    pub category: String,
    pub status: ScenarioStatus,
    pub total_time_ms: u64,
    /// Outcomes keyed by turn index, only for turns that carried rules.
    pub turn_outcomes: BTreeMap<usize, TurnOutcome>,
    pub error: Option<String>,
}

impl ScenarioResult {
    /// Freeze the result of a scenario whose turns all completed. The status
    /// is derived from the accumulated rule results.
    pub fn completed(
        run_id: &str,
        scenario: &Scenario,
        turn_outcomes: BTreeMap<usize, TurnOutcome>,
        total_time_ms: u64,
    ) -> Self {
        let status =
            ScenarioStatus::derive(turn_outcomes.values().flat_map(|o| o.rule_results.iter()));

        Self {
            run_id: run_id.to_string(),
            scenario_id: scenario.id.clone(),
            scenario_name: scenario.name.clone(),
            category: scenario.category.clone(),
            status,
            total_time_ms,
            turn_outcomes,
            error: None,
        }
    }

    /// Freeze the result of a scenario that was terminated by a transport
    /// failure or internal fault. Outcomes collected before the failure are
    /// preserved.
    pub fn failed(
        run_id: &str,
        scenario: &Scenario,
        turn_outcomes: BTreeMap<usize, TurnOutcome>,
        total_time_ms: u64,
        error: String,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            scenario_id: scenario.id.clone(),
            scenario_name: scenario.name.clone(),
            category: scenario.category.clone(),
            status: ScenarioStatus::Fail,
            total_time_ms,
            turn_outcomes,
            error: Some(error),
        }
    }
}

/// One failed rule's context within a [ScenarioReport].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnReport {
    pub turn: usize,
    pub message: String,
    /// Reply text truncated to a bounded length for report size.
    pub reply: String,
    pub intent: Option<String>,
    /// Only rules with `passed == false` appear here.
    pub failed_rules: Vec<RuleResult>,
}

/// Per-scenario detail for the failures and warnings sections of a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScenarioReport {
    pub id: String,
    pub name: String,
    pub category: String,
    pub total_time_ms: u64,
    pub error: Option<String>,
    pub turns: Vec<TurnReport>,
}

/// Aggregate report for one run of the full scenario corpus.
///
/// Built exactly once per run, after every scenario has produced a result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    pub run_id: String,
    /// RFC 3339 timestamp for when the report was built.
    pub timestamp: String,
    pub total: usize,
    pub passed: usize,
    pub warned: usize,
    pub failed: usize,
    /// Percentage of scenarios that passed, 0.0 for an empty run.
    pub pass_rate: f64,
    pub duration_sec: f64,
    pub concurrency: usize,
    pub failures: Vec<ScenarioReport>,
    pub warnings: Vec<ScenarioReport>,
}

/// Append a scenario result to a `.jsonl` file, one JSON object per line.
pub fn append_scenario_result(
    result: &ScenarioResult,
    path: impl AsRef<Path>,
) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    serde_json::to_writer(&mut file, result)?;
    let _ = file.write("\n".as_bytes())?;
    Ok(())
}

/// Load scenario results from a `.jsonl` file written by
/// [append_scenario_result].
pub fn load_scenario_results(path: impl AsRef<Path>) -> anyhow::Result<Vec<ScenarioResult>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut results = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let result: ScenarioResult = serde_json::from_str(&line)?;
        results.push(result);
    }
    Ok(results)
}

/// Serialize a run report to a writer as pretty-printed JSON.
pub fn store_run_report<W: Write>(report: &RunReport, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

/// Load a run report from a reader.
pub fn load_run_report<R: Read>(reader: R) -> anyhow::Result<RunReport> {
    let reader = std::io::BufReader::new(reader);
    serde_json::from_reader(reader).context("Failed to deserialize run report")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rule(passed: bool, critical: bool) -> RuleResult {
        RuleResult {
            rule: "not_empty".to_string(),
            passed,
            message: String::new(),
            critical,
        }
    }

    fn scenario() -> Scenario {
        Scenario {
            id: "s-1".to_string(),
            name: "Sample".to_string(),
            category: "general".to_string(),
            single_turn: false,
            messages: vec![],
            validations: BTreeMap::new(),
        }
    }

    #[test]
    fn status_is_pass_without_failures() {
        let results = [rule(true, true), rule(true, false)];
        assert_eq!(ScenarioStatus::Pass, ScenarioStatus::derive(results.iter()));
    }

    #[test]
    fn status_is_warn_for_non_critical_failure() {
        let results = [rule(true, true), rule(false, false)];
        assert_eq!(ScenarioStatus::Warn, ScenarioStatus::derive(results.iter()));
    }

    #[test]
    fn status_is_fail_for_critical_failure() {
        // A critical failure wins even when non-critical failures are present.
        let results = [rule(false, false), rule(false, true)];
        assert_eq!(ScenarioStatus::Fail, ScenarioStatus::derive(results.iter()));
    }

    #[test]
    fn status_is_pass_for_no_rules() {
        assert_eq!(ScenarioStatus::Pass, ScenarioStatus::derive([]));
    }

    #[test]
    fn failed_result_is_always_fail() {
        let mut outcomes = BTreeMap::new();
        outcomes.insert(
            0,
            TurnOutcome {
                message: "hi".to_string(),
                reply: "hello".to_string(),
                intent: None,
                routed_action: None,
                source: None,
                response_time_ms: 10,
                rule_results: vec![rule(true, true)],
            },
        );

        let result = ScenarioResult::failed(
            "run-1",
            &scenario(),
            outcomes.clone(),
            25,
            "transport failure on turn 1: connection refused".to_string(),
        );

        assert_eq!(ScenarioStatus::Fail, result.status);
        // Outcomes recorded before the failure are preserved.
        assert_eq!(outcomes, result.turn_outcomes);
        assert!(result.error.unwrap().contains("turn 1"));
    }

    #[test]
    fn scenario_results_round_trip_through_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");

        let first = ScenarioResult::completed("run-1", &scenario(), BTreeMap::new(), 12);
        let second = ScenarioResult::failed(
            "run-1",
            &scenario(),
            BTreeMap::new(),
            7,
            "transport failure on turn 0: timed out".to_string(),
        );

        append_scenario_result(&first, &path).unwrap();
        append_scenario_result(&second, &path).unwrap();

        let loaded = load_scenario_results(&path).unwrap();
        assert_eq!(vec![first, second], loaded);
    }
}
