mod report;
mod scenario;

pub use report::{
    append_scenario_result, load_run_report, load_scenario_results, store_run_report, RuleResult,
    RunReport, ScenarioReport, ScenarioResult, ScenarioStatus, TurnOutcome, TurnReport,
};
pub use scenario::{load_corpus, parse_corpus, CorpusFormat, RuleCheck, Scenario, TurnMessage, ValidationRule};
