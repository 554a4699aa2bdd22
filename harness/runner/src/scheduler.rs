use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use parley_core::prelude::{RunInterruptedError, ShutdownListener};
use parley_model::{Scenario, ScenarioResult, ScenarioStatus};
use tokio::task::JoinSet;

use crate::chat::ChatService;
use crate::session::simulate;

/// Live counters for a run, emitted after every scenario completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub total: usize,
    pub completed: usize,
    pub passed: usize,
    pub warned: usize,
    pub failed: usize,
    pub in_flight: usize,
}

impl ProgressUpdate {
    fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            passed: 0,
            warned: 0,
            failed: 0,
            in_flight: 0,
        }
    }

    fn record(&mut self, status: ScenarioStatus) {
        self.completed += 1;
        match status {
            ScenarioStatus::Pass => self.passed += 1,
            ScenarioStatus::Warn => self.warned += 1,
            ScenarioStatus::Fail => self.failed += 1,
        }
    }
}

/// Run every scenario through the simulator with at most `concurrency` in
/// flight at once.
///
/// Scenarios are pulled from a FIFO queue; results are collected in
/// completion order, one per input scenario regardless of how individual
/// simulations end. All bookkeeping (results, counters, progress) is mutated
/// from the single completion point below, so no locking is needed.
///
/// A stop request does not interrupt in-flight simulations; it stops dispatch
/// and records still-queued scenarios as failed so the report covers the full
/// corpus.
pub async fn run_all(
    chat: Arc<dyn ChatService>,
    scenarios: Vec<Arc<Scenario>>,
    concurrency: usize,
    run_id: &str,
    mut shutdown: Option<ShutdownListener>,
    mut on_progress: impl FnMut(ProgressUpdate),
) -> Vec<ScenarioResult> {
    let concurrency = concurrency.max(1);
    let total = scenarios.len();
    let mut queue: VecDeque<Arc<Scenario>> = scenarios.into();
    let mut join_set: JoinSet<ScenarioResult> = JoinSet::new();
    // Task id to scenario, so a panicked task can still be attributed.
    let mut in_flight: HashMap<tokio::task::Id, Arc<Scenario>> = HashMap::new();
    let mut results: Vec<ScenarioResult> = Vec::with_capacity(total);
    let mut update = ProgressUpdate::new(total);

    on_progress(update);

    loop {
        let stop_requested = shutdown
            .as_mut()
            .map(|listener| listener.stop_requested())
            .unwrap_or(false);

        if stop_requested && !queue.is_empty() {
            log::warn!(
                "Stop requested, cancelling {} scenarios still queued",
                queue.len()
            );
            while let Some(scenario) = queue.pop_front() {
                let result = ScenarioResult::failed(
                    run_id,
                    &scenario,
                    BTreeMap::new(),
                    0,
                    RunInterruptedError::new(&scenario.id).to_string(),
                );
                update.record(result.status);
                results.push(result);
            }
        }

        while join_set.len() < concurrency {
            let Some(scenario) = queue.pop_front() else {
                break;
            };
            let chat = chat.clone();
            let run_id = run_id.to_string();
            let task_scenario = scenario.clone();
            let handle = join_set
                .spawn(async move { simulate(chat.as_ref(), &task_scenario, &run_id).await });
            in_flight.insert(handle.id(), scenario);
        }

        if join_set.is_empty() {
            break;
        }

        match join_set.join_next_with_id().await {
            Some(Ok((id, result))) => {
                in_flight.remove(&id);
                update.record(result.status);
                results.push(result);
            }
            Some(Err(join_error)) => {
                // The simulator converts its own errors into results, so this
                // only fires for a panic inside a task. The scenario still
                // gets a result.
                match in_flight.remove(&join_error.id()) {
                    Some(scenario) => {
                        log::error!(
                            "Simulation of scenario {} panicked: {join_error}",
                            scenario.id
                        );
                        let result = ScenarioResult::failed(
                            run_id,
                            &scenario,
                            BTreeMap::new(),
                            0,
                            format!("internal fault during simulation: {join_error}"),
                        );
                        update.record(result.status);
                        results.push(result);
                    }
                    None => log::error!("Completed task was not being tracked: {join_error}"),
                }
            }
            None => break,
        }

        update.in_flight = join_set.len();
        on_progress(update);
    }

    results
}
