use std::collections::BTreeMap;

use parley_model::{Scenario, ScenarioResult, TurnOutcome};

use crate::chat::{ChatService, HistoryEntry};
use crate::rules::evaluate;

/// Replay one scenario's turns against the chat service, in strict order.
///
/// Turns model a real conversation, so turn `t + 1` is never sent before turn
/// `t`'s reply has been received and validated. History grows by a user and an
/// assistant entry after every successful exchange, whether or not the turn
/// carries rules.
///
/// A transport failure terminates the scenario immediately as a failure,
/// keeping whatever outcomes were recorded before it. Errors never propagate
/// out of this function.
pub async fn simulate(chat: &dyn ChatService, scenario: &Scenario, run_id: &str) -> ScenarioResult {
    let started = tokio::time::Instant::now();
    let mut history: Vec<HistoryEntry> = Vec::new();
    let mut turn_outcomes: BTreeMap<usize, TurnOutcome> = BTreeMap::new();

    // Single-turn scenarios terminate after their first exchange.
    let turn_limit = if scenario.single_turn {
        scenario.messages.len().min(1)
    } else {
        scenario.messages.len()
    };

    for (turn, message) in scenario.messages.iter().take(turn_limit).enumerate() {
        let turn_started = tokio::time::Instant::now();
        let reply = match chat.send_turn(&scenario.id, &message.text, &history).await {
            Ok(reply) => reply,
            Err(e) => {
                log::debug!("Scenario {} failed on turn {turn}: {e}", scenario.id);
                return ScenarioResult::failed(
                    run_id,
                    scenario,
                    turn_outcomes,
                    started.elapsed().as_millis() as u64,
                    format!("transport failure on turn {turn}: {e}"),
                );
            }
        };
        let response_time_ms = turn_started.elapsed().as_millis() as u64;

        history.push(HistoryEntry::user(&message.text));
        history.push(HistoryEntry::assistant(&reply.message));

        if let Some(rules) = scenario.validations.get(&turn) {
            let rule_results = rules
                .iter()
                .map(|rule| evaluate(rule, &reply.message, reply.intent.as_deref(), response_time_ms))
                .collect();

            turn_outcomes.insert(
                turn,
                TurnOutcome {
                    message: message.text.clone(),
                    reply: reply.message,
                    intent: reply.intent,
                    routed_action: reply.routed_action,
                    source: reply.source,
                    response_time_ms,
                    rule_results,
                },
            );
        }
    }

    ScenarioResult::completed(
        run_id,
        scenario,
        turn_outcomes,
        started.elapsed().as_millis() as u64,
    )
}
