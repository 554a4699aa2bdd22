use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use parley_model::{RuleCheck, Scenario, ScenarioStatus, TurnMessage, ValidationRule};
use parley_runner::prelude::{simulate, ChatError, ChatReply, ChatService, HistoryEntry};
use pretty_assertions::assert_eq;

fn scenario(id: &str, single_turn: bool, messages: &[&str]) -> Scenario {
    Scenario {
        id: id.to_string(),
        name: format!("Scenario {id}"),
        category: "general".to_string(),
        single_turn,
        messages: messages
            .iter()
            .map(|text| TurnMessage {
                text: text.to_string(),
            })
            .collect(),
        validations: BTreeMap::new(),
    }
}

fn rule(check: RuleCheck, critical: bool) -> ValidationRule {
    ValidationRule { check, critical }
}

/// Echoes every message back and records the history it was handed, so tests
/// can assert causal ordering of turns.
#[derive(Default)]
struct EchoChat {
    reply_text: Option<String>,
    intent: Option<String>,
    delay: Option<Duration>,
    seen: Mutex<Vec<(String, Vec<HistoryEntry>)>>,
}

#[async_trait]
impl ChatService for EchoChat {
    async fn send_turn(
        &self,
        _session_id: &str,
        message: &str,
        history: &[HistoryEntry],
    ) -> Result<ChatReply, ChatError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.seen
            .lock()
            .push((message.to_string(), history.to_vec()));

        Ok(ChatReply {
            message: self
                .reply_text
                .clone()
                .unwrap_or_else(|| format!("echo: {message}")),
            intent: self.intent.clone(),
            ..Default::default()
        })
    }

    async fn health_check(&self) -> Result<(), ChatError> {
        Ok(())
    }
}

/// Fails with a non-success status on the n-th call (0-based), succeeding
/// before that.
struct FailingChat {
    fail_on_call: usize,
    calls: Mutex<usize>,
}

#[async_trait]
impl ChatService for FailingChat {
    async fn send_turn(
        &self,
        _session_id: &str,
        message: &str,
        _history: &[HistoryEntry],
    ) -> Result<ChatReply, ChatError> {
        let mut calls = self.calls.lock();
        let call = *calls;
        *calls += 1;

        if call == self.fail_on_call {
            return Err(ChatError::Status { status: 503 });
        }

        Ok(ChatReply {
            message: format!("echo: {message}"),
            ..Default::default()
        })
    }

    async fn health_check(&self) -> Result<(), ChatError> {
        Ok(())
    }
}

#[tokio::test]
async fn history_reflects_all_prior_turns_in_order() {
    let chat = EchoChat::default();
    let scenario = scenario("multi-1", false, &["first", "second", "third"]);

    let result = simulate(&chat, &scenario, "run-1").await;

    assert_eq!(ScenarioStatus::Pass, result.status);

    let seen = chat.seen.lock();
    assert_eq!(3, seen.len());
    assert_eq!(("first".to_string(), vec![]), seen[0]);
    assert_eq!(
        (
            "second".to_string(),
            vec![
                HistoryEntry::user("first"),
                HistoryEntry::assistant("echo: first"),
            ]
        ),
        seen[1]
    );
    assert_eq!(
        (
            "third".to_string(),
            vec![
                HistoryEntry::user("first"),
                HistoryEntry::assistant("echo: first"),
                HistoryEntry::user("second"),
                HistoryEntry::assistant("echo: second"),
            ]
        ),
        seen[2]
    );
}

#[tokio::test]
async fn outcomes_are_recorded_only_for_validated_turns() {
    let chat = EchoChat::default();
    let mut scenario = scenario("multi-2", false, &["first", "second"]);
    scenario
        .validations
        .insert(1, vec![rule(RuleCheck::NotEmpty, false)]);

    let result = simulate(&chat, &scenario, "run-1").await;

    assert_eq!(ScenarioStatus::Pass, result.status);
    assert_eq!(vec![&1], result.turn_outcomes.keys().collect::<Vec<_>>());

    let outcome = &result.turn_outcomes[&1];
    assert_eq!("second", outcome.message);
    assert_eq!("echo: second", outcome.reply);
    assert!(outcome.rule_results[0].passed);
}

#[tokio::test]
async fn transport_failure_terminates_the_scenario() {
    let chat = FailingChat {
        fail_on_call: 1,
        calls: Mutex::new(0),
    };
    let mut scenario = scenario("multi-3", false, &["first", "second", "third"]);
    scenario
        .validations
        .insert(0, vec![rule(RuleCheck::NotEmpty, true)]);

    let result = simulate(&chat, &scenario, "run-1").await;

    assert_eq!(ScenarioStatus::Fail, result.status);
    assert_eq!(
        Some("transport failure on turn 1: chat endpoint returned status 503".to_string()),
        result.error
    );
    // Turn 0 completed and validated before the failure; its outcome stays.
    assert_eq!(vec![&0], result.turn_outcomes.keys().collect::<Vec<_>>());
    // Turn 2 was never attempted.
    assert_eq!(2, *chat.calls.lock());
}

#[tokio::test]
async fn single_turn_scenario_stops_after_the_first_exchange() {
    let chat = EchoChat::default();
    let mut scenario = scenario("single-1", true, &["only", "never sent"]);
    scenario
        .validations
        .insert(0, vec![rule(RuleCheck::NotEmpty, true)]);

    let result = simulate(&chat, &scenario, "run-1").await;

    assert_eq!(ScenarioStatus::Pass, result.status);
    assert_eq!(1, chat.seen.lock().len());
}

#[tokio::test]
async fn empty_reply_fails_a_critical_not_empty_rule() {
    let chat = EchoChat {
        reply_text: Some("   ".to_string()),
        ..Default::default()
    };
    let mut scenario = scenario("single-2", true, &["hello"]);
    scenario
        .validations
        .insert(0, vec![rule(RuleCheck::NotEmpty, true)]);

    let result = simulate(&chat, &scenario, "run-1").await;

    assert_eq!(ScenarioStatus::Fail, result.status);
    assert!(result.error.is_none());
    assert!(!result.turn_outcomes[&0].rule_results[0].passed);
}

#[tokio::test]
async fn non_critical_failure_on_a_later_turn_warns() {
    let chat = EchoChat::default();
    let mut scenario = scenario("multi-4", false, &["first", "second"]);
    scenario.validations.insert(
        1,
        vec![rule(
            RuleCheck::ContainsAny {
                values: vec!["pricing".to_string()],
            },
            false,
        )],
    );

    let result = simulate(&chat, &scenario, "run-1").await;

    assert_eq!(ScenarioStatus::Warn, result.status);
}

#[tokio::test(start_paused = true)]
async fn slow_replies_fail_response_time_rules() {
    let chat = EchoChat {
        delay: Some(Duration::from_millis(5200)),
        ..Default::default()
    };
    let mut scenario = scenario("slow-1", true, &["hello"]);
    scenario
        .validations
        .insert(0, vec![rule(RuleCheck::ResponseTime { max_ms: 3000 }, false)]);

    let result = simulate(&chat, &scenario, "run-1").await;

    assert_eq!(ScenarioStatus::Warn, result.status);
    let rule_result = &result.turn_outcomes[&0].rule_results[0];
    assert!(!rule_result.passed);
    assert_eq!("5200ms > 3000ms", rule_result.message);
}

#[tokio::test]
async fn intent_metadata_flows_into_outcomes() {
    let chat = EchoChat {
        intent: Some("pricing".to_string()),
        ..Default::default()
    };
    let mut scenario = scenario("intent-1", true, &["how much is wifi?"]);
    scenario.validations.insert(
        0,
        vec![rule(
            RuleCheck::IntentMatch {
                expected: "pricing".to_string(),
            },
            true,
        )],
    );

    let result = simulate(&chat, &scenario, "run-1").await;

    assert_eq!(ScenarioStatus::Pass, result.status);
    assert_eq!(Some("pricing".to_string()), result.turn_outcomes[&0].intent);
}
