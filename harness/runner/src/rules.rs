use parley_model::{RuleCheck, RuleResult, ValidationRule};

/// Evaluate one validation rule against a turn's reply, classification label
/// and measured latency. Pure; the simulator calls this once per rule on
/// turns that carry validations.
pub fn evaluate(
    rule: &ValidationRule,
    reply: &str,
    intent: Option<&str>,
    response_time_ms: u64,
) -> RuleResult {
    let (passed, message) = match &rule.check {
        RuleCheck::NotEmpty => {
            if reply.trim().is_empty() {
                (false, "reply is empty".to_string())
            } else {
                (true, "reply is non-empty".to_string())
            }
        }
        RuleCheck::ContainsAny { values } => {
            let reply_lower = reply.to_lowercase();
            let matched: Vec<&str> = values
                .iter()
                .filter(|v| reply_lower.contains(&v.to_lowercase()))
                .map(|v| v.as_str())
                .collect();

            if matched.is_empty() {
                (false, format!("none of {values:?} found in reply"))
            } else {
                (true, format!("matched: {}", matched.join(", ")))
            }
        }
        RuleCheck::NotContains { values } => {
            let reply_lower = reply.to_lowercase();
            let offending: Vec<&str> = values
                .iter()
                .filter(|v| reply_lower.contains(&v.to_lowercase()))
                .map(|v| v.as_str())
                .collect();

            if offending.is_empty() {
                (true, "no forbidden values in reply".to_string())
            } else {
                (false, format!("forbidden values in reply: {}", offending.join(", ")))
            }
        }
        RuleCheck::ResponseTime { max_ms } => {
            if response_time_ms <= *max_ms {
                (true, format!("{response_time_ms}ms <= {max_ms}ms"))
            } else {
                (false, format!("{response_time_ms}ms > {max_ms}ms"))
            }
        }
        RuleCheck::IntentMatch { expected } => {
            let actual = intent.unwrap_or("(none)");
            (
                intent == Some(expected.as_str()),
                format!("expected intent '{expected}', got '{actual}'"),
            )
        }
        // Malformed scenario data must not masquerade as a passing test.
        RuleCheck::Unknown { kind } => (false, format!("unrecognised rule kind '{kind}'")),
    };

    RuleResult {
        rule: rule.check.label(),
        passed,
        message,
        critical: rule.critical,
    }
}
