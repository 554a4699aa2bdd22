use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// One authored user turn within a scenario.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TurnMessage {
    pub text: String,
}

/// The closed set of checks a validation rule can perform.
///
/// Corpus records carry a free-form `kind` string; anything unrecognised maps
/// to [RuleCheck::Unknown] so that malformed scenario data fails loudly when
/// evaluated instead of passing silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleCheck {
    NotEmpty,
    ContainsAny { values: Vec<String> },
    NotContains { values: Vec<String> },
    ResponseTime { max_ms: u64 },
    IntentMatch { expected: String },
    Unknown { kind: String },
}

impl RuleCheck {
    /// A short label for the check, used in rule results and reports.
    pub fn label(&self) -> String {
        match self {
            RuleCheck::NotEmpty => "not_empty".to_string(),
            RuleCheck::ContainsAny { .. } => "contains_any".to_string(),
            RuleCheck::NotContains { .. } => "not_contains".to_string(),
            RuleCheck::ResponseTime { .. } => "response_time".to_string(),
            RuleCheck::IntentMatch { .. } => "intent_match".to_string(),
            RuleCheck::Unknown { kind } => format!("unknown({kind})"),
        }
    }
}

/// A declarative assertion about one turn's reply, classification or latency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRule {
    pub check: RuleCheck,
    /// A failing critical rule forces the owning scenario to `Fail` rather
    /// than `Warn`.
    pub critical: bool,
}

/// A named, ordered conversation test case with optional per-turn rules.
///
/// Immutable once loaded. The simulator and scheduler share scenarios by
/// reference (`Arc<Scenario>`), never by copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub category: String,
    /// A single-turn scenario terminates after its first exchange, even if
    /// the record carries further messages.
    pub single_turn: bool,
    pub messages: Vec<TurnMessage>,
    /// Sparse mapping from turn index to the rules validated on that turn.
    pub validations: BTreeMap<usize, Vec<ValidationRule>>,
}

/// The rule shape as it appears in corpus files, before the `kind` string is
/// resolved into the closed [RuleCheck] union.
#[derive(Debug, Clone, Deserialize)]
struct RawRule {
    kind: String,
    #[serde(default)]
    values: Vec<String>,
    #[serde(default)]
    max_ms: Option<u64>,
    #[serde(default)]
    expected: Option<String>,
    #[serde(default)]
    critical: bool,
}

impl From<RawRule> for ValidationRule {
    fn from(raw: RawRule) -> Self {
        let check = match raw.kind.as_str() {
            "not_empty" => RuleCheck::NotEmpty,
            "contains_any" => RuleCheck::ContainsAny { values: raw.values },
            "not_contains" => RuleCheck::NotContains { values: raw.values },
            "response_time" => match raw.max_ms {
                Some(max_ms) => RuleCheck::ResponseTime { max_ms },
                None => RuleCheck::Unknown {
                    kind: "response_time without max_ms".to_string(),
                },
            },
            "intent_match" => match raw.expected {
                Some(expected) => RuleCheck::IntentMatch { expected },
                None => RuleCheck::Unknown {
                    kind: "intent_match without expected".to_string(),
                },
            },
            other => RuleCheck::Unknown {
                kind: other.to_string(),
            },
        };

        ValidationRule {
            check,
            critical: raw.critical,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawScenario {
    id: String,
    name: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    single_turn: bool,
    messages: Vec<TurnMessage>,
    #[serde(default)]
    validations: BTreeMap<usize, Vec<RawRule>>,
}

impl From<RawScenario> for Scenario {
    fn from(raw: RawScenario) -> Self {
        Scenario {
            id: raw.id,
            name: raw.name,
            category: raw.category,
            single_turn: raw.single_turn,
            messages: raw.messages,
            validations: raw
                .validations
                .into_iter()
                .map(|(turn, rules)| (turn, rules.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }
}

/// Corpus file formats understood by [parse_corpus].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusFormat {
    Json,
    Yaml,
}

impl CorpusFormat {
    fn for_path(path: &Path) -> CorpusFormat {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => CorpusFormat::Json,
            _ => CorpusFormat::Yaml,
        }
    }
}

/// Parse an ordered list of scenario records from corpus text.
///
/// Scenario ids must be unique within a corpus; a duplicate is a load error
/// rather than a silently shadowed test case.
pub fn parse_corpus(content: &str, format: CorpusFormat) -> anyhow::Result<Vec<Scenario>> {
    let raw: Vec<RawScenario> = match format {
        CorpusFormat::Json => serde_json::from_str(content).context("Invalid JSON corpus")?,
        CorpusFormat::Yaml => serde_yaml::from_str(content).context("Invalid YAML corpus")?,
    };

    let scenarios: Vec<Scenario> = raw.into_iter().map(Into::into).collect();

    let mut seen = std::collections::BTreeSet::new();
    for scenario in &scenarios {
        if !seen.insert(scenario.id.as_str()) {
            anyhow::bail!("Duplicate scenario id in corpus: {}", scenario.id);
        }
    }

    Ok(scenarios)
}

/// Load a scenario corpus from a JSON or YAML file, chosen by extension.
pub fn load_corpus(path: impl AsRef<Path>) -> anyhow::Result<Vec<Scenario>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;
    parse_corpus(&content, CorpusFormat::for_path(path))
        .with_context(|| format!("Failed to parse corpus file: {}", path.display()))
}
