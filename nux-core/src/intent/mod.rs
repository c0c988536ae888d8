//! Pattern-table intent classification.
//!
//! ## Matching
//!
//! ```text
//! text ─► trim + lowercase ─► for intent in table (in order)
//!                                 for pattern in intent (in order)
//!                                     first regex hit anywhere ─► (intent, 0.9, params)
//!                             no hit ─► ("unknown", 0.0, {})
//! ```
//!
//! There is no scoring across competing intents: table order is the only
//! tie-breaker. Confidence is binary by construction.

pub mod patterns;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::command::Parameters;
use crate::error::{NuxError, Result};

/// Intent tag returned when no pattern matches.
pub const UNKNOWN_INTENT: &str = "unknown";
/// Confidence reported for any pattern hit.
pub const MATCH_CONFIDENCE: f32 = 0.9;
/// Maximum number of suggestions returned by `get_command_suggestions`.
const MAX_SUGGESTIONS: usize = 5;

/// Result of classifying one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentClassification {
    pub intent: String,
    pub confidence: f32,
    pub parameters: Parameters,
    /// The normalised (trimmed, lower-cased) text that was classified.
    pub original_text: String,
}

impl IntentClassification {
    pub fn unknown(text: impl Into<String>) -> Self {
        Self {
            intent: UNKNOWN_INTENT.to_string(),
            confidence: 0.0,
            parameters: Parameters::new(),
            original_text: text.into(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.intent == UNKNOWN_INTENT
    }

    /// String parameter by name, if present.
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).and_then(Value::as_str)
    }
}

/// How parameters are pulled out of a pattern's first capture group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// The pattern carries no parameters.
    None,
    /// Store the trimmed capture as a string under the given key.
    Text(&'static str),
    /// All-digit captures become an integer under `number_key`; anything
    /// else is stored as text under `text_key`.
    NumberOrText {
        number_key: &'static str,
        text_key: &'static str,
    },
}

/// One pattern of an intent rule, in source form.
#[derive(Debug, Clone)]
pub struct PatternSpec {
    pub pattern: String,
    pub extraction: Extraction,
    /// Constant parameters added whenever this pattern matches.
    pub fixed: Vec<(&'static str, &'static str)>,
    /// Example phrases offered as autocomplete suggestions.
    pub examples: Vec<String>,
}

impl PatternSpec {
    pub fn new(pattern: &str, extraction: Extraction, examples: &[&str]) -> Self {
        Self {
            pattern: pattern.to_string(),
            extraction,
            fixed: Vec::new(),
            examples: examples.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn with_fixed(mut self, key: &'static str, value: &'static str) -> Self {
        self.fixed.push((key, value));
        self
    }
}

/// An intent tag and its ordered patterns.
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub intent: String,
    pub patterns: Vec<PatternSpec>,
}

impl IntentRule {
    pub fn new(intent: &str, patterns: Vec<PatternSpec>) -> Self {
        Self {
            intent: intent.to_string(),
            patterns,
        }
    }
}

struct CompiledPattern {
    regex: Regex,
    extraction: Extraction,
    fixed: Vec<(&'static str, &'static str)>,
    examples: Vec<String>,
}

struct CompiledRule {
    intent: String,
    patterns: Vec<CompiledPattern>,
}

/// Ordered pattern table, compiled once at construction.
pub struct IntentClassifier {
    rules: Vec<CompiledRule>,
}

impl IntentClassifier {
    /// Classifier over the built-in table.
    pub fn new() -> Result<Self> {
        Self::with_rules(patterns::builtin_rules())
    }

    /// Classifier over a caller-supplied table.
    ///
    /// # Errors
    /// `NuxError::Pattern` if any pattern fails to compile.
    pub fn with_rules(rules: Vec<IntentRule>) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let mut patterns = Vec::with_capacity(rule.patterns.len());
            for spec in rule.patterns {
                let regex = Regex::new(&spec.pattern).map_err(|source| NuxError::Pattern {
                    intent: rule.intent.clone(),
                    source,
                })?;
                patterns.push(CompiledPattern {
                    regex,
                    extraction: spec.extraction,
                    fixed: spec.fixed,
                    examples: spec.examples,
                });
            }
            compiled.push(CompiledRule {
                intent: rule.intent,
                patterns,
            });
        }
        Ok(Self { rules: compiled })
    }

    /// Classify free text. Never fails: a miss is `intent = "unknown"`.
    pub fn parse(&self, text: &str) -> IntentClassification {
        let normalized = text.trim().to_lowercase();
        debug!(text = %normalized, "parsing intent");

        for rule in &self.rules {
            for pattern in &rule.patterns {
                let Some(caps) = pattern.regex.captures(&normalized) else {
                    continue;
                };

                let mut parameters = Parameters::new();
                if let Some(group) = caps.get(1) {
                    extract(pattern.extraction, group.as_str().trim(), &mut parameters);
                }
                for (key, value) in &pattern.fixed {
                    parameters.insert((*key).to_string(), Value::from(*value));
                }

                info!(intent = %rule.intent, "intent matched");
                return IntentClassification {
                    intent: rule.intent.clone(),
                    confidence: MATCH_CONFIDENCE,
                    parameters,
                    original_text: normalized,
                };
            }
        }

        info!(text = %normalized, "no intent matched");
        IntentClassification::unknown(normalized)
    }

    /// Up to five example phrases starting with `prefix`, in table order.
    ///
    /// Autocomplete helper only; not consulted during dispatch.
    pub fn get_command_suggestions(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.to_lowercase();
        self.rules
            .iter()
            .flat_map(|r| r.patterns.iter())
            .flat_map(|p| p.examples.iter())
            .filter(|example| example.starts_with(&prefix))
            .take(MAX_SUGGESTIONS)
            .cloned()
            .collect()
    }

    /// Intent tags in table order.
    pub fn intents(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.intent.as_str()).collect()
    }
}

impl std::fmt::Debug for IntentClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentClassifier")
            .field("intents", &self.intents())
            .finish()
    }
}

fn extract(extraction: Extraction, capture: &str, out: &mut Parameters) {
    match extraction {
        Extraction::None => {}
        Extraction::Text(key) => {
            out.insert(key.to_string(), Value::from(capture));
        }
        Extraction::NumberOrText {
            number_key,
            text_key,
        } => {
            let is_number = !capture.is_empty() && capture.chars().all(|c| c.is_ascii_digit());
            match capture.parse::<i64>() {
                Ok(n) if is_number => {
                    out.insert(number_key.to_string(), Value::from(n));
                }
                // Digits too long for i64 are kept verbatim.
                _ if is_number => {
                    out.insert(number_key.to_string(), Value::from(capture));
                }
                _ => {
                    out.insert(text_key.to_string(), Value::from(capture));
                }
            }
        }
    }
}
