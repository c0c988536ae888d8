//! `CommandResult`: the uniform outcome of every routing tier.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Intent parameters, keyed by name. Ordered so serialised output is stable.
pub type Parameters = BTreeMap<String, Value>;

/// Which routing tier produced a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Origin {
    /// An intent-specific handler (`"open_application"`, ...).
    Intent(String),
    /// A legacy phrase handler, named by its phrase.
    Legacy(String),
    /// A registered skill, named by its metadata name.
    Skill(String),
}

/// Outcome of executing a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub success: bool,
    /// Opaque handler payload.
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Text a handler wants spoken instead of the generic phrasing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speak: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
}

/// Error text for the final routing tier.
pub const NOT_RECOGNIZED: &str = "command not recognized";

impl CommandResult {
    pub fn ok(result: impl Into<Value>) -> Self {
        Self {
            success: true,
            result: result.into(),
            error: None,
            speak: None,
            origin: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: Value::Null,
            error: Some(error.into()),
            speak: None,
            origin: None,
        }
    }

    pub fn not_recognized() -> Self {
        Self::failure(NOT_RECOGNIZED)
    }

    pub fn with_speak(mut self, speak: impl Into<String>) -> Self {
        self.speak = Some(speak.into());
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    /// `true` when no routing tier claimed the command.
    pub fn is_not_recognized(&self) -> bool {
        !self.success && self.origin.is_none() && self.error.as_deref() == Some(NOT_RECOGNIZED)
    }

    /// Payload rendered as plain text: strings verbatim, `null` as empty,
    /// everything else as compact JSON.
    pub fn result_text(&self) -> String {
        match &self.result {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_serializes_without_empty_optionals() {
        let result = CommandResult::failure("boom").with_origin(Origin::Skill("notes".into()));
        let json = serde_json::to_value(&result).expect("serialize result");
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
        assert_eq!(json["origin"]["kind"], "skill");
        assert_eq!(json["origin"]["name"], "notes");
        assert!(json.get("speak").is_none());
    }

    #[test]
    fn result_text_handles_payload_shapes() {
        assert_eq!(CommandResult::ok("hi").result_text(), "hi");
        assert_eq!(CommandResult::ok(Value::Null).result_text(), "");
        assert_eq!(CommandResult::ok(json!({"a": 1})).result_text(), r#"{"a":1}"#);
    }

    #[test]
    fn not_recognized_is_distinguishable_from_tagged_failures() {
        assert!(CommandResult::not_recognized().is_not_recognized());
        let tagged = CommandResult::not_recognized().with_origin(Origin::Skill("x".into()));
        assert!(!tagged.is_not_recognized());
    }
}
