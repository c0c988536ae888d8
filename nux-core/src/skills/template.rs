//! Scaffold record for a new skill.

use serde::{Deserialize, Serialize};

use super::SkillMetadata;

/// Metadata template a human fills in when creating a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillTemplate {
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub triggers: Vec<String>,
}

impl SkillTemplate {
    pub fn new(name: &str) -> Self {
        Self {
            name: normalize_skill_name(name),
            version: "1.0.0".into(),
            author: "Your Name".into(),
            description: "What does this skill do?".into(),
            triggers: Vec::new(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Metadata for a filled-in template.
    pub fn into_metadata(self) -> SkillMetadata {
        SkillMetadata {
            name: self.name,
            version: self.version,
            author: self.author,
            description: self.description,
            triggers: self.triggers,
            requires: Vec::new(),
            enabled: true,
        }
    }
}

/// Lower-case, with whitespace and dashes folded to underscores.
fn normalize_skill_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() || c == '-' {
                '_'
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_has_placeholder_fields_and_no_triggers() {
        let t = SkillTemplate::new("My Skill");
        assert_eq!(t.name, "my_skill");
        assert_eq!(t.version, "1.0.0");
        assert_eq!(t.author, "Your Name");
        assert!(t.triggers.is_empty());
    }

    #[test]
    fn template_serializes_all_keys() {
        let json: serde_json::Value =
            serde_json::from_str(&SkillTemplate::new("pomodoro").to_json_pretty().expect("json"))
                .expect("parse");
        for key in ["name", "version", "author", "description", "triggers"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["triggers"], serde_json::json!([]));
    }

    #[test]
    fn filled_template_becomes_enabled_metadata() {
        let mut t = SkillTemplate::new("timer");
        t.triggers = vec!["timer".into()];
        let meta = t.into_metadata();
        assert!(meta.enabled);
        assert!(meta.can_handle("set a timer"));
    }
}
