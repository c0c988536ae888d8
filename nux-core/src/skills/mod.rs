//! Pluggable skills.
//!
//! A `Skill` is registered explicitly, either directly via
//! `SkillRegistry::register` or through a `SkillLoader` that resolves a
//! trusted source into instantiated skills. Nothing is discovered by
//! scanning, and nothing is sandboxed: a loader's skills run with the same
//! trust as built-in code.

pub mod registry;
pub mod template;

pub use registry::{LoadReport, SharedRegistry, SkillRegistry};
pub use template::SkillTemplate;

use serde::{Deserialize, Serialize};

use crate::command::CommandResult;
use crate::error::Result;
use crate::intent::IntentClassification;

/// Descriptive record a skill returns from `describe()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillMetadata {
    /// Registry key. Uniqueness is enforced by the registry, not the skill.
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
    /// Phrases whose case-insensitive presence in a command selects this skill.
    pub triggers: Vec<String>,
    /// Free-form dependency notes, informational only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl SkillMetadata {
    pub fn new(name: &str, version: &str, author: &str, description: &str, triggers: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            author: author.to_string(),
            description: description.to_string(),
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
            requires: Vec::new(),
            enabled: true,
        }
    }

    /// `true` if any trigger is a case-insensitive substring of `command`.
    pub fn can_handle(&self, command: &str) -> bool {
        let command = command.to_lowercase();
        self.triggers
            .iter()
            .any(|t| !t.is_empty() && command.contains(&t.to_lowercase()))
    }

    pub fn help(&self) -> String {
        format!(
            "{}\n\nTriggers: {}",
            self.description,
            self.triggers.join(", ")
        )
    }
}

/// What a skill sees besides the raw command text.
#[derive(Debug, Clone, Default)]
pub struct SkillContext {
    /// Classification of the command, when one was made.
    pub intent: Option<IntentClassification>,
    /// Recent in-window commands, oldest first.
    pub recent_commands: Vec<String>,
}

impl SkillContext {
    pub fn for_intent(intent: &IntentClassification) -> Self {
        Self {
            intent: Some(intent.clone()),
            recent_commands: Vec::new(),
        }
    }

    pub fn with_recent(mut self, recent_commands: Vec<String>) -> Self {
        self.recent_commands = recent_commands;
        self
    }
}

/// Contract for pluggable skills.
///
/// `execute` takes `&self`: a skill with mutable state keeps it behind its
/// own lock, so dispatch only needs a shared borrow of the registry.
pub trait Skill: Send + Sync + 'static {
    /// Metadata, read once at registration time.
    fn describe(&self) -> SkillMetadata;

    /// Run the skill for `command`.
    ///
    /// # Errors
    /// Any error is converted into a failed `CommandResult` by the caller.
    fn execute(&self, command: &str, ctx: &SkillContext) -> Result<CommandResult>;

    /// One-time setup, called right after registration through `load`.
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Teardown, called from `SkillRegistry::shutdown_all`.
    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// Resolves one trusted source location into instantiated skills.
pub trait SkillLoader: Send + Sync {
    /// Human-readable source name used in logs.
    fn source(&self) -> &str;

    fn load(&self) -> anyhow::Result<Vec<Box<dyn Skill>>>;
}

type SkillFactory = dyn Fn() -> anyhow::Result<Vec<Box<dyn Skill>>> + Send + Sync;

/// A `SkillLoader` backed by a closure. The usual way to hand a
/// compiled-in list of skills to the registry.
pub struct FnLoader {
    source: String,
    factory: Box<SkillFactory>,
}

impl FnLoader {
    pub fn new<F>(source: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<Vec<Box<dyn Skill>>> + Send + Sync + 'static,
    {
        Self {
            source: source.into(),
            factory: Box::new(factory),
        }
    }
}

impl SkillLoader for FnLoader {
    fn source(&self) -> &str {
        &self.source
    }

    fn load(&self) -> anyhow::Result<Vec<Box<dyn Skill>>> {
        (self.factory)()
    }
}
