//! `CommandRouter`: one dispatch call over three handler tiers.
//!
//! ## Precedence
//!
//! ```text
//! 1. intent handler registered for classification.intent  ─► handler(parameters)
//! 2. legacy phrase table (substring of lower-cased text)   ─► handler()
//! 3. SkillRegistry::dispatch                               ─► first matching skill
//! 4. { success: false, error: "command not recognized" }
//! ```
//!
//! Every handler call is wrapped: an `Err` or a panic becomes a failed
//! `CommandResult`, so nothing a handler does can escape `route`.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, error, info};

use crate::command::{CommandResult, Origin, Parameters};
use crate::error::{panic_message, Result};
use crate::intent::IntentClassification;
use crate::skills::{SharedRegistry, SkillContext};

/// Handler bound to one intent tag, called with the extracted parameters.
pub type IntentHandler = Box<dyn Fn(&Parameters) -> Result<CommandResult> + Send + Sync>;

/// Parameterless handler selected by phrase containment.
pub type LegacyHandler = Box<dyn Fn() -> Result<CommandResult> + Send + Sync>;

pub struct CommandRouter {
    intent_handlers: HashMap<String, IntentHandler>,
    legacy: Vec<(String, LegacyHandler)>,
    skills: SharedRegistry,
}

impl CommandRouter {
    pub fn new(skills: SharedRegistry) -> Self {
        Self {
            intent_handlers: HashMap::new(),
            legacy: Vec::new(),
            skills,
        }
    }

    /// Bind a handler to an intent tag, replacing any previous binding.
    pub fn register_intent<F>(&mut self, intent: &str, handler: F)
    where
        F: Fn(&Parameters) -> Result<CommandResult> + Send + Sync + 'static,
    {
        if self
            .intent_handlers
            .insert(intent.to_string(), Box::new(handler))
            .is_some()
        {
            debug!(intent, "intent handler replaced");
        }
    }

    /// Append a legacy phrase. Phrases are scanned in insertion order.
    pub fn register_legacy<F>(&mut self, phrase: &str, handler: F)
    where
        F: Fn() -> Result<CommandResult> + Send + Sync + 'static,
    {
        self.legacy
            .push((phrase.trim().to_lowercase(), Box::new(handler)));
    }

    pub fn has_intent_handler(&self, intent: &str) -> bool {
        self.intent_handlers.contains_key(intent)
    }

    pub fn legacy_phrases(&self) -> impl Iterator<Item = &str> {
        self.legacy.iter().map(|(p, _)| p.as_str())
    }

    pub fn skills(&self) -> &SharedRegistry {
        &self.skills
    }

    /// Route with a context built from the classification alone.
    pub fn route(&self, command_text: &str, classification: &IntentClassification) -> CommandResult {
        self.route_with_context(
            command_text,
            classification,
            &SkillContext::for_intent(classification),
        )
    }

    pub fn route_with_context(
        &self,
        command_text: &str,
        classification: &IntentClassification,
        ctx: &SkillContext,
    ) -> CommandResult {
        // ── Tier 1: intent handler ────────────────────────────────────────
        if let Some(handler) = self.intent_handlers.get(&classification.intent) {
            info!(intent = %classification.intent, "routing to intent handler");
            let origin = Origin::Intent(classification.intent.clone());
            return guarded(origin, || handler(&classification.parameters));
        }

        // ── Tier 2: legacy phrase table ───────────────────────────────────
        let lowered = command_text.trim().to_lowercase();
        if let Some((phrase, handler)) = self
            .legacy
            .iter()
            .find(|(phrase, _)| lowered.contains(phrase.as_str()))
        {
            info!(phrase = %phrase, "routing to legacy handler");
            return guarded(Origin::Legacy(phrase.clone()), || handler());
        }

        // ── Tier 3: skills ────────────────────────────────────────────────
        if let Some(result) = self.skills.read().dispatch(command_text, ctx) {
            return result;
        }

        // ── Tier 4: nothing claimed it ────────────────────────────────────
        info!(command = %lowered, "command not recognized");
        CommandResult::not_recognized()
    }
}

impl std::fmt::Debug for CommandRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut intents: Vec<&String> = self.intent_handlers.keys().collect();
        intents.sort();
        f.debug_struct("CommandRouter")
            .field("intents", &intents)
            .field("legacy", &self.legacy.len())
            .finish_non_exhaustive()
    }
}

fn guarded<F>(origin: Origin, call: F) -> CommandResult
where
    F: FnOnce() -> Result<CommandResult>,
{
    let result = match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            error!(origin = ?origin, "handler failed: {e}");
            CommandResult::failure(e.to_string())
        }
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            error!(origin = ?origin, "handler panicked: {msg}");
            CommandResult::failure(msg)
        }
    };
    if result.origin.is_some() {
        result
    } else {
        result.with_origin(origin)
    }
}
