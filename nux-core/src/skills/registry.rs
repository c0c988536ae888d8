//! `SkillRegistry`: ordered, name-unique collection of skills.
//!
//! ## Ordering
//!
//! Entries keep registration order. `dispatch` walks that order and the first
//! enabled skill whose triggers match wins, so when two skills overlap the
//! earlier registration always answers.
//!
//! ## Name collisions
//!
//! A second skill with an already-registered name is rejected with
//! `NuxError::DuplicateSkill`; the stored entry is never replaced. `load`
//! logs and skips such rejects instead of aborting.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use super::{Skill, SkillContext, SkillLoader, SkillMetadata};
use crate::command::{CommandResult, Origin};
use crate::error::{panic_message, NuxError, Result};

/// Registry shared between the router and management surfaces.
///
/// Dispatch takes the read lock; enable/disable/load take the write lock.
pub type SharedRegistry = Arc<RwLock<SkillRegistry>>;

struct SkillEntry {
    metadata: SkillMetadata,
    skill: Box<dyn Skill>,
}

/// Outcome of `SkillRegistry::load`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Names registered by this load, in order.
    pub loaded: Vec<String>,
    /// Sources whose loader failed, with the error text.
    pub failed_sources: Vec<(String, String)>,
    /// Skill names rejected as duplicates.
    pub rejected: Vec<String>,
}

#[derive(Default)]
pub struct SkillRegistry {
    entries: Vec<SkillEntry>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Register one skill. `describe()` is called exactly once, here.
    ///
    /// # Errors
    /// `NuxError::DuplicateSkill` if the name is already taken.
    pub fn register(&mut self, skill: Box<dyn Skill>) -> Result<()> {
        let metadata = skill.describe();
        if self.position(&metadata.name).is_some() {
            return Err(NuxError::DuplicateSkill(metadata.name));
        }
        info!(skill = %metadata.name, version = %metadata.version, "skill registered");
        self.entries.push(SkillEntry { metadata, skill });
        Ok(())
    }

    /// Register every skill each loader yields, then initialise the new ones.
    ///
    /// A loader failure, a duplicate name, or a failed `initialize()` is
    /// logged and skipped; the remaining sources still load.
    pub fn load(&mut self, loaders: &[&dyn SkillLoader]) -> LoadReport {
        info!(sources = loaders.len(), "loading skills");
        let mut report = LoadReport::default();
        let first_new = self.entries.len();

        for loader in loaders {
            let source = loader.source().to_string();
            let skills = match catch_unwind(AssertUnwindSafe(|| loader.load())) {
                Ok(Ok(skills)) => skills,
                Ok(Err(e)) => {
                    error!(source = %source, "failed to load skills: {e:#}");
                    report.failed_sources.push((source, e.to_string()));
                    continue;
                }
                Err(payload) => {
                    let msg = panic_message(payload.as_ref());
                    error!(source = %source, "skill loader panicked: {msg}");
                    report.failed_sources.push((source, msg));
                    continue;
                }
            };

            for skill in skills {
                match self.register(skill) {
                    Ok(()) => {
                        if let Some(entry) = self.entries.last() {
                            report.loaded.push(entry.metadata.name.clone());
                        }
                    }
                    Err(NuxError::DuplicateSkill(name)) => {
                        warn!(source = %source, skill = %name, "duplicate skill name rejected");
                        report.rejected.push(name);
                    }
                    Err(e) => {
                        error!(source = %source, "failed to register skill: {e}");
                    }
                }
            }
        }

        for entry in &self.entries[first_new..] {
            let name = &entry.metadata.name;
            match catch_unwind(AssertUnwindSafe(|| entry.skill.initialize())) {
                Ok(Ok(())) => debug!(skill = %name, "skill initialised"),
                Ok(Err(e)) => error!(skill = %name, "failed to initialise skill: {e}"),
                Err(payload) => error!(
                    skill = %name,
                    "skill initialise panicked: {}",
                    panic_message(payload.as_ref())
                ),
            }
        }

        info!(
            loaded = report.loaded.len(),
            failed_sources = report.failed_sources.len(),
            rejected = report.rejected.len(),
            total = self.entries.len(),
            "skills loaded"
        );
        report
    }

    /// Run the first enabled skill whose triggers match `command`.
    ///
    /// Returns `None` when nothing matches so the caller can try other tiers.
    /// A skill error or panic becomes a failed result tagged with its name.
    pub fn dispatch(&self, command: &str, ctx: &SkillContext) -> Option<CommandResult> {
        let entry = self
            .entries
            .iter()
            .filter(|e| e.metadata.enabled)
            .find(|e| e.metadata.can_handle(command))?;

        info!(skill = %entry.metadata.name, "skill handling command");
        Some(run_skill(entry, command, ctx))
    }

    /// Run a named skill directly, ignoring triggers and the enabled flag.
    ///
    /// # Errors
    /// `NuxError::SkillNotFound` for an unknown name.
    pub fn execute_named(
        &self,
        name: &str,
        command: &str,
        ctx: &SkillContext,
    ) -> Result<CommandResult> {
        let idx = self
            .position(name)
            .ok_or_else(|| NuxError::SkillNotFound(name.to_string()))?;
        Ok(run_skill(&self.entries[idx], command, ctx))
    }

    pub fn enable(&mut self, name: &str) -> Result<()> {
        self.set_enabled(name, true)
    }

    pub fn disable(&mut self, name: &str) -> Result<()> {
        self.set_enabled(name, false)
    }

    fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        let idx = self
            .position(name)
            .ok_or_else(|| NuxError::SkillNotFound(name.to_string()))?;
        self.entries[idx].metadata.enabled = enabled;
        info!(skill = %name, enabled, "skill toggled");
        Ok(())
    }

    /// Call every skill's `shutdown()`. Failures are logged, never returned.
    pub fn shutdown_all(&self) {
        info!("shutting down all skills");
        for entry in &self.entries {
            let name = &entry.metadata.name;
            match catch_unwind(AssertUnwindSafe(|| entry.skill.shutdown())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(skill = %name, "error shutting down skill: {e}"),
                Err(payload) => error!(
                    skill = %name,
                    "skill shutdown panicked: {}",
                    panic_message(payload.as_ref())
                ),
            }
        }
    }

    /// Metadata snapshot in registration order.
    pub fn list(&self) -> Vec<SkillMetadata> {
        self.entries.iter().map(|e| e.metadata.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&SkillMetadata> {
        self.position(name).map(|i| &self.entries[i].metadata)
    }

    pub fn get_help(&self, name: &str) -> Option<String> {
        self.get(name).map(SkillMetadata::help)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.metadata.name == name)
    }
}

impl std::fmt::Debug for SkillRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillRegistry")
            .field(
                "skills",
                &self.entries.iter().map(|e| &e.metadata.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn run_skill(entry: &SkillEntry, command: &str, ctx: &SkillContext) -> CommandResult {
    let name = &entry.metadata.name;
    let outcome = catch_unwind(AssertUnwindSafe(|| entry.skill.execute(command, ctx)));
    let result = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            error!(skill = %name, "skill execution failed: {e}");
            CommandResult::failure(e.to_string())
        }
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            error!(skill = %name, "skill execution panicked: {msg}");
            CommandResult::failure(msg)
        }
    };
    result.with_origin(Origin::Skill(name.clone()))
}
