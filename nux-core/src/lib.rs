//! # nux-core
//!
//! Voice-command core: turns a transcribed utterance into an executed action
//! and a persona-flavoured reply.
//!
//! ## Architecture
//!
//! ```text
//! wake signal ─► ConversationSession ─► Transcriber::capture
//!                        │
//!                 IntentClassifier::parse
//!                        │
//!        CommandRouter(spawn_blocking): intent handler → legacy phrase → skill
//!                        │
//!               ContextMemory::add_interaction
//!                        │
//!        PersonalityResponder ─► EventHub (broadcast) + SpeechSink
//! ```
//!
//! Audio, STT, TTS and desktop side effects stay behind traits
//! (`Transcriber`, `SpeechSink`, `PlatformActions`); the host binary
//! supplies them.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod builtins;
pub mod command;
pub mod error;
pub mod intent;
pub mod ipc;
pub mod memory;
pub mod personality;
pub mod router;
pub mod session;
pub mod skills;
pub mod voice;

// Convenience re-exports for downstream crates
pub use builtins::{PlatformActions, SystemAction, VolumeAction};
pub use command::{CommandResult, Origin, Parameters};
pub use error::{NuxError, Result};
pub use intent::{IntentClassification, IntentClassifier};
pub use ipc::events::{AssistantEvent, ConversationState};
pub use ipc::EventHub;
pub use memory::{ContextMemory, ContextStats, Interaction, MemoryConfig};
pub use personality::{Persona, PersonalityResponder, ResponseContext, ResponseKind};
pub use router::CommandRouter;
pub use session::{ConversationSession, CycleOutcome, SessionConfig, SharedMemory};
pub use skills::{
    FnLoader, LoadReport, SharedRegistry, Skill, SkillContext, SkillLoader, SkillMetadata,
    SkillRegistry, SkillTemplate,
};
pub use voice::{SpeechRequest, SpeechSink, Transcriber, Utterance};
