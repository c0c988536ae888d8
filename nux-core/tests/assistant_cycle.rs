use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use nux_core::builtins::{self, PlatformActions, SystemAction, VolumeAction};
use nux_core::voice::{RecordingSpeech, ScriptStep, ScriptedTranscriber};
use nux_core::{
    AssistantEvent, CommandResult, CommandRouter, ConversationSession, ConversationState,
    CycleOutcome, FnLoader, NuxError, Origin, Persona, PersonalityResponder, SessionConfig, Skill,
    SkillContext, SkillMetadata, SkillRegistry,
};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

#[derive(Default)]
struct NullPlatform {
    opened: Mutex<Vec<String>>,
}

impl PlatformActions for NullPlatform {
    fn open_application(&self, name: &str) -> nux_core::Result<String> {
        self.opened.lock().push(name.to_string());
        Ok(name.to_string())
    }

    fn open_first_available(&self, candidates: &[&str]) -> nux_core::Result<Option<String>> {
        Ok(candidates.first().map(|c| c.to_string()))
    }

    fn take_screenshot(&self) -> nux_core::Result<Option<PathBuf>> {
        Ok(None)
    }

    fn set_volume(&self, _level: u8) -> nux_core::Result<()> {
        Ok(())
    }

    fn adjust_volume(&self, _action: VolumeAction) -> nux_core::Result<()> {
        Ok(())
    }

    fn system_control(&self, _action: SystemAction) -> nux_core::Result<()> {
        Err(NuxError::handler("not permitted in tests"))
    }

    fn web_search(&self, _query: &str) -> nux_core::Result<()> {
        Ok(())
    }

    fn create_file(&self, name: &str) -> nux_core::Result<PathBuf> {
        Ok(PathBuf::from(name))
    }

    fn delete_file(&self, name: &str) -> nux_core::Result<PathBuf> {
        Ok(PathBuf::from(name))
    }
}

/// Reports how many recent commands it was shown.
struct HistorySkill;

impl Skill for HistorySkill {
    fn describe(&self) -> SkillMetadata {
        SkillMetadata::new(
            "history",
            "1.0.0",
            "tests",
            "What did I just say",
            &["what did i say"],
        )
    }

    fn execute(&self, _command: &str, ctx: &SkillContext) -> nux_core::Result<CommandResult> {
        let last = ctx.recent_commands.last().cloned().unwrap_or_default();
        Ok(CommandResult::ok(json!({ "seen": ctx.recent_commands.len() }))
            .with_speak(format!("You said {last}")))
    }
}

struct Assistant {
    session: Arc<ConversationSession>,
    speech: Arc<RecordingSpeech>,
    transcriber: Arc<ScriptedTranscriber>,
    platform: Arc<NullPlatform>,
}

fn assistant() -> Assistant {
    let mut registry = SkillRegistry::new();
    let loader = FnLoader::new("integration", || {
        Ok(vec![Box::new(HistorySkill) as Box<dyn Skill>])
    });
    let report = registry.load(&[&loader]);
    assert_eq!(report.loaded, vec!["history".to_string()]);

    let platform = Arc::new(NullPlatform::default());
    let mut router = CommandRouter::new(registry.into_shared());
    builtins::install(&mut router, platform.clone());

    let transcriber = Arc::new(ScriptedTranscriber::default());
    let speech = Arc::new(RecordingSpeech::new());
    let config = SessionConfig {
        capture_timeout: Duration::from_millis(500),
        wait_for_speech: true,
        ..Default::default()
    };
    let session = ConversationSession::new(config, Arc::new(router), transcriber.clone())
        .expect("session")
        .with_responder(PersonalityResponder::seeded("Nux", Persona::Professional, 11))
        .with_speech(speech.clone());

    Assistant {
        session: Arc::new(session),
        speech,
        transcriber,
        platform,
    }
}

fn drain(rx: &mut broadcast::Receiver<AssistantEvent>) -> Vec<AssistantEvent> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(ev) => out.push(ev),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return out,
        }
    }
}

#[tokio::test]
async fn spoken_command_reaches_platform_under_500ms() {
    let a = assistant();
    a.transcriber.push(ScriptStep::say("launch firefox"));

    let start = Instant::now();
    let outcome = a.session.on_wake().await.expect("cycle");
    let elapsed = start.elapsed();

    assert!(matches!(outcome, CycleOutcome::Completed(_)));
    assert_eq!(*a.platform.opened.lock(), vec!["firefox"]);
    assert_eq!(
        a.speech.texts(),
        vec!["Opening that for you now! Opening firefox"]
    );
    assert!(
        elapsed < Duration::from_millis(500),
        "cycle took {} ms",
        elapsed.as_millis()
    );
}

#[tokio::test]
async fn skills_see_recent_commands_from_memory() {
    let a = assistant();
    a.session.handle_text("what time is it").await.expect("first");
    a.session.handle_text("mute").await.expect("second");

    let outcome = a.session.handle_text("what did I say").await.expect("third");
    let CycleOutcome::Completed(interaction) = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(interaction.result.result["seen"], 2);
    assert_eq!(interaction.result.origin, Some(Origin::Skill("history".into())));
    assert_eq!(
        interaction.response.as_deref(),
        Some("Done! You said mute")
    );
}

#[tokio::test]
async fn disabled_skill_no_longer_answers() {
    let a = assistant();
    a.session
        .router()
        .skills()
        .write()
        .disable("history")
        .expect("disable");

    let outcome = a.session.handle_text("what did I say").await.expect("cycle");
    let CycleOutcome::Completed(interaction) = outcome else {
        panic!("expected completion");
    };
    assert!(interaction.result.is_not_recognized());
}

#[tokio::test]
async fn handler_failure_is_spoken_not_raised() {
    let a = assistant();
    let mut rx = a.session.subscribe();

    let outcome = a.session.handle_text("shutdown the computer").await.expect("cycle");
    let CycleOutcome::Completed(interaction) = outcome else {
        panic!("expected completion");
    };
    assert!(!interaction.result.success);
    assert_eq!(
        interaction.response.as_deref(),
        Some("Sorry, I couldn't complete that. not permitted in tests")
    );

    let result_event = drain(&mut rx)
        .into_iter()
        .find(|e| matches!(e, AssistantEvent::CommandResult { .. }))
        .expect("command_result event");
    let json = serde_json::to_value(&result_event).expect("serialize");
    assert_eq!(json["type"], "command_result");
    assert_eq!(json["result"]["success"], false);
    assert_eq!(a.session.state(), ConversationState::Idle);
}

#[tokio::test]
async fn timeout_then_next_wake_succeeds() {
    let a = assistant();
    a.transcriber.push(ScriptStep::Silence);
    a.transcriber.push(ScriptStep::say("what's the time"));

    assert_eq!(a.session.on_wake().await.expect("first"), CycleOutcome::TimedOut);
    let outcome = a.session.on_wake().await.expect("second");
    let CycleOutcome::Completed(interaction) = outcome else {
        panic!("expected completion");
    };
    assert!(interaction
        .response
        .as_deref()
        .unwrap_or_default()
        .starts_with("The time is "));
    assert_eq!(a.session.memory().lock().len(), 1);
}
