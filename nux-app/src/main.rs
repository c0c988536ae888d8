//! `nux` entry point.
//!
//! Without flags this runs the console assistant: stdin lines stand in for
//! the wake-word detector and the transcriber, replies are printed. The
//! management flags operate on the skill registry and exit.

mod console;
mod platform;
mod settings;
mod skills;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use nux_core::{
    AssistantEvent, CycleOutcome, IntentClassifier, NuxError, SkillContext, SkillLoader,
    SkillTemplate,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use console::{ConsoleSpeech, Lines, StdinTranscriber};
use platform::DesktopPlatform;
use settings::{default_settings_path, load_settings, AppSettings};
use state::{build_registry, builtin_loader, persist, AppState, Collaborators};

/// Nux: voice command assistant (console mode).
#[derive(Parser)]
#[command(name = "nux", version, about)]
struct Cli {
    /// Path to settings.json.
    #[arg(long, env = "NUX_SETTINGS")]
    settings: Option<PathBuf>,

    /// List loaded skills and exit.
    #[arg(long)]
    list_skills: bool,

    /// Enable a skill (persisted) and exit.
    #[arg(long, value_name = "NAME")]
    enable: Option<String>,

    /// Disable a skill (persisted) and exit.
    #[arg(long, value_name = "NAME")]
    disable: Option<String>,

    /// Run one command against a named skill and print the result.
    #[arg(long, num_args = 2, value_names = ["NAME", "COMMAND"])]
    test_skill: Option<Vec<String>>,

    /// Print a metadata template for a new skill.
    #[arg(long, value_name = "NAME")]
    create_skill: Option<String>,

    /// Print example commands starting with PREFIX.
    #[arg(long, value_name = "PREFIX")]
    suggest: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nux=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings_path = cli.settings.clone().unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&settings_path);
    settings.apply_env_overrides();
    info!(path = %settings_path.display(), persona = %settings.persona, "settings loaded");

    if let Some(name) = &cli.create_skill {
        println!("{}", SkillTemplate::new(name).to_json_pretty()?);
        return Ok(());
    }
    if let Some(prefix) = &cli.suggest {
        for suggestion in IntentClassifier::new()?.get_command_suggestions(prefix) {
            println!("{suggestion}");
        }
        return Ok(());
    }

    let loader = builtin_loader(&settings_path);
    if cli.list_skills || cli.enable.is_some() || cli.disable.is_some() || cli.test_skill.is_some()
    {
        return manage_skills(&cli, settings, &settings_path, &loader);
    }

    run_console(settings, settings_path, &loader).await
}

fn manage_skills(
    cli: &Cli,
    mut settings: AppSettings,
    settings_path: &std::path::Path,
    loader: &dyn SkillLoader,
) -> anyhow::Result<()> {
    let (mut registry, _report) = build_registry(&settings, &[loader]);

    if let Some(name) = &cli.enable {
        registry.enable(name)?;
        settings.set_skill_enabled(name, true);
        persist(settings_path, &settings)?;
        println!("Enabled {name}");
    }
    if let Some(name) = &cli.disable {
        registry.disable(name)?;
        settings.set_skill_enabled(name, false);
        persist(settings_path, &settings)?;
        println!("Disabled {name}");
    }
    if let Some([name, command]) = cli.test_skill.as_deref() {
        let result = registry.execute_named(name, command, &SkillContext::default())?;
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    if cli.list_skills {
        for meta in registry.list() {
            let status = if meta.enabled { "enabled" } else { "disabled" };
            println!("{} v{} [{status}]: {}", meta.name, meta.version, meta.description);
            println!("    triggers: {}", meta.triggers.join(", "));
        }
    }

    registry.shutdown_all();
    Ok(())
}

async fn run_console(
    settings: AppSettings,
    settings_path: PathBuf,
    loader: &dyn SkillLoader,
) -> anyhow::Result<()> {
    let lines = console::spawn_stdin_reader();
    let speech = Arc::new(ConsoleSpeech::new(settings.assistant_name.clone()));
    let collaborators = Collaborators {
        platform: Arc::new(DesktopPlatform::from_home()),
        transcriber: Arc::new(StdinTranscriber::new(Arc::clone(&lines))),
        speech: settings.speak_responses.then(|| speech.clone() as Arc<dyn nux_core::SpeechSink>),
    };
    let state = AppState::build(settings, settings_path, &[loader], collaborators)
        .context("starting assistant")?;

    spawn_event_logger(&state);

    let wake_hint = state.settings.lock().wake_words.join("\", \"");
    println!("Nux v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "Say \"{wake_hint}\" then your command on the next line. `/text <command>` skips the wake word, `/status` shows diagnostics, `/quit` exits.\n"
    );

    console_loop(&state, &lines, &speech).await;

    info!("shutting down");
    state.skills.read().shutdown_all();
    Ok(())
}

async fn console_loop(state: &AppState, lines: &Lines, speech: &ConsoleSpeech) {
    let session = &state.session;
    loop {
        let line = tokio::select! {
            line = console::next_line(lines) => line,
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C");
                None
            }
        };
        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line == "/quit" {
            break;
        }
        if line == "/status" {
            match serde_json::to_string_pretty(&state.diagnostics_snapshot()) {
                Ok(json) => println!("{json}"),
                Err(e) => warn!("diagnostics: {e}"),
            }
            continue;
        }
        if let Some(command) = line.strip_prefix("/text ") {
            let outcome = state
                .run_interruptible(session.handle_text(command), interrupted())
                .await;
            report(state, speech, outcome);
            continue;
        }

        let is_wake = state.settings.lock().is_wake_phrase(line);
        if is_wake {
            println!("{}", speech.render(&session.responder().wake_response()));
            let outcome = state.run_interruptible(session.on_wake(), interrupted()).await;
            report(state, speech, outcome);
        } else {
            debug!(line, "no wake word; ignored");
        }
    }
}

/// Print what speech did not already say.
fn report(state: &AppState, speech: &ConsoleSpeech, outcome: nux_core::Result<CycleOutcome>) {
    let speaks = state.session.config().speak_responses;
    match outcome {
        Ok(CycleOutcome::Completed(interaction)) => {
            if !speaks {
                if let Some(response) = interaction.response {
                    println!("{}", speech.render(&response));
                }
            }
        }
        Ok(CycleOutcome::TimedOut) => {}
        Ok(CycleOutcome::Cancelled) => println!("(cancelled)"),
        Err(NuxError::Busy) => warn!("still handling the previous command"),
        Err(e) => warn!("command cycle failed: {e}"),
    }
}

/// Resolves on Ctrl+C. A failed signal listener never resolves.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("ctrl-c listener unavailable: {e}");
        std::future::pending::<()>().await;
    }
}

fn spawn_event_logger(state: &AppState) {
    let mut rx = state.session.subscribe();
    let speaks = state.session.config().speak_responses;
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(text) = console::event_echo(&event, speaks) {
                        println!("{text}");
                    }
                    match &event {
                        AssistantEvent::Error { message } => warn!("assistant error: {message}"),
                        _ => match serde_json::to_string(&event) {
                            Ok(json) => debug!(target: "nux::events", "{json}"),
                            Err(e) => warn!("serialize event: {e}"),
                        },
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("event logger lagged by {n} events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
