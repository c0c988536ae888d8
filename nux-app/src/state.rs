//! Application state: the assembled session plus the settings it came from.
//!
//! `AppState::build` is the composition root. It owns the only `EventHub`
//! (inside the session) and the only skill registry handle.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use nux_core::{
    builtins, CommandRouter, ConversationSession, ConversationState, CycleOutcome, LoadReport,
    PersonalityResponder, PlatformActions, SharedRegistry, SkillLoader, SkillRegistry,
    SpeechSink, Transcriber,
};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use crate::settings::{save_settings, AppSettings};
use crate::skills::BuiltinSkills;

pub struct AppState {
    /// Persisted app settings cache.
    pub settings: Arc<Mutex<AppSettings>>,
    /// Absolute path to `settings.json`.
    pub settings_path: PathBuf,
    pub skills: SharedRegistry,
    pub session: Arc<ConversationSession>,
}

/// Collaborators supplied by the host.
pub struct Collaborators {
    pub platform: Arc<dyn PlatformActions>,
    pub transcriber: Arc<dyn Transcriber>,
    pub speech: Option<Arc<dyn SpeechSink>>,
}

impl AppState {
    pub fn build(
        settings: AppSettings,
        settings_path: PathBuf,
        loaders: &[&dyn SkillLoader],
        collaborators: Collaborators,
    ) -> anyhow::Result<Self> {
        let (registry, report) = build_registry(&settings, loaders);
        log_load_report(&report);
        let skills = registry.into_shared();

        let mut router = CommandRouter::new(Arc::clone(&skills));
        builtins::install(&mut router, collaborators.platform);

        let responder = PersonalityResponder::new(settings.assistant_name.clone(), settings.persona());
        let mut session = ConversationSession::new(
            settings.session_config(),
            Arc::new(router),
            collaborators.transcriber,
        )
        .context("building conversation session")?
        .with_responder(responder);
        if let Some(speech) = collaborators.speech {
            session = session.with_speech(speech);
        }

        Ok(Self {
            settings: Arc::new(Mutex::new(settings)),
            settings_path,
            skills,
            session: Arc::new(session),
        })
    }

    /// Toggle a skill in the live registry and persist the choice.
    pub fn set_skill_enabled(&self, name: &str, enabled: bool) -> anyhow::Result<()> {
        {
            let mut skills = self.skills.write();
            if enabled {
                skills.enable(name)?;
            } else {
                skills.disable(name)?;
            }
        }
        let snapshot = {
            let mut settings = self.settings.lock();
            settings.set_skill_enabled(name, enabled);
            settings.clone()
        };
        persist(&self.settings_path, &snapshot)
    }

    /// Drive one session cycle; if `interrupt` resolves first the cycle is
    /// cancelled and its `Cancelled` outcome returned.
    pub async fn run_interruptible<C, I>(
        &self,
        cycle: C,
        interrupt: I,
    ) -> nux_core::Result<CycleOutcome>
    where
        C: Future<Output = nux_core::Result<CycleOutcome>>,
        I: Future<Output = ()>,
    {
        tokio::pin!(cycle);
        tokio::select! {
            biased;
            outcome = &mut cycle => outcome,
            () = interrupt => {
                let cancelled = self.session.cancel();
                info!(cancelled, "interrupt during cycle");
                cycle.await
            }
        }
    }

    pub fn diagnostics_snapshot(&self) -> AppDiagnostics {
        let skills = self.skills.read().list();
        AppDiagnostics {
            state: self.session.state(),
            skills_loaded: skills.len(),
            skills_enabled: skills.iter().filter(|s| s.enabled).count(),
            interactions: self.session.memory().lock().len(),
            event_subscribers: self.session.hub().subscriber_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDiagnostics {
    pub state: ConversationState,
    pub skills_loaded: usize,
    pub skills_enabled: usize,
    pub interactions: usize,
    pub event_subscribers: usize,
}

/// Load every source and apply the persisted disabled list.
pub fn build_registry(
    settings: &AppSettings,
    loaders: &[&dyn SkillLoader],
) -> (SkillRegistry, LoadReport) {
    let mut registry = SkillRegistry::new();
    let report = registry.load(loaders);
    for name in &settings.disabled_skills {
        if let Err(e) = registry.disable(name) {
            warn!(skill = %name, "disabled skill in settings is not loaded: {e}");
        }
    }
    (registry, report)
}

pub fn builtin_loader(settings_path: &Path) -> BuiltinSkills {
    let data_dir = settings_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(crate::settings::data_dir);
    let workspace_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    BuiltinSkills {
        data_dir,
        workspace_dir,
    }
}

pub fn persist(path: &Path, settings: &AppSettings) -> anyhow::Result<()> {
    save_settings(path, settings)
        .with_context(|| format!("writing settings to {}", path.display()))
}

fn log_load_report(report: &LoadReport) {
    info!(skills = ?report.loaded, "skills loaded");
    for (source, error) in &report.failed_sources {
        warn!(source = %source, "skill source failed to load: {error}");
    }
    for name in &report.rejected {
        warn!(skill = %name, "duplicate skill rejected");
    }
}
