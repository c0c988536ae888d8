//! Persistent application settings (JSON file in app data directory).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nux_core::{MemoryConfig, Persona, SessionConfig};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub assistant_name: String,
    pub persona: String,
    pub wake_words: Vec<String>,
    pub capture_timeout_secs: f32,
    pub max_history: usize,
    pub context_window_minutes: i64,
    pub speak_responses: bool,
    pub wait_for_speech: bool,
    pub disabled_skills: Vec<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            assistant_name: nux_core::personality::DEFAULT_NAME.into(),
            persona: "friendly".into(),
            wake_words: vec!["hey nux".into(), "nux".into()],
            capture_timeout_secs: 5.0,
            max_history: 50,
            context_window_minutes: 30,
            speak_responses: true,
            wait_for_speech: false,
            disabled_skills: Vec::new(),
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        let name = self.assistant_name.trim();
        self.assistant_name = if name.is_empty() {
            nux_core::personality::DEFAULT_NAME.into()
        } else {
            name.to_string()
        };
        self.persona = normalize_persona(&self.persona);
        self.wake_words = normalize_terms(&self.wake_words);
        if self.wake_words.is_empty() {
            self.wake_words = AppSettings::default().wake_words;
        }
        self.capture_timeout_secs = if self.capture_timeout_secs.is_finite() {
            self.capture_timeout_secs.clamp(1.0, 60.0)
        } else {
            5.0
        };
        self.max_history = self.max_history.clamp(1, 1000);
        self.context_window_minutes = self.context_window_minutes.clamp(1, 24 * 60);
        self.disabled_skills = normalize_terms(&self.disabled_skills);
    }

    /// Apply `NUX_*` environment overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("NUX_ASSISTANT_NAME") {
            self.assistant_name = name;
        }
        if let Some(persona) = lookup("NUX_PERSONA") {
            self.persona = persona;
        }
        if let Some(raw) = lookup("NUX_CAPTURE_TIMEOUT_SECS") {
            match raw.trim().parse::<f32>() {
                Ok(secs) => self.capture_timeout_secs = secs,
                Err(_) => warn!(value = %raw, "ignoring invalid NUX_CAPTURE_TIMEOUT_SECS"),
            }
        }
        if let Some(raw) = lookup("NUX_SPEAK_RESPONSES") {
            self.speak_responses = parse_flag(&raw);
        }
        if let Some(raw) = lookup("NUX_WAKE_WORDS") {
            self.wake_words = raw.split(',').map(str::to_string).collect();
        }
        self.normalize();
    }

    pub fn persona(&self) -> Persona {
        self.persona.parse().unwrap_or_default()
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            capture_timeout: Duration::from_secs_f32(self.capture_timeout_secs),
            speak_responses: self.speak_responses,
            wait_for_speech: self.wait_for_speech,
            memory: MemoryConfig {
                max_history: self.max_history,
                context_window_minutes: self.context_window_minutes,
            },
            ..SessionConfig::default()
        }
    }

    /// `true` if `line` contains one of the configured wake words.
    pub fn is_wake_phrase(&self, line: &str) -> bool {
        let line = line.to_lowercase();
        self.wake_words.iter().any(|w| line.contains(w.as_str()))
    }

    pub fn set_skill_enabled(&mut self, name: &str, enabled: bool) {
        let name = name.trim().to_lowercase();
        self.disabled_skills.retain(|s| *s != name);
        if !enabled {
            self.disabled_skills.push(name);
        }
    }
}

pub fn normalize_persona(raw: &str) -> String {
    raw.parse::<Persona>().unwrap_or_default().as_str().into()
}

/// Trimmed, lower-cased, de-duplicated, at most 64 entries.
fn normalize_terms(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for term in raw {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            continue;
        }
        if out.contains(&term) {
            continue;
        }
        out.push(term);
        if out.len() >= 64 {
            break;
        }
    }
    out
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Per-user data directory, e.g. `~/.local/share/nux`.
pub fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("NuxAI")
            .join("Nux")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("nux")
    }
}

pub fn default_settings_path() -> PathBuf {
    data_dir().join("settings.json")
}

pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
