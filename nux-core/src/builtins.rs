//! Built-in command handlers.
//!
//! `install` binds a handler to each of the seven built-in intents and adds
//! the legacy phrase table. The handlers only format results and validate
//! parameters. Anything that touches the desktop goes through
//! `PlatformActions`, so the core stays testable without a display.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::command::{CommandResult, Parameters};
use crate::error::{NuxError, Result};
use crate::intent::patterns::{
    FILE_OPERATIONS, OPEN_APPLICATION, SCREENSHOT, SEARCH, SYSTEM_CONTROL, TIME_QUERY,
    VOLUME_CONTROL,
};
use crate::router::CommandRouter;

const BROWSERS: &[&str] = &["firefox", "google-chrome", "chromium", "brave"];
const CHROME_FIRST: &[&str] = &["google-chrome", "firefox", "chromium", "brave"];
const TERMINALS: &[&str] = &["gnome-terminal", "konsole", "xfce4-terminal", "xterm"];
const FILE_MANAGERS: &[&str] = &["nautilus", "dolphin", "thunar", "nemo", "pcmanfm"];
const CALCULATORS: &[&str] = &["gnome-calculator", "kcalc", "galculator", "qalculate"];

/// Relative volume change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeAction {
    Increase,
    Decrease,
    Mute,
    Unmute,
}

impl FromStr for VolumeAction {
    type Err = NuxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "increase" | "raise" => Ok(Self::Increase),
            "decrease" | "lower" => Ok(Self::Decrease),
            "mute" => Ok(Self::Mute),
            "unmute" => Ok(Self::Unmute),
            other => Err(NuxError::InvalidParameter {
                name: "action".into(),
                reason: format!("unknown volume action `{other}`"),
            }),
        }
    }
}

/// Power-state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemAction {
    Shutdown,
    Restart,
    Sleep,
}

impl FromStr for SystemAction {
    type Err = NuxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "shutdown" => Ok(Self::Shutdown),
            "restart" | "reboot" => Ok(Self::Restart),
            "sleep" | "suspend" => Ok(Self::Sleep),
            other => Err(NuxError::InvalidParameter {
                name: "action".into(),
                reason: format!("unknown system action `{other}`"),
            }),
        }
    }
}

/// Desktop side effects the built-in handlers need.
///
/// Implementations spawn and return; they never wait for the launched
/// program to finish.
pub trait PlatformActions: Send + Sync {
    /// Launch an application by spoken name. Returns the program started.
    fn open_application(&self, name: &str) -> Result<String>;

    /// Launch the first candidate that can be spawned.
    fn open_first_available(&self, candidates: &[&str]) -> Result<Option<String>>;

    /// Capture the screen. `None` when no capture tool is available.
    fn take_screenshot(&self) -> Result<Option<PathBuf>>;

    /// Absolute volume, already validated to `0..=100`.
    fn set_volume(&self, level: u8) -> Result<()>;

    fn adjust_volume(&self, action: VolumeAction) -> Result<()>;

    fn system_control(&self, action: SystemAction) -> Result<()>;

    fn web_search(&self, query: &str) -> Result<()>;

    fn create_file(&self, name: &str) -> Result<PathBuf>;

    fn delete_file(&self, name: &str) -> Result<PathBuf>;
}

/// Register every built-in intent handler and the legacy phrase table.
pub fn install(router: &mut CommandRouter, platform: Arc<dyn PlatformActions>) {
    let p = platform.clone();
    router.register_intent(OPEN_APPLICATION, move |params: &Parameters| {
        let app = required_str(params, "application")?;
        let started = p.open_application(app)?;
        Ok(CommandResult::ok(format!("Opening {started}")))
    });

    let p = platform.clone();
    router.register_intent(SCREENSHOT, move |_: &Parameters| screenshot(&*p));

    router.register_intent(TIME_QUERY, |_: &Parameters| Ok(current_time()));

    let p = platform.clone();
    router.register_intent(SYSTEM_CONTROL, move |params: &Parameters| {
        let action: SystemAction = required_str(params, "action")?.parse()?;
        p.system_control(action)?;
        let msg = match action {
            SystemAction::Shutdown => "Shutting down the system",
            SystemAction::Restart => "Restarting the system",
            SystemAction::Sleep => "Putting the system to sleep",
        };
        Ok(CommandResult::ok(msg))
    });

    let p = platform.clone();
    router.register_intent(VOLUME_CONTROL, move |params: &Parameters| {
        volume(&*p, params)
    });

    let p = platform.clone();
    router.register_intent(SEARCH, move |params: &Parameters| {
        let query = required_str(params, "query")?;
        p.web_search(query)?;
        Ok(CommandResult::ok(format!("Searching for {query}")))
    });

    let p = platform.clone();
    router.register_intent(FILE_OPERATIONS, move |params: &Parameters| {
        let name = required_str(params, "filename")?;
        match required_str(params, "operation")? {
            "create" => {
                let path = p.create_file(name)?;
                Ok(CommandResult::ok(format!("Created {}", path.display())))
            }
            "delete" => {
                let path = p.delete_file(name)?;
                Ok(CommandResult::ok(format!("Deleted {}", path.display())))
            }
            other => Err(NuxError::InvalidParameter {
                name: "operation".into(),
                reason: format!("unsupported file operation `{other}`"),
            }),
        }
    });

    install_legacy(router, platform);
    debug!(router = ?router, "built-in handlers installed");
}

fn install_legacy(router: &mut CommandRouter, platform: Arc<dyn PlatformActions>) {
    register_launcher(router, &platform, "open browser", BROWSERS, "browser");
    register_launcher(router, &platform, "open firefox", BROWSERS, "browser");
    register_launcher(router, &platform, "open chrome", CHROME_FIRST, "browser");

    for phrase in ["take screenshot", "screenshot"] {
        let p = platform.clone();
        router.register_legacy(phrase, move || screenshot(&*p));
    }
    for phrase in ["what time is it", "time"] {
        router.register_legacy(phrase, || Ok(current_time()));
    }

    register_launcher(router, &platform, "open terminal", TERMINALS, "terminal");
    register_launcher(router, &platform, "open file manager", FILE_MANAGERS, "file manager");
    register_launcher(router, &platform, "open calculator", CALCULATORS, "calculator");
}

fn register_launcher(
    router: &mut CommandRouter,
    platform: &Arc<dyn PlatformActions>,
    phrase: &str,
    candidates: &'static [&'static str],
    kind: &'static str,
) {
    let p = platform.clone();
    router.register_legacy(phrase, move || match p.open_first_available(candidates)? {
        Some(program) => Ok(CommandResult::ok(format!("Opening {program}"))),
        None => Err(NuxError::handler(format!("No {kind} found"))),
    });
}

fn screenshot(platform: &dyn PlatformActions) -> Result<CommandResult> {
    match platform.take_screenshot()? {
        Some(path) => Ok(CommandResult::ok(format!(
            "Screenshot saved to {}",
            path.display()
        ))),
        None => Err(NuxError::handler("Screenshot tool not available")),
    }
}

fn volume(platform: &dyn PlatformActions, params: &Parameters) -> Result<CommandResult> {
    if let Some(level) = params.get("level") {
        let level = level
            .as_i64()
            .filter(|l| (0..=100).contains(l))
            .ok_or_else(|| NuxError::InvalidParameter {
                name: "level".into(),
                reason: format!("volume must be between 0 and 100, got {level}"),
            })?;
        // Range checked above.
        let level = level as u8;
        platform.set_volume(level)?;
        return Ok(CommandResult::ok(format!("Volume set to {level}%")));
    }

    let action: VolumeAction = required_str(params, "action")?.parse()?;
    platform.adjust_volume(action)?;
    let msg = match action {
        VolumeAction::Increase => "Volume increased",
        VolumeAction::Decrease => "Volume decreased",
        VolumeAction::Mute => "Volume muted",
        VolumeAction::Unmute => "Volume unmuted",
    };
    Ok(CommandResult::ok(msg))
}

fn current_time() -> CommandResult {
    let now = chrono::Local::now();
    CommandResult::ok(format!("The time is {}", now.format("%I:%M %p")))
}

fn required_str<'a>(params: &'a Parameters, name: &str) -> Result<&'a str> {
    params
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| NuxError::InvalidParameter {
            name: name.to_string(),
            reason: "missing".into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Origin;
    use crate::intent::IntentClassifier;
    use crate::skills::SkillRegistry;
    use parking_lot::Mutex;

    /// Records every call; spawns nothing.
    #[derive(Default)]
    struct RecordingPlatform {
        calls: Mutex<Vec<String>>,
        available: Vec<&'static str>,
        screenshot_tool: bool,
    }

    impl RecordingPlatform {
        fn record(&self, call: String) {
            self.calls.lock().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    impl PlatformActions for RecordingPlatform {
        fn open_application(&self, name: &str) -> Result<String> {
            self.record(format!("open:{name}"));
            Ok(name.to_string())
        }

        fn open_first_available(&self, candidates: &[&str]) -> Result<Option<String>> {
            self.record(format!("first:{}", candidates.join(",")));
            Ok(candidates
                .iter()
                .find(|c| self.available.iter().any(|a| a == *c))
                .map(|c| c.to_string()))
        }

        fn take_screenshot(&self) -> Result<Option<PathBuf>> {
            self.record("screenshot".into());
            Ok(self
                .screenshot_tool
                .then(|| PathBuf::from("/tmp/nux_screenshot.png")))
        }

        fn set_volume(&self, level: u8) -> Result<()> {
            self.record(format!("volume:{level}"));
            Ok(())
        }

        fn adjust_volume(&self, action: VolumeAction) -> Result<()> {
            self.record(format!("adjust:{action:?}"));
            Ok(())
        }

        fn system_control(&self, action: SystemAction) -> Result<()> {
            self.record(format!("system:{action:?}"));
            Ok(())
        }

        fn web_search(&self, query: &str) -> Result<()> {
            self.record(format!("search:{query}"));
            Ok(())
        }

        fn create_file(&self, name: &str) -> Result<PathBuf> {
            self.record(format!("create:{name}"));
            Ok(PathBuf::from(name))
        }

        fn delete_file(&self, name: &str) -> Result<PathBuf> {
            self.record(format!("delete:{name}"));
            Err(NuxError::handler(format!("{name} does not exist")))
        }
    }

    struct Harness {
        classifier: IntentClassifier,
        router: CommandRouter,
        platform: Arc<RecordingPlatform>,
    }

    impl Harness {
        fn new(platform: RecordingPlatform) -> Self {
            let platform = Arc::new(platform);
            let mut router = CommandRouter::new(SkillRegistry::new().into_shared());
            install(&mut router, platform.clone());
            Self {
                classifier: IntentClassifier::new().expect("builtin table"),
                router,
                platform,
            }
        }

        fn run(&self, text: &str) -> CommandResult {
            let cls = self.classifier.parse(text);
            self.router.route(text, &cls)
        }
    }

    #[test]
    fn every_builtin_intent_has_a_handler() {
        let h = Harness::new(RecordingPlatform::default());
        for intent in h.classifier.intents() {
            assert!(h.router.has_intent_handler(intent), "no handler for {intent}");
        }
    }

    #[test]
    fn open_application_passes_the_spoken_name() {
        let h = Harness::new(RecordingPlatform::default());
        let result = h.run("open firefox");
        assert!(result.success);
        assert_eq!(result.result_text(), "Opening firefox");
        assert_eq!(h.platform.calls(), vec!["open:firefox"]);
    }

    #[test]
    fn time_query_is_answered_from_the_clock() {
        let h = Harness::new(RecordingPlatform::default());
        let text = h.run("what time is it").result_text();
        assert!(text.starts_with("The time is "), "{text}");
        assert!(text.ends_with("AM") || text.ends_with("PM"), "{text}");
        assert!(h.platform.calls().is_empty());
    }

    #[test]
    fn volume_level_outside_range_fails() {
        let h = Harness::new(RecordingPlatform::default());
        let result = h.run("set volume to 150");
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap_or_default().contains("0 and 100"));
        assert!(h.platform.calls().is_empty());

        let result = h.run("set volume to 40");
        assert_eq!(result.result_text(), "Volume set to 40%");
        assert_eq!(h.platform.calls(), vec!["volume:40"]);
    }

    #[test]
    fn volume_verbs_map_to_relative_actions() {
        let h = Harness::new(RecordingPlatform::default());
        assert_eq!(h.run("lower the volume").result_text(), "Volume decreased");
        assert_eq!(h.run("mute").result_text(), "Volume muted");
        assert_eq!(h.platform.calls(), vec!["adjust:Decrease", "adjust:Mute"]);
    }

    #[test]
    fn system_control_uses_the_action_parameter() {
        let h = Harness::new(RecordingPlatform::default());
        let result = h.run("reboot the computer");
        assert_eq!(result.result_text(), "Restarting the system");
        assert_eq!(h.platform.calls(), vec!["system:Restart"]);
    }

    #[test]
    fn search_and_file_operations() {
        let h = Harness::new(RecordingPlatform::default());
        assert_eq!(h.run("search for rust lifetimes").result_text(), "Searching for rust lifetimes");
        assert_eq!(h.run("create file notes.txt").result_text(), "Created notes.txt");

        let deleted = h.run("delete file ghost.txt");
        assert!(!deleted.success);
        assert_eq!(deleted.error.as_deref(), Some("ghost.txt does not exist"));
        assert_eq!(
            h.platform.calls(),
            vec!["search:rust lifetimes", "create:notes.txt", "delete:ghost.txt"]
        );
    }

    #[test]
    fn missing_screenshot_tool_is_a_failure() {
        let h = Harness::new(RecordingPlatform::default());
        let result = h.run("take a screenshot");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Screenshot tool not available"));

        let h = Harness::new(RecordingPlatform {
            screenshot_tool: true,
            ..Default::default()
        });
        let result = h.run("screenshot");
        assert!(result.success);
        assert_eq!(result.origin, Some(Origin::Intent(SCREENSHOT.into())));
    }

    #[test]
    fn legacy_launchers_fall_through_candidates() {
        let h = Harness::new(RecordingPlatform {
            available: vec!["xterm", "thunar"],
            ..Default::default()
        });
        // No intent matches these, so the legacy table answers.
        let cls = crate::intent::IntentClassification::unknown("terminal");
        let result = h.router.route("please open terminal", &cls);
        assert_eq!(result.result_text(), "Opening xterm");
        assert_eq!(result.origin, Some(Origin::Legacy("open terminal".into())));

        let result = h.router.route("open calculator", &cls);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No calculator found"));
    }

    #[test]
    fn legacy_table_keeps_phrase_order() {
        let h = Harness::new(RecordingPlatform::default());
        assert_eq!(
            h.router.legacy_phrases().collect::<Vec<_>>(),
            vec![
                "open browser",
                "open firefox",
                "open chrome",
                "take screenshot",
                "screenshot",
                "what time is it",
                "time",
                "open terminal",
                "open file manager",
                "open calculator",
            ]
        );
    }

    #[test]
    fn action_names_parse_case_insensitively() {
        assert_eq!("Raise".parse::<VolumeAction>().expect("parse"), VolumeAction::Increase);
        assert_eq!("suspend".parse::<SystemAction>().expect("parse"), SystemAction::Sleep);
        assert!("dance".parse::<SystemAction>().is_err());
    }
}
