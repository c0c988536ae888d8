//! Persona-flavoured response text.
//!
//! Each persona overrides some response kinds; anything it leaves out falls
//! back to the `friendly` base table. Draws are uniform and come from an
//! injectable `StdRng`, so a seeded responder is fully repeatable.

use std::fmt;
use std::str::FromStr;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::command::CommandResult;
use crate::error::NuxError;
use crate::intent::patterns::{OPEN_APPLICATION, SCREENSHOT, SYSTEM_CONTROL, TIME_QUERY};

pub const DEFAULT_NAME: &str = "Nux";

/// Placeholder replaced with the assistant name.
const NAME_SLOT: &str = "{name}";

const FALLBACK: &str = "OK.";

const LISTENING_PROMPTS: &[&str] = &["I'm listening...", "Go ahead...", "What can I do for you?"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    #[default]
    Friendly,
    Professional,
    Casual,
    Excited,
}

impl Persona {
    pub const ALL: [Persona; 4] = [
        Persona::Friendly,
        Persona::Professional,
        Persona::Casual,
        Persona::Excited,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Persona::Friendly => "friendly",
            Persona::Professional => "professional",
            Persona::Casual => "casual",
            Persona::Excited => "excited",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = NuxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Persona::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| NuxError::InvalidParameter {
                name: "persona".into(),
                reason: format!("unknown persona `{s}`"),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Greeting,
    Acknowledged,
    Success,
    Error,
    UnknownCommand,
    Timeout,
}

/// Optional detail appended to a drawn response.
///
/// Only one suffix is used, checked in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseContext {
    pub application: Option<String>,
    pub action: Option<String>,
    pub result: Option<String>,
}

impl ResponseContext {
    pub fn application(app: impl Into<String>) -> Self {
        Self {
            application: Some(app.into()),
            ..Default::default()
        }
    }

    pub fn action(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
            ..Default::default()
        }
    }

    pub fn result(result: impl Into<String>) -> Self {
        Self {
            result: Some(result.into()),
            ..Default::default()
        }
    }

    fn suffix(&self) -> Option<String> {
        if let Some(app) = &self.application {
            Some(format!(" Opening {app}."))
        } else if let Some(action) = &self.action {
            Some(format!(" {}.", title_case(action)))
        } else {
            self.result.as_ref().map(|r| format!(" {r}"))
        }
    }
}

fn base_templates(kind: ResponseKind) -> &'static [&'static str] {
    match kind {
        ResponseKind::Greeting => &[
            "Hello! {name} here.",
            "Yes, I'm listening.",
            "How can I help you?",
            "I'm ready!",
        ],
        ResponseKind::Acknowledged => &["Got it!", "On it!", "Sure thing!", "Will do!", "Right away!"],
        ResponseKind::Success => &["Done!", "All set!", "Task completed!", "There you go!", "Finished!"],
        ResponseKind::Error => &[
            "Sorry, I couldn't do that.",
            "Hmm, that didn't work.",
            "I ran into a problem.",
            "Something went wrong.",
        ],
        ResponseKind::UnknownCommand => &[
            "I didn't understand that.",
            "Could you repeat that?",
            "I'm not sure what you mean.",
            "I don't know how to do that yet.",
        ],
        ResponseKind::Timeout => &[
            "I didn't hear anything.",
            "No command heard.",
            "Listening timeout.",
        ],
    }
}

fn persona_overrides(persona: Persona, kind: ResponseKind) -> Option<&'static [&'static str]> {
    use ResponseKind::*;
    let table: &'static [&'static str] = match (persona, kind) {
        (Persona::Friendly, _) => return None,

        (Persona::Professional, Greeting) => &[
            "{name} AI assistant ready.",
            "At your service.",
            "Standing by for commands.",
        ],
        (Persona::Professional, Acknowledged) => &["Understood.", "Executing.", "Processing request."],
        (Persona::Professional, Success) => &[
            "Task completed successfully.",
            "Operation finished.",
            "Command executed.",
        ],

        (Persona::Casual, Greeting) => &["Hey! What's up?", "Yo, I'm here!", "Sup?"],
        (Persona::Casual, Acknowledged) => &["Cool, doing it!", "Alright!", "You got it!"],
        (Persona::Casual, Success) => &["Done and done!", "Easy peasy!", "Nailed it!"],

        (Persona::Excited, Greeting) => &["Yes! I'm so ready!", "Let's do this!", "I'm pumped!"],
        (Persona::Excited, Acknowledged) => &[
            "Awesome! On it!",
            "Yes! Doing it now!",
            "Exciting! Let me handle that!",
        ],
        (Persona::Excited, Success) => &[
            "Woohoo! Done!",
            "Success! That was great!",
            "Nailed it! Amazing!",
        ],

        _ => return None,
    };
    Some(table)
}

pub struct PersonalityResponder {
    name: String,
    persona: Persona,
    rng: Mutex<StdRng>,
}

impl PersonalityResponder {
    /// Responder seeded from OS entropy.
    pub fn new(name: impl Into<String>, persona: Persona) -> Self {
        Self::with_rng(name, persona, StdRng::from_entropy())
    }

    /// Deterministic responder for tests and replays.
    pub fn seeded(name: impl Into<String>, persona: Persona, seed: u64) -> Self {
        Self::with_rng(name, persona, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(name: impl Into<String>, persona: Persona, rng: StdRng) -> Self {
        Self {
            name: name.into(),
            persona,
            rng: Mutex::new(rng),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    /// Candidate list for `kind` under the active persona.
    pub fn templates(&self, kind: ResponseKind) -> &'static [&'static str] {
        persona_overrides(self.persona, kind).unwrap_or_else(|| base_templates(kind))
    }

    pub fn get_response(&self, kind: ResponseKind, context: Option<&ResponseContext>) -> String {
        let mut response = self.draw(self.templates(kind));
        if let Some(suffix) = context.and_then(ResponseContext::suffix) {
            response.push_str(&suffix);
        }
        response
    }

    /// Final spoken reply for a routed command.
    pub fn format_command_response(&self, intent: &str, result: &CommandResult) -> String {
        if !result.success {
            let error = result.error.as_deref().unwrap_or("unknown error");
            return format!("Sorry, I couldn't complete that. {error}");
        }

        let payload = result.speak.clone().unwrap_or_else(|| result.result_text());
        let reply = match intent {
            OPEN_APPLICATION => format!("Opening that for you now! {payload}"),
            SCREENSHOT => format!("Screenshot captured! {payload}"),
            TIME_QUERY => payload,
            SYSTEM_CONTROL => format!("Executing system command. {payload}"),
            _ => format!("Done! {payload}"),
        };
        reply.trim_end().to_string()
    }

    pub fn wake_response(&self) -> String {
        self.get_response(ResponseKind::Greeting, None)
    }

    pub fn listening_prompt(&self) -> String {
        self.draw(LISTENING_PROMPTS)
    }

    fn draw(&self, templates: &[&str]) -> String {
        let picked = templates
            .choose(&mut *self.rng.lock())
            .copied()
            .unwrap_or(FALLBACK);
        picked.replace(NAME_SLOT, &self.name)
    }
}

impl Default for PersonalityResponder {
    fn default() -> Self {
        Self::new(DEFAULT_NAME, Persona::default())
    }
}

impl fmt::Debug for PersonalityResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersonalityResponder")
            .field("name", &self.name)
            .field("persona", &self.persona)
            .finish_non_exhaustive()
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn seeded_casual_greeting_is_repeatable_and_casual_only() {
        let a = PersonalityResponder::seeded("Nux", Persona::Casual, 7);
        let b = PersonalityResponder::seeded("Nux", Persona::Casual, 7);
        let professional = persona_overrides(Persona::Professional, ResponseKind::Greeting)
            .expect("professional greetings");
        let casual =
            persona_overrides(Persona::Casual, ResponseKind::Greeting).expect("casual greetings");

        for _ in 0..32 {
            let drawn = a.get_response(ResponseKind::Greeting, None);
            assert_eq!(drawn, b.get_response(ResponseKind::Greeting, None));
            assert!(casual.contains(&drawn.as_str()), "{drawn}");
            assert!(!professional.contains(&drawn.as_str()));
        }
    }

    #[test]
    fn missing_override_falls_back_to_friendly() {
        let r = PersonalityResponder::seeded("Nux", Persona::Excited, 1);
        let drawn = r.get_response(ResponseKind::Timeout, None);
        assert!(base_templates(ResponseKind::Timeout).contains(&drawn.as_str()));
    }

    #[test]
    fn assistant_name_is_substituted() {
        let r = PersonalityResponder::seeded("Jarvis", Persona::Professional, 3);
        let all: Vec<String> = (0..40).map(|_| r.wake_response()).collect();
        assert!(all.iter().any(|g| g == "Jarvis AI assistant ready."));
        assert!(all.iter().all(|g| !g.contains("{name}")));
    }

    #[test]
    fn context_suffix_priority() {
        let r = PersonalityResponder::seeded("Nux", Persona::Friendly, 5);
        let ctx = ResponseContext {
            application: Some("firefox".into()),
            action: Some("shutdown".into()),
            result: Some("ignored".into()),
        };
        assert!(r
            .get_response(ResponseKind::Acknowledged, Some(&ctx))
            .ends_with(" Opening firefox."));

        let ctx = ResponseContext::action("restart now");
        assert!(r
            .get_response(ResponseKind::Acknowledged, Some(&ctx))
            .ends_with(" Restart Now."));

        let ctx = ResponseContext::result("42 notes");
        assert!(r
            .get_response(ResponseKind::Success, Some(&ctx))
            .ends_with(" 42 notes"));
    }

    #[test]
    fn failure_uses_fixed_prefix() {
        let r = PersonalityResponder::default();
        let result = CommandResult::failure("no screenshot tool");
        assert_eq!(
            r.format_command_response(SCREENSHOT, &result),
            "Sorry, I couldn't complete that. no screenshot tool"
        );
    }

    #[test]
    fn success_templates_per_intent() {
        let r = PersonalityResponder::default();
        let ok = CommandResult::ok("Opening firefox");
        assert_eq!(
            r.format_command_response(OPEN_APPLICATION, &ok),
            "Opening that for you now! Opening firefox"
        );
        let time = CommandResult::ok("The time is 03:04 PM");
        assert_eq!(r.format_command_response(TIME_QUERY, &time), "The time is 03:04 PM");
        let other = CommandResult::ok(json!({"count": 2}));
        assert_eq!(r.format_command_response("notes", &other), r#"Done! {"count":2}"#);
    }

    #[test]
    fn speak_text_is_preferred_over_payload() {
        let r = PersonalityResponder::default();
        let result = CommandResult::ok(json!({"notes": ["a", "b"]})).with_speak("You have 2 notes");
        assert_eq!(r.format_command_response("skill", &result), "Done! You have 2 notes");
    }

    #[test]
    fn persona_parses_case_insensitively() {
        assert_eq!("Casual".parse::<Persona>().expect("parse"), Persona::Casual);
        assert_eq!(" EXCITED ".parse::<Persona>().expect("parse"), Persona::Excited);
        assert!("grumpy".parse::<Persona>().is_err());
    }

    #[test]
    fn listening_prompt_comes_from_prompt_list() {
        let r = PersonalityResponder::seeded("Nux", Persona::Friendly, 9);
        assert!(LISTENING_PROMPTS.contains(&r.listening_prompt().as_str()));
    }
}
