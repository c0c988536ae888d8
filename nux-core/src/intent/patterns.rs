//! Built-in intent table.
//!
//! Order matters: intents are tried top to bottom and patterns within an
//! intent in list order. Verbs are anchored on `\b` so that "restart" never
//! reads as "start".

use super::{Extraction, IntentRule, PatternSpec};

pub const OPEN_APPLICATION: &str = "open_application";
pub const SCREENSHOT: &str = "screenshot";
pub const TIME_QUERY: &str = "time_query";
pub const SYSTEM_CONTROL: &str = "system_control";
pub const VOLUME_CONTROL: &str = "volume_control";
pub const SEARCH: &str = "search";
pub const FILE_OPERATIONS: &str = "file_operations";

pub fn builtin_rules() -> Vec<IntentRule> {
    vec![
        IntentRule::new(
            OPEN_APPLICATION,
            vec![PatternSpec::new(
                r"\b(?:open|launch|start)\s+(?:the\s+)?(\w+(?:\s+\w+)?)",
                Extraction::Text("application"),
                &["open browser", "launch firefox", "start calculator"],
            )],
        ),
        IntentRule::new(
            SCREENSHOT,
            vec![
                PatternSpec::new(
                    r"\b(?:take|capture|grab)\s+(?:a\s+)?screenshot",
                    Extraction::None,
                    &["take screenshot", "capture screen"],
                ),
                PatternSpec::new(r"screenshot", Extraction::None, &["screenshot"]),
            ],
        ),
        IntentRule::new(
            TIME_QUERY,
            vec![
                PatternSpec::new(
                    r"\b(?:what|tell me)\s+(?:is\s+)?(?:the\s+)?time(?:\s+is it)?",
                    Extraction::None,
                    &["what time is it", "tell me the time"],
                ),
                PatternSpec::new(
                    r"\b(?:what's|whats)\s+the\s+time",
                    Extraction::None,
                    &["what's the time"],
                ),
                PatternSpec::new(r"^time$", Extraction::None, &["time"]),
            ],
        ),
        IntentRule::new(
            SYSTEM_CONTROL,
            vec![PatternSpec::new(
                r"\b(shutdown|restart|reboot|sleep|suspend)\b\s*(?:the\s+)?(?:computer|system|pc)?",
                Extraction::Text("action"),
                &["shutdown", "restart computer", "sleep"],
            )],
        ),
        IntentRule::new(
            VOLUME_CONTROL,
            vec![
                PatternSpec::new(
                    r"\b(?:set|change)\s+volume\s+to\s+(\d+)",
                    Extraction::NumberOrText {
                        number_key: "level",
                        text_key: "action",
                    },
                    &["set volume to 50"],
                ),
                PatternSpec::new(
                    r"\b(increase|decrease|raise|lower)\s+(?:the\s+)?volume",
                    Extraction::Text("action"),
                    &["increase volume", "lower volume"],
                ),
                PatternSpec::new(
                    r"\b(mute|unmute)\b",
                    Extraction::Text("action"),
                    &["mute", "unmute"],
                ),
            ],
        ),
        IntentRule::new(
            SEARCH,
            vec![PatternSpec::new(
                r"\b(?:search|google|look up)\s+(?:for\s+)?(.+)",
                Extraction::Text("query"),
                &["search for python", "google linux commands"],
            )],
        ),
        IntentRule::new(
            FILE_OPERATIONS,
            vec![
                PatternSpec::new(
                    r"\b(?:create|make)\s+(?:a\s+)?(?:new\s+)?file\s+(?:called\s+)?(.+)",
                    Extraction::Text("filename"),
                    &["create file test.txt", "make a new file"],
                )
                .with_fixed("operation", "create"),
                PatternSpec::new(
                    r"\b(?:delete|remove)\s+(?:the\s+)?file\s+(.+)",
                    Extraction::Text("filename"),
                    &["delete file test.txt"],
                )
                .with_fixed("operation", "delete"),
            ],
        ),
    ]
}
