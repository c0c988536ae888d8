//! Broadcast records published to the notification hub.
//!
//! Every record serialises as a flat JSON object with a `"type"` tag:
//!
//! | Variant | `type` |
//! |---------|--------|
//! | `WakeWordDetected` | `"wake_word_detected"` |
//! | `ListeningStarted` | `"listening_started"` |
//! | `CommandReceived` | `"command_received"` |
//! | `CommandResult` | `"command_result"` |
//! | `ListeningTimeout` | `"listening_timeout"` |
//! | `StateChanged` | `"state_changed"` |
//! | `Cancelled` | `"cancelled"` |
//! | `Error` | `"error"` |

use serde::{Deserialize, Serialize};

use crate::command::CommandResult;

// ---------------------------------------------------------------------------
// Assistant events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantEvent {
    WakeWordDetected,
    ListeningStarted,
    CommandReceived {
        command: String,
    },
    CommandResult {
        result: CommandResult,
        response: String,
    },
    ListeningTimeout {
        message: String,
    },
    StateChanged {
        state: ConversationState,
    },
    /// The in-flight cycle was abandoned; nothing was recorded.
    Cancelled,
    Error {
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Conversation state
// ---------------------------------------------------------------------------

/// Current phase of a conversation session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationState {
    /// Waiting for a wake signal.
    #[default]
    Idle,
    /// Waiting for the transcriber to yield an utterance.
    Listening,
    /// Classifying and dispatching a command.
    Processing,
    /// Handing the rendered response to the notification/speech collaborators.
    Responding,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_events_serialize_as_bare_type_tag() {
        let json = serde_json::to_value(AssistantEvent::ListeningStarted).expect("serialize");
        assert_eq!(json, serde_json::json!({"type": "listening_started"}));

        let json = serde_json::to_value(AssistantEvent::WakeWordDetected).expect("serialize");
        assert_eq!(json["type"], "wake_word_detected");
    }

    #[test]
    fn command_result_event_carries_result_and_response() {
        let event = AssistantEvent::CommandResult {
            result: CommandResult::ok("Opening firefox"),
            response: "Opening that for you now! Opening firefox".into(),
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "command_result");
        assert_eq!(json["result"]["success"], true);
        assert_eq!(json["result"]["result"], "Opening firefox");
        assert_eq!(json["response"], "Opening that for you now! Opening firefox");
    }

    #[test]
    fn state_changed_uses_lowercase_state() {
        let event = AssistantEvent::StateChanged {
            state: ConversationState::Processing,
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["state"], "processing");

        let back: AssistantEvent = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, event);
    }

    #[test]
    fn state_rejects_non_lowercase_values() {
        assert!(serde_json::from_str::<ConversationState>(r#""Idle""#).is_err());
    }
}
