use thiserror::Error;

/// All errors produced by nux-core.
#[derive(Debug, Error)]
pub enum NuxError {
    #[error("invalid intent pattern for `{intent}`: {source}")]
    Pattern {
        intent: String,
        #[source]
        source: regex::Error,
    },

    #[error("a skill named `{0}` is already registered")]
    DuplicateSkill(String),

    #[error("skill not found: {0}")]
    SkillNotFound(String),

    #[error("session is busy: a command is already in flight")]
    Busy,

    #[error("{0}")]
    Handler(String),

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("collaborator error: {0}")]
    Collaborator(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NuxError {
    /// Shorthand for a handler-level failure carrying a plain message.
    pub fn handler(msg: impl Into<String>) -> Self {
        Self::Handler(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, NuxError>;

/// Best-effort text for a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
