//! Session types: roles, transcript messages, and the persisted shape.

use serde::{Deserialize, Serialize};

/// Prepaid allowance for a session, in caps. The meter starts here and
/// every priced reply is subtracted from it.
pub const CAPS_CEILING: i64 = 10_000;

/// Role of a message participant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub text: String,
    /// Caps charged for this message. `None` for user messages and for
    /// replies the server left unpriced. Negative values survive in stored
    /// data but never count toward the meter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caps: Option<i64>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            caps: None,
        }
    }

    pub fn assistant(text: impl Into<String>, caps: Option<i64>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            caps,
        }
    }
}

/// What survives a restart: the transcript plus the context toggle.
/// The remaining-caps meter is derived on load, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedSession {
    pub messages: Vec<Message>,
    pub include_context: bool,
}
