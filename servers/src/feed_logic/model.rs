use serde::{Deserialize, Serialize};

/// Inbound control frame: `{"command": "...", "topics": [...]}`.
///
/// `command` is optional so that a well-formed JSON object without one
/// still decodes and gets an "Unknown command" reply instead of being
/// treated as undecodable.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientCommand {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub topics: Option<Vec<String>>,
}

/// Acknowledgment for a handled control frame. The subscribe ack echoes the
/// accepted topic list; the unsubscribe ack is bare.
#[derive(Debug, Clone, Serialize)]
pub struct Ack {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
}

impl Ack {
    pub fn subscribed(topics: Vec<String>) -> Self {
        Self {
            status: "subscribed",
            topics: Some(topics),
        }
    }

    pub fn unsubscribed() -> Self {
        Self {
            status: "unsubscribed",
            topics: None,
        }
    }
}

/// Error reply that leaves the connection open.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReply {
    pub error: &'static str,
}

impl ErrorReply {
    pub const UNKNOWN_COMMAND: Self = Self {
        error: "Unknown command",
    };
    pub const INVALID_JSON: Self = Self {
        error: "Invalid JSON",
    };
    pub const DATA_NOT_FOUND: Self = Self {
        error: "Data not found",
    };
}
