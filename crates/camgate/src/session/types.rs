use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state of the one camera session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    Discovering,
    Open,
    Ready,
    Error,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Discovering => "discovering",
            SessionState::Open => "open",
            SessionState::Ready => "ready",
            SessionState::Error => "error",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emitted on every state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionTransition {
    pub from: SessionState,
    pub to: SessionState,
}

/// Point-in-time view of the session, readable without waiting for the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    pub serial_numbers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            state: SessionState::Disconnected,
            serial_number: None,
            serial_numbers: Vec::new(),
            last_error: None,
        }
    }
}
