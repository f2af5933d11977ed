//! IPC command model
//!
//! A [`Command`] is the unit exchanged in both directions. It is immutable
//! once built; components pass clones, never mutate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the command asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Query state
    Get,
    /// Change state (also used for responses)
    Set,
}

/// Domain key a command refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    /// LED color, value is `r:g:b` or a color name
    Color,
    /// LED brightness, value is a number
    Brightness,
    /// Display mode, value is a mode name
    Mode,
    /// Dimming, value is `true` or `false`
    Dim,
    /// Hardware information, value is `all`
    Information,
    /// Response from the daemon, value is `ok`, `nok` or raw telemetry
    Response,
}

impl Key {
    /// Name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Key::Color => "color",
            Key::Brightness => "brightness",
            Key::Mode => "mode",
            Key::Dim => "dim",
            Key::Information => "information",
            Key::Response => "response",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response value for a successful set
pub const RESPONSE_OK: &str = "ok";

/// Response value for a failed set
pub const RESPONSE_NOK: &str = "nok";

/// Value requesting every information field
pub const INFORMATION_ALL: &str = "all";

/// A command exchanged between client and daemon
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    action: Action,
    key: Key,
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secret: Option<String>,
}

impl Command {
    /// Create a command without a secret
    pub fn new(action: Action, key: Key, value: impl Into<String>) -> Self {
        Self {
            action,
            key,
            value: value.into(),
            secret: None,
        }
    }

    /// Create a `set` command
    pub fn set(key: Key, value: impl Into<String>) -> Self {
        Self::new(Action::Set, key, value)
    }

    /// Create a `get` command
    pub fn get(key: Key, value: impl Into<String>) -> Self {
        Self::new(Action::Get, key, value)
    }

    /// Create the `get information all` query
    pub fn information() -> Self {
        Self::get(Key::Information, INFORMATION_ALL)
    }

    /// Create a response carrying `value`
    pub fn response(value: impl Into<String>) -> Self {
        Self::set(Key::Response, value)
    }

    /// Create an ok/nok response
    pub fn status_response(ok: bool) -> Self {
        Self::response(if ok { RESPONSE_OK } else { RESPONSE_NOK })
    }

    /// Return a copy carrying `secret`
    pub fn with_secret(&self, secret: Option<&str>) -> Self {
        Self {
            secret: secret.map(str::to_string),
            ..self.clone()
        }
    }

    /// Action of the command
    pub fn action(&self) -> Action {
        self.action
    }

    /// Key of the command
    pub fn key(&self) -> Key {
        self.key
    }

    /// Payload of the command
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Shared secret attached to the command
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// Check if this is the `get information all` query
    pub fn is_information_request(&self) -> bool {
        self.action == Action::Get && self.key == Key::Information && self.value == INFORMATION_ALL
    }
}

// Keep secrets out of logs
impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("action", &self.action)
            .field("key", &self.key)
            .field("value", &self.value)
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .finish()
    }
}
