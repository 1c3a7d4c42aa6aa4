//! A single message in the conversation.

use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque unique identifier of a [`Turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(Uuid);

impl TurnId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Who authored a turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
}

/// One immutable message. Fields are read-only once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub text: String,
    pub sender: Sender,
    pub created_at: DateTime<Utc>,
    /// Local `HH:MM`, fixed at creation.
    pub display_time: String,
}

impl Turn {
    fn new(text: impl Into<String>, sender: Sender) -> Self {
        let created_at = Utc::now();
        Self {
            id: TurnId::generate(),
            text: text.into(),
            sender,
            display_time: created_at.with_timezone(&Local).format("%H:%M").to_string(),
            created_at,
        }
    }

    /// Create a user-authored turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User)
    }

    /// Create an agent-authored turn.
    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Agent)
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = Turn::user("hi");
        let b = Turn::user("hi");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn display_time_is_hours_and_minutes() {
        let turn = Turn::agent("hello");
        assert_eq!(turn.display_time.len(), 5);
        assert_eq!(&turn.display_time[2..3], ":");
        assert!(!turn.is_user());
    }

    #[test]
    fn sender_renders_lowercase() {
        assert_eq!(Sender::User.to_string(), "user");
        assert_eq!(Sender::Agent.as_ref(), "agent");
        assert_eq!(serde_json::to_string(&Sender::Agent).unwrap(), "\"agent\"");
    }
}
