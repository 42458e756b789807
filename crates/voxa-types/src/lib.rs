//! Shared types for the Voxa voice assistant.
//!
//! This crate holds the plain data passed between the voice providers, the
//! persistence layer and the server: role-tagged chat messages, per-agent
//! configuration and voice profiles.
//!
//! Nothing here performs I/O. Every other Voxa crate depends on
//! `voxa-types` for cross-cutting definitions so the dependency graph stays
//! acyclic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod voice;

/// System prompt used when an agent has no configuration record.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Sampling temperature used when an agent has no configuration record.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Voice used when an agent has no configuration record.
pub const DEFAULT_VOICE: &str = "neutral";

/// Valid sampling temperature range accepted by the language model.
pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions prepended ahead of the conversation.
    System,
    /// Text spoken by the caller.
    User,
    /// Text generated by the language model.
    Assistant,
}

impl Role {
    /// Returns the wire label for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known [`Role`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown message role: {0}")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// A single role-tagged entry of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Per-agent configuration record.
///
/// Loaded once when a session is created and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent name, as addressed by the connection route.
    #[serde(default)]
    pub name: String,
    /// Prompt prepended as a system-role message on every generation.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Sampling temperature for the language model.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Voice profile id used for synthesis.
    #[serde(default = "default_voice")]
    pub voice: String,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

impl AgentConfig {
    /// Builds the fallback configuration for an agent with no record.
    pub fn fallback(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            voice: default_voice(),
        }
    }

    /// Returns the system prompt, or `None` if it is blank.
    pub fn system_prompt(&self) -> Option<&str> {
        let trimmed = self.system_prompt.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(&self.system_prompt)
        }
    }

    /// Returns the temperature clamped to [`TEMPERATURE_RANGE`].
    pub fn clamped_temperature(&self) -> f32 {
        if self.temperature.is_nan() {
            return DEFAULT_TEMPERATURE;
        }
        self.temperature
            .clamp(*TEMPERATURE_RANGE.start(), *TEMPERATURE_RANGE.end())
    }
}
