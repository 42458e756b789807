//! Agent definitions loaded from `<dir>/<agent_name>.toml`.
//!
//! A file may set any of `system_prompt`, `temperature` and `voice`; fields
//! it leaves out take the configured defaults. An agent without a usable
//! file still connects, with the defaults only.

use crate::config::AgentsConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use voxa_types::AgentConfig;

/// Longest accepted agent name.
pub const MAX_AGENT_NAME_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum AgentConfigError {
    #[error("invalid agent name: {0:?}")]
    InvalidName(String),

    #[error("agent file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read agent file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse agent file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Agent names map to file names, so only `[A-Za-z0-9_-]` is allowed.
pub fn is_valid_agent_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_AGENT_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[derive(Debug, Default, Deserialize)]
struct AgentFile {
    system_prompt: Option<String>,
    temperature: Option<f32>,
    voice: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AgentLoader {
    dir: PathBuf,
    defaults: AgentConfig,
}

impl AgentLoader {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            defaults: AgentConfig::fallback(""),
        }
    }

    pub fn from_config(config: &AgentsConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.dir),
            defaults: AgentConfig {
                name: String::new(),
                system_prompt: config.default_system_prompt.clone(),
                temperature: config.default_temperature,
                voice: config.default_voice.clone(),
            },
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The configuration an agent gets when its file is missing or unusable.
    pub fn defaults_for(&self, name: &str) -> AgentConfig {
        AgentConfig {
            name: name.to_string(),
            ..self.defaults.clone()
        }
    }

    /// Reads and parses the agent's file.
    pub async fn try_load(&self, name: &str) -> Result<AgentConfig, AgentConfigError> {
        if !is_valid_agent_name(name) {
            return Err(AgentConfigError::InvalidName(name.to_string()));
        }

        let path = self.dir.join(format!("{}.toml", name));
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AgentConfigError::NotFound(path))
            }
            Err(source) => return Err(AgentConfigError::Read { path, source }),
        };
        let file: AgentFile =
            toml::from_str(&contents).map_err(|source| AgentConfigError::Parse {
                path: path.clone(),
                source,
            })?;

        let defaults = self.defaults_for(name);
        let mut agent = AgentConfig {
            name: name.to_string(),
            system_prompt: file.system_prompt.unwrap_or(defaults.system_prompt),
            temperature: file.temperature.unwrap_or(defaults.temperature),
            voice: file
                .voice
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.voice),
        };

        let clamped = agent.clamped_temperature();
        if clamped != agent.temperature {
            tracing::warn!(
                agent = %name,
                configured = agent.temperature,
                used = clamped,
                "agent temperature out of range, clamping"
            );
            agent.temperature = clamped;
        }

        Ok(agent)
    }

    /// Loads the agent, falling back to defaults when the file is missing
    /// or unusable.
    pub async fn load(&self, name: &str) -> AgentConfig {
        match self.try_load(name).await {
            Ok(agent) => {
                tracing::debug!(agent = %name, "loaded agent configuration");
                agent
            }
            Err(AgentConfigError::NotFound(path)) => {
                tracing::info!(agent = %name, path = %path.display(), "no agent file, using defaults");
                self.defaults_for(name)
            }
            Err(e) => {
                tracing::warn!(agent = %name, "failed to load agent configuration, using defaults: {}", e);
                self.defaults_for(name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_agent(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(format!("{}.toml", name)), body).unwrap();
    }

    #[test]
    fn agent_names_are_restricted() {
        assert!(is_valid_agent_name("support-bot_2"));
        assert!(!is_valid_agent_name(""));
        assert!(!is_valid_agent_name("../etc/passwd"));
        assert!(!is_valid_agent_name("name.toml"));
        assert!(!is_valid_agent_name("with space"));
        assert!(!is_valid_agent_name(&"a".repeat(MAX_AGENT_NAME_LEN + 1)));
    }

    #[tokio::test]
    async fn loads_agent_file() {
        let dir = tempfile::tempdir().unwrap();
        write_agent(
            dir.path(),
            "concierge",
            r#"
            system_prompt = "You are a hotel concierge."
            temperature = 0.2
            voice = "warm"
            "#,
        );

        let agent = AgentLoader::new(dir.path()).load("concierge").await;
        assert_eq!(agent.name, "concierge");
        assert_eq!(agent.system_prompt, "You are a hotel concierge.");
        assert_eq!(agent.temperature, 0.2);
        assert_eq!(agent.voice, "warm");
    }

    #[tokio::test]
    async fn partial_file_takes_configured_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_agent(dir.path(), "terse", "system_prompt = \"Answer in one word.\"\n");

        let loader = AgentLoader::from_config(&AgentsConfig {
            dir: dir.path().to_string_lossy().into_owned(),
            default_voice: "narrator".to_string(),
            ..AgentsConfig::default()
        });
        let agent = loader.load("terse").await;
        assert_eq!(agent.system_prompt, "Answer in one word.");
        assert_eq!(agent.temperature, voxa_types::DEFAULT_TEMPERATURE);
        assert_eq!(agent.voice, "narrator");
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loader = AgentLoader::new(dir.path());

        assert!(matches!(
            loader.try_load("ghost").await,
            Err(AgentConfigError::NotFound(_))
        ));
        assert_eq!(loader.load("ghost").await, AgentConfig::fallback("ghost"));
    }

    #[tokio::test]
    async fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_agent(dir.path(), "broken", "temperature = \"hot\"");
        let loader = AgentLoader::new(dir.path());

        assert!(matches!(
            loader.try_load("broken").await,
            Err(AgentConfigError::Parse { .. })
        ));
        assert_eq!(loader.load("broken").await, AgentConfig::fallback("broken"));
    }

    #[tokio::test]
    async fn out_of_range_temperature_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        write_agent(dir.path(), "wild", "temperature = 9.5\n");

        let agent = AgentLoader::new(dir.path()).load("wild").await;
        assert_eq!(agent.temperature, 2.0);
    }

    #[tokio::test]
    async fn invalid_name_never_touches_the_filesystem() {
        let loader = AgentLoader::new("/nonexistent");
        assert!(matches!(
            loader.try_load("../secrets").await,
            Err(AgentConfigError::InvalidName(_))
        ));
    }
}
