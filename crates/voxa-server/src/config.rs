//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;
use voxa_voice::{LlmConfig, SttConfig, TtsConfig};

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Session lifecycle settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Agent definition lookup.
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Speech-to-text providers.
    #[serde(default)]
    pub stt: SttConfig,

    /// Language model client.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Text-to-speech provider.
    #[serde(default)]
    pub tts: TtsConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "voxa_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Number of prior history entries forwarded to the language model.
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Idle time after which a session is swept. `0` disables the sweep.
    #[serde(default = "default_session_timeout")]
    pub timeout_seconds: u64,

    /// How often the sweep runs. `0` derives it from the timeout.
    #[serde(default)]
    pub sweep_interval_seconds: u64,
}

/// Where agent definitions live and what an agent gets when it has none.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentsConfig {
    #[serde(default = "default_agents_dir")]
    pub dir: String,

    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,

    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    #[serde(default = "default_voice")]
    pub default_voice: String,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8000
}

fn default_db_path() -> String {
    "voxa.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_history() -> usize {
    20
}

fn default_session_timeout() -> u64 {
    3600
}

fn default_agents_dir() -> String {
    "agents".to_string()
}

fn default_system_prompt() -> String {
    voxa_types::DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_temperature() -> f32 {
    voxa_types::DEFAULT_TEMPERATURE
}

fn default_voice() -> String {
    voxa_types::DEFAULT_VOICE.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            timeout_seconds: default_session_timeout(),
            sweep_interval_seconds: 0,
        }
    }
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            dir: default_agents_dir(),
            default_system_prompt: default_system_prompt(),
            default_temperature: default_temperature(),
            default_voice: default_voice(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `VOXA_HOST` overrides `server.host`
/// - `VOXA_PORT` overrides `server.port`
/// - `VOXA_DB_PATH` overrides `database.path`
/// - `VOXA_LOG_LEVEL` overrides `logging.level`
/// - `VOXA_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `VOXA_LLM_API_KEY` (or `GROQ_API_KEY`) overrides `llm.api_key`
/// - `VOXA_STT_API_KEY` (or `GROQ_API_KEY`) overrides the API key of every
///   configured STT provider
/// - `VOXA_AGENTS_DIR` overrides `agents.dir`
/// - `VOXA_MAX_HISTORY` overrides `session.max_history`
/// - `VOXA_SESSION_TIMEOUT` overrides `session.timeout_seconds`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies `VOXA_*` overrides read through `lookup`.
///
/// Unparseable numeric or address values are ignored with a warning.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("VOXA_HOST") {
        match host.parse() {
            Ok(parsed) => config.server.host = parsed,
            Err(_) => tracing::warn!(value = %host, "ignoring invalid VOXA_HOST"),
        }
    }
    if let Some(port) = lookup("VOXA_PORT") {
        match port.parse() {
            Ok(parsed) => config.server.port = parsed,
            Err(_) => tracing::warn!(value = %port, "ignoring invalid VOXA_PORT"),
        }
    }
    if let Some(db_path) = lookup("VOXA_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = lookup("VOXA_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("VOXA_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    let shared_key = lookup("GROQ_API_KEY").filter(|k| !k.is_empty());
    if let Some(key) = lookup("VOXA_LLM_API_KEY").or_else(|| shared_key.clone()) {
        config.llm.api_key = key;
    }
    if let Some(key) = lookup("VOXA_STT_API_KEY").or(shared_key) {
        config.stt.primary.api_key = key.clone();
        if let Some(secondary) = config.stt.secondary.as_mut() {
            secondary.api_key = key;
        }
    }

    if let Some(dir) = lookup("VOXA_AGENTS_DIR") {
        config.agents.dir = dir;
    }
    if let Some(max) = lookup("VOXA_MAX_HISTORY") {
        match max.parse() {
            Ok(parsed) => config.session.max_history = parsed,
            Err(_) => tracing::warn!(value = %max, "ignoring invalid VOXA_MAX_HISTORY"),
        }
    }
    if let Some(timeout) = lookup("VOXA_SESSION_TIMEOUT") {
        match timeout.parse() {
            Ok(parsed) => config.session.timeout_seconds = parsed,
            Err(_) => tracing::warn!(value = %timeout, "ignoring invalid VOXA_SESSION_TIMEOUT"),
        }
    }
}
