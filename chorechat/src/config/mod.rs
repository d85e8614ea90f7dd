//! Configuration for the `ChoreChat` client core.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/chorechat/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use crate::chat::subscription::BackoffConfig;
use crate::chat::{SendMode, conversations::SortStrategy};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    chat: ChatFileConfig,
    subscription: SubscriptionFileConfig,
    ui: UiFileConfig,
}

/// `[chat]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ChatFileConfig {
    sort: Option<SortStrategy>,
    send_mode: Option<SendMode>,
    history_timeout_secs: Option<u64>,
    event_buffer: Option<usize>,
    feed_buffer: Option<usize>,
}

/// `[subscription]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SubscriptionFileConfig {
    backoff_initial_ms: Option<u64>,
    max_retries: Option<u32>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    timestamp_format: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Chat subsystem configuration (used by
/// [`ChatController`](crate::chat::ChatController)).
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Conversation list ordering.
    pub sort: SortStrategy,
    /// When a sent message appears in the sender's transcript.
    pub send_mode: SendMode,
    /// How long a history fetch may run before the selection fails.
    pub history_timeout: Duration,
    /// Buffer size of the controller's internal event channel.
    pub event_buffer: usize,
    /// Buffer size of each supervised feed's delivery channel.
    pub feed_buffer: usize,
    /// Reconnect policy for the subscription supervisor.
    pub backoff: BackoffConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            sort: SortStrategy::default(),
            send_mode: SendMode::default(),
            history_timeout: Duration::from_secs(10),
            event_buffer: 64,
            feed_buffer: 256,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Chat subsystem config.
    pub chat: ChatConfig,
    /// Timestamp display format string (chrono).
    pub timestamp_format: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chat: ChatConfig::default(),
            timestamp_format: "%H:%M".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// CLI args and env vars are parsed via `clap`. If `--config` is given
    /// and the file does not exist, returns an error. If no `--config` is
    /// given, the default path (`~/.config/chorechat/config.toml`) is tried
    /// and silently ignored if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. This is separated from `load()` to
    /// enable unit testing without CLI parsing.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            chat: ChatConfig {
                sort: cli.sort.or(file.chat.sort).unwrap_or(defaults.chat.sort),
                send_mode: cli
                    .send_mode
                    .or(file.chat.send_mode)
                    .unwrap_or(defaults.chat.send_mode),
                history_timeout: file
                    .chat
                    .history_timeout_secs
                    .map_or(defaults.chat.history_timeout, Duration::from_secs),
                event_buffer: file
                    .chat
                    .event_buffer
                    .unwrap_or(defaults.chat.event_buffer),
                feed_buffer: file.chat.feed_buffer.unwrap_or(defaults.chat.feed_buffer),
                backoff: BackoffConfig {
                    initial: file
                        .subscription
                        .backoff_initial_ms
                        .map_or(defaults.chat.backoff.initial, Duration::from_millis),
                    max_retries: file
                        .subscription
                        .max_retries
                        .unwrap_or(defaults.chat.backoff.max_retries),
                },
            },
            timestamp_format: cli
                .timestamp_format
                .clone()
                .or_else(|| file.ui.timestamp_format.clone())
                .unwrap_or(defaults.timestamp_format),
        }
    }
}

/// CLI arguments parsed by clap.
///
/// This crate owns no binary; hosts embed these args into their own
/// command definition.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "ChoreChat realtime messaging core")]
pub struct CliArgs {
    /// Conversation list ordering.
    #[arg(long, value_enum, env = "CHORECHAT_SORT")]
    pub sort: Option<SortStrategy>,

    /// When a sent message appears in the sender's transcript.
    #[arg(long, value_enum, env = "CHORECHAT_SEND_MODE")]
    pub send_mode: Option<SendMode>,

    /// Path to config file (default: `~/.config/chorechat/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Timestamp display format (chrono format string).
    #[arg(long)]
    pub timestamp_format: Option<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "CHORECHAT_LOG")]
    pub log_level: String,

    /// Path to log file (default: stderr only).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            // No config dir available — use defaults.
            return Ok(ConfigFile::default());
        };
        config_dir.join("chorechat").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
