//! Load config from file and environment.

use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_RELAY: &str = "ws://127.0.0.1:9090";
const DEFAULT_STUN: &str = "stun:stun.l.google.com:19302";

/// Error reading an explicitly named config file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Game configuration. File: --config or ~/.config/wordle_duet/config.toml.
/// Env overrides: WORDLE_DUET_RELAY, WORDLE_DUET_DATA_DIR.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Signaling relay WebSocket url
    #[serde(default = "default_relay_url")]
    pub relay_url: String,
    /// STUN/TURN urls for the peer connection
    #[serde(default = "default_ice_servers")]
    pub ice_servers: Vec<String>,
    #[serde(default = "default_letter_count")]
    pub letter_count: usize,
    #[serde(default = "default_board_count")]
    pub board_count: usize,
    /// Defaults to letter count plus board count
    #[serde(default)]
    pub guesses_allowed: Option<usize>,
    /// Boards per row when rendering
    #[serde(default = "default_columns")]
    pub columns: usize,
    /// Where saved games, statistics and the log file live
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Extra accepted guesses, one per line. Both players need the same file
    /// or their boards can disagree on which guesses count.
    #[serde(default)]
    pub extra_words: Option<PathBuf>,
}

fn default_relay_url() -> String {
    DEFAULT_RELAY.to_string()
}
fn default_ice_servers() -> Vec<String> {
    vec![DEFAULT_STUN.to_string()]
}
const fn default_letter_count() -> usize {
    5
}
const fn default_board_count() -> usize {
    1
}
const fn default_columns() -> usize {
    2
}

impl Default for Config {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
            ice_servers: default_ice_servers(),
            letter_count: default_letter_count(),
            board_count: default_board_count(),
            guesses_allowed: None,
            columns: default_columns(),
            data_dir: None,
            extra_words: None,
        }
    }
}

impl Config {
    /// Guesses per board after defaults are applied
    #[must_use]
    pub fn guesses(&self) -> usize {
        self.guesses_allowed
            .unwrap_or(self.letter_count + self.board_count)
    }

    /// Data directory after defaults are applied
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            home_dir().map_or_else(
                || PathBuf::from(".wordle_duet"),
                |home| home.join(".local/share/wordle_duet"),
            )
        })
    }

    /// Parse a config file
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(relay) = var("WORDLE_DUET_RELAY")
            && !relay.is_empty()
        {
            self.relay_url = relay;
        }
        if let Some(dir) = var("WORDLE_DUET_DATA_DIR")
            && !dir.is_empty()
        {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }
}

/// Load config: merge default, then config file (if present), then env vars.
///
/// An explicit `path` must exist and parse; the default location is skipped
/// when missing and logged when invalid.
///
/// # Errors
/// Returns `ConfigError` only for an explicit `path`.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => Config::from_file(path)?,
        None => load_default_file().unwrap_or_default(),
    };
    config.apply_env(|name| std::env::var(name).ok());
    Ok(config)
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

fn load_default_file() -> Option<Config> {
    let path = home_dir()?.join(".config/wordle_duet/config.toml");
    if !path.exists() {
        return None;
    }
    match Config::from_file(&path) {
        Ok(config) => Some(config),
        Err(e) => {
            log::warn!("{e}; using defaults");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.letter_count, 5);
        assert_eq!(config.board_count, 1);
        assert_eq!(config.guesses(), 6);
        assert_eq!(config.relay_url, DEFAULT_RELAY);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "board_count = 4\nguesses_allowed = 10\nextra_words = \"/tmp/words.txt\""
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.board_count, 4);
        assert_eq!(config.letter_count, 5);
        assert_eq!(config.guesses(), 10);
        assert_eq!(config.ice_servers, default_ice_servers());
        assert_eq!(config.extra_words, Some(PathBuf::from("/tmp/words.txt")));
    }

    #[test]
    fn unknown_fields_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "boards = 4").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(matches!(
            load(Some(Path::new("/no/such/config.toml"))),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn env_overrides() {
        let mut config = Config::default();
        config.apply_env(|name| match name {
            "WORDLE_DUET_RELAY" => Some("ws://relay.example:1".to_string()),
            "WORDLE_DUET_DATA_DIR" => Some("/tmp/duet".to_string()),
            _ => None,
        });
        assert_eq!(config.relay_url, "ws://relay.example:1");
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/duet"));

        let mut untouched = Config::default();
        untouched.apply_env(|_| Some(String::new()));
        assert_eq!(untouched, Config::default());
    }
}
