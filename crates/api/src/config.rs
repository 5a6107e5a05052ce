use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Invalid process configuration. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}'")]
    Invalid { var: &'static str, value: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for running next to the reader
/// command on a single host.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `7500`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    pub database_url: String,
    /// Monitor settings file.
    pub settings_path: PathBuf,
    /// Whether the periodic scanner (and the startup scan) runs.
    pub scanner_enabled: bool,
    /// Command line of the reading source.
    pub reader_command: String,
    pub reader_timeout_secs: u64,
    /// Bounded wait for a device record lock, in milliseconds.
    pub lock_timeout_ms: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                        |
    /// |----------------------------|--------------------------------|
    /// | `HOST`                     | `0.0.0.0`                      |
    /// | `PORT`                     | `7500`                         |
    /// | `CORS_ORIGINS`             | (none)                         |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                           |
    /// | `DATABASE_URL`             | `sqlite://diskwarden_state.db` |
    /// | `SETTINGS_PATH`            | `settings.json`                |
    /// | `DISKWARDEN_SCANNER`       | unset (`1` enables)            |
    /// | `DISK_READER_CMD`          | `diskwarden-reader`            |
    /// | `DISK_READER_TIMEOUT_SECS` | `60`                           |
    /// | `STATE_LOCK_TIMEOUT_MS`    | `5000`                         |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let cors_origins = string("CORS_ORIGINS", "")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let reader_command = string("DISK_READER_CMD", "diskwarden-reader");
        if reader_command.trim().is_empty() {
            return Err(ConfigError::Empty("DISK_READER_CMD"));
        }

        Ok(Self {
            host: string("HOST", "0.0.0.0"),
            port: parse(&lookup, "PORT", 7500)?,
            cors_origins,
            request_timeout_secs: parse(&lookup, "REQUEST_TIMEOUT_SECS", 30)?,
            database_url: string("DATABASE_URL", "sqlite://diskwarden_state.db"),
            settings_path: PathBuf::from(string("SETTINGS_PATH", "settings.json")),
            scanner_enabled: lookup("DISKWARDEN_SCANNER").is_some_and(|v| v.trim() == "1"),
            reader_command,
            reader_timeout_secs: parse(&lookup, "DISK_READER_TIMEOUT_SECS", 60)?,
            lock_timeout_ms: parse(&lookup, "STATE_LOCK_TIMEOUT_MS", 5000)?,
        })
    }

    pub fn reader_timeout(&self) -> Duration {
        Duration::from_secs(self.reader_timeout_secs)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
