//! Server configuration read from environment variables.
//!
//! | Variable             | Default     |
//! |----------------------|-------------|
//! | `BIND_ADDR`          | `127.0.0.1` |
//! | `PORT`               | `8080`      |
//! | `PUBLIC_HOST`        | bind address |
//! | `TOKEN`              | required    |
//! | `PROXIMITY_DATA_DIR` | `data`      |

use std::path::PathBuf;

use thiserror::Error;

/// Default bind address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";

/// Default port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default data directory.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Invalid or missing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `TOKEN` is unset or empty.
    #[error("TOKEN must be set to the shared API secret")]
    MissingToken,

    /// `PORT` is not a valid port number.
    #[error("Invalid PORT {value:?}")]
    InvalidPort {
        /// The raw value.
        value: String,
    },
}

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: String,
    /// Port to bind to.
    pub port: u16,
    /// Host name used in result URLs handed to clients.
    pub public_host: Option<String>,
    /// Shared secret expected in `Authorization: bearer <token>`.
    pub token: String,
    /// Root of the catalog file and job record directory.
    pub data_dir: PathBuf,
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `TOKEN` is missing or `PORT` is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `get`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `TOKEN` is missing or `PORT` is invalid.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let token = get("TOKEN")
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let port = match get("PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort { value })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            port,
            public_host: get("PUBLIC_HOST").filter(|h| !h.is_empty()),
            token,
            data_dir: get("PROXIMITY_DATA_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from),
        })
    }

    /// Path of the address catalog file.
    #[must_use]
    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join("addresses").join("addresses.json")
    }

    /// Directory holding radius lookup job records.
    #[must_use]
    pub fn lookups_dir(&self) -> PathBuf {
        self.data_dir.join("radius_lookups")
    }

    /// Base URL clients use to reach this server.
    #[must_use]
    pub fn public_base_url(&self) -> String {
        let host = self.public_host.as_deref().unwrap_or(&self.bind_addr);
        format!("http://{host}:{}", self.port)
    }
}
