//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/sheetctl/config.toml` by default. CLI flags and environment
//! variables override the file.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use sheetctl_api::{ClientDescriptor, SheetsConfig};

use crate::error::{ClientError, ClientResult};

/// Configuration for the sheetctl client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Spreadsheet to operate on.
    pub spreadsheet_id: Option<String>,

    /// Path to the OAuth credentials JSON.
    ///
    /// Defaults to `credentials.json` next to the config file.
    pub credentials_file: Option<PathBuf>,

    /// Path to token storage. Defaults to the library default.
    pub token_file: Option<PathBuf>,

    /// OAuth scopes to request. Empty means the library defaults.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Request timeout in seconds.
    pub timeout: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            credentials_file: None,
            token_file: None,
            scopes: Vec::new(),
            timeout: 30,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| format!("failed to read config: {}", e))?;
            toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sheetctl")
    }

    /// Returns the default credentials file path.
    pub fn default_credentials_path() -> PathBuf {
        Self::default_config_dir().join("credentials.json")
    }

    /// Builds the library configuration, applying CLI overrides.
    ///
    /// The spreadsheet id resolves CLI flag (or `SPREADSHEET_ID` env var,
    /// handled by clap) first, then the config file. The credentials file is
    /// loaded here, so a missing or malformed one fails now rather than at
    /// first use.
    pub fn to_sheets_config(
        &self,
        spreadsheet_id: Option<String>,
        credentials_file: Option<PathBuf>,
    ) -> ClientResult<SheetsConfig> {
        let spreadsheet_id = spreadsheet_id
            .or_else(|| self.spreadsheet_id.clone())
            .ok_or_else(|| {
                ClientError::Config(format!(
                    "a spreadsheet id is required - pass --spreadsheet-id, set SPREADSHEET_ID, \
                     or add spreadsheet_id to {}",
                    Self::default_path().display()
                ))
            })?;

        let credentials_path = credentials_file
            .or_else(|| self.credentials_file.clone())
            .unwrap_or_else(Self::default_credentials_path);

        let descriptor = ClientDescriptor::from_file(&credentials_path)?;

        let mut config = SheetsConfig::new(descriptor, spreadsheet_id)
            .with_timeout(Duration::from_secs(self.timeout));

        if let Some(ref path) = self.token_file {
            config = config.with_token_path(path);
        }

        if !self.scopes.is_empty() {
            config = config.with_scopes(self.scopes.clone());
        }

        Ok(config)
    }
}
