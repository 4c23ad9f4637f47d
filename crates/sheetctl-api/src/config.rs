//! Client descriptor and library configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

/// OAuth 2.0 client descriptor for Google API access.
///
/// Users must provide their own OAuth client, as Google requires registered
/// applications for API access. Loaded once from the credentials JSON and
/// immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct ClientDescriptor {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
    /// The redirect URI the authorization code is delivered to.
    pub redirect_uri: String,
}

/// Out-of-band redirect URI for flows where the user pastes the code back.
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Structure of Google's OAuth credentials JSON file.
///
/// Supports multiple formats:
/// 1. Google Cloud Console format with "installed" or "web" section
/// 2. Flat format with client_id and client_secret at root level
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    /// Credentials for installed (desktop) applications.
    installed: Option<NestedCredentials>,
    /// Credentials for web applications.
    web: Option<NestedCredentials>,
    /// Direct client_id (flat format).
    client_id: Option<String>,
    /// Direct client_secret (flat format).
    client_secret: Option<String>,
}

/// OAuth credentials within a nested section of the credentials JSON file.
#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

impl ClientDescriptor {
    /// Creates a new client descriptor.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Loads a client descriptor from a Google Cloud Console JSON file.
    ///
    /// The file should be the JSON downloaded from the Google Cloud Console
    /// OAuth 2.0 credentials page. An absent or malformed file is a
    /// configuration error.
    pub fn from_file(path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ApiError::configuration(format!(
                "credentials file not found at {} - download it from the Google Cloud Console",
                path.display()
            ))
            .with_step("load credentials"));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ApiError::configuration(format!("failed to read credentials file: {}", e))
                .with_step("load credentials")
                .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses a client descriptor from a Google credentials JSON string.
    ///
    /// Supports the Google Cloud Console format
    /// (`{"installed": {"client_id": ..., "client_secret": ..., "redirect_uris": [...]}}`,
    /// or `"web"` in place of `"installed"`) and the flat format with
    /// `client_id`/`client_secret` at the root level. Metadata fields such as
    /// `project_id` are ignored. When no redirect URI is present the
    /// out-of-band URI is used.
    pub fn from_json(json: &str) -> ApiResult<Self> {
        let file: CredentialsFile = serde_json::from_str(json).map_err(|e| {
            ApiError::configuration(format!("failed to parse credentials JSON: {}", e))
                .with_step("load credentials")
                .with_source(e)
        })?;

        if let Some(creds) = file.installed.or(file.web) {
            let redirect_uri = creds
                .redirect_uris
                .into_iter()
                .next()
                .unwrap_or_else(|| OOB_REDIRECT_URI.to_string());
            return Ok(Self::new(creds.client_id, creds.client_secret, redirect_uri));
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret, OOB_REDIRECT_URI));
        }

        Err(ApiError::configuration(
            "credentials file must contain an 'installed'/'web' section or \
             'client_id'/'client_secret' at root level",
        )
        .with_step("load credentials"))
    }

    /// Validates that the descriptor appears to be correctly formatted.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        if self.redirect_uri.is_empty() {
            return Err("redirect_uri is required");
        }
        Ok(())
    }
}

/// Configuration for the Sheets authentication core and API client.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    /// OAuth client descriptor.
    pub descriptor: ClientDescriptor,

    /// The spreadsheet this process operates on.
    pub spreadsheet_id: String,

    /// Path to store OAuth tokens.
    ///
    /// Defaults to `~/.local/share/sheetctl/tokens.json`.
    pub token_path: PathBuf,

    /// OAuth scopes to request.
    pub scopes: Vec<String>,

    /// Request timeout.
    pub timeout: Duration,
}

impl SheetsConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default OAuth scopes: full spreadsheet access plus per-file Drive access.
    pub const DEFAULT_SCOPES: [&'static str; 2] = [
        "https://www.googleapis.com/auth/spreadsheets",
        "https://www.googleapis.com/auth/drive.file",
    ];

    /// Creates a new configuration for the given client and spreadsheet.
    pub fn new(descriptor: ClientDescriptor, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            descriptor,
            spreadsheet_id: spreadsheet_id.into(),
            token_path: Self::default_token_path(),
            scopes: Self::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Returns the default token storage path.
    pub fn default_token_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".local").join("share"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sheetctl")
            .join("tokens.json")
    }

    /// Sets the token storage path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.descriptor
            .validate()
            .map_err(|e| format!("invalid credentials: {}", e))?;

        if self.spreadsheet_id.is_empty() {
            return Err("spreadsheet_id is required".to_string());
        }

        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }

        Ok(())
    }
}
