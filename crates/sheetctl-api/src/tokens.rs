//! OAuth token storage.
//!
//! This module handles persistence of the access/refresh token pair across
//! process invocations. Exactly one pair is persisted per store path; a newly
//! obtained pair always overwrites the previous one in full.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};

/// An OAuth access/refresh token pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPair {
    /// The access token for API requests.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    pub refresh_token: Option<String>,

    /// When the access token expires.
    pub expires_at: Option<DateTime<Utc>>,

    /// The OAuth scopes that were granted.
    pub scopes: Vec<String>,
}

impl TokenPair {
    /// Creates a new token pair from OAuth response data.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        let expires_at = expires_in_secs.map(|secs| {
            // Subtract a buffer to refresh before actual expiry
            Utc::now() + Duration::seconds(secs) - Duration::seconds(60)
        });

        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at,
            scopes,
        }
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            // If no expiry is set, assume it's valid (some tokens don't expire)
            None => false,
        }
    }

    /// Returns true if the pair has all the required scopes.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Updates the access token after a refresh.
    pub fn update_access_token(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs
            .map(|secs| Utc::now() + Duration::seconds(secs) - Duration::seconds(60));
    }
}

/// Persisted token storage with a file-based backend.
///
/// The pair is stored as JSON; writes go through a temp file and a rename so
/// the stored pair is replaced atomically from the caller's perspective.
#[derive(Debug)]
pub struct TokenStore {
    /// Path to the token file.
    path: PathBuf,

    /// In-memory cache of the current pair.
    tokens: RwLock<Option<TokenPair>>,
}

impl TokenStore {
    /// Creates a new token store at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: RwLock::new(None),
        }
    }

    /// Loads the persisted pair from disk into memory.
    ///
    /// Returns Ok(true) if a pair was loaded, Ok(false) if none has ever been
    /// saved. A file that exists but cannot be read or parsed is a storage
    /// error, not an absent token.
    pub fn load(&self) -> ApiResult<bool> {
        if !self.path.exists() {
            debug!("no token file at {:?}", self.path);
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ApiError::storage(format!("failed to read token file: {}", e))
                .with_step("load token")
                .with_source(e)
        })?;

        let tokens: TokenPair = serde_json::from_str(&content).map_err(|e| {
            ApiError::storage(format!("failed to parse token file: {}", e))
                .with_step("load token")
                .with_source(e)
        })?;

        info!("loaded tokens from {:?}", self.path);
        *self.tokens.write().unwrap() = Some(tokens);
        Ok(true)
    }

    /// Saves the current pair to disk.
    pub fn save(&self) -> ApiResult<()> {
        let tokens = self.tokens.read().unwrap();
        let tokens = tokens
            .as_ref()
            .ok_or_else(|| ApiError::internal("no tokens to save").with_step("save token"))?;

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ApiError::storage(format!("failed to create token directory: {}", e))
                    .with_step("save token")
                    .with_source(e)
            })?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(tokens).map_err(|e| {
            ApiError::internal(format!("failed to serialize tokens: {}", e)).with_step("save token")
        })?;

        fs::write(&temp_path, &content).map_err(|e| {
            ApiError::storage(format!("failed to write token file: {}", e))
                .with_step("save token")
                .with_source(e)
        })?;

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ApiError::storage(format!("failed to rename token file: {}", e))
                .with_step("save token")
                .with_source(e)
        })?;

        // Set restrictive permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(&self.path, perms);
        }

        debug!("saved tokens to {:?}", self.path);
        Ok(())
    }

    /// Returns a clone of the current pair, if any.
    pub fn get(&self) -> Option<TokenPair> {
        self.tokens.read().unwrap().clone()
    }

    /// Sets a new pair and saves it to disk, replacing any previous one.
    pub fn set(&self, tokens: TokenPair) -> ApiResult<()> {
        *self.tokens.write().unwrap() = Some(tokens);
        self.save()
    }

    /// Clears the stored pair (both in memory and on disk).
    pub fn clear(&self) -> ApiResult<()> {
        *self.tokens.write().unwrap() = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ApiError::storage(format!("failed to remove token file: {}", e))
                    .with_step("clear token")
                    .with_source(e)
            })?;
            info!("cleared tokens from {:?}", self.path);
        }
        Ok(())
    }

    /// Returns the token storage path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if a pair is loaded and not expired.
    pub fn has_valid_tokens(&self) -> bool {
        self.tokens
            .read()
            .unwrap()
            .as_ref()
            .is_some_and(|t| !t.is_expired())
    }

    /// Returns true if a pair is loaded and has a refresh token.
    pub fn has_refresh_token(&self) -> bool {
        self.tokens
            .read()
            .unwrap()
            .as_ref()
            .is_some_and(|t| t.refresh_token.is_some())
    }
}
