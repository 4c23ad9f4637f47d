//! Authenticated client provider.
//!
//! [`Authenticator`] is the only way to obtain an [`AuthorizedHandle`]: it
//! memoizes the first successful handle for the process lifetime and
//! guarantees the interactive authorization flow never runs twice
//! concurrently.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::config::{ClientDescriptor, SheetsConfig};
use crate::error::{ApiError, ApiResult};
use crate::oauth::{AuthFlow, CodePrompt, FlowState, UrlOpener};
use crate::tokens::{TokenPair, TokenStore};

/// An opaque capability for signing Sheets API requests.
///
/// Wraps the client descriptor, the current token pair and the target
/// spreadsheet. There is no public constructor and no `Default`: the only
/// way to obtain one is [`Authenticator::authorized_handle`].
#[derive(Debug)]
pub struct AuthorizedHandle {
    descriptor: ClientDescriptor,
    tokens: TokenPair,
    spreadsheet_id: String,
}

impl AuthorizedHandle {
    pub(crate) fn new(
        descriptor: ClientDescriptor,
        tokens: TokenPair,
        spreadsheet_id: String,
    ) -> Self {
        Self {
            descriptor,
            tokens,
            spreadsheet_id,
        }
    }

    /// The bearer token used to sign outbound requests.
    pub fn access_token(&self) -> &str {
        &self.tokens.access_token
    }

    /// The spreadsheet this handle operates on.
    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// The OAuth client this handle was minted for.
    pub fn client_id(&self) -> &str {
        &self.descriptor.client_id
    }

    /// The scopes granted to this handle.
    pub fn scopes(&self) -> &[String] {
        &self.tokens.scopes
    }
}

/// Single construction path for authenticated handles.
///
/// Token resolution order: a valid persisted pair is used as-is (no network,
/// no interaction); an expired pair with a refresh token is refreshed and
/// re-persisted; otherwise the interactive flow runs. The result is memoized,
/// so every later call returns the same handle.
pub struct Authenticator {
    config: SheetsConfig,
    flow: AuthFlow,
    store: TokenStore,
    handle: OnceCell<Arc<AuthorizedHandle>>,
}

impl Authenticator {
    /// Creates a new authenticator for the given configuration.
    ///
    /// Loads any persisted token pair; a token file that exists but cannot
    /// be read is a storage error.
    pub fn new(config: SheetsConfig) -> ApiResult<Self> {
        config
            .validate()
            .map_err(|e| ApiError::configuration(e).with_step("validate config"))?;

        let store = TokenStore::new(&config.token_path);
        store.load()?;

        let flow = AuthFlow::new(
            config.descriptor.clone(),
            config.scopes.clone(),
            config.timeout,
        )?;

        Ok(Self {
            config,
            flow,
            store,
            handle: OnceCell::new(),
        })
    }

    /// Replaces the URL opener collaborator of the underlying flow.
    pub fn with_opener(mut self, opener: Box<dyn UrlOpener>) -> Self {
        self.flow = self.flow.with_opener(opener);
        self
    }

    /// Replaces the code prompt collaborator of the underlying flow.
    pub fn with_prompt(mut self, prompt: Box<dyn CodePrompt>) -> Self {
        self.flow = self.flow.with_prompt(prompt);
        self
    }

    /// Overrides the token endpoint of the underlying flow.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.flow = self.flow.with_token_url(url);
        self
    }

    /// Returns the current state of the authorization flow.
    pub fn flow_state(&self) -> FlowState {
        self.flow.state()
    }

    /// Returns true if a usable token pair is available without user
    /// interaction (valid, or refreshable).
    pub fn is_authenticated(&self) -> bool {
        if let Some(tokens) = self.store.get() {
            !tokens.is_expired() || tokens.refresh_token.is_some()
        } else {
            false
        }
    }

    /// Removes the persisted token pair, forcing the next handle request
    /// through the interactive flow.
    pub fn clear_tokens(&self) -> ApiResult<()> {
        self.store.clear()
    }

    /// Returns the authorized handle, running the authorization flow at most
    /// once per process.
    ///
    /// The first successful call memoizes its handle; every later call
    /// returns the same `Arc`. Concurrent callers are serialized so the
    /// interactive flow cannot run twice; a failed attempt leaves the memo
    /// empty and the caller may retry.
    pub async fn authorized_handle(&self) -> ApiResult<Arc<AuthorizedHandle>> {
        let handle = self
            .handle
            .get_or_try_init(|| async {
                let tokens = self.obtain_tokens().await?;
                Ok::<_, ApiError>(Arc::new(AuthorizedHandle::new(
                    self.config.descriptor.clone(),
                    tokens,
                    self.config.spreadsheet_id.clone(),
                )))
            })
            .await?;

        Ok(Arc::clone(handle))
    }

    async fn obtain_tokens(&self) -> ApiResult<TokenPair> {
        if let Some(tokens) = self.store.get() {
            if !tokens.is_expired() {
                debug!("using persisted tokens");
                self.flow.mark_authorized();
                return Ok(tokens);
            }

            if let Some(ref refresh_token) = tokens.refresh_token {
                debug!("refreshing expired access token");
                match self.flow.refresh(refresh_token).await {
                    Ok((access_token, expires_in)) => {
                        let mut updated = tokens.clone();
                        updated.update_access_token(access_token, expires_in);
                        self.store.set(updated.clone())?;
                        self.flow.mark_authorized();
                        return Ok(updated);
                    }
                    Err(e) => {
                        warn!("token refresh failed, falling back to consent flow: {}", e);
                    }
                }
            }
        }

        self.flow.run(&self.store).await
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("spreadsheet_id", &self.config.spreadsheet_id)
            .field("token_path", &self.store.path())
            .field("state", &self.flow.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OOB_REDIRECT_URI;
    use crate::error::ApiErrorCode;
    use crate::test_support::{
        temp_token_path, token_server, FailingOpener, RecordingOpener, ScriptedPrompt,
    };
    use std::path::PathBuf;

    const TOKEN_OK: &str =
        r#"{"access_token": "new-access", "refresh_token": "new-refresh", "expires_in": 3600}"#;

    fn test_config(token_path: PathBuf) -> SheetsConfig {
        let descriptor = ClientDescriptor::new(
            "test-client.apps.googleusercontent.com",
            "test-secret",
            OOB_REDIRECT_URI,
        );
        SheetsConfig::new(descriptor, "sheet-123").with_token_path(token_path)
    }

    fn seed_tokens(path: &PathBuf, pair: TokenPair) {
        let store = TokenStore::new(path.clone());
        store.set(pair).unwrap();
    }

    #[tokio::test]
    async fn first_run_opens_url_and_prompts_once() {
        let server = token_server(200, TOKEN_OK);
        let opener = RecordingOpener::default();
        let prompt = ScriptedPrompt::new("pasted-code");

        let path = temp_token_path();
        let auth = Authenticator::new(test_config(path.clone()))
            .unwrap()
            .with_token_url(server.url.clone())
            .with_opener(Box::new(opener.clone()))
            .with_prompt(Box::new(prompt.clone()));

        let handle = auth.authorized_handle().await.unwrap();
        assert_eq!(handle.access_token(), "new-access");
        assert_eq!(handle.spreadsheet_id(), "sheet-123");
        assert_eq!(opener.calls(), 1);
        assert_eq!(prompt.calls(), 1);
        assert_eq!(auth.flow_state(), FlowState::Authorized);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn persisted_tokens_skip_all_interaction() {
        let path = temp_token_path();
        seed_tokens(
            &path,
            TokenPair::new("persisted", None, Some(3600), vec!["s".to_string()]),
        );

        let opener = RecordingOpener::default();
        let prompt = ScriptedPrompt::new("never-used");

        let auth = Authenticator::new(test_config(path.clone()))
            .unwrap()
            .with_opener(Box::new(opener.clone()))
            .with_prompt(Box::new(prompt.clone()));

        let handle = auth.authorized_handle().await.unwrap();
        assert_eq!(handle.access_token(), "persisted");
        assert_eq!(opener.calls(), 0);
        assert_eq!(prompt.calls(), 0);
        assert_eq!(auth.flow_state(), FlowState::Authorized);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn handle_is_memoized() {
        let path = temp_token_path();
        seed_tokens(&path, TokenPair::new("persisted", None, None, vec![]));

        let auth = Authenticator::new(test_config(path.clone())).unwrap();

        let first = auth.authorized_handle().await.unwrap();
        let second = auth.authorized_handle().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_calls_run_flow_once() {
        let server = token_server(200, TOKEN_OK);
        let prompt = ScriptedPrompt::new("pasted-code");

        let path = temp_token_path();
        let auth = Authenticator::new(test_config(path.clone()))
            .unwrap()
            .with_token_url(server.url.clone())
            .with_opener(Box::new(RecordingOpener::default()))
            .with_prompt(Box::new(prompt.clone()));

        let (first, second) = tokio::join!(auth.authorized_handle(), auth.authorized_handle());
        let first = first.unwrap();
        let second = second.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(prompt.calls(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn expired_tokens_are_refreshed_without_prompting() {
        let server = token_server(200, r#"{"access_token": "refreshed", "expires_in": 3600}"#);

        let path = temp_token_path();
        let mut expired = TokenPair::new(
            "stale",
            Some("refresh-token".to_string()),
            None,
            vec!["s".to_string()],
        );
        expired.expires_at = Some(chrono::Utc::now() - chrono::Duration::hours(1));
        seed_tokens(&path, expired);

        let prompt = ScriptedPrompt::new("never-used");
        let auth = Authenticator::new(test_config(path.clone()))
            .unwrap()
            .with_token_url(server.url.clone())
            .with_prompt(Box::new(prompt.clone()));

        let handle = auth.authorized_handle().await.unwrap();
        assert_eq!(handle.access_token(), "refreshed");
        assert_eq!(prompt.calls(), 0);

        // The refreshed pair replaced the persisted one in full
        let store = TokenStore::new(path.clone());
        store.load().unwrap();
        let reloaded = store.get().unwrap();
        assert_eq!(reloaded.access_token, "refreshed");
        assert_eq!(reloaded.refresh_token, Some("refresh-token".to_string()));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn rejected_refresh_falls_back_to_consent_flow() {
        // The endpoint rejects everything, so the refresh fails and the
        // interactive flow runs (and fails too) - the prompt call proves the
        // fallback happened.
        let server = token_server(400, r#"{"error": "invalid_grant"}"#);

        let path = temp_token_path();
        let mut expired = TokenPair::new("stale", Some("revoked".to_string()), None, vec![]);
        expired.expires_at = Some(chrono::Utc::now() - chrono::Duration::hours(1));
        seed_tokens(&path, expired);

        let prompt = ScriptedPrompt::new("pasted-code");
        let auth = Authenticator::new(test_config(path.clone()))
            .unwrap()
            .with_token_url(server.url.clone())
            .with_opener(Box::new(RecordingOpener::default()))
            .with_prompt(Box::new(prompt.clone()));

        let err = auth.authorized_handle().await.unwrap_err();
        assert_eq!(err.code(), ApiErrorCode::AuthorizationFailed);
        assert_eq!(prompt.calls(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn failed_browser_open_is_not_fatal() {
        let server = token_server(200, TOKEN_OK);
        let prompt = ScriptedPrompt::new("pasted-code");

        let path = temp_token_path();
        let auth = Authenticator::new(test_config(path.clone()))
            .unwrap()
            .with_token_url(server.url.clone())
            .with_opener(Box::new(FailingOpener))
            .with_prompt(Box::new(prompt.clone()));

        let handle = auth.authorized_handle().await.unwrap();
        assert_eq!(handle.access_token(), "new-access");
        assert_eq!(prompt.calls(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn malformed_token_file_fails_construction() {
        let path = temp_token_path();
        std::fs::write(&path, "not json").unwrap();

        let err = Authenticator::new(test_config(path.clone())).unwrap_err();
        assert_eq!(err.code(), ApiErrorCode::StorageError);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn invalid_config_fails_construction() {
        let descriptor = ClientDescriptor::new("not-a-google-id", "secret", OOB_REDIRECT_URI);
        let config = SheetsConfig::new(descriptor, "sheet-123");

        let err = Authenticator::new(config).unwrap_err();
        assert_eq!(err.code(), ApiErrorCode::ConfigurationError);
    }
}
