//! OAuth 2.0 authorization-code flow for Google APIs.
//!
//! This module implements the installed-application flow with an out-of-band
//! authorization code: the consent URL is opened in the user's browser and the
//! user pastes the resulting code back into the terminal.
//!
//! # Flow Overview
//!
//! 1. Build the authorization URL embedding the client descriptor and scopes
//! 2. Open the user's browser to Google's consent page
//! 3. Block on the code prompt until the user pastes the authorization code
//! 4. Exchange the code for access and refresh tokens
//! 5. Persist the token pair
//!
//! The flow is an explicit three-state machine (`NoToken`,
//! `AwaitingUserCode`, `Authorized`). A failed exchange resets the state to
//! `NoToken`; the caller may re-run the whole flow. The engine imposes no
//! timeout of its own while waiting for the code.

use std::io::{self, BufRead, Write};
use std::sync::RwLock;

use tracing::{debug, info, warn};

use crate::config::ClientDescriptor;
use crate::error::{ApiError, ApiResult};
use crate::tokens::{TokenPair, TokenStore};

/// Google OAuth endpoints.
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Opens a URL in the user's browser.
///
/// Failures are surfaced as non-fatal warnings by the flow; the user can
/// still navigate to the printed URL manually.
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Opens URLs with the system default browser.
#[derive(Debug, Default)]
pub struct SystemOpener;

impl UrlOpener for SystemOpener {
    fn open(&self, url: &str) -> io::Result<()> {
        open::that(url)
    }
}

/// Reads a single line of user input, blocking until one is available.
pub trait CodePrompt: Send + Sync {
    fn prompt_line(&self, prompt: &str) -> io::Result<String>;
}

/// Prompts on stdout and reads the reply from stdin.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl CodePrompt for StdinPrompt {
    fn prompt_line(&self, prompt: &str) -> io::Result<String> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

/// The state of the authorization flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// No token has been obtained; the flow has not started or was reset.
    NoToken,
    /// The consent URL was issued; blocked on the user-supplied code.
    AwaitingUserCode,
    /// A token pair was obtained and persisted.
    Authorized,
}

/// Authorization flow engine.
///
/// Drives the interactive consent flow and the code/refresh-token exchanges
/// against the token endpoint. Browser opening and code entry are delegated
/// to the [`UrlOpener`] and [`CodePrompt`] collaborators.
pub struct AuthFlow {
    descriptor: ClientDescriptor,
    scopes: Vec<String>,
    http_client: reqwest::Client,
    opener: Box<dyn UrlOpener>,
    prompt: Box<dyn CodePrompt>,
    auth_url: String,
    token_url: String,
    state: RwLock<FlowState>,
}

impl AuthFlow {
    /// Creates a new flow engine with the system browser and stdin prompt.
    pub fn new(
        descriptor: ClientDescriptor,
        scopes: Vec<String>,
        timeout: std::time::Duration,
    ) -> ApiResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ApiError::internal(format!("failed to create HTTP client: {}", e)).with_source(e)
            })?;

        Ok(Self {
            descriptor,
            scopes,
            http_client,
            opener: Box::new(SystemOpener),
            prompt: Box::new(StdinPrompt),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            state: RwLock::new(FlowState::NoToken),
        })
    }

    /// Replaces the URL opener collaborator.
    pub fn with_opener(mut self, opener: Box<dyn UrlOpener>) -> Self {
        self.opener = opener;
        self
    }

    /// Replaces the code prompt collaborator.
    pub fn with_prompt(mut self, prompt: Box<dyn CodePrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Overrides the authorization endpoint.
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Overrides the token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Returns the current flow state.
    pub fn state(&self) -> FlowState {
        *self.state.read().unwrap()
    }

    fn set_state(&self, state: FlowState) {
        *self.state.write().unwrap() = state;
    }

    /// Short-circuits the state machine to `Authorized`.
    ///
    /// Used when a persisted token pair makes the interactive flow
    /// unnecessary.
    pub(crate) fn mark_authorized(&self) {
        self.set_state(FlowState::Authorized);
    }

    /// Builds the consent URL for this client and scope set.
    pub fn consent_url(&self) -> String {
        let scope = self.scopes.join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            access_type=offline&prompt=consent",
            self.auth_url,
            urlencoding::encode(&self.descriptor.client_id),
            urlencoding::encode(&self.descriptor.redirect_uri),
            urlencoding::encode(&scope),
        )
    }

    /// Runs the interactive authorization flow and persists the result.
    ///
    /// This will:
    /// 1. Open the user's browser to Google's consent page
    /// 2. Block on the code prompt until the user pastes the authorization code
    /// 3. Exchange the code for a token pair
    /// 4. Persist the pair through `store`
    ///
    /// # Errors
    ///
    /// Returns an error if the user supplies no code, the exchange is
    /// rejected, the network fails, or the pair cannot be persisted. On any
    /// failure the state machine resets to [`FlowState::NoToken`] and no
    /// token is written.
    pub async fn run(&self, store: &TokenStore) -> ApiResult<TokenPair> {
        let consent_url = self.consent_url();

        info!("starting authorization flow, opening browser...");
        debug!("consent URL: {}", consent_url);

        if let Err(e) = self.opener.open(&consent_url) {
            warn!("failed to open browser: {}", e);
            // Print URL for manual copy
            eprintln!("\nPlease open this URL in your browser:\n\n{}\n", consent_url);
        }

        self.set_state(FlowState::AwaitingUserCode);

        let code = match self.prompt.prompt_line("Enter the authorization code: ") {
            Ok(code) => code,
            Err(e) => {
                self.set_state(FlowState::NoToken);
                return Err(ApiError::internal(format!(
                    "failed to read authorization code: {}",
                    e
                ))
                .with_step("read code")
                .with_source(e));
            }
        };

        if code.is_empty() {
            self.set_state(FlowState::NoToken);
            return Err(
                ApiError::authorization("no authorization code provided").with_step("read code")
            );
        }

        info!("received authorization code, exchanging for tokens...");

        let tokens = match self.exchange_code(code.trim()).await {
            Ok(tokens) => tokens,
            Err(e) => {
                self.set_state(FlowState::NoToken);
                return Err(e);
            }
        };

        if let Err(e) = store.set(tokens.clone()) {
            self.set_state(FlowState::NoToken);
            return Err(e);
        }

        self.set_state(FlowState::Authorized);
        info!("authorization successful, tokens persisted");
        Ok(tokens)
    }

    /// Exchanges an authorization code for a token pair.
    async fn exchange_code(&self, code: &str) -> ApiResult<TokenPair> {
        let params = [
            ("client_id", self.descriptor.client_id.as_str()),
            ("client_secret", self.descriptor.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.descriptor.redirect_uri.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                ApiError::network(format!("token exchange request failed: {}", e))
                    .with_step("exchange code")
                    .with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ApiError::network(format!("failed to read response: {}", e))
                .with_step("exchange code")
                .with_source(e)
        })?;

        if !status.is_success() {
            return Err(ApiError::authorization(format!(
                "token exchange failed ({}): {}",
                status, body
            ))
            .with_step("exchange code"));
        }

        let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            ApiError::invalid_response(format!("invalid token response: {}", e))
                .with_step("exchange code")
                .with_source(e)
        })?;

        info!("successfully obtained tokens");
        Ok(TokenPair::new(
            token_response.access_token,
            token_response.refresh_token,
            token_response.expires_in,
            self.scopes.clone(),
        ))
    }

    /// Refreshes an expired access token using the refresh token.
    ///
    /// Returns the new access token and its expiry time. This grant never
    /// touches the interactive state machine.
    pub async fn refresh(&self, refresh_token: &str) -> ApiResult<(String, Option<i64>)> {
        let params = [
            ("client_id", self.descriptor.client_id.as_str()),
            ("client_secret", self.descriptor.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                ApiError::network(format!("token refresh request failed: {}", e))
                    .with_step("refresh token")
                    .with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ApiError::network(format!("failed to read response: {}", e))
                .with_step("refresh token")
                .with_source(e)
        })?;

        if !status.is_success() {
            return Err(ApiError::authorization(format!(
                "token refresh failed ({}): {}",
                status, body
            ))
            .with_step("refresh token"));
        }

        let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            ApiError::invalid_response(format!("invalid token response: {}", e))
                .with_step("refresh token")
                .with_source(e)
        })?;

        info!("successfully refreshed access token");
        Ok((token_response.access_token, token_response.expires_in))
    }
}

impl std::fmt::Debug for AuthFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthFlow")
            .field("client_id", &self.descriptor.client_id)
            .field("scopes", &self.scopes)
            .field("state", &self.state())
            .finish()
    }
}

/// Response from the token endpoint.
#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}
