//! OAuth2 token lifecycle and Google Sheets API access.
//!
//! This crate provides the authenticated core of sheetctl:
//!
//! - [`ClientDescriptor`] / [`TokenStore`] - the credential store (client
//!   secret JSON, persisted token pair)
//! - [`AuthFlow`] - the interactive OAuth2 authorization-code flow
//! - [`Authenticator`] - the single construction path for an
//!   [`AuthorizedHandle`]
//! - [`SheetsClient`] - document-level operations on one spreadsheet
//!
//! # Authentication Flow
//!
//! 1. The authenticator loads the persisted token pair, if any
//! 2. A valid pair short-circuits the flow: no network, no interaction
//! 3. An expired pair with a refresh token is refreshed and re-persisted
//! 4. Otherwise the browser is opened on Google's consent page and the user
//!    pastes the authorization code back into the terminal
//! 5. The code is exchanged for tokens, which are persisted for future runs
//!
//! # Example
//!
//! ```ignore
//! use sheetctl_api::{Authenticator, ClientDescriptor, SheetsClient, SheetsConfig};
//!
//! let descriptor = ClientDescriptor::from_file("credentials.json")?;
//! let config = SheetsConfig::new(descriptor, "my-spreadsheet-id");
//! let timeout = config.timeout;
//!
//! let authenticator = Authenticator::new(config)?;
//! let handle = authenticator.authorized_handle().await?;
//!
//! let client = SheetsClient::new(handle, timeout)?;
//! let rows = client.read_range("Sheet1!A1:D10").await?;
//! ```

pub mod authenticator;
pub mod config;
pub mod error;
pub mod oauth;
pub mod sheets;
pub mod tokens;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types at crate root
pub use authenticator::{Authenticator, AuthorizedHandle};
pub use config::{ClientDescriptor, SheetsConfig, OOB_REDIRECT_URI};
pub use error::{ApiError, ApiErrorCode, ApiResult};
pub use oauth::{AuthFlow, CodePrompt, FlowState, StdinPrompt, SystemOpener, UrlOpener};
pub use sheets::{
    cell_text, filter_rows, AppendResponse, ClearResponse, SheetProperties, SheetsClient,
    SpreadsheetInfo, UpdateResponse, ValueInputOption, ValueRange,
};
pub use tokens::{TokenPair, TokenStore};
