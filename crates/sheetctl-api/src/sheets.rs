//! Google Sheets API client.
//!
//! This module provides the document-level operations on top of an
//! [`AuthorizedHandle`]: metadata, range reads/writes, appends, clears and a
//! client-side row search. All operations are pass-throughs to the Sheets v4
//! REST API.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::authenticator::AuthorizedHandle;
use crate::error::{ApiError, ApiResult};

/// Base URL for the Google Sheets API v4.
const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// How written cell values are interpreted by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueInputOption {
    /// Values are stored as-is, without parsing.
    #[default]
    Raw,
    /// Values are parsed as if typed into the UI (formulas, dates, ...).
    UserEntered,
}

impl ValueInputOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "RAW",
            Self::UserEntered => "USER_ENTERED",
        }
    }
}

/// Google Sheets API client bound to a single spreadsheet.
#[derive(Debug)]
pub struct SheetsClient {
    http_client: reqwest::Client,
    handle: Arc<AuthorizedHandle>,
    base_url: String,
}

impl SheetsClient {
    /// Creates a new client signing requests with the given handle.
    pub fn new(handle: Arc<AuthorizedHandle>, timeout: Duration) -> ApiResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ApiError::internal(format!("failed to create HTTP client: {}", e)).with_source(e)
            })?;

        Ok(Self {
            http_client,
            handle,
            base_url: SHEETS_API_BASE.to_string(),
        })
    }

    /// Overrides the API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn spreadsheet_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url,
            urlencoding::encode(self.handle.spreadsheet_id())
        )
    }

    fn values_url(&self, range: &str, suffix: &str) -> String {
        format!(
            "{}/values/{}{}",
            self.spreadsheet_url(),
            urlencoding::encode(range),
            suffix
        )
    }

    /// Fetches spreadsheet metadata (title and sheet list).
    pub async fn spreadsheet_info(&self) -> ApiResult<SpreadsheetInfo> {
        debug!("fetching spreadsheet metadata");

        let response = self
            .http_client
            .get(self.spreadsheet_url())
            .bearer_auth(self.handle.access_token())
            .query(&[("fields", "properties.title,sheets.properties,spreadsheetUrl")])
            .send()
            .await
            .map_err(|e| Self::transport_error(e).with_step("get metadata"))?;

        Self::parse_response(response, "get metadata").await
    }

    /// Lists the sheets of the spreadsheet.
    pub async fn list_sheets(&self) -> ApiResult<Vec<SheetProperties>> {
        let info = self.spreadsheet_info().await?;
        Ok(info.sheets.into_iter().map(|s| s.properties).collect())
    }

    /// Reads cell values from a range.
    ///
    /// A range with no data comes back as an empty table, not an error.
    pub async fn read_range(&self, range: &str) -> ApiResult<ValueRange> {
        debug!("reading range {}", range);

        let response = self
            .http_client
            .get(self.values_url(range, ""))
            .bearer_auth(self.handle.access_token())
            .send()
            .await
            .map_err(|e| Self::transport_error(e).with_step("read range"))?;

        Self::parse_response(response, "read range").await
    }

    /// Overwrites cell values in a range.
    pub async fn write_range(
        &self,
        range: &str,
        rows: Vec<Vec<Value>>,
        input_option: ValueInputOption,
    ) -> ApiResult<UpdateResponse> {
        debug!("writing {} rows to {}", rows.len(), range);

        let body = ValueRange {
            range: None,
            major_dimension: None,
            values: rows,
        };

        let response = self
            .http_client
            .put(self.values_url(range, ""))
            .bearer_auth(self.handle.access_token())
            .query(&[("valueInputOption", input_option.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::transport_error(e).with_step("write range"))?;

        Self::parse_response(response, "write range").await
    }

    /// Appends rows after the last table row of a range.
    pub async fn append_rows(
        &self,
        range: &str,
        rows: Vec<Vec<Value>>,
        input_option: ValueInputOption,
    ) -> ApiResult<AppendResponse> {
        debug!("appending {} rows to {}", rows.len(), range);

        let body = ValueRange {
            range: None,
            major_dimension: None,
            values: rows,
        };

        let response = self
            .http_client
            .post(self.values_url(range, ":append"))
            .bearer_auth(self.handle.access_token())
            .query(&[
                ("valueInputOption", input_option.as_str()),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::transport_error(e).with_step("append rows"))?;

        Self::parse_response(response, "append rows").await
    }

    /// Clears cell values in a range; formatting is left intact.
    pub async fn clear_range(&self, range: &str) -> ApiResult<ClearResponse> {
        debug!("clearing range {}", range);

        let response = self
            .http_client
            .post(self.values_url(range, ":clear"))
            .bearer_auth(self.handle.access_token())
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await
            .map_err(|e| Self::transport_error(e).with_step("clear range"))?;

        Self::parse_response(response, "clear range").await
    }

    /// Reads a range and returns the rows where any cell contains the search
    /// term (case-insensitive).
    pub async fn search_rows(&self, term: &str, range: &str) -> ApiResult<Vec<Vec<Value>>> {
        debug!("searching for {:?} in {}", term, range);

        let data = self.read_range(range).await?;
        Ok(filter_rows(&data.values, term))
    }

    /// Maps a transport-level failure to a network error.
    fn transport_error(e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::network("request timeout").with_source(e)
        } else if e.is_connect() {
            ApiError::network(format!("connection failed: {}", e)).with_source(e)
        } else {
            ApiError::network(format!("request failed: {}", e)).with_source(e)
        }
    }

    /// Maps a non-success status to the error taxonomy and parses a success
    /// body into `T`.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        step: &str,
    ) -> ApiResult<T> {
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(
                ApiError::authentication("access token expired or invalid").with_step(step)
            );
        }

        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(ApiError::authorization("access denied to spreadsheet").with_step(step));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::not_found("spreadsheet or range not found").with_step(step));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(ApiError::rate_limited(format!(
                "rate limit exceeded{}",
                retry_after
                    .map(|s| format!(", retry after {} seconds", s))
                    .unwrap_or_default()
            ))
            .with_step(step));
        }

        if status == reqwest::StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            return Err(
                ApiError::bad_request(format!("invalid request: {}", body)).with_step(step)
            );
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(
                ApiError::server(format!("API error ({}): {}", status, body)).with_step(step)
            );
        }

        let body = response.text().await.map_err(|e| {
            ApiError::network(format!("failed to read response: {}", e))
                .with_step(step)
                .with_source(e)
        })?;

        serde_json::from_str(&body).map_err(|e| {
            ApiError::invalid_response(format!("failed to parse response: {}", e))
                .with_step(step)
                .with_source(e)
        })
    }
}

/// Returns the rows where any cell contains `term`, case-insensitively.
pub fn filter_rows(rows: &[Vec<Value>], term: &str) -> Vec<Vec<Value>> {
    let needle = term.to_lowercase();
    rows.iter()
        .filter(|row| {
            row.iter()
                .any(|cell| cell_text(cell).to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

/// Renders a cell value as plain text (strings without JSON quoting).
pub fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A block of cell values, as read from or written to the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,
    /// Row-major cell values; absent when the range is empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Vec<Value>>,
}

/// Spreadsheet metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetInfo {
    pub properties: SpreadsheetProperties,
    #[serde(default)]
    pub sheets: Vec<Sheet>,
    pub spreadsheet_url: Option<String>,
}

/// Top-level spreadsheet properties.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetProperties {
    pub title: String,
}

/// A sheet within the spreadsheet.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub properties: SheetProperties,
}

/// Properties of a single sheet.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub title: String,
    #[serde(default)]
    pub sheet_id: i64,
    #[serde(default)]
    pub index: i64,
}

/// Response from the values.update endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    pub updated_range: Option<String>,
    #[serde(default)]
    pub updated_rows: u64,
    #[serde(default)]
    pub updated_columns: u64,
    #[serde(default)]
    pub updated_cells: u64,
}

/// Response from the values.append endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendResponse {
    pub table_range: Option<String>,
    pub updates: Option<UpdateResponse>,
}

/// Response from the values.clear endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearResponse {
    pub cleared_range: Option<String>,
}
