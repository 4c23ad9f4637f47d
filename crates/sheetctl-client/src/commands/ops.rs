//! Sheet operation commands.
//!
//! One function per operation; each prints its result and maps API errors
//! through the client error type.

use serde_json::Value;

use sheetctl_api::{SheetsClient, ValueInputOption};

use crate::error::{ClientError, ClientResult};
use crate::render::format_table;

/// Default range for reads and searches.
pub const DEFAULT_READ_RANGE: &str = "Sheet1!A1:Z1000";
/// Default target for writes.
pub const DEFAULT_WRITE_RANGE: &str = "Sheet1!A1";
/// Default sheet for appends.
pub const DEFAULT_APPEND_RANGE: &str = "Sheet1";
/// Default range for clears.
pub const DEFAULT_CLEAR_RANGE: &str = "Sheet1!A1:Z100";

/// Parses one `--row` argument into a row of string cells.
pub fn parse_row(row: &str) -> Vec<Value> {
    row.split(',')
        .map(|cell| Value::String(cell.trim().to_string()))
        .collect()
}

/// Parses the repeated `--row` arguments.
pub fn parse_rows(rows: &[String]) -> ClientResult<Vec<Vec<Value>>> {
    if rows.is_empty() {
        return Err(ClientError::Input("at least one --row is required".into()));
    }
    Ok(rows.iter().map(|row| parse_row(row)).collect())
}

/// Reads and prints a range.
pub async fn read(client: &SheetsClient, range: &str) -> ClientResult<()> {
    let data = client.read_range(range).await?;

    if data.values.is_empty() {
        println!("No data found in {}", range);
    } else {
        println!(
            "{} rows from {}:",
            data.values.len(),
            data.range.as_deref().unwrap_or(range)
        );
        print!("{}", format_table(&data.values));
    }
    Ok(())
}

/// Overwrites a range and reports how much changed.
pub async fn write(
    client: &SheetsClient,
    range: &str,
    rows: Vec<Vec<Value>>,
    input_option: ValueInputOption,
) -> ClientResult<()> {
    let result = client.write_range(range, rows, input_option).await?;
    println!(
        "Updated {} cells in {}",
        result.updated_cells,
        result.updated_range.as_deref().unwrap_or(range)
    );
    Ok(())
}

/// Appends rows and reports where they landed.
pub async fn append(
    client: &SheetsClient,
    range: &str,
    rows: Vec<Vec<Value>>,
    input_option: ValueInputOption,
) -> ClientResult<()> {
    let result = client.append_rows(range, rows, input_option).await?;
    let appended = result.updates.map(|u| u.updated_rows).unwrap_or(0);
    println!("Appended {} rows to {}", appended, range);
    Ok(())
}

/// Searches a range and prints the matching rows.
pub async fn search(client: &SheetsClient, term: &str, range: &str) -> ClientResult<()> {
    let hits = client.search_rows(term, range).await?;

    if hits.is_empty() {
        println!("No rows matching {:?} in {}", term, range);
    } else {
        println!("{} rows matching {:?}:", hits.len(), term);
        print!("{}", format_table(&hits));
    }
    Ok(())
}

/// Clears a range.
pub async fn clear(client: &SheetsClient, range: &str) -> ClientResult<()> {
    let result = client.clear_range(range).await?;
    println!("Cleared {}", result.cleared_range.as_deref().unwrap_or(range));
    Ok(())
}

/// Prints the spreadsheet title and its sheets.
pub async fn info(client: &SheetsClient) -> ClientResult<()> {
    let info = client.spreadsheet_info().await?;

    println!("Title:  {}", info.properties.title);
    println!(
        "Sheets: {}",
        info.sheets
            .iter()
            .map(|s| s.properties.title.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    if let Some(url) = info.spreadsheet_url {
        println!("URL:    {}", url);
    }
    Ok(())
}

/// Lists the sheets of the spreadsheet.
pub async fn sheets(client: &SheetsClient) -> ClientResult<()> {
    let sheets = client.list_sheets().await?;

    println!("{} sheets:", sheets.len());
    for sheet in sheets {
        println!("{:>3}  {}  (id {})", sheet.index, sheet.title, sheet.sheet_id);
    }
    Ok(())
}
