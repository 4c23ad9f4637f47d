//! Authentication command.

use tracing::info;

use sheetctl_api::{Authenticator, SheetsConfig};

use crate::error::ClientResult;

/// Runs the OAuth authorization flow.
///
/// With a usable persisted token this is a no-op unless `force` is set, in
/// which case the stored pair is cleared and the interactive flow runs again.
pub async fn run(config: SheetsConfig, force: bool) -> ClientResult<()> {
    let authenticator = Authenticator::new(config)?;

    if authenticator.is_authenticated() && !force {
        println!("Already authenticated.");
        println!("Use --force to re-authenticate.");
        return Ok(());
    }

    if force {
        authenticator.clear_tokens()?;
    }

    println!("Starting Google Sheets authentication...");
    println!();
    println!("A browser window will open for you to authorize access.");
    println!("If the browser doesn't open, check the terminal for a URL to copy.");
    println!();

    let handle = authenticator.authorized_handle().await?;

    info!("authentication successful");
    println!();
    println!("Authentication successful!");
    println!(
        "Tokens saved; sheetctl can now access spreadsheet {}.",
        handle.spreadsheet_id()
    );

    Ok(())
}
