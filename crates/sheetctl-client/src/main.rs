//! sheetctl CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use sheetctl_api::{Authenticator, SheetsClient, StdinPrompt, ValueInputOption};

use sheetctl_client::cli::{Cli, Command};
use sheetctl_client::commands::{auth, menu, ops};
use sheetctl_client::config::ClientConfig;
use sheetctl_client::error::{ClientError, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.debug {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string()))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Run the command
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    // Load configuration
    let config = if let Some(ref path) = cli.config {
        ClientConfig::load_from(path).map_err(ClientError::Config)?
    } else {
        ClientConfig::load().unwrap_or_default()
    };

    let sheets_config =
        config.to_sheets_config(cli.spreadsheet_id.clone(), cli.credentials_file.clone())?;
    let timeout = sheets_config.timeout;

    if let Some(Command::Auth { force }) = cli.command {
        return auth::run(sheets_config, force).await;
    }

    // Every other command operates on an authorized client
    let authenticator = Authenticator::new(sheets_config)?;
    let handle = authenticator.authorized_handle().await?;
    let client = SheetsClient::new(handle, timeout)?;

    match cli.command {
        None | Some(Command::Menu) => {
            let prompt = StdinPrompt;
            menu::run(&client, &prompt).await
        }
        Some(Command::Info) => ops::info(&client).await,
        Some(Command::Sheets) => ops::sheets(&client).await,
        Some(Command::Read { range }) => {
            ops::read(&client, range.as_deref().unwrap_or(ops::DEFAULT_READ_RANGE)).await
        }
        Some(Command::Write {
            range,
            rows,
            user_entered,
        }) => {
            let parsed = ops::parse_rows(&rows)?;
            ops::write(
                &client,
                range.as_deref().unwrap_or(ops::DEFAULT_WRITE_RANGE),
                parsed,
                input_option(user_entered),
            )
            .await
        }
        Some(Command::Append {
            sheet,
            rows,
            user_entered,
        }) => {
            let parsed = ops::parse_rows(&rows)?;
            ops::append(
                &client,
                sheet.as_deref().unwrap_or(ops::DEFAULT_APPEND_RANGE),
                parsed,
                input_option(user_entered),
            )
            .await
        }
        Some(Command::Search { term, range }) => {
            ops::search(
                &client,
                &term,
                range.as_deref().unwrap_or(ops::DEFAULT_READ_RANGE),
            )
            .await
        }
        Some(Command::Clear { range }) => {
            ops::clear(&client, range.as_deref().unwrap_or(ops::DEFAULT_CLEAR_RANGE)).await
        }
        // Handled before the authenticated client was built
        Some(Command::Auth { .. }) => Ok(()),
    }
}

fn input_option(user_entered: bool) -> ValueInputOption {
    if user_entered {
        ValueInputOption::UserEntered
    } else {
        ValueInputOption::Raw
    }
}
