//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// sheetctl - a Google Sheets spreadsheet at your fingertips
#[derive(Debug, Parser)]
#[command(name = "sheetctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "SHEETCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Spreadsheet to operate on
    #[arg(long, env = "SPREADSHEET_ID")]
    pub spreadsheet_id: Option<String>,

    /// Path to the OAuth credentials JSON from the Google Cloud Console
    #[arg(long, env = "SHEETCTL_CREDENTIALS")]
    pub credentials_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands. Without one, the interactive menu starts.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the OAuth authorization flow
    Auth {
        /// Re-run the flow even if a token is already stored
        #[arg(long)]
        force: bool,
    },

    /// Show the spreadsheet title and its sheets
    Info,

    /// List the sheets of the spreadsheet
    Sheets,

    /// Read cell values from a range
    Read {
        /// Range to read (e.g. 'Sheet1!A1:D10')
        range: Option<String>,
    },

    /// Overwrite cell values in a range
    Write {
        /// Target range (e.g. 'Sheet1!A1')
        range: Option<String>,

        /// A row of comma-separated cells (can be repeated)
        #[arg(long = "row", required = true)]
        rows: Vec<String>,

        /// Parse values as if typed into the UI instead of storing them raw
        #[arg(long)]
        user_entered: bool,
    },

    /// Append rows after the last table row of a sheet
    Append {
        /// Sheet or range to append to (e.g. 'Sheet1')
        sheet: Option<String>,

        /// A row of comma-separated cells (can be repeated)
        #[arg(long = "row", required = true)]
        rows: Vec<String>,

        /// Parse values as if typed into the UI instead of storing them raw
        #[arg(long)]
        user_entered: bool,
    },

    /// Find rows containing a term
    Search {
        /// Term to search for (case-insensitive)
        term: String,

        /// Range to search in
        #[arg(long)]
        range: Option<String>,
    },

    /// Clear cell values in a range
    Clear {
        /// Range to clear (e.g. 'Sheet1!A1:Z100')
        range: Option<String>,
    },

    /// Run the interactive menu
    Menu,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_read_with_range() {
        let cli = Cli::try_parse_from(["sheetctl", "read", "Sheet1!A1:B2"]).unwrap();
        match cli.command {
            Some(Command::Read { range }) => assert_eq!(range.as_deref(), Some("Sheet1!A1:B2")),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parses_write_rows() {
        let cli =
            Cli::try_parse_from(["sheetctl", "write", "--row", "a,b", "--row", "c,d"]).unwrap();
        match cli.command {
            Some(Command::Write { rows, range, .. }) => {
                assert_eq!(rows, vec!["a,b".to_string(), "c,d".to_string()]);
                assert!(range.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn write_requires_rows() {
        assert!(Cli::try_parse_from(["sheetctl", "write", "Sheet1!A1"]).is_err());
    }

    #[test]
    fn no_command_defaults_to_menu() {
        let cli = Cli::try_parse_from(["sheetctl"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn spreadsheet_id_flag() {
        let cli = Cli::try_parse_from(["sheetctl", "--spreadsheet-id", "abc", "info"]).unwrap();
        assert_eq!(cli.spreadsheet_id.as_deref(), Some("abc"));
    }
}
