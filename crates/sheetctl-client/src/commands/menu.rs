//! Interactive menu loop.
//!
//! The default mode when sheetctl is started without a subcommand: a numbered
//! menu over the sheet operations. Operation failures are printed and the
//! menu is redisplayed; only quitting leaves the loop.

use std::io;

use serde_json::Value;

use sheetctl_api::{CodePrompt, SheetsClient, ValueInputOption};

use crate::commands::ops;
use crate::error::ClientResult;

/// A menu entry chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Read,
    Write,
    Append,
    Search,
    Clear,
    Info,
    Sheets,
    Quit,
}

/// Maps user input to a menu action. Accepts the number or the name.
pub fn parse_choice(input: &str) -> Option<MenuAction> {
    match input.trim().to_lowercase().as_str() {
        "1" | "read" => Some(MenuAction::Read),
        "2" | "write" => Some(MenuAction::Write),
        "3" | "append" => Some(MenuAction::Append),
        "4" | "search" => Some(MenuAction::Search),
        "5" | "clear" => Some(MenuAction::Clear),
        "6" | "info" => Some(MenuAction::Info),
        "7" | "sheets" => Some(MenuAction::Sheets),
        "8" | "q" | "quit" | "exit" => Some(MenuAction::Quit),
        _ => None,
    }
}

fn print_menu() {
    println!();
    println!("=== sheetctl ===");
    println!("1. Read a range");
    println!("2. Write a range");
    println!("3. Append rows");
    println!("4. Search rows");
    println!("5. Clear a range");
    println!("6. Spreadsheet info");
    println!("7. List sheets");
    println!("8. Quit");
}

/// Prompts for a value, falling back to `default` on an empty reply.
fn prompt_or_default(prompt: &dyn CodePrompt, label: &str, default: &str) -> io::Result<String> {
    let input = prompt.prompt_line(&format!("{} [{}]: ", label, default))?;
    let input = input.trim();
    Ok(if input.is_empty() {
        default.to_string()
    } else {
        input.to_string()
    })
}

/// Reads rows of comma-separated cells until an empty line.
fn read_rows(prompt: &dyn CodePrompt) -> io::Result<Vec<Vec<Value>>> {
    println!("Enter rows as comma-separated cells; empty line to finish.");
    let mut rows = Vec::new();
    loop {
        let line = prompt.prompt_line("row> ")?;
        if line.trim().is_empty() {
            break;
        }
        rows.push(ops::parse_row(&line));
    }
    Ok(rows)
}

/// Runs the menu loop until the user quits.
pub async fn run(client: &SheetsClient, prompt: &dyn CodePrompt) -> ClientResult<()> {
    loop {
        print_menu();
        let choice = prompt.prompt_line("choice> ")?;

        let Some(action) = parse_choice(&choice) else {
            println!("Unknown choice: {}", choice.trim());
            continue;
        };

        if action == MenuAction::Quit {
            println!("Bye.");
            return Ok(());
        }

        if let Err(e) = dispatch(client, prompt, action).await {
            // Operation failures are recoverable; show them and re-display
            eprintln!("error: {}", e);
        }
    }
}

async fn dispatch(
    client: &SheetsClient,
    prompt: &dyn CodePrompt,
    action: MenuAction,
) -> ClientResult<()> {
    match action {
        MenuAction::Read => {
            let range = prompt_or_default(prompt, "Range", ops::DEFAULT_READ_RANGE)?;
            ops::read(client, &range).await
        }
        MenuAction::Write => {
            let range = prompt_or_default(prompt, "Range", ops::DEFAULT_WRITE_RANGE)?;
            let rows = read_rows(prompt)?;
            if rows.is_empty() {
                println!("Nothing to write.");
                Ok(())
            } else {
                ops::write(client, &range, rows, ValueInputOption::Raw).await
            }
        }
        MenuAction::Append => {
            let range = prompt_or_default(prompt, "Sheet", ops::DEFAULT_APPEND_RANGE)?;
            let rows = read_rows(prompt)?;
            if rows.is_empty() {
                println!("Nothing to append.");
                Ok(())
            } else {
                ops::append(client, &range, rows, ValueInputOption::Raw).await
            }
        }
        MenuAction::Search => {
            let term = prompt.prompt_line("Search term: ")?;
            let term = term.trim();
            if term.is_empty() {
                println!("Nothing to search for.");
                Ok(())
            } else {
                let range = prompt_or_default(prompt, "Range", ops::DEFAULT_READ_RANGE)?;
                ops::search(client, term, &range).await
            }
        }
        MenuAction::Clear => {
            let range = prompt_or_default(prompt, "Range", ops::DEFAULT_CLEAR_RANGE)?;
            ops::clear(client, &range).await
        }
        MenuAction::Info => ops::info(client).await,
        MenuAction::Sheets => ops::sheets(client).await,
        // Handled by the loop before dispatch
        MenuAction::Quit => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replies with a scripted sequence of lines.
    struct ScriptedPrompt {
        lines: Mutex<VecDeque<String>>,
    }

    impl ScriptedPrompt {
        fn new(lines: &[&str]) -> Self {
            Self {
                lines: Mutex::new(lines.iter().map(|l| l.to_string()).collect()),
            }
        }
    }

    impl CodePrompt for ScriptedPrompt {
        fn prompt_line(&self, _prompt: &str) -> io::Result<String> {
            self.lines
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| io::Error::other("script exhausted"))
        }
    }

    #[test]
    fn parse_choice_numbers_and_names() {
        assert_eq!(parse_choice("1"), Some(MenuAction::Read));
        assert_eq!(parse_choice("read"), Some(MenuAction::Read));
        assert_eq!(parse_choice(" 4 "), Some(MenuAction::Search));
        assert_eq!(parse_choice("SHEETS"), Some(MenuAction::Sheets));
        assert_eq!(parse_choice("8"), Some(MenuAction::Quit));
        assert_eq!(parse_choice("q"), Some(MenuAction::Quit));
        assert_eq!(parse_choice("9"), None);
        assert_eq!(parse_choice(""), None);
    }

    #[test]
    fn prompt_or_default_uses_default_on_empty() {
        let prompt = ScriptedPrompt::new(&[""]);
        let value = prompt_or_default(&prompt, "Range", "Sheet1!A1").unwrap();
        assert_eq!(value, "Sheet1!A1");
    }

    #[test]
    fn prompt_or_default_keeps_input() {
        let prompt = ScriptedPrompt::new(&["Archive!B2:C3"]);
        let value = prompt_or_default(&prompt, "Range", "Sheet1!A1").unwrap();
        assert_eq!(value, "Archive!B2:C3");
    }

    #[test]
    fn read_rows_until_empty_line() {
        let prompt = ScriptedPrompt::new(&["1,Ada", "2,Grace", ""]);
        let rows = read_rows(&prompt).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec![json!("1"), json!("Ada")]);
    }
}
