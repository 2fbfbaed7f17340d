//! Line commands read from stdin.

use chainwatch_core::Account;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Switch chain by registry name or endpoint.
    Chain(String),
    Track(Account),
    Lock,
    Unlock,
    Chains,
    Status,
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("Unknown command '{0}' (try 'help')")]
    Unknown(String),
}

pub const HELP: &str = "\
commands:
  chain <name|endpoint>  switch chain
  track <address>        track an account's balance
  lock | unlock          suspend or resume chain access
  chains                 list known chains
  status                 print the current state
  quit                   exit";

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "chain" | "c" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument("chain"));
            }
            Command::Chain(rest.to_string())
        }
        "track" | "t" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument("track"));
            }
            Command::Track(Account::new(rest))
        }
        "lock" => Command::Lock,
        "unlock" => Command::Unlock,
        "chains" | "ls" => Command::Chains,
        "status" | "s" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => return Err(CommandError::Unknown(word.to_string())),
    };
    Ok(Some(command))
}
