//! Interactive shell commands
//!
//! ```text
//! read                 arm the input receive loop
//! out  <id> [hex]      send an output report
//! getf <id>            read a feature report
//! setf <id> [hex]      send a feature report
//! info                 show the open device
//! clear                clear the screen
//! help                 list commands
//! quit                 disconnect and exit
//! ```
//!
//! Report ids are decimal or `0x`-prefixed hex. Payload hex may contain
//! spaces and `-` separators.

use hid_analyzer_transport::hex::{self, HexError};
use thiserror::Error;

pub const HELP: &str = "\
read                 arm the input receive loop
out  <id> [hex]      send an output report
getf <id>            read a feature report
setf <id> [hex]      send a feature report
info                 show the open device
clear                clear the screen
help                 list commands
quit                 disconnect and exit";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandLineError {
    #[error("Unknown command '{0}', type 'help' for a list")]
    Unknown(String),

    #[error("'{0}' needs a report id")]
    MissingReportId(&'static str),

    #[error("Invalid report id '{0}', expected 0-255 or 0x00-0xFF")]
    InvalidReportId(String),

    #[error("'{0}' takes no arguments")]
    UnexpectedArguments(&'static str),

    #[error(transparent)]
    MalformedHex(#[from] HexError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    ReadInput,
    WriteOutput { report_id: u8, payload: Vec<u8> },
    ReadFeature { report_id: u8 },
    WriteFeature { report_id: u8, payload: Vec<u8> },
    Info,
    Clear,
    Help,
    Quit,
}

/// Parse a report id: decimal, or hex with a `0x` prefix
pub fn parse_report_id(text: &str) -> Result<u8, CommandLineError> {
    let invalid = || CommandLineError::InvalidReportId(text.to_string());
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).map_err(|_| invalid()),
        None => text.parse().map_err(|_| invalid()),
    }
}

impl ShellCommand {
    /// Parse one input line; blank lines yield `None`
    pub fn parse(line: &str) -> Result<Option<Self>, CommandLineError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "" => return Ok(None),
            "read" => no_args("read", rest, ShellCommand::ReadInput)?,
            "out" => {
                let (report_id, payload) = id_and_payload("out", rest)?;
                ShellCommand::WriteOutput { report_id, payload }
            }
            "getf" => {
                let (report_id, payload) = id_and_payload("getf", rest)?;
                if !payload.is_empty() {
                    return Err(CommandLineError::UnexpectedArguments("getf"));
                }
                ShellCommand::ReadFeature { report_id }
            }
            "setf" => {
                let (report_id, payload) = id_and_payload("setf", rest)?;
                ShellCommand::WriteFeature { report_id, payload }
            }
            "info" => no_args("info", rest, ShellCommand::Info)?,
            "clear" | "cls" => no_args("clear", rest, ShellCommand::Clear)?,
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" | "q" => ShellCommand::Quit,
            _ => return Err(CommandLineError::Unknown(word.to_string())),
        };
        Ok(Some(command))
    }
}

fn no_args(
    name: &'static str,
    rest: &str,
    command: ShellCommand,
) -> Result<ShellCommand, CommandLineError> {
    if rest.is_empty() {
        Ok(command)
    } else {
        Err(CommandLineError::UnexpectedArguments(name))
    }
}

fn id_and_payload(name: &'static str, rest: &str) -> Result<(u8, Vec<u8>), CommandLineError> {
    let (id, hex_text) = match rest.split_once(char::is_whitespace) {
        Some((id, hex_text)) => (id, hex_text),
        None => (rest, ""),
    };
    if id.is_empty() {
        return Err(CommandLineError::MissingReportId(name));
    }
    Ok((parse_report_id(id)?, hex::decode(hex_text)?))
}
