//! Line-based parameter control for live sessions
//!
//! Each stdin line is one command:
//! - `<param> <value>` sets a parameter (`cutoff 1200`, `trim -3 dB`)
//! - `show` prints the current values
//! - `levels` prints the output meter
//! - `reset` restores the defaults
//! - `quit` stops the session

use ladder_core::domain::params::{ParamId, ParameterSet};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    Set(ParamId, f32),
    Show,
    Levels,
    Reset,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("missing value for {0}")]
    MissingValue(ParamId),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(ParamId, String),
}

/// Parse one control line against the parameters' units
pub fn parse_command(line: &str, parameters: &ParameterSet) -> Result<ControlCommand, ControlError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "" => Err(ControlError::Empty),
        "show" => Ok(ControlCommand::Show),
        "levels" | "meter" => Ok(ControlCommand::Levels),
        "reset" => Ok(ControlCommand::Reset),
        "quit" | "exit" | "q" => Ok(ControlCommand::Quit),
        name => {
            let id: ParamId = name
                .parse()
                .map_err(|_| ControlError::UnknownCommand(word.to_string()))?;
            if rest.is_empty() {
                return Err(ControlError::MissingValue(id));
            }
            parameters
                .parameter(id)
                .parse_value(rest)
                .map(|value| ControlCommand::Set(id, value))
                .ok_or_else(|| ControlError::InvalidValue(id, rest.to_string()))
        }
    }
}

/// One line per parameter, as shown by `show`
pub fn describe(parameters: &ParameterSet) -> String {
    parameters
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
