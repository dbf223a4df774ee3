// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Error Taxonomy
//!
//! Every failure the core can produce is one of the structural
//! variants of [`CommandParseError`]. Nothing here is raised as a Rust
//! panic or exception in ordinary operation; handlers return these
//! values, and [`crate::exception::ExceptionController`] dispatches on
//! them.

use std::fmt;
use std::sync::Arc;

/// A caption key: a stable identifier used by a front-end's message
/// catalog to look up a localized template for an error. The core
/// never renders text itself, it only ever emits one of these plus a
/// substitution map (carried on the enum variants below).
pub type CaptionKey = &'static str;

/// Top-level error taxonomy, matching one structural variant per kind
/// of failure the dispatch pipeline can encounter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CommandParseError {
    #[error("invalid syntax, expected: {correct_syntax}")]
    InvalidSyntax {
        correct_syntax: String,
        matched_prefix: String,
    },

    #[error("no such command: '{input}'")]
    NoSuchCommand { input: String },

    #[error("missing permission '{missing}' for {target}")]
    NoPermission { target: String, missing: String },

    #[error("invalid sender: expected {required}, got {actual}")]
    InvalidSender { required: String, actual: String },

    #[error("argument parse error: {cause}")]
    ArgumentParse { cause: ArgumentParseError },

    #[error("flag parse error ({reason}): '{token}'")]
    FlagParse {
        reason: FlagParseReason,
        token: String,
    },

    #[error("command execution failed: {cause}")]
    CommandExecution { cause: CommandExecutionError },

    #[error("internal error")]
    Internal,
}

impl CommandParseError {
    /// The caption key used to locate a default message, per parser or
    /// error-kind class tag.
    pub fn caption_key(&self) -> CaptionKey {
        match self {
            CommandParseError::InvalidSyntax { .. } => "error.invalid_syntax",
            CommandParseError::NoSuchCommand { .. } => "error.no_such_command",
            CommandParseError::NoPermission { .. } => "error.no_permission",
            CommandParseError::InvalidSender { .. } => "error.invalid_sender",
            CommandParseError::ArgumentParse { cause } => cause.caption_key(),
            CommandParseError::FlagParse { .. } => "error.flag_parse",
            CommandParseError::CommandExecution { .. } => "error.command_execution",
            CommandParseError::Internal => "error.internal",
        }
    }

    /// Substitution variables for the caption named by
    /// [`CommandParseError::caption_key`].
    pub fn variables(&self) -> Vec<(&'static str, String)> {
        match self {
            CommandParseError::InvalidSyntax {
                correct_syntax,
                matched_prefix,
            } => vec![
                ("correct_syntax", correct_syntax.clone()),
                ("matched_prefix", matched_prefix.clone()),
            ],
            CommandParseError::NoSuchCommand { input } => vec![("input", input.clone())],
            CommandParseError::NoPermission { target, missing } => vec![
                ("target", target.clone()),
                ("missing", missing.clone()),
            ],
            CommandParseError::InvalidSender { required, actual } => vec![
                ("required", required.clone()),
                ("actual", actual.clone()),
            ],
            CommandParseError::ArgumentParse { cause } => cause.variables(),
            CommandParseError::FlagParse { token, .. } => vec![("flag", token.clone())],
            CommandParseError::CommandExecution { .. } | CommandParseError::Internal => vec![],
        }
    }
}

/// Structured failures produced by the standard typed parsers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ArgumentParseError {
    #[error("'{input}' is not a number between {min} and {max}")]
    NumberParse {
        input: String,
        min: String,
        max: String,
    },

    #[error("'{input}' is not a valid duration")]
    DurationParse { input: String },

    #[error("'{input}' is not one of: {}", acceptable.join(", "))]
    EnumParse {
        input: String,
        acceptable: Vec<String>,
    },

    /// A nested [`AggregateParser`](crate::parser::aggregate::AggregateParser)
    /// step failed; `component` names the failing step, `cause` its error.
    #[error("aggregate parse error in component '{component}': {cause}")]
    Aggregate {
        component: String,
        cause: AggregateParseCause,
    },

    #[error("{message}")]
    Custom { message: String },
}

impl ArgumentParseError {
    fn caption_key(&self) -> CaptionKey {
        match self {
            ArgumentParseError::NumberParse { .. } => "error.number_parse",
            ArgumentParseError::DurationParse { .. } => "error.duration_parse",
            ArgumentParseError::EnumParse { .. } => "error.enum_parse",
            ArgumentParseError::Aggregate { .. } => "error.aggregate_parse",
            ArgumentParseError::Custom { .. } => "error.custom_parse",
        }
    }

    fn variables(&self) -> Vec<(&'static str, String)> {
        match self {
            ArgumentParseError::NumberParse { input, min, max } => vec![
                ("input", input.clone()),
                ("min", min.clone()),
                ("max", max.clone()),
            ],
            ArgumentParseError::DurationParse { input } => vec![("input", input.clone())],
            ArgumentParseError::EnumParse { input, acceptable } => vec![
                ("input", input.clone()),
                ("acceptable", acceptable.join(", ")),
            ],
            ArgumentParseError::Aggregate { component, .. } => vec![("component", component.clone())],
            ArgumentParseError::Custom { message } => vec![("message", message.clone())],
        }
    }
}

/// Reasons a [`crate::flag::CommandFlagParser`] can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FlagParseReason {
    #[error("unknown flag")]
    UnknownFlag,
    #[error("duplicate flag")]
    DuplicateFlag,
    #[error("combined short form did not start a valid flag")]
    NoFlagStarted,
    #[error("missing argument")]
    MissingArgument,
    #[error("missing permission")]
    NoPermission,
}

/// The cause of an [`ArgumentParseError::Aggregate`] failure: either
/// an inner parser ran out of input, or an inner parser failed outright.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AggregateParseCause {
    #[error("missing input")]
    MissingInput,
    #[error(transparent)]
    Inner(Box<CommandParseError>),
}

/// The error surfaced by a handler, erased to a boxed `std::error::Error`
/// so the core's error taxonomy stays a single concrete enum instead of
/// threading a per-command error type parameter through every API.
#[derive(Debug, Clone)]
pub struct CommandExecutionError {
    message: String,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl CommandExecutionError {
    pub fn new(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        CommandExecutionError {
            message: error.to_string(),
            source: Some(Arc::new(error)),
        }
    }

    pub fn from_message(message: impl Into<String>) -> Self {
        CommandExecutionError {
            message: message.into(),
            source: None,
        }
    }
}

impl fmt::Display for CommandExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CommandExecutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}
