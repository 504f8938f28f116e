//! # Error Types
//!
//! This module defines all error types for the Quill compiler.
//!
//! Each pipeline stage has its own error, and every error carries enough position
//! information to highlight the offending source text.
//!
//! ## Error Types
//! - `LexError` - Unterminated quote or bracket, with line and column of the opening delimiter
//! - `ParseError` - Grammar violations with line and column of the offending token
//! - `ExecutionError` - Unknown key/time/tempo/clef values, with the element index
//! - `ConfigError` - Invalid compiler configuration
//! - `CompileError` - Umbrella over all of the above, returned by [`crate::compile`]
//!
//! ## Usage
//! ```rust
//! use quill::{compile, CompileError};
//!
//! match compile("C4 q \"Hello") {
//!     Ok(score) => println!("{} measures", score.measures.len()),
//!     Err(CompileError::Lex(e)) => eprintln!("{}", e),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::fmt;
use thiserror::Error;

/// Structural failures found while scanning token boundaries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// A `"` was opened but the line ended before an unescaped closing `"`.
    ///
    /// # Example
    /// ```
    /// # use quill::LexError;
    /// let err = LexError::UnterminatedQuote { line: 2, column: 7 };
    /// assert_eq!(err.to_string(), "Unclosed quote at line 2, column 7");
    /// ```
    #[error("Unclosed quote at line {line}, column {column}")]
    UnterminatedQuote { line: usize, column: usize },

    /// A `[` was opened but the line ended before the matching `]`.
    #[error("Unclosed bracket at line {line}, column {column}")]
    UnterminatedBracket { line: usize, column: usize },
}

impl LexError {
    pub fn line(&self) -> usize {
        match self {
            LexError::UnterminatedQuote { line, .. } | LexError::UnterminatedBracket { line, .. } => {
                *line
            }
        }
    }

    pub fn column(&self) -> usize {
        match self {
            LexError::UnterminatedQuote { column, .. }
            | LexError::UnterminatedBracket { column, .. } => *column,
        }
    }
}

/// The grammar rule a [`ParseError`] violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    InvalidPitch,
    UnknownDuration,
    UnclosedBracket,
    UnclosedQuote,
    /// A lyric with nothing to attach to (after a rest, a barline, a command, or on its own)
    InvalidAttachment,
    UnknownCommand,
}

impl ParseErrorKind {
    /// The user-facing message for this kind.
    pub fn message(&self) -> &'static str {
        match self {
            ParseErrorKind::InvalidPitch => "Invalid pitch",
            ParseErrorKind::UnknownDuration => "Unknown duration",
            ParseErrorKind::UnclosedBracket => "Unclosed bracket",
            ParseErrorKind::UnclosedQuote => "Unclosed quote",
            ParseErrorKind::InvalidAttachment => "Invalid attachment",
            ParseErrorKind::UnknownCommand => "Unknown command",
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Grammar violation with location information.
///
/// # Example
/// ```
/// # use quill::{ParseError, ParseErrorKind};
/// let err = ParseError::new(ParseErrorKind::InvalidPitch, 5, 10);
/// assert_eq!(err.to_string(), "Parse error at line 5, column 10: Invalid pitch");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Parse error at line {line}, column {column}: {kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        let kind = match err {
            LexError::UnterminatedQuote { .. } => ParseErrorKind::UnclosedQuote,
            LexError::UnterminatedBracket { .. } => ParseErrorKind::UnclosedBracket,
        };
        ParseError::new(kind, err.line(), err.column())
    }
}

/// The vocabulary a metadata value failed to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionErrorKind {
    UnknownKey,
    UnknownTimeSignature,
    UnknownTempoName,
    UnknownClef,
}

impl ExecutionErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            ExecutionErrorKind::UnknownKey => "Unknown key",
            ExecutionErrorKind::UnknownTimeSignature => "Unknown time signature",
            ExecutionErrorKind::UnknownTempoName => "Unknown tempo",
            ExecutionErrorKind::UnknownClef => "Unknown clef",
        }
    }
}

impl fmt::Display for ExecutionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Semantic error raised while executing parsed elements.
///
/// `index` is the position of the offending element in the parser's output.
///
/// # Example
/// ```
/// # use quill::{ExecutionError, ExecutionErrorKind};
/// let err = ExecutionError {
///     kind: ExecutionErrorKind::UnknownClef,
///     index: 3,
///     value: "soprano".to_string(),
/// };
/// assert_eq!(err.to_string(), "Semantic error at element 3: Unknown clef 'soprano'");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Semantic error at element {index}: {kind} '{value}'")]
pub struct ExecutionError {
    pub kind: ExecutionErrorKind,
    pub index: usize,
    pub value: String,
}

/// Invalid compiler configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config value for '{field}': {value}")]
    Invalid { field: &'static str, value: String },
}

/// Any failure of a full compilation pass.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CompileError {
    /// The bare user-facing message, without position information.
    pub fn message(&self) -> String {
        match self {
            CompileError::Lex(e) => ParseError::from(e.clone()).kind.message().to_string(),
            CompileError::Parse(e) => e.kind.message().to_string(),
            CompileError::Execution(e) => e.kind.message().to_string(),
            CompileError::Config(e) => e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_error_maps_to_parse_kind() {
        let err: ParseError = LexError::UnterminatedBracket { line: 3, column: 1 }.into();
        assert_eq!(err.kind, ParseErrorKind::UnclosedBracket);
        assert_eq!((err.line, err.column), (3, 1));

        let err: ParseError = LexError::UnterminatedQuote { line: 1, column: 6 }.into();
        assert_eq!(err.kind, ParseErrorKind::UnclosedQuote);
    }

    #[test]
    fn test_compile_error_message() {
        let err = CompileError::from(LexError::UnterminatedQuote { line: 1, column: 6 });
        assert_eq!(err.message(), "Unclosed quote");

        let err = CompileError::from(ParseError::new(ParseErrorKind::UnknownDuration, 1, 4));
        assert_eq!(err.message(), "Unknown duration");
        assert_eq!(err.to_string(), "Parse error at line 1, column 4: Unknown duration");
    }
}
