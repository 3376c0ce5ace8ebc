//! Error types for the shell protocol.

use thiserror::Error;

/// Errors produced when decoding module output.
///
/// Parsers fail fast on the first problem they find; they never return a
/// partially populated record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line did not split into the number of fields the report requires.
    #[error("unexpected field count: expected {expected}, got {actual}")]
    UnexpectedLength {
        /// Field count required by the report format.
        expected: usize,
        /// Field count actually present.
        actual: usize,
    },

    /// The report-type discriminator was not `POS`.
    #[error("wrong report discriminator: {0:?}")]
    WrongDiscriminator(String),

    /// A numeric field could not be parsed.
    #[error("malformed number in field {field}: {value:?}")]
    MalformedNumber {
        /// Name of the offending field.
        field: &'static str,
        /// Raw field text.
        value: String,
    },

    /// A prompt-delimited block was missing required lines.
    #[error("malformed block: {0}")]
    MalformedBlock(String),

    /// A tag identifier was empty.
    #[error("empty tag identifier")]
    EmptyIdentifier,

    /// Module output was not valid UTF-8.
    #[error("invalid UTF-8 in module output")]
    InvalidUtf8,
}

/// Result type alias for protocol parsing.
pub type ProtocolResult<T> = Result<T, ParseError>;
