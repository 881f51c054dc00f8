//! Error types for XFCC header parsing.

use thiserror::Error;

/// Errors raised by the character-level tokenizer.
///
/// Columns are zero-based character offsets into the input and point at (or
/// just past) the offending character.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LexError {
    /// The character following a backslash has no escaped meaning in the
    /// current quoting context.
    #[error("invalid escape character `{ch}` (column {column})")]
    InvalidEscapeCharacter { ch: char, column: usize },

    /// The input ended inside a quoted string.
    #[error("string missing end quote (column {column})")]
    UnterminatedQuote { column: usize },

    /// The input ended directly after a backslash.
    #[error("string missing escape (column {column})")]
    UnterminatedEscape { column: usize },
}

/// Errors raised when the token sequence does not match the field grammar.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrammarError {
    /// A field key was expected but a delimiter or end of input was found.
    #[error("expected a field key, found {found} (column {column})")]
    ExpectedFieldKey { found: String, column: usize },

    /// A field key was not followed by `=`.
    #[error("expected `=` after field key `{key}`, found {found} (column {column})")]
    ExpectedEquals {
        key: String,
        found: String,
        column: usize,
    },

    /// A token was left over where a delimiter or end of input was expected.
    #[error("unexpected {found} (column {column})")]
    UnexpectedToken { found: String, column: usize },
}

/// Errors raised when mapping parsed fields onto typed records.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SemanticError {
    /// A top-level field key outside the known set.
    #[error("unknown field `{key}` in client cert {index}")]
    UnknownField { index: usize, key: String },

    /// A `Subject` value that failed to parse, annotated with the group it
    /// belongs to.
    #[error("invalid subject in client cert {index}: {source}")]
    InvalidSubject {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    /// A distinguished-name component key outside the known set.
    #[error("unknown subject component `{0}`")]
    UnknownSubjectComponent(String),
}

/// Any failure of a header or subject parse.
///
/// None of these are retryable: the input is malformed, and callers are
/// expected to reject the header outright.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("lex: {0}")]
    Lex(#[from] LexError),
    #[error("grammar: {0}")]
    Grammar(#[from] GrammarError),
    #[error("semantic: {0}")]
    Semantic(#[from] SemanticError),
}
