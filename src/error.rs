use std::str::Utf8Error;

use thiserror::Error;

/// An error that can happen during parsing. [`line`](Self::line) and
/// [`column`](Self::column) locate the character on which the error fired.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{kind} at line {line}, column {column}")]
pub struct ParseError {
    /// What went wrong
    pub kind: ErrorKind,

    /// The line on which the error fired (1-based)
    pub line: u32,

    /// The column of the offending character on that line
    pub column: u32,
}

impl ParseError {
    /// Returns `true` if parsing can continue after this error: either by
    /// calling [`parse()`](crate::JsonPullParser::parse()) again with more
    /// input ([`ErrorKind::UnexpectedEof`]) or by moving the parser to a
    /// larger buffer with [`reallocate()`](crate::JsonPullParser::reallocate())
    /// ([`ErrorKind::InsufficientMemory`]).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::UnexpectedEof | ErrorKind::InsufficientMemory
        )
    }
}

/// The taxonomy of parse errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input was exhausted before the end of the document, possibly in the
    /// middle of a multi-byte character. Recoverable: call
    /// [`parse()`](crate::JsonPullParser::parse()) again with the next input
    /// slice and parsing continues where it stopped.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// The working buffer is full. Recoverable: move the parser to a strictly
    /// larger buffer with [`reallocate()`](crate::JsonPullParser::reallocate())
    /// and call [`parse()`](crate::JsonPullParser::parse()) again.
    #[error("working buffer exhausted")]
    InsufficientMemory,

    /// The parsed text is not valid JSON. Fatal: every further call returns
    /// the same error until the parser is [`reset()`](crate::JsonPullParser::reset()).
    #[error("syntax error")]
    Syntax,

    /// A `{` was closed by a `]`, or a `[` was closed by a `}`. Fatal.
    #[error("closing token does not match the opening token")]
    TokenMismatch,

    /// The parser reached a state it should never be able to reach. Fatal.
    #[error("parser reached an inconsistent internal state")]
    Internal,

    /// An empty input slice was passed to [`parse()`](crate::JsonPullParser::parse()).
    /// Not pinned: the next call with actual input proceeds normally.
    #[error("no input was provided")]
    InvalidInput,
}

/// An error that can happen when reading the current name or string value
/// as UTF-8 text
#[derive(Error, Debug)]
#[error("invalid string: {0}")]
pub struct InvalidStringValueError(#[from] Utf8Error);
