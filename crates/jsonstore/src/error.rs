//! Error types for every layer of the engine.
//!
//! Lexing and building failures surface as [`DecodeError`]; callers that only care about the
//! broad layer can use [`DecodeError::is_builder_error`] and [`DecodeError::is_node_error`].
use core::fmt;
use std::io;

use jsonlike::Kind;

use crate::lexer::TokenKind;

/// A malformed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    kind: LexErrorKind,
    offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    UnterminatedString,
    InvalidEscape,
    InvalidNumber,
    UnexpectedCharacter(u8),
    UnexpectedEof,
    InvalidUtf8,
    /// A single token is longer than the configured limit.
    ValueTooLarge {
        limit: usize,
    },
    /// The byte source failed.
    Io(io::ErrorKind),
}

impl LexError {
    pub(crate) fn new(kind: LexErrorKind, offset: usize) -> LexError {
        LexError { kind, offset }
    }
    #[must_use]
    pub fn kind(&self) -> &LexErrorKind {
        &self.kind
    }
    /// Byte offset of the token that failed.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LexErrorKind::UnterminatedString => f.write_str("unterminated string")?,
            LexErrorKind::InvalidEscape => f.write_str("invalid escape sequence")?,
            LexErrorKind::InvalidNumber => f.write_str("invalid number")?,
            LexErrorKind::UnexpectedCharacter(byte) if byte.is_ascii_graphic() => {
                write!(f, "unexpected character '{}'", char::from(*byte))?;
            }
            LexErrorKind::UnexpectedCharacter(byte) => {
                write!(f, "unexpected byte 0x{byte:02x}")?;
            }
            LexErrorKind::UnexpectedEof => f.write_str("unexpected end of input")?,
            LexErrorKind::InvalidUtf8 => f.write_str("invalid UTF-8 in string")?,
            LexErrorKind::ValueTooLarge { limit } => {
                write!(f, "token exceeds the limit of {limit} bytes")?;
            }
            LexErrorKind::Io(kind) => write!(f, "failed to read input: {kind}")?,
        }
        write!(f, " at byte {}", self.offset)
    }
}

impl std::error::Error for LexError {}

/// A handle was used against the wrong store, or a store could not be mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The handle was issued by a different store, or by this store before a reset.
    ForeignHandle,
    /// The handle is the zero sentinel or points past the end of the store.
    InvalidHandle,
    NotAnArray,
    NotAnObject,
    /// The child already contains the container it would be appended to.
    Cycle,
    /// The store is shared with a document and can no longer be mutated.
    Shared,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreError::ForeignHandle => "handle belongs to a different store",
            StoreError::InvalidHandle => "handle does not refer to a value",
            StoreError::NotAnArray => "value is not an array",
            StoreError::NotAnObject => "value is not an object",
            StoreError::Cycle => "value would contain itself",
            StoreError::Shared => "store is shared and cannot be mutated",
        })
    }
}

impl std::error::Error for StoreError {}

/// A node does not have the shape a reader expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    TypeMismatch { expected: Kind, found: Kind },
    MissingField(&'static str),
    /// Containers are nested deeper than a recursive reader supports.
    TooDeep { limit: usize },
    Custom(String),
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::TypeMismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            NodeError::MissingField(name) => write!(f, "missing field `{name}`"),
            NodeError::TooDeep { limit } => {
                write!(f, "nesting exceeds the limit of {limit} levels")
            }
            NodeError::Custom(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for NodeError {}

/// The token stream does not form a JSON value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderError {
    UnexpectedToken {
        expected: &'static str,
        found: TokenKind,
        offset: usize,
    },
    /// Input continues after a complete document.
    TrailingContent { offset: usize },
    Store(StoreError),
}

impl fmt::Display for BuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuilderError::UnexpectedToken {
                expected,
                found,
                offset,
            } => write!(f, "expected {expected}, found {found} at byte {offset}"),
            BuilderError::TrailingContent { offset } => {
                write!(f, "trailing content at byte {offset}")
            }
            BuilderError::Store(error) => error.fmt(f),
        }
    }
}

impl std::error::Error for BuilderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuilderError::Store(error) => Some(error),
            _ => None,
        }
    }
}

impl From<StoreError> for BuilderError {
    fn from(error: StoreError) -> Self {
        BuilderError::Store(error)
    }
}

/// Decoding failed. Whatever was built before the failure must be discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    Lex(LexError),
    Builder(BuilderError),
    Node(NodeError),
    Store(StoreError),
}

impl DecodeError {
    /// The input bytes could not be turned into a document.
    #[must_use]
    pub fn is_builder_error(&self) -> bool {
        matches!(self, DecodeError::Lex(_) | DecodeError::Builder(_))
    }
    /// A decoded document could not be read in the requested shape.
    #[must_use]
    pub fn is_node_error(&self) -> bool {
        matches!(self, DecodeError::Node(_) | DecodeError::Store(_))
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Lex(error) => error.fmt(f),
            DecodeError::Builder(error) => error.fmt(f),
            DecodeError::Node(error) => error.fmt(f),
            DecodeError::Store(error) => error.fmt(f),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Lex(error) => Some(error),
            DecodeError::Builder(error) => Some(error),
            DecodeError::Node(error) => Some(error),
            DecodeError::Store(error) => Some(error),
        }
    }
}

impl From<LexError> for DecodeError {
    fn from(error: LexError) -> Self {
        DecodeError::Lex(error)
    }
}

impl From<BuilderError> for DecodeError {
    fn from(error: BuilderError) -> Self {
        DecodeError::Builder(error)
    }
}

impl From<NodeError> for DecodeError {
    fn from(error: NodeError) -> Self {
        DecodeError::Node(error)
    }
}

impl From<StoreError> for DecodeError {
    fn from(error: StoreError) -> Self {
        DecodeError::Store(error)
    }
}

impl serde::de::Error for DecodeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        DecodeError::Node(NodeError::Custom(msg.to_string()))
    }

    fn missing_field(field: &'static str) -> Self {
        DecodeError::Node(NodeError::MissingField(field))
    }
}

/// Encoding failed. A decoded document always encodes unless memory runs out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    OutOfMemory,
    /// A record type refused to serialize.
    Serialize(String),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::OutOfMemory => f.write_str("out of memory while encoding"),
            EncodeError::Serialize(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for EncodeError {}
