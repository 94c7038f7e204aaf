//! Streaming JSON tokenizer.
//!
//! The lexer pulls bytes from a [`Source`] and produces one [`Token`] per call to
//! [`Lexer::next_token`]. Strings without escapes are returned as views into the input;
//! escaped strings are decoded into a scratch buffer owned by the lexer state.
//!
//! The first malformed token moves the lexer into a terminal error state. From then on every
//! call returns an error token and [`Lexer::error`] keeps reporting the same error.
mod source;
mod token;

pub use source::{ReadSource, SliceSource, Source};
pub use token::{Token, TokenKind};

use crate::{
    error::{LexError, LexErrorKind},
    pool::{Pool, Reset},
};

/// Lexer configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LexerOptions {
    keep_blanks: bool,
    max_value_bytes: Option<usize>,
}

impl LexerOptions {
    #[must_use]
    pub fn new() -> LexerOptions {
        LexerOptions::default()
    }

    /// Emit whitespace runs as [`TokenKind::Blank`] tokens instead of skipping them.
    #[must_use]
    pub fn with_keep_blanks(mut self, keep_blanks: bool) -> LexerOptions {
        self.keep_blanks = keep_blanks;
        self
    }

    /// Reject any single token whose raw span is longer than `limit` bytes.
    #[must_use]
    pub fn with_max_value_bytes(mut self, limit: usize) -> LexerOptions {
        self.max_value_bytes = Some(limit);
        self
    }

    #[must_use]
    pub fn keep_blanks(&self) -> bool {
        self.keep_blanks
    }

    #[must_use]
    pub fn max_value_bytes(&self) -> Option<usize> {
        self.max_value_bytes
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Status {
    #[default]
    Ready,
    Eof,
    Failed(LexError),
}

/// The reusable part of a lexer: options, scratch space and the current state.
#[derive(Debug, Default)]
pub struct LexerState {
    options: LexerOptions,
    scratch: Vec<u8>,
    status: Status,
}

impl Reset for LexerState {
    fn reset(&mut self) {
        self.options = LexerOptions::default();
        self.scratch.clear();
        self.status = Status::Ready;
    }
}

struct Scanned {
    kind: TokenKind,
    offset: usize,
    escaped: bool,
}

impl Scanned {
    fn plain(kind: TokenKind, offset: usize) -> Scanned {
        Scanned {
            kind,
            offset,
            escaped: false,
        }
    }
}

/// A tokenizer bound to one byte source.
#[derive(Debug)]
pub struct Lexer<S> {
    source: S,
    state: LexerState,
}

impl<S: Source> Lexer<S> {
    /// Create a lexer with fresh, unpooled state.
    pub fn new(source: S, options: LexerOptions) -> Lexer<S> {
        Lexer::with_state(source, LexerState::default(), options)
    }

    fn with_state(source: S, mut state: LexerState, options: LexerOptions) -> Lexer<S> {
        state.options = options;
        Lexer { source, state }
    }

    /// Advance to the next token.
    pub fn next_token(&mut self) -> Token<'_> {
        match &self.state.status {
            Status::Failed(error) => return Token::terminal(TokenKind::Error, error.offset()),
            Status::Eof => return Token::terminal(TokenKind::Eof, self.source.offset()),
            Status::Ready => {}
        }
        match self.scan() {
            Ok(scanned) => self.token(&scanned),
            Err(error) => {
                tracing::debug!(%error, "Lexer failed");
                let offset = error.offset();
                self.state.status = Status::Failed(error);
                Token::terminal(TokenKind::Error, offset)
            }
        }
    }

    /// `true` unless the lexer is in the error state.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        !matches!(self.state.status, Status::Failed(_))
    }

    /// The error that stopped the lexer, if any.
    #[must_use]
    pub fn error(&self) -> Option<&LexError> {
        match &self.state.status {
            Status::Failed(error) => Some(error),
            _ => None,
        }
    }

    #[must_use]
    pub fn options(&self) -> LexerOptions {
        self.state.options
    }

    /// Number of input bytes consumed so far.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.source.offset()
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    fn token(&self, scanned: &Scanned) -> Token<'_> {
        let raw = self.source.token();
        let text = match scanned.kind {
            TokenKind::String if scanned.escaped => self.state.scratch.as_slice(),
            TokenKind::String => raw.get(1..raw.len().saturating_sub(1)).unwrap_or_default(),
            _ => raw,
        };
        Token {
            kind: scanned.kind,
            offset: scanned.offset,
            raw,
            // Validated while scanning
            text: std::str::from_utf8(text).unwrap_or_default(),
            escaped: scanned.escaped,
        }
    }

    fn peek(&mut self) -> Result<Option<u8>, LexError> {
        self.source
            .peek()
            .map_err(|error| LexError::new(LexErrorKind::Io(error.kind()), self.source.offset()))
    }

    /// Consume one byte of the current token, enforcing the size limit.
    fn bump(&mut self, offset: usize) -> Result<(), LexError> {
        self.source.bump();
        match self.state.options.max_value_bytes {
            Some(limit) if self.source.token().len() > limit => Err(LexError::new(
                LexErrorKind::ValueTooLarge { limit },
                offset,
            )),
            _ => Ok(()),
        }
    }

    fn scan(&mut self) -> Result<Scanned, LexError> {
        if !self.state.options.keep_blanks {
            while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek()? {
                self.source.skip();
            }
        }
        self.source.start_token();
        let offset = self.source.offset();
        let Some(byte) = self.peek()? else {
            self.state.status = Status::Eof;
            return Ok(Scanned::plain(TokenKind::Eof, offset));
        };
        let kind = match byte {
            b'{' => TokenKind::BeginObject,
            b'}' => TokenKind::EndObject,
            b'[' => TokenKind::BeginArray,
            b']' => TokenKind::EndArray,
            b':' => TokenKind::Colon,
            b',' => TokenKind::Comma,
            b'"' => return self.scan_string(offset),
            b'-' | b'0'..=b'9' => {
                self.scan_number(offset)?;
                return Ok(Scanned::plain(TokenKind::Number, offset));
            }
            b't' => {
                self.scan_literal(b"true", offset)?;
                return Ok(Scanned::plain(TokenKind::True, offset));
            }
            b'f' => {
                self.scan_literal(b"false", offset)?;
                return Ok(Scanned::plain(TokenKind::False, offset));
            }
            b'n' => {
                self.scan_literal(b"null", offset)?;
                return Ok(Scanned::plain(TokenKind::Null, offset));
            }
            b' ' | b'\t' | b'\n' | b'\r' => {
                // Blank runs are not values, the size limit does not apply
                while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek()? {
                    self.source.bump();
                }
                return Ok(Scanned::plain(TokenKind::Blank, offset));
            }
            other => {
                return Err(LexError::new(
                    LexErrorKind::UnexpectedCharacter(other),
                    offset,
                ))
            }
        };
        self.bump(offset)?;
        Ok(Scanned::plain(kind, offset))
    }

    fn scan_string(&mut self, offset: usize) -> Result<Scanned, LexError> {
        // Opening quote
        self.bump(offset)?;
        self.state.scratch.clear();
        let mut escaped = false;
        loop {
            match self.peek()? {
                None => return Err(LexError::new(LexErrorKind::UnterminatedString, offset)),
                Some(b'"') => {
                    self.bump(offset)?;
                    break;
                }
                Some(b'\\') => {
                    if !escaped {
                        escaped = true;
                        let consumed = self.source.token();
                        self.state
                            .scratch
                            .extend_from_slice(consumed.get(1..).unwrap_or_default());
                    }
                    self.bump(offset)?;
                    self.scan_escape(offset)?;
                }
                Some(byte) if byte < 0x20 => {
                    return Err(LexError::new(
                        LexErrorKind::UnexpectedCharacter(byte),
                        offset,
                    ));
                }
                Some(byte) => {
                    self.bump(offset)?;
                    if escaped {
                        self.state.scratch.push(byte);
                    }
                }
            }
        }
        let content = if escaped {
            self.state.scratch.as_slice()
        } else {
            let raw = self.source.token();
            raw.get(1..raw.len() - 1).unwrap_or_default()
        };
        if std::str::from_utf8(content).is_err() {
            return Err(LexError::new(LexErrorKind::InvalidUtf8, offset));
        }
        Ok(Scanned {
            kind: TokenKind::String,
            offset,
            escaped,
        })
    }

    fn scan_escape(&mut self, offset: usize) -> Result<(), LexError> {
        let Some(byte) = self.peek()? else {
            return Err(LexError::new(LexErrorKind::UnterminatedString, offset));
        };
        self.bump(offset)?;
        let decoded = match byte {
            b'"' => b'"',
            b'\\' => b'\\',
            b'/' => b'/',
            b'b' => 0x08,
            b'f' => 0x0c,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'u' => {
                let ch = self.scan_unicode(offset)?;
                let mut buf = [0; 4];
                self.state
                    .scratch
                    .extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                return Ok(());
            }
            _ => return Err(LexError::new(LexErrorKind::InvalidEscape, offset)),
        };
        self.state.scratch.push(decoded);
        Ok(())
    }

    /// Decode the code point of a `\u` escape, combining surrogate pairs.
    fn scan_unicode(&mut self, offset: usize) -> Result<char, LexError> {
        let invalid = || LexError::new(LexErrorKind::InvalidEscape, offset);
        let first = self.scan_hex4(offset)?;
        let code = match first {
            0xD800..=0xDBFF => {
                if self.peek()? != Some(b'\\') {
                    return Err(invalid());
                }
                self.bump(offset)?;
                if self.peek()? != Some(b'u') {
                    return Err(invalid());
                }
                self.bump(offset)?;
                let second = self.scan_hex4(offset)?;
                if !(0xDC00..=0xDFFF).contains(&second) {
                    return Err(invalid());
                }
                0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00)
            }
            0xDC00..=0xDFFF => return Err(invalid()),
            _ => first,
        };
        char::from_u32(code).ok_or_else(invalid)
    }

    fn scan_hex4(&mut self, offset: usize) -> Result<u32, LexError> {
        let mut value = 0;
        for _ in 0..4 {
            let Some(byte) = self.peek()? else {
                return Err(LexError::new(LexErrorKind::UnterminatedString, offset));
            };
            let digit = char::from(byte)
                .to_digit(16)
                .ok_or_else(|| LexError::new(LexErrorKind::InvalidEscape, offset))?;
            self.bump(offset)?;
            value = (value << 4) | digit;
        }
        Ok(value)
    }

    fn scan_number(&mut self, offset: usize) -> Result<(), LexError> {
        let invalid = || LexError::new(LexErrorKind::InvalidNumber, offset);
        if self.peek()? == Some(b'-') {
            self.bump(offset)?;
        }
        match self.peek()? {
            Some(b'0') => {
                self.bump(offset)?;
                // No leading zeros
                if matches!(self.peek()?, Some(b'0'..=b'9')) {
                    return Err(invalid());
                }
            }
            Some(b'1'..=b'9') => self.scan_digits(offset)?,
            _ => return Err(invalid()),
        }
        if self.peek()? == Some(b'.') {
            self.bump(offset)?;
            if !matches!(self.peek()?, Some(b'0'..=b'9')) {
                return Err(invalid());
            }
            self.scan_digits(offset)?;
        }
        if matches!(self.peek()?, Some(b'e' | b'E')) {
            self.bump(offset)?;
            if matches!(self.peek()?, Some(b'+' | b'-')) {
                self.bump(offset)?;
            }
            if !matches!(self.peek()?, Some(b'0'..=b'9')) {
                return Err(invalid());
            }
            self.scan_digits(offset)?;
        }
        Ok(())
    }

    fn scan_digits(&mut self, offset: usize) -> Result<(), LexError> {
        while let Some(b'0'..=b'9') = self.peek()? {
            self.bump(offset)?;
        }
        Ok(())
    }

    fn scan_literal(&mut self, expected: &'static [u8], offset: usize) -> Result<(), LexError> {
        for &byte in expected {
            match self.peek()? {
                Some(actual) if actual == byte => self.bump(offset)?,
                Some(actual) => {
                    return Err(LexError::new(
                        LexErrorKind::UnexpectedCharacter(actual),
                        offset,
                    ))
                }
                None => return Err(LexError::new(LexErrorKind::UnexpectedEof, offset)),
            }
        }
        Ok(())
    }
}

/// A pool of lexer states, so that each decode session reuses scratch space.
#[derive(Debug, Default)]
pub struct LexerPool {
    states: Pool<LexerState>,
}

impl LexerPool {
    #[must_use]
    pub fn new() -> LexerPool {
        LexerPool::default()
    }

    /// Bind a clean lexer state to `source` for one decode session.
    pub fn borrow_lexer<S: Source>(&self, source: S, options: LexerOptions) -> Lexer<S> {
        Lexer::with_state(source, self.states.borrow(), options)
    }

    /// Return the lexer state to the pool and give back the source.
    pub fn redeem_lexer<S>(&self, lexer: Lexer<S>) -> S {
        self.states.redeem(lexer.state);
        lexer.source
    }

    /// Number of idle lexer states.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.states.idle()
    }
}
