//! Byte sources the lexer reads from.
use std::io;

use crate::writer::ScratchBuffer;

/// A sequential byte source that remembers the bytes of the token being scanned.
pub trait Source {
    /// The next byte, without consuming it. `None` at the end of input.
    ///
    /// # Errors
    ///
    /// Propagates failures of the underlying reader.
    fn peek(&mut self) -> io::Result<Option<u8>>;
    /// Consume the peeked byte as part of the current token.
    fn bump(&mut self);
    /// Consume the peeked byte without recording it.
    fn skip(&mut self);
    /// Begin a new token at the current position.
    fn start_token(&mut self);
    /// Bytes consumed since the last [`Source::start_token`].
    fn token(&self) -> &[u8];
    /// Total number of bytes consumed.
    fn offset(&self) -> usize;
}

/// Zero-copy source over an in-memory slice.
#[derive(Debug, Clone)]
pub struct SliceSource<'de> {
    input: &'de [u8],
    position: usize,
    start: usize,
}

impl<'de> SliceSource<'de> {
    #[must_use]
    pub fn new(input: &'de [u8]) -> SliceSource<'de> {
        SliceSource {
            input,
            position: 0,
            start: 0,
        }
    }

    /// Input that has not been consumed yet.
    #[must_use]
    pub fn remaining(&self) -> &'de [u8] {
        self.input.get(self.position..).unwrap_or_default()
    }
}

impl Source for SliceSource<'_> {
    #[inline]
    fn peek(&mut self) -> io::Result<Option<u8>> {
        Ok(self.input.get(self.position).copied())
    }

    #[inline]
    fn bump(&mut self) {
        self.position += 1;
    }

    #[inline]
    fn skip(&mut self) {
        self.position += 1;
    }

    #[inline]
    fn start_token(&mut self) {
        self.start = self.position;
    }

    #[inline]
    fn token(&self) -> &[u8] {
        self.input
            .get(self.start..self.position)
            .unwrap_or_default()
    }

    #[inline]
    fn offset(&self) -> usize {
        self.position
    }
}

/// Buffered source over any reader.
///
/// Token bytes are copied into a separate buffer because the read window is overwritten on
/// refill. Both buffers can be taken from and returned to a pool.
#[derive(Debug)]
pub struct ReadSource<R> {
    reader: R,
    window: ScratchBuffer,
    filled: usize,
    position: usize,
    consumed: usize,
    token: Vec<u8>,
}

impl<R: io::Read> ReadSource<R> {
    pub fn new(reader: R) -> ReadSource<R> {
        ReadSource::with_buffer(reader, ScratchBuffer::new())
    }

    /// Create a source reading through `window`, e.g. a pooled buffer.
    pub fn with_buffer(reader: R, window: ScratchBuffer) -> ReadSource<R> {
        ReadSource {
            reader,
            window,
            filled: 0,
            position: 0,
            consumed: 0,
            token: Vec::new(),
        }
    }

    /// Release the reader and the read window.
    pub fn into_parts(self) -> (R, ScratchBuffer) {
        (self.reader, self.window)
    }

    fn refill(&mut self) -> io::Result<()> {
        loop {
            match self.reader.read(self.window.window()) {
                Ok(filled) => {
                    self.filled = filled;
                    self.position = 0;
                    return Ok(());
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(error),
            }
        }
    }

    #[inline]
    fn current(&self) -> Option<u8> {
        if self.position < self.filled {
            self.window.filled(self.filled).get(self.position).copied()
        } else {
            None
        }
    }
}

impl<R: io::Read> Source for ReadSource<R> {
    fn peek(&mut self) -> io::Result<Option<u8>> {
        if self.position >= self.filled {
            self.refill()?;
        }
        Ok(self.current())
    }

    fn bump(&mut self) {
        if let Some(byte) = self.current() {
            self.token.push(byte);
            self.position += 1;
            self.consumed += 1;
        }
    }

    fn skip(&mut self) {
        if self.position < self.filled {
            self.position += 1;
            self.consumed += 1;
        }
    }

    fn start_token(&mut self) {
        self.token.clear();
    }

    fn token(&self) -> &[u8] {
        &self.token
    }

    fn offset(&self) -> usize {
        self.consumed
    }
}
