use std::io;

use crate::{error::EncodeError, pool::Reset};

/// A growable byte sink that can append in place onto caller-supplied bytes.
#[derive(Debug, Default, Clone)]
pub struct AppendWriter {
    buf: Vec<u8>,
}

impl AppendWriter {
    #[must_use]
    pub fn new() -> AppendWriter {
        AppendWriter::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> AppendWriter {
        AppendWriter {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Replace the content with `initial`; subsequent writes append after it.
    pub fn set(&mut self, initial: Vec<u8>) {
        self.buf = initial;
    }

    /// Swap in `buf` as the content and return the previous buffer.
    pub fn replace(&mut self, buf: Vec<u8>) -> Vec<u8> {
        std::mem::replace(&mut self.buf, buf)
    }

    /// Append `bytes`, growing the buffer geometrically.
    ///
    /// # Errors
    ///
    /// Fails only if the allocator cannot provide the required capacity.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.buf
            .try_reserve(bytes.len())
            .map_err(|_| EncodeError::OutOfMemory)?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Append a single byte.
    ///
    /// # Errors
    ///
    /// Fails only if the allocator cannot provide the required capacity.
    pub fn push(&mut self, byte: u8) -> Result<(), EncodeError> {
        self.buf
            .try_reserve(1)
            .map_err(|_| EncodeError::OutOfMemory)?;
        self.buf.push(byte);
        Ok(())
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Move the content out, leaving the writer empty and without capacity.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

impl Reset for AppendWriter {
    fn reset(&mut self) {
        self.buf.clear();
    }
}

impl io::Write for AppendWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        AppendWriter::write(self, buf).map_err(|_| io::Error::from(io::ErrorKind::OutOfMemory))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Default size of a read window.
const DEFAULT_WINDOW: usize = 8 * 1024;

/// A reusable byte window for buffered reads.
#[derive(Debug, Default, Clone)]
pub struct ScratchBuffer {
    buf: Vec<u8>,
}

impl ScratchBuffer {
    #[must_use]
    pub fn new() -> ScratchBuffer {
        ScratchBuffer::default()
    }

    /// Zero-filled window of at least the default size, ready to be read into.
    pub(crate) fn window(&mut self) -> &mut [u8] {
        if self.buf.len() < DEFAULT_WINDOW {
            self.buf.resize(DEFAULT_WINDOW, 0);
        }
        &mut self.buf
    }

    pub(crate) fn filled(&self, len: usize) -> &[u8] {
        &self.buf[..len.min(self.buf.len())]
    }
}

impl Reset for ScratchBuffer {
    fn reset(&mut self) {
        self.buf.clear();
    }
}
