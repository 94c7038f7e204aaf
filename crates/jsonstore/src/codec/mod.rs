//! Encoding and decoding entry points built on pooled resources.
//!
//! Every helper borrows what it needs from a [`Pools`] instance immediately before use and
//! redeems it before returning, on success and on failure alike.
mod de;
mod encode;
mod ser;

use std::io;

use serde::de::DeserializeOwned;

pub(crate) use encode::display;

use crate::{
    builder::Builder,
    document::Document,
    error::{DecodeError, EncodeError, StoreError},
    lexer::{Lexer, LexerOptions, ReadSource, SliceSource, Source},
    node::Node,
    pool::Pools,
    writer::AppendWriter,
};

/// Nesting limit of the serde paths, which recurse once per container level.
pub(crate) const MAX_DEPTH: usize = 128;

/// Values that encode themselves as compact JSON.
pub trait MarshalBinary {
    /// Append the encoding of `self` to `writer`.
    ///
    /// # Errors
    ///
    /// Fails only if memory runs out.
    fn append_text(&self, writer: &mut AppendWriter) -> Result<(), EncodeError>;

    /// Encode into a new byte vector, using the global pools.
    ///
    /// # Errors
    ///
    /// Fails only if memory runs out.
    fn marshal_binary(&self) -> Result<Vec<u8>, EncodeError> {
        borrow_encode_bytes(Pools::global(), self)
    }
}

impl MarshalBinary for Node<'_> {
    fn append_text(&self, writer: &mut AppendWriter) -> Result<(), EncodeError> {
        encode::write_node(writer, *self)
    }
}

/// An empty document encodes as `null`.
impl MarshalBinary for Document {
    fn append_text(&self, writer: &mut AppendWriter) -> Result<(), EncodeError> {
        match self.root() {
            Some(node) => encode::write_node(writer, node),
            None => writer.write(b"null"),
        }
    }
}

/// Append the encoding of `value` to `existing` through a pooled writer.
///
/// The output grows `existing` in place. The pooled buffer is set aside meanwhile and goes
/// back to the pool with its capacity. On failure `existing` is dropped together with the
/// partial output.
///
/// # Errors
///
/// Fails only if memory runs out.
pub fn borrow_append_text<T: MarshalBinary + ?Sized>(
    pools: &Pools,
    value: &T,
    existing: Vec<u8>,
) -> Result<Vec<u8>, EncodeError> {
    let mut writer = pools.writers().scoped();
    let spare = writer.replace(existing);
    let result = value.append_text(&mut writer);
    let output = writer.replace(spare);
    result.map(|()| output)
}

/// Encode `value` into a pooled writer and return an independent copy of the bytes.
///
/// # Errors
///
/// Fails only if memory runs out.
pub fn borrow_encode_bytes<T: MarshalBinary + ?Sized>(
    pools: &Pools,
    value: &T,
) -> Result<Vec<u8>, EncodeError> {
    let mut writer = pools.writers().scoped();
    value.append_text(&mut writer)?;
    Ok(writer.bytes().to_vec())
}

impl Document {
    /// Decode a complete JSON document with default options and the global pools.
    ///
    /// # Errors
    ///
    /// Fails on malformed input. No document is produced on failure.
    pub fn unmarshal_binary(raw: &[u8]) -> Result<Document, DecodeError> {
        Document::unmarshal_binary_with(Pools::global(), raw, LexerOptions::default())
    }

    /// Decode a complete JSON document through a lexer borrowed from `pools`.
    ///
    /// # Errors
    ///
    /// Fails on malformed input. No document is produced on failure.
    pub fn unmarshal_binary_with(
        pools: &Pools,
        raw: &[u8],
        options: LexerOptions,
    ) -> Result<Document, DecodeError> {
        let mut lexer = pools.lexers().borrow_lexer(SliceSource::new(raw), options);
        let result = decode_document(&mut lexer);
        pools.lexers().redeem_lexer(lexer);
        result
    }

    /// Decode a complete JSON document from `reader`, buffering through a pooled window.
    ///
    /// # Errors
    ///
    /// Fails on malformed input or if reading fails.
    pub fn decode_reader<R: io::Read>(
        pools: &Pools,
        reader: R,
        options: LexerOptions,
    ) -> Result<Document, DecodeError> {
        let source = ReadSource::with_buffer(reader, pools.buffers().borrow());
        let mut lexer = pools.lexers().borrow_lexer(source, options);
        let result = decode_document(&mut lexer);
        let (_, window) = pools.lexers().redeem_lexer(lexer).into_parts();
        pools.buffers().redeem(window);
        result
    }
}

fn decode_document<S: Source>(lexer: &mut Lexer<S>) -> Result<Document, DecodeError> {
    let mut builder = Builder::new();
    let result = builder
        .decode_document(lexer)
        .and_then(|root| builder.finish(root).map_err(DecodeError::from));
    if let Err(error) = &result {
        tracing::debug!(%error, offset = lexer.offset(), "Failed to decode document");
    }
    result
}

/// Decode a record type from JSON text.
///
/// The input is decoded into a document first, then `T` is deserialized from its root.
///
/// # Errors
///
/// Fails with a builder error on malformed input and with a node error if the document does
/// not have the shape `T` expects.
pub fn from_slice<T: DeserializeOwned>(raw: &[u8]) -> Result<T, DecodeError> {
    let document = Document::unmarshal_binary(raw)?;
    let root = document.root().ok_or(StoreError::InvalidHandle)?;
    T::deserialize(root)
}

/// Encode a record type as compact JSON through a pooled writer.
///
/// # Errors
///
/// Fails if `T` refuses to serialize or memory runs out.
#[cfg(feature = "serde_json")]
pub fn to_vec<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, EncodeError> {
    let mut writer = Pools::global().writers().scoped();
    serde_json::to_writer(&mut *writer, value).map_err(|error| {
        if error.is_io() {
            EncodeError::OutOfMemory
        } else {
            EncodeError::Serialize(error.to_string())
        }
    })?;
    Ok(writer.bytes().to_vec())
}
