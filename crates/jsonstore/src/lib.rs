//! # jsonstore
//!
//! Arena-backed JSON documents.
//!
//! Every value of a document lives in a [`Store`] and is addressed by a [`Handle`]. Strings, keys
//! and numbers keep the exact text they were decoded from, so encoding a decoded document gives
//! back its compact form byte for byte. Object keys are interned per store.
//!
//! ```rust
//! use jsonstore::{Document, MarshalBinary};
//!
//! let document = Document::unmarshal_binary(br#"{"name": "Rex", "tags": [1, 2.50]}"#)?;
//! let root = document.root().expect("Not empty");
//! assert_eq!(root.get("name").and_then(|name| name.as_str()), Some("Rex"));
//! assert_eq!(document.marshal_binary()?, br#"{"name":"Rex","tags":[1,2.50]}"#);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Decoding is split into layers that can be used on their own:
//!
//! - [`Lexer`] turns a byte [`Source`] into [`Token`]s;
//! - [`Builder`] assembles tokens into a [`Store`];
//! - [`Node`] is a read-only view of a stored value;
//! - [`Pools`] recycle writers, scratch buffers and lexer state between calls.
//!
//! Nodes implement `serde::Deserializer`, so records can be read straight out of a document
//! with [`from_slice`].
mod builder;
mod codec;
mod document;
mod error;
mod lexer;
mod node;
mod pool;
mod store;
mod writer;

pub use builder::{Builder, Decoder};
#[cfg(feature = "serde_json")]
pub use codec::to_vec;
pub use codec::{borrow_append_text, borrow_encode_bytes, from_slice, MarshalBinary};
pub use document::Document;
pub use error::{
    BuilderError, DecodeError, EncodeError, LexError, LexErrorKind, NodeError, StoreError,
};
pub use jsonlike::{JsonLike, Kind};
pub use lexer::{
    Lexer, LexerOptions, LexerPool, LexerState, ReadSource, SliceSource, Source, Token, TokenKind,
};
pub use node::{Elements, NamedPairs, Node, Pairs};
pub use pool::{Pool, Pooled, Pools, Reset};
pub use store::{Handle, InternedKey, KeyClass, RawNumber, Store, Value};
pub use writer::{AppendWriter, ScratchBuffer};
