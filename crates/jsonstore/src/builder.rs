//! Turning token streams and foreign values into store entries.
use std::sync::Arc;

use jsonlike::{JsonLike, Kind};
use string_interner::symbol::SymbolU32;

use crate::{
    document::Document,
    error::{BuilderError, DecodeError, StoreError},
    lexer::{Lexer, LexerOptions, SliceSource, Source, TokenKind},
    node::Node,
    store::{Handle, RawNumber, Store, Value},
};

/// An open container during decoding.
struct Frame {
    index: usize,
    object: bool,
    /// Key of the member whose value is being decoded.
    key: Option<SymbolU32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Value,
    FirstElement,
    FirstKey,
    Key,
    Colon,
    /// A comma or the end of the innermost container.
    Next,
}

/// A container of a foreign value whose members are still being copied.
enum Pending<E, P> {
    Elements(usize, E),
    Pairs(usize, P),
}

/// Populates a [`Store`] and hands out [`Document`]s that share it.
///
/// The store stays mutable until it is shared with a document, after that every mutation
/// fails with [`StoreError::Shared`].
#[derive(Debug)]
pub struct Builder {
    store: Arc<Store>,
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

impl Builder {
    #[must_use]
    pub fn new() -> Builder {
        Builder::with_store(Store::new())
    }

    /// Build into an existing store, e.g. one that was [reset](Store::reset) for reuse.
    #[must_use]
    pub fn with_store(store: Store) -> Builder {
        Builder {
            store: Arc::new(store),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Mutable access to the store.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::Shared`] once a document shares the store.
    pub fn store_mut(&mut self) -> Result<&mut Store, StoreError> {
        Arc::get_mut(&mut self.store).ok_or(StoreError::Shared)
    }

    /// Release the builder. Documents created earlier keep their own reference to the store.
    #[must_use]
    pub fn into_shared(self) -> Arc<Store> {
        self.store
    }

    /// Decode exactly one value from `lexer`, leaving the lexer right after it.
    ///
    /// # Errors
    ///
    /// Fails on the first lexer error or on a token that cannot continue the value. Entries
    /// appended before the failure stay in the store and must be discarded with it.
    pub fn decode_value<S: Source>(&mut self, lexer: &mut Lexer<S>) -> Result<Handle, DecodeError> {
        match self.decode(lexer)? {
            Some(handle) => Ok(handle),
            None => Err(BuilderError::UnexpectedToken {
                expected: "a value",
                found: TokenKind::Eof,
                offset: lexer.offset(),
            }
            .into()),
        }
    }

    /// Decode one value and require that nothing but whitespace follows it.
    ///
    /// # Errors
    ///
    /// Same as [`Builder::decode_value`], plus [`BuilderError::TrailingContent`].
    pub fn decode_document<S: Source>(
        &mut self,
        lexer: &mut Lexer<S>,
    ) -> Result<Handle, DecodeError> {
        let handle = self.decode_value(lexer)?;
        loop {
            let token = lexer.next_token();
            match token.kind() {
                TokenKind::Blank => {}
                TokenKind::Eof => return Ok(handle),
                TokenKind::Error => return Err(lex_error(lexer)),
                _ => {
                    return Err(BuilderError::TrailingContent {
                        offset: token.offset(),
                    }
                    .into())
                }
            }
        }
    }

    /// Decode a complete document from a string with default lexer options.
    ///
    /// # Errors
    ///
    /// Same as [`Builder::decode_document`].
    pub fn decode_str(&mut self, input: &str) -> Result<Handle, DecodeError> {
        let mut lexer = Lexer::new(SliceSource::new(input.as_bytes()), LexerOptions::default());
        self.decode_document(&mut lexer)
    }

    /// Decode the next value, or `None` if the input ends before one starts.
    pub(crate) fn decode<S: Source>(
        &mut self,
        lexer: &mut Lexer<S>,
    ) -> Result<Option<Handle>, DecodeError> {
        let store = self.store_mut()?;
        let mut stack: Vec<Frame> = Vec::new();
        let mut expect = Expect::Value;
        loop {
            let token = lexer.next_token();
            let (kind, offset) = (token.kind(), token.offset());
            let unexpected = |expected: &'static str| -> DecodeError {
                BuilderError::UnexpectedToken {
                    expected,
                    found: kind,
                    offset,
                }
                .into()
            };
            let completed = match (expect, kind) {
                (_, TokenKind::Blank) => continue,
                (_, TokenKind::Error) => return Err(lex_error(lexer)),
                (Expect::Value, TokenKind::Eof) if stack.is_empty() => return Ok(None),
                (Expect::FirstElement, TokenKind::EndArray)
                | (Expect::FirstKey, TokenKind::EndObject) => stack.pop().map(|frame| frame.index),
                (Expect::Value | Expect::FirstElement, _) => {
                    let handle = match kind {
                        TokenKind::Null => store.put(Value::Null),
                        TokenKind::True => store.put(Value::Bool(true)),
                        TokenKind::False => store.put(Value::Bool(false)),
                        TokenKind::String => store.put_str(token.text()),
                        TokenKind::Number => store.put_raw_number(token.text()),
                        TokenKind::BeginArray | TokenKind::BeginObject => {
                            let object = kind == TokenKind::BeginObject;
                            let handle = store.put(if object { Value::Object } else { Value::Array });
                            stack.push(Frame {
                                index: handle.index(),
                                object,
                                key: None,
                            });
                            expect = if object {
                                Expect::FirstKey
                            } else {
                                Expect::FirstElement
                            };
                            continue;
                        }
                        _ => return Err(unexpected("a value")),
                    };
                    Some(handle.index())
                }
                (Expect::FirstKey | Expect::Key, TokenKind::String) => {
                    let key = store.intern_symbol(token.text());
                    if let Some(frame) = stack.last_mut() {
                        frame.key = Some(key);
                    }
                    expect = Expect::Colon;
                    continue;
                }
                (Expect::FirstKey | Expect::Key, _) => return Err(unexpected("a string key")),
                (Expect::Colon, TokenKind::Colon) => {
                    expect = Expect::Value;
                    continue;
                }
                (Expect::Colon, _) => return Err(unexpected("':'")),
                (Expect::Next, TokenKind::Comma) => {
                    expect = match stack.last() {
                        Some(frame) if frame.object => Expect::Key,
                        _ => Expect::Value,
                    };
                    continue;
                }
                (Expect::Next, TokenKind::EndArray | TokenKind::EndObject)
                    if stack
                        .last()
                        .is_some_and(|frame| frame.object == (kind == TokenKind::EndObject)) =>
                {
                    stack.pop().map(|frame| frame.index)
                }
                (Expect::Next, _) => {
                    return Err(unexpected(match stack.last() {
                        Some(frame) if frame.object => "',' or '}'",
                        _ => "',' or ']'",
                    }))
                }
            };
            let Some(index) = completed else {
                continue;
            };
            match stack.last_mut() {
                Some(frame) => {
                    store.append_member(frame.index, frame.key.take(), index);
                    expect = Expect::Next;
                }
                None => return Ok(Some(store.handle(index))),
            }
        }
    }

    /// Copy any JSON-like value into the store, e.g. a node of another store or a
    /// `serde_json::Value`.
    ///
    /// Number text that is not valid JSON is stored as `null`.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::Shared`] once a document shares the store.
    pub fn copy_from<'a, V: JsonLike<'a>>(&mut self, value: V) -> Result<Handle, StoreError> {
        let store = self.store_mut()?;
        let mut stack = Vec::new();
        let root = put_shallow(store, value, &mut stack);
        while let Some(pending) = stack.last_mut() {
            let (container, key, child) = match pending {
                Pending::Elements(index, elements) => match elements.next() {
                    Some(child) => (*index, None, child),
                    None => {
                        stack.pop();
                        continue;
                    }
                },
                Pending::Pairs(index, pairs) => match pairs.next() {
                    Some((key, child)) => (*index, Some(key), child),
                    None => {
                        stack.pop();
                        continue;
                    }
                },
            };
            let key = key.map(|key| store.intern_symbol(key));
            let child = put_shallow(store, child, &mut stack);
            store.append_member(container, key, child);
        }
        Ok(store.handle(root))
    }

    /// A document rooted at `node` that shares this builder's store.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::ForeignHandle`] if `node` belongs to a different store.
    pub fn with_root(&self, node: Node<'_>) -> Result<Document, StoreError> {
        if !std::ptr::eq(node.store(), Arc::as_ptr(&self.store)) {
            return Err(StoreError::ForeignHandle);
        }
        Ok(Document::new(Arc::clone(&self.store), node.handle()))
    }

    /// Finish building with `root` as the document root.
    ///
    /// # Errors
    ///
    /// Fails if `root` was not issued by this builder's store.
    pub fn finish(self, root: Handle) -> Result<Document, StoreError> {
        self.store.get(root)?;
        Ok(Document::new(self.store, root))
    }
}

fn put_shallow<'a, V: JsonLike<'a>>(
    store: &mut Store,
    value: V,
    stack: &mut Vec<Pending<V::Elements, V::Pairs>>,
) -> usize {
    let handle = match value.kind() {
        Kind::Null => store.put(Value::Null),
        Kind::Bool => store.put(Value::Bool(value.as_bool().unwrap_or_default())),
        Kind::Number => {
            let text = value.as_number();
            match text.as_deref().map(RawNumber::parse) {
                Some(Ok(number)) => store.put(Value::Number(number)),
                _ => store.put(Value::Null),
            }
        }
        Kind::String => store.put_str(value.as_str().unwrap_or_default()),
        Kind::Array => {
            let handle = store.put(Value::Array);
            if let Some(elements) = value.elements() {
                stack.push(Pending::Elements(handle.index(), elements));
            }
            handle
        }
        Kind::Object => {
            let handle = store.put(Value::Object);
            if let Some(pairs) = value.pairs() {
                stack.push(Pending::Pairs(handle.index(), pairs));
            }
            handle
        }
    };
    handle.index()
}

fn lex_error<S: Source>(lexer: &Lexer<S>) -> DecodeError {
    lexer.error().cloned().map_or_else(
        || {
            BuilderError::UnexpectedToken {
                expected: "a token",
                found: TokenKind::Error,
                offset: lexer.offset(),
            }
            .into()
        },
        DecodeError::Lex,
    )
}

/// Iterator of documents over a stream of concatenated JSON values.
///
/// Each document gets its own store. Iteration stops at the end of input or after the first
/// error.
#[derive(Debug)]
pub struct Decoder<S> {
    lexer: Lexer<S>,
    failed: bool,
}

impl<S: Source> Decoder<S> {
    pub fn new(lexer: Lexer<S>) -> Decoder<S> {
        Decoder {
            lexer,
            failed: false,
        }
    }

    /// Release the lexer, e.g. to redeem it to its pool.
    pub fn into_lexer(self) -> Lexer<S> {
        self.lexer
    }
}

impl<S: Source> Iterator for Decoder<S> {
    type Item = Result<Document, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let mut builder = Builder::new();
        match builder.decode(&mut self.lexer) {
            Ok(Some(handle)) => Some(builder.finish(handle).map_err(DecodeError::from)),
            Ok(None) => None,
            Err(error) => {
                self.failed = true;
                Some(Err(error))
            }
        }
    }
}
