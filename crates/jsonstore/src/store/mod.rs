//! Append-only arena of JSON values.
//!
//! Every value lives in one [`Store`] and is addressed by a [`Handle`]. Handles stay valid for
//! the whole lifetime of the store: values are never moved or removed, and containers keep
//! their members in a linked list of member slots, so appending to an array or object never
//! touches previously issued handles.
//!
//! Each store has a process-unique identity that is embedded into the handles and keys it
//! issues. Using a handle with a store that did not issue it fails with
//! [`StoreError::ForeignHandle`]; [`Store::reset`] assigns a new identity, so handles issued
//! before a reset are detected as well.
mod keys;

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashSet;
use jsonlike::Kind;
use string_interner::symbol::SymbolU32;

use keys::Keys;
pub use keys::{InternedKey, KeyClass};

use crate::{
    error::{LexError, LexErrorKind, StoreError},
    lexer::{Lexer, LexerOptions, SliceSource, TokenKind},
    node::Node,
};

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

fn next_store_id() -> u64 {
    NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A stable reference to a value inside one [`Store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Handle {
    store: u64,
    index: usize,
}

impl Handle {
    /// The sentinel that refers to nothing.
    pub const NONE: Handle = Handle { store: 0, index: 0 };

    #[must_use]
    pub fn is_none(self) -> bool {
        self == Handle::NONE
    }

    /// Identity of the store that issued this handle.
    #[must_use]
    pub fn store_id(self) -> u64 {
        self.store
    }

    pub(crate) fn index(self) -> usize {
        self.index
    }
}

/// The verbatim text of a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawNumber<'a>(&'a str);

impl<'a> RawNumber<'a> {
    /// Validate `text` as a single JSON number.
    ///
    /// # Errors
    ///
    /// Returns the lexer error for malformed input, or [`LexErrorKind::InvalidNumber`] when the
    /// text is not exactly one number.
    pub fn parse(text: &'a str) -> Result<RawNumber<'a>, LexError> {
        let mut lexer = Lexer::new(SliceSource::new(text.as_bytes()), LexerOptions::default());
        let token = lexer.next_token();
        let (kind, len) = (token.kind(), token.raw().len());
        if kind == TokenKind::Number && len == text.len() {
            return Ok(RawNumber(text));
        }
        Err(lexer
            .error()
            .cloned()
            .unwrap_or_else(|| LexError::new(LexErrorKind::InvalidNumber, len)))
    }

    pub(crate) fn new_unchecked(text: &'a str) -> RawNumber<'a> {
        RawNumber(text)
    }

    #[must_use]
    pub fn as_str(self) -> &'a str {
        self.0
    }

    /// The value as `i64`, if the text is an integer in range.
    #[must_use]
    pub fn as_i64(self) -> Option<i64> {
        self.0.parse().ok()
    }

    /// The value as `u64`, if the text is a non-negative integer in range.
    #[must_use]
    pub fn as_u64(self) -> Option<u64> {
        self.0.parse().ok()
    }

    #[must_use]
    pub fn as_f64(self) -> Option<f64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for RawNumber<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A value as stored, without the members of containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value<'a> {
    Null,
    Bool(bool),
    Number(RawNumber<'a>),
    String(&'a str),
    Array,
    Object,
}

impl Value<'_> {
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Array => Kind::Array,
            Value::Object => Kind::Object,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Members {
    pub(crate) first: Option<usize>,
    last: Option<usize>,
    pub(crate) len: usize,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Member {
    pub(crate) key: Option<SymbolU32>,
    pub(crate) value: usize,
    pub(crate) next: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
enum Entry {
    Null,
    Bool(bool),
    Number(Span),
    String(Span),
    Array(Members),
    Object(Members),
}

impl Entry {
    fn members(&self) -> Option<&Members> {
        match self {
            Entry::Array(members) | Entry::Object(members) => Some(members),
            _ => None,
        }
    }

    fn members_mut(&mut self) -> Option<&mut Members> {
        match self {
            Entry::Array(members) | Entry::Object(members) => Some(members),
            _ => None,
        }
    }
}

/// Arena owning the values and interned keys of one or more documents.
pub struct Store {
    id: u64,
    /// Slot 0 is a placeholder so that no valid handle has index 0.
    entries: Vec<Entry>,
    members: Vec<Member>,
    text: String,
    keys: Keys,
}

impl Default for Store {
    fn default() -> Self {
        Store::new()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.id)
            .field("values", &self.len())
            .field("keys", &self.keys.len())
            .finish_non_exhaustive()
    }
}

impl Store {
    #[must_use]
    pub fn new() -> Store {
        Store {
            id: next_store_id(),
            entries: vec![Entry::Null],
            members: Vec::new(),
            text: String::new(),
            keys: Keys::default(),
        }
    }

    /// Process-unique identity of this store.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len() - 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all values and keys while keeping allocations.
    ///
    /// The store gets a new identity: every handle and key issued before the reset is rejected
    /// with [`StoreError::ForeignHandle`] afterwards.
    pub fn reset(&mut self) {
        self.id = next_store_id();
        self.entries.truncate(1);
        self.members.clear();
        self.text.clear();
        self.keys = Keys::default();
    }

    /// Append a value. Containers start out empty.
    pub fn put(&mut self, value: Value<'_>) -> Handle {
        let entry = match value {
            Value::Null => Entry::Null,
            Value::Bool(value) => Entry::Bool(value),
            Value::Number(number) => Entry::Number(self.push_text(number.as_str())),
            Value::String(text) => Entry::String(self.push_text(text)),
            Value::Array => Entry::Array(Members::default()),
            Value::Object => Entry::Object(Members::default()),
        };
        self.push(entry)
    }

    pub fn put_str(&mut self, text: &str) -> Handle {
        self.put(Value::String(text))
    }

    pub fn put_i64(&mut self, value: i64) -> Handle {
        let mut buffer = itoa::Buffer::new();
        self.put_raw_number(buffer.format(value))
    }

    pub fn put_u64(&mut self, value: u64) -> Handle {
        let mut buffer = itoa::Buffer::new();
        self.put_raw_number(buffer.format(value))
    }

    /// Append a freshly rendered float. JSON has no NaN or infinities, those become `null`.
    pub fn put_f64(&mut self, value: f64) -> Handle {
        if value.is_finite() {
            self.put_raw_number(&value.to_string())
        } else {
            self.put(Value::Null)
        }
    }

    /// Number text that the lexer already validated.
    pub(crate) fn put_raw_number(&mut self, text: &str) -> Handle {
        let span = self.push_text(text);
        self.push(Entry::Number(span))
    }

    /// # Errors
    ///
    /// Fails if the handle was not issued by this store.
    pub fn get(&self, handle: Handle) -> Result<Value<'_>, StoreError> {
        let index = self.index(handle)?;
        Ok(self.value(index))
    }

    /// A read-only view of the value behind `handle`.
    ///
    /// # Errors
    ///
    /// Fails if the handle was not issued by this store.
    pub fn node(&self, handle: Handle) -> Result<Node<'_>, StoreError> {
        let index = self.index(handle)?;
        Ok(Node::new(self, index))
    }

    /// Append `child` to the array `array`.
    ///
    /// The same child may be appended to several containers.
    ///
    /// # Errors
    ///
    /// Fails on foreign handles, if `array` is not an array, or if `child` contains `array`.
    pub fn extend(&mut self, array: Handle, child: Handle) -> Result<(), StoreError> {
        let container = self.index(array)?;
        let child = self.index(child)?;
        if !matches!(self.entries[container], Entry::Array(_)) {
            return Err(StoreError::NotAnArray);
        }
        self.check_acyclic(container, child)?;
        self.append_member(container, None, child);
        Ok(())
    }

    /// Append the member `key: child` to the object `object`.
    ///
    /// # Errors
    ///
    /// Fails on foreign handles or keys, if `object` is not an object, or if `child` contains
    /// `object`.
    pub fn extend_pair(
        &mut self,
        object: Handle,
        key: InternedKey,
        child: Handle,
    ) -> Result<(), StoreError> {
        let container = self.index(object)?;
        let child = self.index(child)?;
        self.check_key(key)?;
        if !matches!(self.entries[container], Entry::Object(_)) {
            return Err(StoreError::NotAnObject);
        }
        self.check_acyclic(container, child)?;
        self.append_member(container, Some(key.symbol), child);
        Ok(())
    }

    /// The canonical key for `text`, interning it on first use.
    pub fn intern(&mut self, text: &str) -> InternedKey {
        InternedKey {
            store: self.id,
            symbol: self.keys.intern(text),
        }
    }

    /// The canonical key for `text` if it was interned before.
    #[must_use]
    pub fn lookup_key(&self, text: &str) -> Option<InternedKey> {
        self.keys.lookup(text).map(|symbol| InternedKey {
            store: self.id,
            symbol,
        })
    }

    /// # Errors
    ///
    /// Fails if the key was not interned by this store.
    pub fn key_str(&self, key: InternedKey) -> Result<&str, StoreError> {
        self.check_key(key)?;
        self.keys
            .resolve(key.symbol)
            .ok_or(StoreError::InvalidHandle)
    }

    /// # Errors
    ///
    /// Fails if the key was not interned by this store.
    pub fn key_class(&self, key: InternedKey) -> Result<KeyClass, StoreError> {
        self.check_key(key)?;
        self.keys
            .class(key.symbol)
            .ok_or(StoreError::InvalidHandle)
    }

    fn index(&self, handle: Handle) -> Result<usize, StoreError> {
        if handle.is_none() {
            Err(StoreError::InvalidHandle)
        } else if handle.store != self.id {
            Err(StoreError::ForeignHandle)
        } else if handle.index >= self.entries.len() {
            Err(StoreError::InvalidHandle)
        } else {
            Ok(handle.index)
        }
    }

    fn check_key(&self, key: InternedKey) -> Result<(), StoreError> {
        if key.store == self.id {
            Ok(())
        } else {
            Err(StoreError::ForeignHandle)
        }
    }

    fn push(&mut self, entry: Entry) -> Handle {
        let index = self.entries.len();
        self.entries.push(entry);
        self.handle(index)
    }

    fn push_text(&mut self, text: &str) -> Span {
        let start = self.text.len();
        self.text.push_str(text);
        Span {
            start,
            end: self.text.len(),
        }
    }

    fn text_at(&self, span: Span) -> &str {
        self.text.get(span.start..span.end).unwrap_or_default()
    }

    fn check_acyclic(&self, container: usize, child: usize) -> Result<(), StoreError> {
        let mut pending = vec![child];
        let mut seen = AHashSet::new();
        while let Some(index) = pending.pop() {
            if index == container {
                return Err(StoreError::Cycle);
            }
            if !seen.insert(index) {
                continue;
            }
            if let Some(members) = self.entries[index].members() {
                let mut cursor = members.first;
                while let Some(position) = cursor {
                    let member = &self.members[position];
                    pending.push(member.value);
                    cursor = member.next;
                }
            }
        }
        Ok(())
    }

    /// Link a new member slot at the end of a container. `container` must be an array or
    /// object index of this store.
    pub(crate) fn append_member(
        &mut self,
        container: usize,
        key: Option<SymbolU32>,
        value: usize,
    ) {
        let position = self.members.len();
        let Some(members) = self.entries[container].members_mut() else {
            return;
        };
        let previous = members.last.replace(position);
        if previous.is_none() {
            members.first = Some(position);
        }
        members.len += 1;
        self.members.push(Member {
            key,
            value,
            next: None,
        });
        if let Some(previous) = previous {
            self.members[previous].next = Some(position);
        }
    }

    pub(crate) fn handle(&self, index: usize) -> Handle {
        Handle {
            store: self.id,
            index,
        }
    }

    pub(crate) fn kind_at(&self, index: usize) -> Kind {
        match self.entries[index] {
            Entry::Null => Kind::Null,
            Entry::Bool(_) => Kind::Bool,
            Entry::Number(_) => Kind::Number,
            Entry::String(_) => Kind::String,
            Entry::Array(_) => Kind::Array,
            Entry::Object(_) => Kind::Object,
        }
    }

    pub(crate) fn value(&self, index: usize) -> Value<'_> {
        match self.entries[index] {
            Entry::Null => Value::Null,
            Entry::Bool(value) => Value::Bool(value),
            Entry::Number(span) => Value::Number(RawNumber::new_unchecked(self.text_at(span))),
            Entry::String(span) => Value::String(self.text_at(span)),
            Entry::Array(_) => Value::Array,
            Entry::Object(_) => Value::Object,
        }
    }

    pub(crate) fn members_of(&self, index: usize) -> Option<Members> {
        self.entries[index].members().copied()
    }

    pub(crate) fn member(&self, position: usize) -> &Member {
        &self.members[position]
    }

    pub(crate) fn key_at(&self, symbol: SymbolU32) -> &str {
        self.keys.resolve(symbol).unwrap_or_default()
    }

    pub(crate) fn intern_symbol(&mut self, text: &str) -> SymbolU32 {
        self.keys.intern(text)
    }

    pub(crate) fn lookup_symbol(&self, text: &str) -> Option<SymbolU32> {
        self.keys.lookup(text)
    }
}
