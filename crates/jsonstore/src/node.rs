//! Read-only views into a [`Store`].
use core::fmt;
use std::borrow::Cow;

use jsonlike::{JsonLike, Kind};
use string_interner::symbol::SymbolU32;

use crate::{
    codec,
    store::{Handle, InternedKey, Member, RawNumber, Store, Value},
};

/// A value inside a [`Store`].
///
/// Nodes are `Copy` and borrow their store. Kind predicates are total; typed accessors return
/// `None` when the node is of a different kind.
#[derive(Clone, Copy)]
pub struct Node<'s> {
    store: &'s Store,
    index: usize,
}

impl<'s> Node<'s> {
    pub(crate) fn new(store: &'s Store, index: usize) -> Node<'s> {
        Node { store, index }
    }

    #[must_use]
    pub fn handle(self) -> Handle {
        self.store.handle(self.index)
    }

    #[must_use]
    pub fn store(self) -> &'s Store {
        self.store
    }

    #[must_use]
    pub fn kind(self) -> Kind {
        self.store.kind_at(self.index)
    }

    #[must_use]
    pub fn value(self) -> Value<'s> {
        self.store.value(self.index)
    }

    #[must_use]
    pub fn is_null(self) -> bool {
        self.kind() == Kind::Null
    }
    #[must_use]
    pub fn is_bool(self) -> bool {
        self.kind() == Kind::Bool
    }
    #[must_use]
    pub fn is_number(self) -> bool {
        self.kind() == Kind::Number
    }
    #[must_use]
    pub fn is_string(self) -> bool {
        self.kind() == Kind::String
    }
    #[must_use]
    pub fn is_array(self) -> bool {
        self.kind() == Kind::Array
    }
    #[must_use]
    pub fn is_object(self) -> bool {
        self.kind() == Kind::Object
    }

    #[must_use]
    pub fn as_str(self) -> Option<&'s str> {
        match self.value() {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_number(self) -> Option<RawNumber<'s>> {
        match self.value() {
            Value::Number(number) => Some(number),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(self) -> Option<bool> {
        match self.value() {
            Value::Bool(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(self) -> Option<i64> {
        self.as_number()?.as_i64()
    }

    #[must_use]
    pub fn as_u64(self) -> Option<u64> {
        self.as_number()?.as_u64()
    }

    #[must_use]
    pub fn as_f64(self) -> Option<f64> {
        self.as_number()?.as_f64()
    }

    /// Number of members of an array or object, zero for scalars.
    #[must_use]
    pub fn len(self) -> usize {
        self.store
            .members_of(self.index)
            .map_or(0, |members| members.len)
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Array elements in insertion order.
    #[must_use]
    pub fn elements(self) -> Option<Elements<'s>> {
        if !self.is_array() {
            return None;
        }
        Some(Elements {
            cursor: Cursor::new(self.store, self.index),
        })
    }

    /// Object members in insertion order.
    #[must_use]
    pub fn pairs(self) -> Option<Pairs<'s>> {
        if !self.is_object() {
            return None;
        }
        Some(Pairs {
            cursor: Cursor::new(self.store, self.index),
        })
    }

    /// The first member named `key`.
    #[must_use]
    pub fn get(self, key: &str) -> Option<Node<'s>> {
        // A key that was never interned cannot be a member
        let symbol = self.store.lookup_symbol(key)?;
        self.find(|member_key| member_key == symbol)
    }

    /// The first member with the given interned key.
    #[must_use]
    pub fn get_interned(self, key: InternedKey) -> Option<Node<'s>> {
        if key.store != self.store.id() {
            return None;
        }
        self.find(|member_key| member_key == key.symbol)
    }

    /// The array element at `index`.
    #[must_use]
    pub fn get_index(self, index: usize) -> Option<Node<'s>> {
        self.elements()?.nth(index)
    }

    /// Resolve an RFC 6901 JSON pointer relative to this node.
    #[must_use]
    pub fn pointer(self, pointer: &str) -> Option<Node<'s>> {
        if pointer.is_empty() {
            return Some(self);
        }
        let mut target = self;
        for token in pointer.strip_prefix('/')?.split('/') {
            let token = unescape_token(token);
            target = match target.kind() {
                Kind::Object => target.get(&token)?,
                Kind::Array => target.get_index(parse_index(&token)?)?,
                _ => return None,
            };
        }
        Some(target)
    }

    fn find(self, matches: impl Fn(SymbolU32) -> bool) -> Option<Node<'s>> {
        if !self.is_object() {
            return None;
        }
        let mut cursor = Cursor::new(self.store, self.index);
        while let Some(member) = cursor.advance() {
            if member.key.is_some_and(&matches) {
                return Some(Node::new(self.store, member.value));
            }
        }
        None
    }
}

fn unescape_token(token: &str) -> Cow<'_, str> {
    if token.contains('~') {
        Cow::Owned(token.replace("~1", "/").replace("~0", "~"))
    } else {
        Cow::Borrowed(token)
    }
}

fn parse_index(token: &str) -> Option<usize> {
    if token.starts_with('+') || (token.starts_with('0') && token.len() > 1) {
        return None;
    }
    token.parse().ok()
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("handle", &self.handle())
            .field("kind", &self.kind())
            .finish()
    }
}

impl fmt::Display for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        codec::display(*self, f)
    }
}

/// Walks the member slots of one container.
#[derive(Clone)]
struct Cursor<'s> {
    store: &'s Store,
    next: Option<usize>,
    remaining: usize,
}

impl<'s> Cursor<'s> {
    fn new(store: &'s Store, index: usize) -> Cursor<'s> {
        let members = store.members_of(index).unwrap_or_default();
        Cursor {
            store,
            next: members.first,
            remaining: members.len,
        }
    }

    fn advance(&mut self) -> Option<&'s Member> {
        let member = self.store.member(self.next?);
        self.next = member.next;
        self.remaining -= 1;
        Some(member)
    }
}

/// Lazy iterator over array elements. Clone it to restart from the current position.
#[derive(Clone)]
pub struct Elements<'s> {
    cursor: Cursor<'s>,
}

impl<'s> Iterator for Elements<'s> {
    type Item = Node<'s>;

    fn next(&mut self) -> Option<Node<'s>> {
        let member = self.cursor.advance()?;
        Some(Node::new(self.cursor.store, member.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.cursor.remaining, Some(self.cursor.remaining))
    }
}

impl ExactSizeIterator for Elements<'_> {}

/// Lazy iterator over object members as `(key, value)`.
#[derive(Clone)]
pub struct Pairs<'s> {
    cursor: Cursor<'s>,
}

impl<'s> Iterator for Pairs<'s> {
    type Item = (InternedKey, Node<'s>);

    fn next(&mut self) -> Option<Self::Item> {
        let member = self.cursor.advance()?;
        let key = InternedKey {
            store: self.cursor.store.id(),
            symbol: member.key?,
        };
        Some((key, Node::new(self.cursor.store, member.value)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.cursor.remaining, Some(self.cursor.remaining))
    }
}

impl ExactSizeIterator for Pairs<'_> {}

/// Object members with their keys resolved to text.
#[derive(Clone)]
pub struct NamedPairs<'s> {
    pairs: Pairs<'s>,
}

impl<'s> Iterator for NamedPairs<'s> {
    type Item = (&'s str, Node<'s>);

    fn next(&mut self) -> Option<Self::Item> {
        let store = self.pairs.cursor.store;
        let (key, node) = self.pairs.next()?;
        Some((store.key_at(key.symbol), node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.pairs.size_hint()
    }
}

impl ExactSizeIterator for NamedPairs<'_> {}

impl<'s> JsonLike<'s> for Node<'s> {
    type Elements = Elements<'s>;
    type Pairs = NamedPairs<'s>;

    fn kind(self) -> Kind {
        Node::kind(self)
    }

    fn as_str(self) -> Option<&'s str> {
        Node::as_str(self)
    }

    fn as_number(self) -> Option<Cow<'s, str>> {
        Node::as_number(self).map(|number| Cow::Borrowed(number.as_str()))
    }

    fn as_bool(self) -> Option<bool> {
        Node::as_bool(self)
    }

    fn elements(self) -> Option<Elements<'s>> {
        Node::elements(self)
    }

    fn pairs(self) -> Option<NamedPairs<'s>> {
        Some(NamedPairs {
            pairs: Node::pairs(self)?,
        })
    }

    fn get(self, key: &str) -> Option<Node<'s>> {
        Node::get(self, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use std::sync::Arc;
    use test_case::test_case;

    fn build(input: &str) -> Arc<Store> {
        let mut builder = Builder::new();
        builder.decode_str(input).expect("Valid JSON");
        builder.into_shared()
    }

    fn root(store: &Store) -> Node<'_> {
        // The first value a decode appends is the root
        store
            .node(store.handle(1))
            .expect("Store has a root value")
    }

    #[test]
    fn kind_predicates_are_total() {
        let store = build(r#"[null, true, 1, "s", [], {}]"#);
        let node = root(&store);
        let kinds: Vec<_> = node
            .elements()
            .expect("Array")
            .map(|element| {
                [
                    element.is_null(),
                    element.is_bool(),
                    element.is_number(),
                    element.is_string(),
                    element.is_array(),
                    element.is_object(),
                ]
                .iter()
                .filter(|flag| **flag)
                .count()
            })
            .collect();
        assert_eq!(kinds, [1, 1, 1, 1, 1, 1]);
    }

    #[test]
    fn accessors_return_none_on_mismatch() {
        let store = build(r#"{"n": 1, "s": "text", "b": false}"#);
        let node = root(&store);
        let number = node.get("n").expect("Member exists");
        let string = node.get("s").expect("Member exists");
        let boolean = node.get("b").expect("Member exists");
        assert_eq!(number.as_str(), None);
        assert_eq!(number.as_bool(), None);
        assert_eq!(string.as_number(), None);
        assert_eq!(string.as_i64(), None);
        assert_eq!(boolean.as_str(), None);
        assert!(node.as_str().is_none());
        assert!(node.elements().is_none());
        assert!(string.pairs().is_none());
        assert_eq!(number.as_i64(), Some(1));
        assert_eq!(string.as_str(), Some("text"));
        assert_eq!(boolean.as_bool(), Some(false));
    }

    #[test]
    fn pairs_are_lazy_and_restartable() {
        let store = build(r#"{"x": 1, "y": 2, "x2": 3}"#);
        let node = root(&store);
        let mut pairs = node.pairs().expect("Object");
        assert_eq!(pairs.len(), 3);
        let (first, _) = pairs.next().expect("Has members");
        assert_eq!(store.key_str(first), Ok("x"));
        let rest = pairs.clone();
        let names = |pairs: Pairs<'_>| -> Vec<String> {
            pairs
                .map(|(key, _)| store.key_str(key).expect("Own key").to_string())
                .collect()
        };
        assert_eq!(names(pairs), ["y", "x2"]);
        assert_eq!(names(rest), ["y", "x2"]);
        assert_eq!(names(node.pairs().expect("Object")), ["x", "y", "x2"]);
    }

    #[test]
    fn lookups() {
        let store = build(r#"{"a": [10, 20, {"b/c": "x", "d~e": "y"}], "a": "dup"}"#);
        let node = root(&store);
        assert_eq!(node.len(), 2);
        assert!(node.get("missing").is_none());
        assert!(node.get("a").is_some_and(|node| node.is_array()));
        let key = store.lookup_key("a").expect("Interned");
        assert_eq!(node.get_interned(key).map(|node| node.len()), Some(3));
        let array = node.get("a").expect("Member exists");
        assert_eq!(array.get_index(1).and_then(|node| node.as_u64()), Some(20));
        assert!(array.get_index(3).is_none());
    }

    #[test_case("", Some("{\"a\":[10,{\"b/c\":\"x\",\"d~e\":\"y\"}]}"))]
    #[test_case("/a/0", Some("10"))]
    #[test_case("/a/1/b~1c", Some("\"x\""))]
    #[test_case("/a/1/d~0e", Some("\"y\""))]
    #[test_case("/a/01", None)]
    #[test_case("/a/2", None)]
    #[test_case("/a/0/x", None)]
    #[test_case("a", None)]
    fn pointers(pointer: &str, expected: Option<&str>) {
        let store = build(r#"{"a": [10, {"b/c": "x", "d~e": "y"}]}"#);
        let node = root(&store);
        assert_eq!(
            node.pointer(pointer).map(|node| node.to_string()),
            expected.map(str::to_string)
        );
    }

    #[test]
    fn interned_key_from_other_store() {
        let store = build(r#"{"a": 1}"#);
        let mut other = Store::new();
        let key = other.intern("a");
        assert!(root(&store).get_interned(key).is_none());
    }

    #[test]
    fn json_like_view() {
        let store = build(r#"{"a": 1.50, "b": ["x"]}"#);
        let node = root(&store);
        assert_eq!(JsonLike::kind(node), Kind::Object);
        let pairs: Vec<_> = JsonLike::pairs(node)
            .expect("Object")
            .map(|(key, value)| (key, value.kind()))
            .collect();
        assert_eq!(pairs, [("a", Kind::Number), ("b", Kind::Array)]);
        let number = JsonLike::get(node, "a").expect("Member exists");
        assert_eq!(JsonLike::as_number(number).as_deref(), Some("1.50"));
    }
}
