//! # jsonlike
//!
//! A closed view over JSON values that is independent of how they are stored.
//!
//! Algorithms that only need to *read* JSON (structural comparison, copying a value into a
//! different representation, walking paths) are written once against [`JsonLike`] and work for
//! every representation implementing it, e.g. arena-backed nodes and `serde_json::Value`.
use core::fmt;
use std::borrow::Cow;

mod impls;

/// The six kinds of JSON values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl Kind {
    /// Lowercase name of the kind as used in error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Bool => "boolean",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Object => "object",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read access to a JSON value.
///
/// Implementors are cheap `Copy` views (a reference, or a handle paired with its storage).
/// Every accessor returns `None` when the value is of a different kind.
pub trait JsonLike<'a>: Copy {
    /// Elements of an array, in order.
    type Elements: ExactSizeIterator<Item = Self>;
    /// Members of an object, in their stored order.
    type Pairs: ExactSizeIterator<Item = (&'a str, Self)>;

    fn kind(self) -> Kind;
    fn as_str(self) -> Option<&'a str>;
    /// The textual representation of a number.
    ///
    /// Representations that keep the original text return it borrowed.
    fn as_number(self) -> Option<Cow<'a, str>>;
    fn as_bool(self) -> Option<bool>;
    fn elements(self) -> Option<Self::Elements>;
    fn pairs(self) -> Option<Self::Pairs>;

    /// Look up an object member by name.
    fn get(self, key: &str) -> Option<Self> {
        self.pairs()?
            .find_map(|(name, value)| (name == key).then_some(value))
    }
}

/// Structural JSON equality between two values of possibly different representations.
///
/// Object member order is ignored, array order is not. Repeated keys are matched by
/// occurrence: the n-th `"a"` on one side is compared with the n-th `"a"` on the other.
/// Numbers are equal when their text is identical or when they denote the same integer or the
/// same `f64`. Nesting depth is bounded only by memory.
pub fn equal<'a, 'b, L, R>(left: L, right: R) -> bool
where
    L: JsonLike<'a>,
    R: JsonLike<'b>,
{
    let mut stack = vec![(left, right)];
    while let Some((left, right)) = stack.pop() {
        if !shallow_equal(left, right, &mut stack) {
            return false;
        }
    }
    true
}

/// Compare scalars directly and queue the children of containers.
fn shallow_equal<'a, 'b, L, R>(left: L, right: R, stack: &mut Vec<(L, R)>) -> bool
where
    L: JsonLike<'a>,
    R: JsonLike<'b>,
{
    match (left.kind(), right.kind()) {
        (Kind::Null, Kind::Null) => true,
        (Kind::Bool, Kind::Bool) => left.as_bool() == right.as_bool(),
        (Kind::String, Kind::String) => left.as_str() == right.as_str(),
        (Kind::Number, Kind::Number) => match (left.as_number(), right.as_number()) {
            (Some(l), Some(r)) => numbers_equal(&l, &r),
            _ => false,
        },
        (Kind::Array, Kind::Array) => match (left.elements(), right.elements()) {
            (Some(l), Some(r)) if l.len() == r.len() => {
                stack.extend(l.zip(r));
                true
            }
            _ => false,
        },
        (Kind::Object, Kind::Object) => match (left.pairs(), right.pairs()) {
            (Some(l), Some(r)) if l.len() == r.len() => {
                let mut seen: Vec<&str> = Vec::with_capacity(l.len());
                for (key, lv) in l {
                    let occurrence = seen.iter().filter(|name| **name == key).count();
                    seen.push(key);
                    match nth_member(right, key, occurrence) {
                        Some(rv) => stack.push((lv, rv)),
                        None => return false,
                    }
                }
                true
            }
            _ => false,
        },
        _ => false,
    }
}

fn nth_member<'b, R: JsonLike<'b>>(object: R, key: &str, n: usize) -> Option<R> {
    object
        .pairs()?
        .filter(|(name, _)| *name == key)
        .nth(n)
        .map(|(_, value)| value)
}

/// Compare two JSON number literals by value.
#[must_use]
pub fn numbers_equal(left: &str, right: &str) -> bool {
    if left == right {
        return true;
    }
    if let (Ok(l), Ok(r)) = (left.parse::<i64>(), right.parse::<i64>()) {
        return l == r;
    }
    if let (Ok(l), Ok(r)) = (left.parse::<u64>(), right.parse::<u64>()) {
        return l == r;
    }
    match (left.parse::<f64>(), right.parse::<f64>()) {
        (Ok(l), Ok(r)) => l == r,
        _ => false,
    }
}
