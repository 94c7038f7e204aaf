use std::borrow::Cow;

use serde_json::{map, Value};

use crate::{JsonLike, Kind};

type PairsIter<'a> =
    core::iter::Map<map::Iter<'a>, fn((&'a String, &'a Value)) -> (&'a str, &'a Value)>;

impl<'a> JsonLike<'a> for &'a Value {
    type Elements = core::slice::Iter<'a, Value>;
    type Pairs = PairsIter<'a>;

    fn kind(self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
        }
    }

    fn as_str(self) -> Option<&'a str> {
        Value::as_str(self)
    }

    fn as_number(self) -> Option<Cow<'a, str>> {
        match self {
            Value::Number(number) => Some(Cow::Owned(number.to_string())),
            _ => None,
        }
    }

    fn as_bool(self) -> Option<bool> {
        Value::as_bool(self)
    }

    fn elements(self) -> Option<Self::Elements> {
        self.as_array().map(|items| items.iter())
    }

    fn pairs(self) -> Option<Self::Pairs> {
        self.as_object()
            .map(|object| object.iter().map(as_pair as fn(_) -> _))
    }

    fn get(self, key: &str) -> Option<Self> {
        self.as_object()?.get(key)
    }
}

fn as_pair<'a>((key, value): (&'a String, &'a Value)) -> (&'a str, &'a Value) {
    (key.as_str(), value)
}

#[cfg(test)]
mod tests {
    use crate::{equal, JsonLike, Kind};
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!(null), Kind::Null)]
    #[test_case(&json!(false), Kind::Bool)]
    #[test_case(&json!(1.5), Kind::Number)]
    #[test_case(&json!("a"), Kind::String)]
    #[test_case(&json!([]), Kind::Array)]
    #[test_case(&json!({}), Kind::Object)]
    fn kinds(value: &Value, expected: Kind) {
        assert_eq!(JsonLike::kind(value), expected);
    }

    #[test]
    fn accessors_return_none_on_mismatch() {
        let value = json!(42);
        assert_eq!(JsonLike::as_str(&value), None);
        assert_eq!(JsonLike::as_bool(&value), None);
        assert!(JsonLike::elements(&value).is_none());
        assert!(JsonLike::pairs(&value).is_none());
        assert_eq!(JsonLike::as_number(&value).as_deref(), Some("42"));
    }

    #[test]
    fn pairs_are_exact_size() {
        let value = json!({"a": 1, "b": 2});
        let pairs = JsonLike::pairs(&value).expect("Object");
        assert_eq!(pairs.len(), 2);
    }

    #[test_case(&json!({"a": [1, 2], "b": "fred"}), &json!({"b": "fred", "a": [1, 2]}), true; "member order is ignored")]
    #[test_case(&json!([1, 2]), &json!([2, 1]), false; "element order matters")]
    #[test_case(&json!({"a": 1}), &json!({"a": 1, "b": 2}), false; "different sizes")]
    #[test_case(&json!(1.0), &json!(1), true; "numbers by value")]
    #[test_case(&json!("1"), &json!(1), false; "different kinds")]
    fn structural_equality(left: &Value, right: &Value, expected: bool) {
        assert_eq!(equal(left, right), expected);
    }
}
