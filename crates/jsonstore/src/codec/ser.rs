use serde::ser::{Error, Serialize, SerializeMap, SerializeSeq, Serializer};

use jsonlike::JsonLike;

use super::MAX_DEPTH;
use crate::{
    document::Document,
    node::Node,
    store::{RawNumber, Value},
};

/// Numbers go through the narrowest serde number type that holds them. Number text with no
/// exact counterpart, e.g. `1e400` or integers wider than 64 bits that `f64` rounds, is an
/// error. Input nested deeper than 128 levels is an error too.
impl Serialize for Node<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Bounded {
            node: *self,
            remaining: MAX_DEPTH,
        }
        .serialize(serializer)
    }
}

struct Bounded<'s> {
    node: Node<'s>,
    remaining: usize,
}

impl Bounded<'_> {
    fn descend<E: Error>(&self) -> Result<usize, E> {
        self.remaining.checked_sub(1).ok_or_else(|| {
            E::custom(format_args!(
                "nesting exceeds the limit of {MAX_DEPTH} levels"
            ))
        })
    }
}

impl Serialize for Bounded<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = self.node;
        match node.value() {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(value) => serializer.serialize_bool(value),
            Value::Number(number) => {
                if let Some(value) = number.as_u64() {
                    serializer.serialize_u64(value)
                } else if let Some(value) = number.as_i64() {
                    serializer.serialize_i64(value)
                } else if let Some(value) = exact_f64(number) {
                    serializer.serialize_f64(value)
                } else {
                    Err(S::Error::custom(format_args!(
                        "number {number} has no exact serde representation"
                    )))
                }
            }
            Value::String(text) => serializer.serialize_str(text),
            Value::Array => {
                let remaining = self.descend::<S::Error>()?;
                let mut seq = serializer.serialize_seq(Some(node.len()))?;
                for node in node.elements().into_iter().flatten() {
                    seq.serialize_element(&Bounded { node, remaining })?;
                }
                seq.end()
            }
            Value::Object => {
                let remaining = self.descend::<S::Error>()?;
                let mut map = serializer.serialize_map(Some(node.len()))?;
                for (key, node) in JsonLike::pairs(node).into_iter().flatten() {
                    map.serialize_entry(key, &Bounded { node, remaining })?;
                }
                map.end()
            }
        }
    }
}

/// The `f64` for finite number text. Integer text must convert without rounding.
fn exact_f64(number: RawNumber<'_>) -> Option<f64> {
    let value = number.as_f64().filter(|value| value.is_finite())?;
    let text = number.as_str();
    if text.contains(['.', 'e', 'E']) {
        return Some(value);
    }
    (format!("{:.0}", value.abs()) == text.trim_start_matches('-')).then_some(value)
}

/// An empty document serializes as a unit.
impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.root() {
            Some(node) => node.serialize(serializer),
            None => serializer.serialize_unit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{codec::MAX_DEPTH, document::Document};
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn serialize_through_serde_json() {
        let document = Document::unmarshal_binary(
            br#"{"int": -3, "big": 18446744073709551615, "float": 0.5, "list": ["a", null, true]}"#,
        )
        .expect("Valid JSON");
        let value = serde_json::to_value(&document).expect("Serializes");
        assert_eq!(
            value,
            json!({"int": -3, "big": 18_446_744_073_709_551_615_u64, "float": 0.5, "list": ["a", null, true]})
        );
    }

    #[test]
    fn empty_document_is_null() {
        let value = serde_json::to_value(Document::default()).expect("Serializes");
        assert!(value.is_null());
    }

    #[test]
    fn wide_integers_that_fit_an_f64_exactly() {
        let document = Document::unmarshal_binary(b"[100000000000000000000, -0]").expect("Valid JSON");
        let value = serde_json::to_value(&document).expect("Serializes");
        assert_eq!(value, json!([1e20, 0]));
    }

    #[test_case("1e400"; "infinite")]
    #[test_case("-1E+400"; "negative infinite")]
    #[test_case("123456789012345678901234567890"; "rounded integer")]
    fn inexact_numbers_are_errors(input: &str) {
        let document = Document::unmarshal_binary(format!("[{input}]").as_bytes()).expect("Valid JSON");
        let error = serde_json::to_string(&document).expect_err("Inexact");
        assert_eq!(
            error.to_string(),
            format!("number {input} has no exact serde representation")
        );
        assert_eq!(document.to_string(), format!("[{input}]"));
    }

    #[test]
    fn nesting_is_limited() {
        let within = nested(MAX_DEPTH);
        let document = Document::unmarshal_binary(within.as_bytes()).expect("Valid JSON");
        assert_eq!(serde_json::to_string(&document).expect("Serializes"), within);
        let document = Document::unmarshal_binary(nested(200_000).as_bytes()).expect("Valid JSON");
        let error = serde_json::to_vec(&document).expect_err("Too deep");
        assert_eq!(
            error.to_string(),
            format!("nesting exceeds the limit of {MAX_DEPTH} levels")
        );
    }

    fn nested(depth: usize) -> String {
        format!("{}{}", "[".repeat(depth), "]".repeat(depth))
    }
}
