use serde::de::{self, value::BorrowedStrDeserializer, DeserializeSeed, Deserializer, Visitor};

use jsonlike::{JsonLike, Kind};

use super::MAX_DEPTH;
use crate::{
    error::{DecodeError, NodeError},
    node::{Elements, NamedPairs, Node},
    store::Value,
};

/// Deserializing recurses once per container level. Input nested deeper than 128 levels fails
/// with [`NodeError::TooDeep`].
impl<'de> Deserializer<'de> for Node<'de> {
    type Error = DecodeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        Bounded::new(self).deserialize_any(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        Bounded::new(self).deserialize_option(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        Bounded::new(self).deserialize_newtype_struct(name, visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        Bounded::new(self).deserialize_enum(name, variants, visitor)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier ignored_any
    }
}

/// A node together with the number of container levels it may still open.
#[derive(Clone, Copy)]
struct Bounded<'de> {
    node: Node<'de>,
    remaining: usize,
}

impl<'de> Bounded<'de> {
    fn new(node: Node<'de>) -> Bounded<'de> {
        Bounded {
            node,
            remaining: MAX_DEPTH,
        }
    }

    /// Depth budget for the children of this node.
    fn descend(self) -> Result<usize, DecodeError> {
        self.remaining.checked_sub(1).ok_or_else(|| {
            NodeError::TooDeep { limit: MAX_DEPTH }.into()
        })
    }

    fn seq(self) -> Result<SeqAccess<'de>, DecodeError> {
        let remaining = self.descend()?;
        match self.node.elements() {
            Some(elements) => Ok(SeqAccess {
                elements,
                remaining,
            }),
            None => Err(mismatch(Kind::Array, self.node)),
        }
    }

    fn map(self) -> Result<MapAccess<'de>, DecodeError> {
        let remaining = self.descend()?;
        match JsonLike::pairs(self.node) {
            Some(pairs) => Ok(MapAccess {
                pairs,
                value: None,
                remaining,
            }),
            None => Err(mismatch(Kind::Object, self.node)),
        }
    }
}

impl<'de> Deserializer<'de> for Bounded<'de> {
    type Error = DecodeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.node.value() {
            Value::Null => visitor.visit_unit(),
            Value::Bool(value) => visitor.visit_bool(value),
            Value::Number(number) => {
                if let Some(value) = number.as_u64() {
                    visitor.visit_u64(value)
                } else if let Some(value) = number.as_i64() {
                    visitor.visit_i64(value)
                } else if let Some(value) = number.as_f64().filter(|value| value.is_finite()) {
                    visitor.visit_f64(value)
                } else {
                    Err(de::Error::custom(format_args!(
                        "number {number} is out of range"
                    )))
                }
            }
            Value::String(text) => visitor.visit_borrowed_str(text),
            Value::Array => visitor.visit_seq(self.seq()?),
            Value::Object => visitor.visit_map(self.map()?),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        if self.node.is_null() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        match self.node.value() {
            Value::String(text) => {
                visitor.visit_enum(BorrowedStrDeserializer::<DecodeError>::new(text))
            }
            Value::Object => {
                let mut members = self.map()?;
                match (members.pairs.next(), members.pairs.next()) {
                    (Some((variant, node)), None) => visitor.visit_enum(EnumAccess {
                        variant,
                        value: Bounded {
                            node,
                            remaining: members.remaining,
                        },
                    }),
                    _ => Err(de::Error::custom(
                        "expected an object with a single key for an enum",
                    )),
                }
            }
            _ => Err(mismatch(Kind::Object, self.node)),
        }
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier ignored_any
    }
}

fn mismatch(expected: Kind, node: Node<'_>) -> DecodeError {
    NodeError::TypeMismatch {
        expected,
        found: node.kind(),
    }
    .into()
}

struct SeqAccess<'de> {
    elements: Elements<'de>,
    remaining: usize,
}

impl<'de> de::SeqAccess<'de> for SeqAccess<'de> {
    type Error = DecodeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, DecodeError> {
        let remaining = self.remaining;
        self.elements
            .next()
            .map(|node| seed.deserialize(Bounded { node, remaining }))
            .transpose()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.elements.len())
    }
}

struct MapAccess<'de> {
    pairs: NamedPairs<'de>,
    value: Option<Node<'de>>,
    remaining: usize,
}

impl<'de> de::MapAccess<'de> for MapAccess<'de> {
    type Error = DecodeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, DecodeError> {
        match self.pairs.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(BorrowedStrDeserializer::<DecodeError>::new(key))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, DecodeError> {
        match self.value.take() {
            Some(node) => seed.deserialize(Bounded {
                node,
                remaining: self.remaining,
            }),
            None => Err(de::Error::custom("value requested before its key")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.pairs.len())
    }
}

struct EnumAccess<'de> {
    variant: &'de str,
    value: Bounded<'de>,
}

impl<'de> de::EnumAccess<'de> for EnumAccess<'de> {
    type Error = DecodeError;
    type Variant = VariantAccess<'de>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, VariantAccess<'de>), DecodeError> {
        let variant = seed.deserialize(BorrowedStrDeserializer::<DecodeError>::new(self.variant))?;
        Ok((variant, VariantAccess { value: self.value }))
    }
}

struct VariantAccess<'de> {
    value: Bounded<'de>,
}

impl<'de> de::VariantAccess<'de> for VariantAccess<'de> {
    type Error = DecodeError;

    fn unit_variant(self) -> Result<(), DecodeError> {
        de::Deserialize::deserialize(self.value)
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<T::Value, DecodeError> {
        seed.deserialize(self.value)
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        match self.value.node.value() {
            Value::Array => visitor.visit_seq(self.value.seq()?),
            _ => Err(mismatch(Kind::Array, self.value.node)),
        }
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        match self.value.node.value() {
            Value::Object => visitor.visit_map(self.value.map()?),
            _ => Err(mismatch(Kind::Object, self.value.node)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::{de::IgnoredAny, Deserialize};
    use test_case::test_case;

    use crate::{
        codec::{from_slice, MAX_DEPTH},
        document::Document,
        error::{DecodeError, NodeError},
        Kind,
    };

    #[derive(Debug, Deserialize, PartialEq)]
    enum Shape {
        Point,
        Circle(f64),
        Segment(i32, i32),
        Rect { width: u32, height: u32 },
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Scene<'a> {
        title: &'a str,
        shapes: Vec<Shape>,
        note: Option<String>,
    }

    fn document(input: &str) -> Document {
        Document::unmarshal_binary(input.as_bytes()).expect("Valid JSON")
    }

    #[test]
    fn borrows_strings_from_the_store() {
        let document = document(
            r#"{"title": "demo", "note": null, "shapes": ["Point", {"Circle": 1.5}, {"Segment": [1, -2]}, {"Rect": {"width": 3, "height": 4}}]}"#,
        );
        let scene = Scene::deserialize(document.root().expect("Not empty")).expect("Valid scene");
        assert_eq!(
            scene,
            Scene {
                title: "demo",
                shapes: vec![
                    Shape::Point,
                    Shape::Circle(1.5),
                    Shape::Segment(1, -2),
                    Shape::Rect {
                        width: 3,
                        height: 4
                    },
                ],
                note: None,
            }
        );
    }

    #[test]
    fn maps_keep_every_member() {
        let document = document(r#"{"b": 2, "a": 1}"#);
        let map =
            BTreeMap::<String, u8>::deserialize(document.root().expect("Not empty")).expect("Map");
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], 1);
        assert_eq!(map["b"], 2);
    }

    #[test_case("[1]")]
    #[test_case("3")]
    #[test_case("null")]
    fn enums_need_a_string_or_an_object(input: &str) {
        let document = document(input);
        let error = Shape::deserialize(document.root().expect("Not empty")).expect_err("Not an enum");
        assert!(matches!(
            error,
            DecodeError::Node(NodeError::TypeMismatch {
                expected: Kind::Object,
                ..
            })
        ));
    }

    #[test]
    fn enum_objects_need_exactly_one_key() {
        let document = document(r#"{"Circle": 1, "Point": null}"#);
        let error = Shape::deserialize(document.root().expect("Not empty")).expect_err("Two keys");
        assert!(error.is_node_error());
    }

    #[test]
    fn numbers_pick_the_narrowest_visitor() {
        let document = document("[18446744073709551615, -9223372036854775808, 2.5]");
        let values =
            <(u64, i64, f64)>::deserialize(document.root().expect("Not empty")).expect("Numbers");
        assert_eq!(values, (u64::MAX, i64::MIN, 2.5));
    }

    fn nested(depth: usize) -> String {
        format!("{}{}", "[".repeat(depth), "]".repeat(depth))
    }

    #[test]
    fn nesting_up_to_the_limit() {
        let arrays = document(&nested(MAX_DEPTH));
        assert!(IgnoredAny::deserialize(arrays.root().expect("Not empty")).is_ok());
        let objects = document(&format!(
            "{}1{}",
            r#"{"a":"#.repeat(MAX_DEPTH),
            "}".repeat(MAX_DEPTH)
        ));
        assert!(IgnoredAny::deserialize(objects.root().expect("Not empty")).is_ok());
    }

    #[test_case(MAX_DEPTH + 1)]
    #[test_case(200_000)]
    fn nesting_beyond_the_limit(depth: usize) {
        let error = from_slice::<IgnoredAny>(nested(depth).as_bytes()).expect_err("Too deep");
        assert_eq!(
            error,
            DecodeError::Node(NodeError::TooDeep { limit: MAX_DEPTH })
        );
    }

    #[test]
    fn nested_enums_count_towards_the_limit() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        enum Tree {
            Leaf,
            Node(Box<Tree>),
        }
        let tree = |depth: usize| {
            document(&format!(
                "{}\"Leaf\"{}",
                r#"{"Node":"#.repeat(depth),
                "}".repeat(depth)
            ))
        };
        let within = tree(MAX_DEPTH);
        assert!(Tree::deserialize(within.root().expect("Not empty")).is_ok());
        let beyond = tree(MAX_DEPTH + 1);
        let error = Tree::deserialize(beyond.root().expect("Not empty")).expect_err("Too deep");
        assert_eq!(
            error,
            DecodeError::Node(NodeError::TooDeep { limit: MAX_DEPTH })
        );
    }

    #[test]
    fn infinite_numbers_are_out_of_range() {
        let document = document("1e400");
        let error = f64::deserialize(document.root().expect("Not empty")).expect_err("Infinite");
        assert_eq!(error.to_string(), "number 1e400 is out of range");
    }
}
