use std::{io, sync::Arc, thread};

use jsonstore::{
    borrow_append_text, borrow_encode_bytes, Builder, DecodeError, Decoder, Document, Handle,
    Kind, LexErrorKind, Lexer, LexerOptions, MarshalBinary, Pools, SliceSource, Store, StoreError,
    Value,
};
use serde_json::json;
use test_case::test_case;

fn decode(input: &str) -> Document {
    Document::unmarshal_binary(input.as_bytes()).expect("Valid JSON")
}

fn encode(document: &Document) -> String {
    String::from_utf8(document.marshal_binary().expect("Encodes")).expect("Valid UTF-8")
}

#[test_case(" { \"a\" : [ 1 , 2.50 , -0 ] , \"b\" : null } ", r#"{"a":[1,2.50,-0],"b":null}"#; "whitespace")]
#[test_case(r#""A\né""#, "\"A\\n\u{e9}\""; "escapes are normalized")]
#[test_case("[]", "[]"; "empty array")]
#[test_case("{}", "{}"; "empty object")]
#[test_case("[[],{},[{}]]", "[[],{},[{}]]"; "nested empties")]
#[test_case("1E+400", "1E+400"; "huge exponent")]
#[test_case("123456789012345678901234567890", "123456789012345678901234567890"; "wide integer")]
#[test_case(r#"{"x":1,"y":2,"x2":3}"#, r#"{"x":1,"y":2,"x2":3}"#; "key order")]
#[test_case(r#"{"a":1,"a":2}"#, r#"{"a":1,"a":2}"#; "duplicate keys")]
fn compact_round_trip(input: &str, expected: &str) {
    let first = encode(&decode(input));
    assert_eq!(first, expected);
    assert_eq!(encode(&decode(&first)), first);
}

#[test]
fn round_trip_preserves_meaning() {
    let value = json!({
        "id": 42,
        "name": "line\nbreak \"quoted\" \u{1F600}",
        "ratio": -0.125,
        "flags": [true, false, null],
        "nested": {"empty": {}, "list": [[1], [2, [3]]]}
    });
    let raw = serde_json::to_vec(&value).expect("Serializable");
    let encoded = decode(std::str::from_utf8(&raw).expect("Valid UTF-8"))
        .marshal_binary()
        .expect("Encodes");
    let reparsed: serde_json::Value = serde_json::from_slice(&encoded).expect("Valid JSON");
    assert_eq!(reparsed, value);
}

#[test]
fn duplicate_keys_resolve_to_the_first_member() {
    let document = decode(r#"{"a":1,"a":2}"#);
    let root = document.root().expect("Not empty");
    assert_eq!(root.len(), 2);
    assert_eq!(root.get("a").and_then(|node| node.as_i64()), Some(1));
}

#[test]
fn key_order_survives_lookups() {
    let document = decode(r#"{"x":1,"y":2,"x2":3}"#);
    let root = document.root().expect("Not empty");
    let keys: Vec<_> = root
        .pairs()
        .expect("Object")
        .map(|(key, _)| root.store().key_str(key).expect("Own key").to_string())
        .collect();
    assert_eq!(keys, ["x", "y", "x2"]);
    let key = root.store().lookup_key("y").expect("Interned");
    assert_eq!(root.get_interned(key).and_then(|node| node.as_u64()), Some(2));
}

#[test_case(r#"["abc"#, LexErrorKind::UnterminatedString; "truncated string")]
#[test_case(r#"{"a": tru}"#, LexErrorKind::UnexpectedCharacter(b'}'); "broken literal")]
#[test_case("[01]", LexErrorKind::InvalidNumber; "leading zero")]
fn lexer_errors_surface(input: &str, expected: LexErrorKind) {
    let error = Document::unmarshal_binary(input.as_bytes()).expect_err("Malformed");
    assert!(error.is_builder_error());
    match error {
        DecodeError::Lex(error) => assert_eq!(error.kind(), &expected),
        other => panic!("Unexpected error: {other:?}"),
    }
}

#[test_case("[1 2]"; "missing comma")]
#[test_case(r#"{"a" 1}"#; "missing colon")]
#[test_case("{1:2}"; "number key")]
#[test_case("[1,]"; "trailing comma")]
#[test_case("1 2"; "two values")]
#[test_case(""; "empty input")]
#[test_case("]"; "stray bracket")]
fn structural_errors_are_builder_errors(input: &str) {
    let error = Document::unmarshal_binary(input.as_bytes()).expect_err("Malformed");
    assert!(matches!(error, DecodeError::Builder(_)), "{error:?}");
}

#[test]
fn max_value_bytes_boundary() {
    let pools = Pools::new();
    let options = LexerOptions::new().with_max_value_bytes(5);
    let document = Document::unmarshal_binary_with(&pools, br#"["abc", 12345]"#, options)
        .expect("Within the limit");
    assert_eq!(encode(&document), r#"["abc",12345]"#);
    let error = Document::unmarshal_binary_with(&pools, br#"["abcd"]"#, options)
        .expect_err("Over the limit");
    match error {
        DecodeError::Lex(error) => {
            assert_eq!(error.kind(), &LexErrorKind::ValueTooLarge { limit: 5 });
            assert_eq!(error.offset(), 1);
        }
        other => panic!("Unexpected error: {other:?}"),
    }
}

#[test]
fn keep_blanks_does_not_change_the_document() {
    let pools = Pools::new();
    let input = b" [ 1 ,\n\t{ \"a\" : \"b\" } ] ";
    let kept = Document::unmarshal_binary_with(
        &pools,
        input,
        LexerOptions::new().with_keep_blanks(true),
    )
    .expect("Valid JSON");
    let skipped =
        Document::unmarshal_binary_with(&pools, input, LexerOptions::default()).expect("Valid JSON");
    assert_eq!(encode(&kept), encode(&skipped));
    assert_eq!(kept, skipped);
}

#[test]
fn reader_and_slice_agree() {
    let input = br#"{"k": ["v", 1.5e3, {"n": null}]}"#;
    let pools = Pools::new();
    let from_reader =
        Document::decode_reader(&pools, &input[..], LexerOptions::default()).expect("Valid JSON");
    assert_eq!(encode(&from_reader), encode(&decode(std::str::from_utf8(input).expect("UTF-8"))));
    assert_eq!(pools.lexers().idle(), 1);
    assert_eq!(pools.buffers().idle(), 1);
}

struct Interrupted;

impl io::Read for Interrupted {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::from(io::ErrorKind::BrokenPipe))
    }
}

#[test]
fn reader_errors_become_lex_errors() {
    let pools = Pools::new();
    let error = Document::decode_reader(&pools, Interrupted, LexerOptions::default())
        .expect_err("Reader fails");
    match error {
        DecodeError::Lex(error) => {
            assert_eq!(error.kind(), &LexErrorKind::Io(io::ErrorKind::BrokenPipe));
        }
        other => panic!("Unexpected error: {other:?}"),
    }
    assert_eq!(pools.lexers().idle(), 1);
    assert_eq!(pools.buffers().idle(), 1);
}

#[test]
fn pooled_writers_never_leak_output() {
    let pools = Pools::new();
    let first = decode(r#"{"secret":"aaaaaaaaaaaaaaaa"}"#);
    let second = decode("[]");
    let bytes = borrow_encode_bytes(&pools, &first).expect("Encodes");
    assert_eq!(bytes, br#"{"secret":"aaaaaaaaaaaaaaaa"}"#);
    let bytes = borrow_encode_bytes(&pools, &second).expect("Encodes");
    assert_eq!(bytes, b"[]");
    let appended = borrow_append_text(&pools, &second, b"prefix=".to_vec()).expect("Encodes");
    assert_eq!(appended, b"prefix=[]");
    assert_eq!(pools.writers().idle(), 1);
    assert!(pools.writers().borrow().is_empty());
}

#[test]
fn pools_are_shared_between_threads() {
    let pools = Arc::new(Pools::new());
    let handles: Vec<_> = (0..8)
        .map(|idx| {
            let pools = Arc::clone(&pools);
            thread::spawn(move || {
                for round in 0..50 {
                    let input = format!(r#"{{"thread":{idx},"round":{round}}}"#);
                    let document = Document::unmarshal_binary_with(
                        &pools,
                        input.as_bytes(),
                        LexerOptions::default(),
                    )
                    .expect("Valid JSON");
                    let bytes = borrow_encode_bytes(&pools, &document).expect("Encodes");
                    assert_eq!(bytes, input.as_bytes());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }
}

#[test]
fn deep_nesting_does_not_recurse() {
    let depth = 100_000;
    let input = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
    let document = decode(&input);
    assert_eq!(encode(&document).len(), input.len());
    assert!(document == decode(&input));
    let input = format!("{}1{}", r#"{"a":"#.repeat(depth), "}".repeat(depth));
    let document = decode(&input);
    assert_eq!(document.to_string(), input);
    assert!(document == decode(&input));
    assert!(document != decode(&input.replacen('1', "2", 1)));
}

#[test]
fn equality_with_repeated_keys_is_symmetric() {
    let repeated = decode(r#"{"a":1,"a":1}"#);
    let distinct = decode(r#"{"a":1,"b":2}"#);
    assert!(repeated != distinct);
    assert!(distinct != repeated);
    assert!(repeated == decode(r#"{"a":1,"a":1}"#));
}

#[test]
fn handles_stay_valid_while_the_store_grows() {
    let mut store = Store::new();
    let first = store.put_str("first");
    let array = store.put(Value::Array);
    let mut handles = vec![first];
    for idx in 0..1000 {
        let handle = store.put_i64(idx);
        store.extend(array, handle).expect("Array");
        handles.push(handle);
    }
    assert!(matches!(store.get(first), Ok(Value::String("first"))));
    for (idx, handle) in handles.iter().skip(1).enumerate() {
        let node = store.node(*handle).expect("Own handle");
        assert_eq!(node.as_i64(), i64::try_from(idx).ok());
    }
    assert_eq!(store.node(array).expect("Own handle").len(), 1000);
}

#[test]
fn handles_are_bound_to_their_store() {
    let mut left = Store::new();
    let mut right = Store::new();
    let handle = left.put(Value::Null);
    let array = right.put(Value::Array);
    assert_eq!(right.get(handle).err(), Some(StoreError::ForeignHandle));
    assert_eq!(right.extend(array, handle), Err(StoreError::ForeignHandle));
    assert_eq!(left.get(Handle::NONE).err(), Some(StoreError::InvalidHandle));
    left.reset();
    assert_eq!(left.get(handle).err(), Some(StoreError::ForeignHandle));
}

#[test]
fn builder_assembles_documents_by_hand() {
    let mut builder = Builder::new();
    let store = builder.store_mut().expect("Unshared");
    let root = store.put(Value::Object);
    let list = store.put(Value::Array);
    let shared = store.put_str("shared");
    store.extend(list, shared).expect("Array");
    store.extend(list, shared).expect("Array");
    let key = store.intern("list");
    store.extend_pair(root, key, list).expect("Object");
    let flag = store.put(Value::Bool(true));
    let key = store.intern("$flag");
    store.extend_pair(root, key, flag).expect("Object");
    assert_eq!(store.extend(list, root), Err(StoreError::Cycle));
    let document = builder.finish(root).expect("Own handle");
    assert_eq!(encode(&document), r#"{"list":["shared","shared"],"$flag":true}"#);
    assert_eq!(document.root().map(|node| node.kind()), Some(Kind::Object));
}

#[test]
fn decoder_reads_concatenated_documents() {
    let lexer = Lexer::new(
        SliceSource::new(b"{\"a\":1} [2]\n\"three\" @ 4"),
        LexerOptions::default(),
    );
    let mut decoder = Decoder::new(lexer);
    let mut encoded = Vec::new();
    let mut errors = 0;
    for document in decoder.by_ref() {
        match document {
            Ok(document) => encoded.push(encode(&document)),
            Err(error) => {
                assert!(error.is_builder_error());
                errors += 1;
            }
        }
    }
    assert_eq!(encoded, [r#"{"a":1}"#, "[2]", r#""three""#]);
    assert_eq!(errors, 1);
    assert!(decoder.next().is_none());
    assert!(!decoder.into_lexer().is_ok());
}

#[test]
fn empty_document_encodes_as_null() {
    let document = Document::default();
    assert_eq!(encode(&document), "null");
    assert_eq!(document.to_string(), "null");
    assert!(document.root().is_none());
}
