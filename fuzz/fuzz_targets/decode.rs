#![no_main]
use jsonstore::{Document, MarshalBinary};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(document) = Document::unmarshal_binary(data) else {
        return;
    };
    let encoded = document.marshal_binary().expect("Decoded documents always encode");
    let again = Document::unmarshal_binary(&encoded).expect("Encoded output is valid JSON");
    assert_eq!(
        again.marshal_binary().expect("Decoded documents always encode"),
        encoded
    );
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) {
        let reparsed: serde_json::Value =
            serde_json::from_slice(&encoded).expect("Encoded output is valid JSON");
        assert_eq!(value, reparsed);
    }
});
