#![no_main]
use jsonstore::{Lexer, LexerOptions, SliceSource};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let options = LexerOptions::new().with_keep_blanks(true);
    let mut lexer = Lexer::new(SliceSource::new(data), options);
    let mut raw = Vec::with_capacity(data.len());
    loop {
        let token = lexer.next_token();
        if token.is_eof() {
            assert_eq!(raw, data);
            return;
        }
        if token.is_error() {
            assert!(data.starts_with(&raw));
            return;
        }
        raw.extend_from_slice(token.raw());
    }
});
