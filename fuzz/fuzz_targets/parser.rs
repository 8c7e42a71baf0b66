#![no_main]

use libfuzzer_sys::fuzz_target;

// Arbitrary text must either parse or fail with an error, never panic.
fuzz_target!(|source: &str| {
    if let Ok(tokens) = quill::lex(source) {
        let _ = quill::parse_tokens(&tokens, &quill::Config::default());
    }
});
