#![no_main]

use libfuzzer_sys::fuzz_target;
use redbot_commands::tokenize;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let tokens = tokenize(&raw);
    if tokens.is_empty() {
        assert!(tokens.args.is_empty());
        assert!(raw.trim().is_empty());
    }
    assert!(!tokens.verb.contains(char::is_whitespace));
    assert!(tokens
        .args
        .iter()
        .all(|arg| !arg.is_empty() && !arg.contains(char::is_whitespace)));
});
