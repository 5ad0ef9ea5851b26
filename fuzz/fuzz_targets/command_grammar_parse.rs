#![no_main]

use libfuzzer_sys::fuzz_target;
use redbot_commands::{parse_bot_command, tokenize, ParsedBotCommand};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    match parse_bot_command(&raw) {
        ParsedBotCommand::Command(command) => {
            assert!(!command.name().is_empty());
        }
        ParsedBotCommand::Unknown { verb } => {
            assert_eq!(verb, tokenize(&raw).verb);
        }
    }
});
