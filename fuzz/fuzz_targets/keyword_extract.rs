#![no_main]

use libfuzzer_sys::fuzz_target;
use redbot_commands::extract_keywords;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let keywords = extract_keywords(&raw);
    if let Some(percent) = keywords.percent {
        assert!(percent <= 100);
    }
    for hours in [keywords.estimate, keywords.record].into_iter().flatten() {
        assert!(hours.is_finite());
        assert!(hours >= 0.0);
    }
});
