//! Fuzz target: detection probe output parser.
//!
//! Feeds arbitrary text through the `Detected repo:` line parser. It must never
//! panic, and anything it accepts must be a well-formed repository location.
#![no_main]

use cifuzz_executor::{parse_detected_repo, DETECTION_MARKER};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let output = String::from_utf8_lossy(data);
    if let Ok(location) = parse_detected_repo(&output) {
        assert!(output.contains(DETECTION_MARKER));
        assert!(!location.origin.is_empty());
        assert!(!location.origin.chars().any(char::is_whitespace));
        assert!(!location.local_name.is_empty());
        assert!(!location.local_name.contains('/'));
    }
});
