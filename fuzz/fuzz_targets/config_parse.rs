//! Fuzz target for configuration parsing.
//!
//! Ensures that malformed JSON input doesn't cause panics and that anything
//! that parses survives validation without panicking.

#![no_main]

use huddlescribe::PipelineConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = serde_json::from_str::<PipelineConfig>(s) {
            let _ = config.validate();
        }
    }
});
