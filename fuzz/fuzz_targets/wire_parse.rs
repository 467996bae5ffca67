//! Fuzz target for STT wire-JSON parsing and normalization.
//!
//! Whatever a provider answers with must either normalize cleanly or come
//! back as an error; it must never panic.

#![no_main]

use huddlescribe::stt::RawTranscription;
use huddlescribe::transcript::normalize;
use huddlescribe::PipelineConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(raw) = serde_json::from_slice::<RawTranscription>(data) {
        let config = PipelineConfig::default();
        let _ = normalize(&raw, 0.0, &config);
        let _ = normalize(&raw, 1234.5, &config);
    }
});
