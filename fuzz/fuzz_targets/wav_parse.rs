//! Fuzz target for WAV blob parsing.
//!
//! Arbitrary bytes from a recorder must never panic the audio layer.

#![no_main]

use huddlescribe::WavAudio;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(audio) = WavAudio::from_bytes(data.to_vec()) {
        use huddlescribe::AudioSource;
        let _ = audio.duration_ms();
        let _ = audio.read_range(0, 1_000);
    }
});
