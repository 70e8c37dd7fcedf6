#![no_main]
use libfuzzer_sys::fuzz_target;
use mqtt_topic::{is_valid_filter, Topic};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Every valid topic is also a valid filter.
        if s.parse::<Topic>().is_ok() {
            assert!(is_valid_filter(s));
        }
    }
});
