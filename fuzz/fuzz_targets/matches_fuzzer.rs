#![no_main]
use libfuzzer_sys::fuzz_target;
use mqtt_topic::{is_valid_filter, is_valid_topic, matches};

fuzz_target!(|data: (&str, &str)| {
    let (filter, topic) = data;

    if !is_valid_filter(filter) || !is_valid_topic(topic) {
        return;
    }

    let matched = matches(filter, topic);

    // A filter without wildcards only matches itself.
    if is_valid_topic(filter) {
        assert_eq!(matched, filter == topic);
    }

    if !topic.starts_with('$') {
        assert!(matches("#", topic));
    }
});
