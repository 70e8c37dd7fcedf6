#![no_main]
use libfuzzer_sys::fuzz_target;
use mqtt_topic::{is_valid_filter_bytes, TopicFilter, MAX_TOPIC_LEN_BYTES};

fuzz_target!(|data: &[u8]| {
    let parsed = TopicFilter::from_bytes(data);
    assert_eq!(parsed.is_ok(), is_valid_filter_bytes(data));

    if let Ok(filter) = parsed {
        assert!(filter.as_str().len() <= MAX_TOPIC_LEN_BYTES);
        assert_eq!(filter.levels().count() as u32, filter.level_count());
    }
});
