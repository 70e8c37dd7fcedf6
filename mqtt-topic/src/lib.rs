pub const TOPIC_SEPARATOR: char = '/';

pub const MULTI_LEVEL_WILDCARD: char = '#';
pub const MULTI_LEVEL_WILDCARD_STR: &str = "#";

pub const SINGLE_LEVEL_WILDCARD: char = '+';
pub const SINGLE_LEVEL_WILDCARD_STR: &str = "+";

/// Topics starting with this character are reserved for the broker
/// (`$SYS/...` and friends).
pub const SYSTEM_TOPIC_PREFIX: char = '$';

pub const MAX_TOPIC_LEN_BYTES: usize = 65_535;

pub mod matcher;
pub mod topic;

pub use matcher::matches;
pub use topic::{
    is_valid_filter, is_valid_filter_bytes, is_valid_topic, is_valid_topic_bytes, Topic,
    TopicFilter, TopicLevel, TopicLevels, TopicParseError,
};
