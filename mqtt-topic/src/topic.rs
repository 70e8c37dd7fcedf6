use crate::{
    MAX_TOPIC_LEN_BYTES, MULTI_LEVEL_WILDCARD, MULTI_LEVEL_WILDCARD_STR, SINGLE_LEVEL_WILDCARD,
    SINGLE_LEVEL_WILDCARD_STR, SYSTEM_TOPIC_PREFIX, TOPIC_SEPARATOR,
};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// A filter for subscribers to indicate which topics they want
/// to receive messages from. Can contain wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TopicFilter {
    Concrete { filter: String, level_count: u32 },
    Wildcard { filter: String, level_count: u32 },
}

/// A topic name publishers use when sending MQTT messages.
/// Cannot contain wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    topic_name: String,
    level_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicLevel<'a> {
    Concrete(&'a str),
    SingleLevelWildcard,
    MultiLevelWildcard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TopicParseError {
    #[error("topic is empty")]
    EmptyTopic,
    #[error("topic is longer than {} bytes", MAX_TOPIC_LEN_BYTES)]
    TopicTooLong,
    #[error("topic is not valid UTF-8")]
    InvalidUtf8,
    #[error("multi-level wildcard is only allowed as the last level")]
    MultilevelWildcardNotAtEnd,
    #[error("wildcards must occupy an entire topic level")]
    InvalidWildcardLevel,
    #[error("topic names cannot contain wildcards or null characters")]
    WildcardOrNullInTopic,
    #[error("topic filters cannot contain null characters")]
    NullInFilter,
}

/// Checks shared by topics and filters.
fn check_common(s: &str) -> Result<(), TopicParseError> {
    // Filters and topics cannot be empty
    if s.is_empty() {
        return Err(TopicParseError::EmptyTopic);
    }

    // Filters and topics cannot exceed the byte length in the MQTT spec
    if s.len() > MAX_TOPIC_LEN_BYTES {
        return Err(TopicParseError::TopicTooLong);
    }

    Ok(())
}

/// If Ok, returns (level_count, contains_wildcards).
fn process_filter(filter: &str) -> Result<(u32, bool), TopicParseError> {
    check_common(filter)?;

    if filter.contains('\0') {
        return Err(TopicParseError::NullInFilter);
    }

    let mut level_count = 0;
    let mut contains_wildcards = false;
    let mut levels = filter.split(TOPIC_SEPARATOR).peekable();

    while let Some(level) = levels.next() {
        let level_contains_wildcard =
            level.contains(|x: char| x == SINGLE_LEVEL_WILDCARD || x == MULTI_LEVEL_WILDCARD);

        if level_contains_wildcard {
            // Any wildcards on a particular level must be specified on their own
            if level.len() > 1 {
                return Err(TopicParseError::InvalidWildcardLevel);
            }

            // Multi-level wildcards can only be at the end of the filter
            if level == MULTI_LEVEL_WILDCARD_STR && levels.peek().is_some() {
                return Err(TopicParseError::MultilevelWildcardNotAtEnd);
            }

            contains_wildcards = true;
        }

        level_count += 1;
    }

    Ok((level_count, contains_wildcards))
}

/// If Ok, returns the level count.
fn process_topic(topic: &str) -> Result<u32, TopicParseError> {
    check_common(topic)?;

    // Topics cannot contain wildcards or null characters
    if topic.contains(|x: char| {
        x == SINGLE_LEVEL_WILDCARD || x == MULTI_LEVEL_WILDCARD || x == '\0'
    }) {
        return Err(TopicParseError::WildcardOrNullInTopic);
    }

    Ok(topic.split(TOPIC_SEPARATOR).count() as u32)
}

/// Returns true if `topic` can be published to.
pub fn is_valid_topic(topic: &str) -> bool {
    process_topic(topic).is_ok()
}

/// Returns true if `filter` can be subscribed to.
pub fn is_valid_filter(filter: &str) -> bool {
    process_filter(filter).is_ok()
}

pub fn is_valid_topic_bytes(topic: &[u8]) -> bool {
    std::str::from_utf8(topic).map(is_valid_topic).unwrap_or(false)
}

pub fn is_valid_filter_bytes(filter: &[u8]) -> bool {
    std::str::from_utf8(filter).map(is_valid_filter).unwrap_or(false)
}

impl FromStr for TopicFilter {
    type Err = TopicParseError;

    fn from_str(filter: &str) -> Result<Self, Self::Err> {
        let (level_count, contains_wildcards) = process_filter(filter)?;

        let topic_filter = if contains_wildcards {
            TopicFilter::Wildcard { filter: filter.to_string(), level_count }
        } else {
            TopicFilter::Concrete { filter: filter.to_string(), level_count }
        };

        Ok(topic_filter)
    }
}

impl FromStr for Topic {
    type Err = TopicParseError;

    fn from_str(topic: &str) -> Result<Self, Self::Err> {
        let level_count = process_topic(topic)?;

        Ok(Topic { topic_name: topic.to_string(), level_count })
    }
}

impl TopicFilter {
    /// Parse a filter straight off the wire, checking the UTF-8 encoding first.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TopicParseError> {
        std::str::from_utf8(bytes).map_err(|_| TopicParseError::InvalidUtf8)?.parse()
    }

    pub fn as_str(&self) -> &str {
        match self {
            TopicFilter::Concrete { filter, .. } => filter,
            TopicFilter::Wildcard { filter, .. } => filter,
        }
    }

    pub fn level_count(&self) -> u32 {
        match self {
            TopicFilter::Concrete { level_count, .. } => *level_count,
            TopicFilter::Wildcard { level_count, .. } => *level_count,
        }
    }

    pub fn has_wildcards(&self) -> bool {
        matches!(self, TopicFilter::Wildcard { .. })
    }

    /// Whether this filter targets reserved (`$`-prefixed) topics.
    pub fn is_system(&self) -> bool {
        self.as_str().starts_with(SYSTEM_TOPIC_PREFIX)
    }

    pub fn levels(&self) -> TopicLevels<'_> {
        TopicLevels { levels_iter: self.as_str().split(TOPIC_SEPARATOR) }
    }
}

impl Topic {
    /// Parse a topic straight off the wire, checking the UTF-8 encoding first.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TopicParseError> {
        std::str::from_utf8(bytes).map_err(|_| TopicParseError::InvalidUtf8)?.parse()
    }

    pub fn as_str(&self) -> &str {
        &self.topic_name
    }

    pub fn level_count(&self) -> u32 {
        self.level_count
    }

    pub fn is_system(&self) -> bool {
        self.topic_name.starts_with(SYSTEM_TOPIC_PREFIX)
    }

    pub fn levels(&self) -> TopicLevels<'_> {
        TopicLevels { levels_iter: self.topic_name.split(TOPIC_SEPARATOR) }
    }
}

impl fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.topic_name)
    }
}

pub struct TopicLevels<'a> {
    levels_iter: std::str::Split<'a, char>,
}

impl<'a> Iterator for TopicLevels<'a> {
    type Item = TopicLevel<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.levels_iter.next() {
            Some(MULTI_LEVEL_WILDCARD_STR) => Some(TopicLevel::MultiLevelWildcard),
            Some(SINGLE_LEVEL_WILDCARD_STR) => Some(TopicLevel::SingleLevelWildcard),
            Some(level) => Some(TopicLevel::Concrete(level)),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::topic::{
        is_valid_filter, is_valid_filter_bytes, is_valid_topic, is_valid_topic_bytes, Topic,
        TopicFilter, TopicLevel, TopicParseError, MAX_TOPIC_LEN_BYTES,
    };

    #[test]
    fn test_topic_filter_parse_empty_topic() {
        assert_eq!("".parse::<TopicFilter>().unwrap_err(), TopicParseError::EmptyTopic);
        assert_eq!("".parse::<Topic>().unwrap_err(), TopicParseError::EmptyTopic);
    }

    #[test]
    fn test_topic_filter_parse_length() {
        let just_right_topic = "g".repeat(MAX_TOPIC_LEN_BYTES);
        assert!(just_right_topic.parse::<TopicFilter>().is_ok());
        assert!(just_right_topic.parse::<Topic>().is_ok());

        let too_long_topic = "g".repeat(MAX_TOPIC_LEN_BYTES + 1);
        assert_eq!(
            too_long_topic.parse::<TopicFilter>().unwrap_err(),
            TopicParseError::TopicTooLong
        );
        assert_eq!(too_long_topic.parse::<Topic>().unwrap_err(), TopicParseError::TopicTooLong);
    }

    #[test]
    fn test_length_is_counted_in_bytes() {
        // 'é' is two bytes in UTF-8
        let multibyte = "é".repeat(MAX_TOPIC_LEN_BYTES / 2 + 1);
        assert!(multibyte.chars().count() < MAX_TOPIC_LEN_BYTES);
        assert!(!is_valid_topic(&multibyte));
        assert!(!is_valid_filter(&multibyte));
    }

    #[test]
    fn test_topic_filter_parse_concrete() {
        assert_eq!(
            "/".parse::<TopicFilter>().unwrap(),
            TopicFilter::Concrete { filter: "/".to_string(), level_count: 2 }
        );

        assert_eq!(
            "a".parse::<TopicFilter>().unwrap(),
            TopicFilter::Concrete { filter: "a".to_string(), level_count: 1 }
        );

        assert_eq!(
            "a//topic".parse::<TopicFilter>().unwrap(),
            TopicFilter::Concrete { filter: "a//topic".to_string(), level_count: 3 }
        );

        assert_eq!(
            "home/kitchen/temperature".parse::<TopicFilter>().unwrap(),
            TopicFilter::Concrete {
                filter: "home/kitchen/temperature".to_string(),
                level_count: 3,
            }
        );
    }

    #[test]
    fn test_topic_filter_parse_single_level_wildcard() {
        assert_eq!(
            "+".parse::<TopicFilter>().unwrap(),
            TopicFilter::Wildcard { filter: "+".to_string(), level_count: 1 }
        );

        assert_eq!(
            "+/".parse::<TopicFilter>().unwrap(),
            TopicFilter::Wildcard { filter: "+/".to_string(), level_count: 2 }
        );

        assert_eq!(
            "myhome/groundfloor/+/temperature".parse::<TopicFilter>().unwrap(),
            TopicFilter::Wildcard {
                filter: "myhome/groundfloor/+/temperature".to_string(),
                level_count: 4,
            }
        );
    }

    #[test]
    fn test_topic_filter_parse_multi_level_wildcard() {
        assert_eq!(
            "#".parse::<TopicFilter>().unwrap(),
            TopicFilter::Wildcard { filter: "#".to_string(), level_count: 1 }
        );

        assert_eq!(
            "#/".parse::<TopicFilter>().unwrap_err(),
            TopicParseError::MultilevelWildcardNotAtEnd
        );

        assert_eq!(
            "/#".parse::<TopicFilter>().unwrap(),
            TopicFilter::Wildcard { filter: "/#".to_string(), level_count: 2 }
        );

        assert_eq!(
            "sport/tennis/player1/#".parse::<TopicFilter>().unwrap(),
            TopicFilter::Wildcard { filter: "sport/tennis/player1/#".to_string(), level_count: 4 }
        );
    }

    #[test]
    fn test_topic_filter_parse_sys_prefix() {
        assert_eq!(
            "$SYS/stats".parse::<TopicFilter>().unwrap(),
            TopicFilter::Concrete { filter: "$SYS/stats".to_string(), level_count: 2 }
        );

        assert_eq!(
            "$SYS/#".parse::<TopicFilter>().unwrap(),
            TopicFilter::Wildcard { filter: "$SYS/#".to_string(), level_count: 2 }
        );

        assert!("$SYS/#".parse::<TopicFilter>().unwrap().is_system());
        assert!(!"/$SYS/#".parse::<TopicFilter>().unwrap().is_system());
        assert!("$SYS/stats".parse::<Topic>().unwrap().is_system());
    }

    #[test]
    fn test_topic_filter_parse_invalid_filters() {
        assert_eq!(
            "sport/#/stats".parse::<TopicFilter>().unwrap_err(),
            TopicParseError::MultilevelWildcardNotAtEnd
        );
        assert_eq!(
            "foo/#/bar".parse::<TopicFilter>().unwrap_err(),
            TopicParseError::MultilevelWildcardNotAtEnd
        );
        assert_eq!(
            "a/#/#".parse::<TopicFilter>().unwrap_err(),
            TopicParseError::MultilevelWildcardNotAtEnd
        );
        assert_eq!(
            "sport#/stats#".parse::<TopicFilter>().unwrap_err(),
            TopicParseError::InvalidWildcardLevel
        );
        assert_eq!(
            "sport/tennis#".parse::<TopicFilter>().unwrap_err(),
            TopicParseError::InvalidWildcardLevel
        );
        assert_eq!(
            "foo/+bar".parse::<TopicFilter>().unwrap_err(),
            TopicParseError::InvalidWildcardLevel
        );
        assert_eq!(
            "sport/++".parse::<TopicFilter>().unwrap_err(),
            TopicParseError::InvalidWildcardLevel
        );
        assert_eq!("a/\0".parse::<TopicFilter>().unwrap_err(), TopicParseError::NullInFilter);
    }

    #[test]
    fn test_topic_name_success() {
        assert_eq!(
            "/".parse::<Topic>().unwrap(),
            Topic { topic_name: "/".to_string(), level_count: 2 }
        );

        assert_eq!(
            "Accounts payable".parse::<Topic>().unwrap(),
            Topic { topic_name: "Accounts payable".to_string(), level_count: 1 }
        );

        assert_eq!(
            "a/topic/".parse::<Topic>().unwrap(),
            Topic { topic_name: "a/topic/".to_string(), level_count: 3 }
        );

        assert_eq!(
            "$SYS/stats".parse::<Topic>().unwrap(),
            Topic { topic_name: "$SYS/stats".to_string(), level_count: 2 }
        );
    }

    #[test]
    fn test_topic_name_failure() {
        assert_eq!("#".parse::<Topic>().unwrap_err(), TopicParseError::WildcardOrNullInTopic);
        assert_eq!("+".parse::<Topic>().unwrap_err(), TopicParseError::WildcardOrNullInTopic);
        assert_eq!("\0".parse::<Topic>().unwrap_err(), TopicParseError::WildcardOrNullInTopic);
        assert_eq!("foo/#".parse::<Topic>().unwrap_err(), TopicParseError::WildcardOrNullInTopic);
        assert_eq!("foo+".parse::<Topic>().unwrap_err(), TopicParseError::WildcardOrNullInTopic);
        assert_eq!(
            "/null/byte/\0".parse::<Topic>().unwrap_err(),
            TopicParseError::WildcardOrNullInTopic
        );
    }

    #[test]
    fn test_from_bytes_rejects_invalid_utf8() {
        let bytes = [b'a', b'/', 0xff, 0xfe];

        assert_eq!(Topic::from_bytes(&bytes).unwrap_err(), TopicParseError::InvalidUtf8);
        assert_eq!(TopicFilter::from_bytes(&bytes).unwrap_err(), TopicParseError::InvalidUtf8);
        assert!(!is_valid_topic_bytes(&bytes));
        assert!(!is_valid_filter_bytes(&bytes));

        assert_eq!(Topic::from_bytes(b"a/b").unwrap().as_str(), "a/b");
        assert!(TopicFilter::from_bytes(b"a/+").unwrap().has_wildcards());
        assert!(is_valid_topic_bytes(b"a/b"));
        assert!(is_valid_filter_bytes(b"a/#"));
    }

    #[test]
    fn test_topic_filter_level_iterator_simple() {
        let filter: TopicFilter = "/".parse().unwrap();

        let mut levels = filter.levels();

        assert_eq!(levels.next(), Some(TopicLevel::Concrete("")));
        assert_eq!(levels.next(), Some(TopicLevel::Concrete("")));
        assert_eq!(levels.next(), None);
    }

    #[test]
    fn test_topic_filter_level_iterator_wildcards() {
        let filter: TopicFilter = "home/+/temperature/#".parse().unwrap();

        let mut levels = filter.levels();

        assert_eq!(levels.next(), Some(TopicLevel::Concrete("home")));
        assert_eq!(levels.next(), Some(TopicLevel::SingleLevelWildcard));
        assert_eq!(levels.next(), Some(TopicLevel::Concrete("temperature")));
        assert_eq!(levels.next(), Some(TopicLevel::MultiLevelWildcard));
        assert_eq!(levels.next(), None);
    }

    #[test]
    fn test_topic_level_iterator_empty_levels() {
        let topic: Topic = "a//topic/".parse().unwrap();

        let levels: Vec<TopicLevel> = topic.levels().collect();

        assert_eq!(
            levels,
            vec![
                TopicLevel::Concrete("a"),
                TopicLevel::Concrete(""),
                TopicLevel::Concrete("topic"),
                TopicLevel::Concrete(""),
            ]
        );
        assert_eq!(topic.level_count(), 4);
    }

    #[test]
    fn test_display() {
        let filter: TopicFilter = "sport/+/player1".parse().unwrap();
        let topic: Topic = "sport/tennis/player1".parse().unwrap();

        assert_eq!(filter.to_string(), "sport/+/player1");
        assert_eq!(topic.to_string(), "sport/tennis/player1");
    }
}
