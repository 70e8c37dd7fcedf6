use crate::{
    topic::{Topic, TopicFilter},
    MULTI_LEVEL_WILDCARD_STR, SINGLE_LEVEL_WILDCARD_STR, SYSTEM_TOPIC_PREFIX, TOPIC_SEPARATOR,
};

/// Returns true if the subscription `filter` matches the publish `topic`.
///
/// Both strings must already be valid (see [`crate::is_valid_filter`] and
/// [`crate::is_valid_topic`]). Levels are compared byte for byte, and empty
/// levels only match other empty levels (or a wildcard).
///
/// A filter ending in `#` also matches a topic which runs out before the
/// filter does, so `a/b/#` matches `a`.
///
/// Topics starting with `$` are reserved for the broker and are only matched by
/// filters which also start with `$`, so a `#` or `+` subscription never sees them.
pub fn matches(filter: &str, topic: &str) -> bool {
    if filter.starts_with(SYSTEM_TOPIC_PREFIX) != topic.starts_with(SYSTEM_TOPIC_PREFIX) {
        return false;
    }

    let mut filter_levels = filter.split(TOPIC_SEPARATOR);
    let mut topic_levels = topic.split(TOPIC_SEPARATOR);

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            // A multi-level wildcard is always the last filter level and swallows
            // everything left in the topic, including nothing at all.
            (Some(MULTI_LEVEL_WILDCARD_STR), _) => return true,
            (Some(SINGLE_LEVEL_WILDCARD_STR), Some(_)) => {},
            (Some(filter_level), Some(topic_level)) => {
                if filter_level != topic_level {
                    return false;
                }
            },
            (None, None) => return true,
            // The topic ran out first, the remaining filter levels only need to end in `#`.
            (Some(_), None) => return filter_levels.last() == Some(MULTI_LEVEL_WILDCARD_STR),
            // The filter ran out without a multi-level wildcard.
            (None, Some(_)) => return false,
        }
    }
}

impl TopicFilter {
    pub fn matches(&self, topic: &Topic) -> bool {
        matches(self.as_str(), topic.as_str())
    }
}
