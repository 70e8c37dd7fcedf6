use crate::error::BusError;
use bytes::Bytes;
use mqtt_topic::Topic;

/// A published message.
///
/// Every matching subscriber gets its own `Message`. The payload is an
/// immutable `Bytes`, so a subscriber which wants to modify it has to copy
/// it out first and can never change what other subscribers see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: Topic,
    pub payload: Bytes,
    /// Forwarded to subscribers as-is, retained messages are not stored.
    pub retain: bool,
}

impl Message {
    pub fn new(topic: &str, payload: impl Into<Bytes>, retain: bool) -> Result<Self, BusError> {
        let topic = topic.parse().map_err(BusError::InvalidTopic)?;

        Ok(Self { topic, payload: payload.into(), retain })
    }
}

#[cfg(test)]
mod tests {
    use crate::{error::BusError, message::Message};
    use mqtt_topic::TopicParseError;

    #[test]
    fn test_new_validates_topic() {
        let message = Message::new("test/test", "payload", false).unwrap();
        assert_eq!(message.topic.as_str(), "test/test");
        assert_eq!(&message.payload[..], b"payload");
        assert!(!message.retain);

        assert_eq!(
            Message::new("", "payload", false).unwrap_err(),
            BusError::InvalidTopic(TopicParseError::EmptyTopic)
        );
        assert_eq!(
            Message::new("test/#", vec![1, 2, 3], true).unwrap_err(),
            BusError::InvalidTopic(TopicParseError::WildcardOrNullInTopic)
        );
    }
}
