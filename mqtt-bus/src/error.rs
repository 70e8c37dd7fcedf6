use mqtt_topic::TopicParseError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// The topic can't be published to.
    #[error("topic invalid for publishing: {0}")]
    InvalidTopic(#[source] TopicParseError),
    /// The topic filter can't be subscribed to.
    #[error("topic invalid for subscribing: {0}")]
    InvalidSub(#[source] TopicParseError),
    #[error("the bus is no longer running")]
    BusClosed,
    #[error("timed out handing a command to the bus")]
    Timeout,
    #[error("invalid bus configuration: {0}")]
    InvalidConfig(&'static str),
}
