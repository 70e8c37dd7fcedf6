use crate::{error::BusError, message::Message};
use std::time::Duration;

/// Settings for a [`crate::Bus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Number of commands which can be queued for the bus task before
    /// senders have to wait.
    pub command_channel_capacity: usize,
    /// How long a handle waits for room in the command queue.
    pub operation_timeout: Duration,
    /// Forget subscribers whose receiving end has been dropped the first
    /// time a delivery to them fails.
    pub drop_closed_subscribers: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            command_channel_capacity: 100,
            operation_timeout: Duration::from_secs(1),
            drop_closed_subscribers: true,
        }
    }
}

impl BusConfig {
    pub fn validate(&self) -> Result<(), BusError> {
        if self.command_channel_capacity == 0 {
            return Err(BusError::InvalidConfig("command_channel_capacity must be at least 1"));
        }

        if self.operation_timeout.is_zero() {
            return Err(BusError::InvalidConfig("operation_timeout must be non-zero"));
        }

        Ok(())
    }
}

/// Per-session options passed to [`crate::BusHandle::connect`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// A random ID is assigned when this is `None` or empty.
    pub client_id: Option<String>,
    /// Published if the session ends without a normal disconnect.
    pub will: Option<Message>,
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn will(mut self, will: Message) -> Self {
        self.will = Some(will);
        self
    }
}
