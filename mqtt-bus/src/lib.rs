//! An in-process publish/subscribe bus using MQTT topic semantics.
//!
//! A [`Bus`] runs as a single tokio task. Sessions are opened through a
//! [`BusHandle`], subscribe with topic filters, and receive every message
//! published to a matching topic on their [`BusClient`].

mod bus;
mod client;
mod config;
mod dispatcher;
mod error;
mod message;
mod registry;
mod tree;

pub use bus::{Bus, BusMessage, ClientId, ConnectionId, WillDisconnectLogic};
pub use client::{BusClient, BusHandle};
pub use config::{BusConfig, ConnectOptions};
pub use dispatcher::{DeliverySink, Dispatch, Dispatcher};
pub use error::BusError;
pub use message::Message;
pub use registry::SubscriptionRegistry;
pub use tree::SubscriptionTree;

pub use mqtt_topic as topic;
