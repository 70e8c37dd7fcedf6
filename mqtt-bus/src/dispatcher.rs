use crate::{message::Message, registry::SubscriptionRegistry};
use log::{trace, warn};
use std::{collections::HashMap, fmt::Debug, hash::Hash};
use tokio::sync::mpsc::UnboundedSender;

/// Where a subscriber's messages are handed off to.
///
/// Unbounded, so a slow subscriber never holds up the publisher or anyone else.
pub type DeliverySink = UnboundedSender<Message>;

/// The outcome of a single [`Dispatcher::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch<Id> {
    /// Number of sinks which accepted the message.
    pub delivered: usize,
    /// Matching subscribers whose receiving end is gone.
    pub closed: Vec<Id>,
}

/// Maps subscriber identities to their delivery sinks.
#[derive(Debug)]
pub struct Dispatcher<Id> {
    sinks: HashMap<Id, DeliverySink>,
}

impl<Id> Default for Dispatcher<Id> {
    fn default() -> Self {
        Self { sinks: HashMap::new() }
    }
}

impl<Id: Clone + Eq + Hash + Debug> Dispatcher<Id> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sink previously registered for `id`, if any.
    pub fn register(&mut self, id: Id, sink: DeliverySink) -> Option<DeliverySink> {
        self.sinks.insert(id, sink)
    }

    pub fn unregister(&mut self, id: &Id) -> Option<DeliverySink> {
        self.sinks.remove(id)
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.sinks.contains_key(id)
    }

    /// Hands a copy of `message` to every subscriber in `registry` matching its topic.
    ///
    /// Never waits on a receiver. Matching subscribers without a registered
    /// sink are skipped.
    pub fn dispatch(&self, registry: &SubscriptionRegistry<Id>, message: &Message) -> Dispatch<Id> {
        let mut dispatch = Dispatch { delivered: 0, closed: Vec::new() };

        for id in registry.matching_subscribers(&message.topic) {
            let sink = match self.sinks.get(&id) {
                Some(sink) => sink,
                None => {
                    trace!("No sink registered for subscriber {:?}", id);
                    continue;
                },
            };

            if sink.send(message.clone()).is_err() {
                warn!("Failed to send message to subscriber {:?}. Receiver is closed", id);
                dispatch.closed.push(id);
            } else {
                dispatch.delivered += 1;
            }
        }

        trace!("Delivered message on {} to {} subscribers", message.topic, dispatch.delivered);

        dispatch
    }
}
