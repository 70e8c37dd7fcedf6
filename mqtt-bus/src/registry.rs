use crate::{error::BusError, tree::SubscriptionTree};
use mqtt_topic::{Topic, TopicFilter};
use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
};

/// Which filters each subscriber holds, plus the reverse index used to find
/// the subscribers of a published topic.
///
/// A subscriber holds a given filter at most once, so subscribing twice and
/// unsubscribing once leaves nothing behind.
#[derive(Debug)]
pub struct SubscriptionRegistry<Id> {
    tree: SubscriptionTree<Id>,
    // Used to remove entries from the tree.
    subscriptions: HashMap<Id, Vec<(TopicFilter, u64)>>,
}

impl<Id> Default for SubscriptionRegistry<Id> {
    fn default() -> Self {
        Self { tree: SubscriptionTree::new(), subscriptions: HashMap::new() }
    }
}

impl<Id: Clone + Eq + Hash> SubscriptionRegistry<Id> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, id: Id, filter: &str) -> Result<(), BusError> {
        let filter = filter.parse().map_err(BusError::InvalidSub)?;
        self.subscribe_filter(id, filter);

        Ok(())
    }

    /// Returns false if `id` already held `filter`.
    pub fn subscribe_filter(&mut self, id: Id, filter: TopicFilter) -> bool {
        let tokens = self.subscriptions.entry(id.clone()).or_default();

        if tokens.iter().any(|(existing, _)| *existing == filter) {
            return false;
        }

        let token = self.tree.insert(&filter, id);
        tokens.push((filter, token));

        true
    }

    /// Unsubscribing from a filter that isn't held is not an error.
    pub fn unsubscribe(&mut self, id: &Id, filter: &str) -> Result<(), BusError> {
        let filter = filter.parse().map_err(BusError::InvalidSub)?;
        self.unsubscribe_filter(id, &filter);

        Ok(())
    }

    /// Returns whether `id` held `filter`.
    pub fn unsubscribe_filter(&mut self, id: &Id, filter: &TopicFilter) -> bool {
        let tokens = match self.subscriptions.get_mut(id) {
            Some(tokens) => tokens,
            None => return false,
        };

        let removed = match tokens.iter().position(|(existing, _)| existing == filter) {
            Some(pos) => {
                let (filter, token) = tokens.remove(pos);
                self.tree.remove(&filter, token);
                true
            },
            None => false,
        };

        if tokens.is_empty() {
            self.subscriptions.remove(id);
        }

        removed
    }

    /// Drops every filter held by `id` and returns how many there were.
    pub fn remove_subscriber(&mut self, id: &Id) -> usize {
        match self.subscriptions.remove(id) {
            Some(tokens) => {
                for (filter, token) in &tokens {
                    self.tree.remove(filter, *token);
                }

                tokens.len()
            },
            None => 0,
        }
    }

    /// Every subscriber with at least one filter matching `topic`, each listed once.
    pub fn matching_subscribers(&self, topic: &Topic) -> Vec<Id> {
        let mut seen = HashSet::new();
        let mut matching = Vec::new();

        self.tree.matching_subscribers(topic, |id| {
            if seen.insert(id.clone()) {
                matching.push(id.clone());
            }
        });

        matching
    }

    pub fn filters(&self, id: &Id) -> Vec<&TopicFilter> {
        self.subscriptions
            .get(id)
            .map(|tokens| tokens.iter().map(|(filter, _)| filter).collect())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}
