use mqtt_topic::{Topic, TopicFilter, TopicLevel};
use std::collections::HashMap;

/// One level of the subscription tree.
///
/// `subscribers` hold filters which end exactly at this node, and
/// `multi_level_wildcards` hold filters which end with a `#` right after it.
#[derive(Debug)]
struct SubscriptionTreeNode<T> {
    subscribers: Vec<(u64, T)>,
    single_level_wildcards: Option<Box<SubscriptionTreeNode<T>>>,
    multi_level_wildcards: Vec<(u64, T)>,
    concrete_topic_levels: HashMap<String, SubscriptionTreeNode<T>>,
}

/// A trie of topic filters, used to find every subscription matching a
/// published topic without testing each filter in turn.
///
/// Each insert hands back a token which identifies that entry when removing it,
/// so the same filter can be stored many times with different values.
#[derive(Debug)]
pub struct SubscriptionTree<T> {
    root: SubscriptionTreeNode<T>,
    counter: u64,
    len: usize,
}

impl<T> Default for SubscriptionTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SubscriptionTree<T> {
    pub fn new() -> Self {
        Self { root: SubscriptionTreeNode::new(), counter: 0, len: 0 }
    }

    pub fn insert(&mut self, topic_filter: &TopicFilter, value: T) -> u64 {
        let counter = self.counter;
        self.root.insert(topic_filter, value, counter);
        self.counter += 1;
        self.len += 1;

        counter
    }

    /// Calls `sub_fn` once for every stored filter which matches `topic`.
    pub fn matching_subscribers<F: FnMut(&T)>(&self, topic: &Topic, sub_fn: F) {
        self.root.matching_subscribers(topic, sub_fn)
    }

    pub fn remove(&mut self, topic_filter: &TopicFilter, counter: u64) -> Option<T> {
        let levels: Vec<TopicLevel> = topic_filter.levels().collect();
        let removed = self.root.remove(&levels, counter);

        if removed.is_some() {
            self.len -= 1;
        }

        removed
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

fn take_entry<T>(entries: &mut Vec<(u64, T)>, counter: u64) -> Option<T> {
    let pos = entries.iter().position(|(c, _)| *c == counter)?;
    Some(entries.remove(pos).1)
}

impl<T> SubscriptionTreeNode<T> {
    fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            single_level_wildcards: None,
            multi_level_wildcards: Vec::new(),
            concrete_topic_levels: HashMap::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
            && self.single_level_wildcards.is_none()
            && self.multi_level_wildcards.is_empty()
            && self.concrete_topic_levels.is_empty()
    }

    fn insert(&mut self, topic_filter: &TopicFilter, value: T, counter: u64) {
        let mut current_tree = self;

        for level in topic_filter.levels() {
            match level {
                TopicLevel::SingleLevelWildcard => {
                    current_tree = &mut **current_tree
                        .single_level_wildcards
                        .get_or_insert_with(|| Box::new(SubscriptionTreeNode::new()));
                },
                TopicLevel::MultiLevelWildcard => {
                    // Filters are validated, so `#` is always the final level.
                    current_tree.multi_level_wildcards.push((counter, value));
                    return;
                },
                TopicLevel::Concrete(concrete_topic_level) => {
                    current_tree = current_tree
                        .concrete_topic_levels
                        .entry(concrete_topic_level.to_string())
                        .or_insert_with(SubscriptionTreeNode::new);
                },
            }
        }

        current_tree.subscribers.push((counter, value));
    }

    /// Removes the entry and prunes any nodes left empty on the way back up.
    fn remove(&mut self, levels: &[TopicLevel], counter: u64) -> Option<T> {
        match levels.split_first() {
            None => take_entry(&mut self.subscribers, counter),
            Some((TopicLevel::MultiLevelWildcard, _)) => {
                take_entry(&mut self.multi_level_wildcards, counter)
            },
            Some((TopicLevel::SingleLevelWildcard, rest)) => {
                let sub_tree = self.single_level_wildcards.as_mut()?;
                let removed = sub_tree.remove(rest, counter);

                if sub_tree.is_empty() {
                    self.single_level_wildcards = None;
                }

                removed
            },
            Some((TopicLevel::Concrete(concrete_topic_level), rest)) => {
                let sub_tree = self.concrete_topic_levels.get_mut(*concrete_topic_level)?;
                let removed = sub_tree.remove(rest, counter);

                if sub_tree.is_empty() {
                    self.concrete_topic_levels.remove(*concrete_topic_level);
                }

                removed
            },
        }
    }

    /// Calls `sub_fn` for the `#` entries of this node and all of its descendants.
    fn multi_level_wildcards_below<F: FnMut(&T)>(&self, sub_fn: &mut F) {
        let mut tree_stack = vec![self];

        while let Some(current_tree) = tree_stack.pop() {
            for (_, subscriber) in &current_tree.multi_level_wildcards {
                sub_fn(subscriber);
            }

            tree_stack.extend(current_tree.single_level_wildcards.as_deref());
            tree_stack.extend(current_tree.concrete_topic_levels.values());
        }
    }

    fn matching_subscribers<F: FnMut(&T)>(&self, topic: &Topic, mut sub_fn: F) {
        let levels: Vec<TopicLevel> = topic.levels().collect();
        let is_system_topic = topic.is_system();

        let mut tree_stack = vec![(self, 0)];

        while let Some((current_tree, current_level)) = tree_stack.pop() {
            // Wildcards in the first filter level never match `$` topics.
            let wildcards_allowed = current_level > 0 || !is_system_topic;

            let single_level_tree = if wildcards_allowed {
                for (_, subscriber) in &current_tree.multi_level_wildcards {
                    sub_fn(subscriber);
                }

                current_tree.single_level_wildcards.as_deref()
            } else {
                None
            };

            let concrete_tree = match levels[current_level] {
                TopicLevel::Concrete(level) => current_tree.concrete_topic_levels.get(level),
                // Topics never contain wildcards.
                TopicLevel::SingleLevelWildcard | TopicLevel::MultiLevelWildcard => None,
            };

            for sub_tree in single_level_tree.into_iter().chain(concrete_tree) {
                if current_level + 1 < levels.len() {
                    tree_stack.push((sub_tree, current_level + 1));
                } else {
                    for (_, subscriber) in &sub_tree.subscribers {
                        sub_fn(subscriber);
                    }

                    // The topic ran out, so every filter below here ending in `#` matches.
                    sub_tree.multi_level_wildcards_below(&mut sub_fn);
                }
            }
        }
    }
}
