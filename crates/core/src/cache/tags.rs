use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use crate::api::MovieId;

/// What a cached query reads, and what a mutation writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    /// The movie collection as a whole (every list query).
    Movies,
    /// A single movie record.
    Movie(MovieId),
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Movies => f.write_str("movies"),
            Tag::Movie(id) => write!(f, "movie:{}", id),
        }
    }
}

/// Reverse index from tag to the cache keys that declared it.
#[derive(Debug)]
pub struct TagIndex<K> {
    by_tag: HashMap<Tag, HashSet<K>>,
}

impl<K> Default for TagIndex<K> {
    fn default() -> Self {
        Self {
            by_tag: HashMap::new(),
        }
    }
}

impl<K: Clone + Eq + Hash> TagIndex<K> {
    pub fn subscribe(&mut self, key: &K, tags: &[Tag]) {
        for tag in tags {
            self.by_tag
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
    }

    pub fn unsubscribe(&mut self, key: &K) {
        for keys in self.by_tag.values_mut() {
            keys.remove(key);
        }
        self.by_tag.retain(|_, keys| !keys.is_empty());
    }

    /// Every key subscribed to at least one of `tags`, without duplicates.
    pub fn dependents(&self, tags: &[Tag]) -> Vec<K> {
        let mut seen = HashSet::new();
        tags.iter()
            .filter_map(|tag| self.by_tag.get(tag))
            .flatten()
            .filter(|key| seen.insert(K::clone(key)))
            .cloned()
            .collect()
    }
}
