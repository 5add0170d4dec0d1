//! Tagged query cache.
//!
//! Each cached query declares the [`Tag`]s it reads; a mutation names the
//! tags it writes and [`QueryCache::invalidate`] marks every dependent entry
//! stale. Fetches are issued through [`Ticket`]s carrying a sequence number,
//! and a response is only stored when its ticket is the latest one issued for
//! that key, so a slow, older response can never overwrite a newer one.
//!
//! Entries nobody is looking at are dropped by [`QueryCache::evict`]
//! according to a [`Retention`].

mod tags;

pub use tags::{Tag, TagIndex};

use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Duration, Utc};

/// How long unused entries survive and how many a cache may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention {
    /// Seconds after its fetch that an unused entry is dropped.
    pub keep_unused_secs: i64,
    /// Beyond this many entries the least recently fetched unused ones go.
    pub max_entries: usize,
}

impl Retention {
    pub const LISTS: Retention = Retention {
        keep_unused_secs: 60,
        max_entries: 16,
    };

    pub const DETAILS: Retention = Retention {
        keep_unused_secs: 60,
        max_entries: 64,
    };
}

/// Handle for one fetch of `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket<K> {
    key: K,
    seq: u64,
}

impl<K> Ticket<K> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// A stored query result.
#[derive(Debug, Clone)]
pub struct Entry<V> {
    pub value: V,
    pub stale: bool,
    pub fetched_at: DateTime<Utc>,
    seq: u64,
}

/// Cache of query results keyed by `K`.
#[derive(Debug)]
pub struct QueryCache<K, V> {
    entries: HashMap<K, Entry<V>>,
    /// Latest ticket issued per key.
    issued: HashMap<K, u64>,
    /// Sequence number current when the key was last invalidated; results
    /// from tickets issued at or before it are stored as stale.
    invalidated_at: HashMap<K, u64>,
    tags: TagIndex<K>,
    next_seq: u64,
}

impl<K, V> Default for QueryCache<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            issued: HashMap::new(),
            invalidated_at: HashMap::new(),
            tags: TagIndex::default(),
            next_seq: 0,
        }
    }
}

impl<K: Clone + Eq + Hash, V> QueryCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<&Entry<V>> {
        self.entries.get(key)
    }

    /// The cached value if present and not stale.
    pub fn fresh(&self, key: &K) -> Option<&V> {
        self.entries
            .get(key)
            .filter(|entry| !entry.stale)
            .map(|entry| &entry.value)
    }

    /// The cached value even if stale (the last known good data).
    pub fn last_known(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    pub fn is_stale(&self, key: &K) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.stale)
    }

    /// Start a fetch for `key`, declaring the tags its result depends on.
    /// Any ticket issued earlier for the same key is superseded.
    pub fn issue(&mut self, key: K, tags: &[Tag]) -> Ticket<K> {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.tags.subscribe(&key, tags);
        self.issued.insert(key.clone(), seq);
        Ticket { key, seq }
    }

    /// Whether `ticket` is still the most recently issued one for its key.
    pub fn is_latest(&self, ticket: &Ticket<K>) -> bool {
        self.issued.get(&ticket.key) == Some(&ticket.seq)
    }

    /// Store the result of a fetch.
    ///
    /// Returns `false` (and stores nothing) when a newer ticket exists.
    pub fn complete(&mut self, ticket: &Ticket<K>, value: V) -> bool {
        if !self.is_latest(ticket) {
            return false;
        }
        if self
            .entries
            .get(&ticket.key)
            .is_some_and(|existing| existing.seq > ticket.seq)
        {
            return false;
        }

        let stale = self
            .invalidated_at
            .get(&ticket.key)
            .is_some_and(|&mark| ticket.seq <= mark);

        self.entries.insert(
            ticket.key.clone(),
            Entry {
                value,
                stale,
                fetched_at: Utc::now(),
                seq: ticket.seq,
            },
        );
        true
    }

    /// Mark every entry depending on one of `tags` stale.
    ///
    /// Fetches already in flight for those keys will also store their result
    /// as stale. Returns the affected keys so the caller can refetch them.
    pub fn invalidate(&mut self, tags: &[Tag]) -> Vec<K> {
        let keys = self.tags.dependents(tags);
        for key in &keys {
            if let Some(entry) = self.entries.get_mut(key) {
                entry.stale = true;
            }
            self.invalidated_at.insert(key.clone(), self.next_seq);
        }
        keys
    }

    /// Give up on a fetch that will not store anything.
    ///
    /// When it was the latest ticket and nothing is cached for the key, the
    /// key is forgotten so abandoned queries do not pile up.
    pub fn abandon(&mut self, ticket: &Ticket<K>) {
        if self.is_latest(ticket) && !self.entries.contains_key(&ticket.key) {
            self.remove(&ticket.key);
        }
    }

    /// Drop entries other than `in_use` that are older than the retention
    /// window, then the least recently fetched ones while the cache is over
    /// capacity. Keys with a fetch in flight are kept.
    pub fn evict(
        &mut self,
        in_use: Option<&K>,
        retention: Retention,
        now: DateTime<Utc>,
    ) -> Vec<K> {
        let cutoff = now - Duration::seconds(retention.keep_unused_secs);
        let mut candidates: Vec<(K, DateTime<Utc>)> = self
            .entries
            .iter()
            .filter(|(key, entry)| {
                Some(*key) != in_use && self.issued.get(*key) == Some(&entry.seq)
            })
            .map(|(key, entry)| (key.clone(), entry.fetched_at))
            .collect();
        candidates.sort_by_key(|(_, fetched_at)| *fetched_at);

        let mut over = self.entries.len().saturating_sub(retention.max_entries);
        let mut evicted = Vec::new();
        for (key, fetched_at) in candidates {
            if over > 0 || fetched_at < cutoff {
                over = over.saturating_sub(1);
                evicted.push(key);
            }
        }
        for key in &evicted {
            self.remove(key);
        }
        evicted
    }

    /// Forget a key entirely.
    pub fn remove(&mut self, key: &K) {
        self.entries.remove(key);
        self.issued.remove(key);
        self.invalidated_at.remove(key);
        self.tags.unsubscribe(key);
    }

    /// Forget every key. Tickets issued before the call can no longer
    /// complete.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.issued.clear();
        self.invalidated_at.clear();
        self.tags = TagIndex::default();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MovieId;

    #[test]
    fn test_complete_and_fresh() {
        let mut cache: QueryCache<&str, u32> = QueryCache::new();
        assert!(cache.fresh(&"q").is_none());

        let ticket = cache.issue("q", &[Tag::Movies]);
        assert!(cache.complete(&ticket, 7));
        assert_eq!(cache.fresh(&"q"), Some(&7));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_newer_ticket_wins_regardless_of_arrival() {
        let mut cache: QueryCache<&str, &str> = QueryCache::new();
        let older = cache.issue("q", &[Tag::Movies]);
        let newer = cache.issue("q", &[Tag::Movies]);

        // Newer response arrives first
        assert!(cache.complete(&newer, "new"));
        // Older response arrives late and is dropped
        assert!(!cache.complete(&older, "old"));
        assert_eq!(cache.fresh(&"q"), Some(&"new"));
    }

    #[test]
    fn test_superseded_before_any_arrival() {
        let mut cache: QueryCache<&str, &str> = QueryCache::new();
        let older = cache.issue("q", &[]);
        let _newer = cache.issue("q", &[]);
        assert!(!cache.is_latest(&older));
        assert!(!cache.complete(&older, "old"));
        assert!(cache.get(&"q").is_none());
    }

    #[test]
    fn test_invalidate_marks_dependents_stale() {
        let mut cache: QueryCache<String, u32> = QueryCache::new();
        let list = cache.issue("list".to_string(), &[Tag::Movies]);
        cache.complete(&list, 1);
        let detail = cache.issue("detail".to_string(), &[Tag::Movie(MovieId::new("5"))]);
        cache.complete(&detail, 2);

        let affected = cache.invalidate(&[Tag::Movies]);
        assert_eq!(affected, vec!["list".to_string()]);
        assert!(cache.is_stale(&"list".to_string()));
        assert!(cache.fresh(&"list".to_string()).is_none());
        assert_eq!(cache.last_known(&"list".to_string()), Some(&1));
        assert_eq!(cache.fresh(&"detail".to_string()), Some(&2));
    }

    #[test]
    fn test_in_flight_result_is_stale_after_invalidation() {
        let mut cache: QueryCache<&str, u32> = QueryCache::new();
        let ticket = cache.issue("q", &[Tag::Movies]);
        cache.invalidate(&[Tag::Movies]);

        assert!(cache.complete(&ticket, 1));
        assert!(cache.is_stale(&"q"));

        // A fetch issued after the invalidation is fresh again
        let refetch = cache.issue("q", &[Tag::Movies]);
        assert!(cache.complete(&refetch, 2));
        assert_eq!(cache.fresh(&"q"), Some(&2));
    }

    fn stored(cache: &mut QueryCache<String, u32>, key: &str) {
        let ticket = cache.issue(key.to_string(), &[Tag::Movies]);
        cache.complete(&ticket, 0);
    }

    #[test]
    fn test_evict_drops_entries_past_retention() {
        let mut cache: QueryCache<String, u32> = QueryCache::new();
        stored(&mut cache, "a");
        stored(&mut cache, "b");

        let retention = Retention::LISTS;
        assert!(cache.evict(None, retention, Utc::now()).is_empty());

        let later = Utc::now() + Duration::seconds(retention.keep_unused_secs + 1);
        let evicted = cache.evict(Some(&"b".to_string()), retention, later);
        assert_eq!(evicted, vec!["a".to_string()]);
        assert_eq!(cache.len(), 1);
        assert!(cache.fresh(&"b".to_string()).is_some());
        assert_eq!(cache.invalidate(&[Tag::Movies]), vec!["b".to_string()]);
    }

    #[test]
    fn test_evict_enforces_capacity_oldest_first() {
        let mut cache: QueryCache<String, u32> = QueryCache::new();
        for key in ["a", "b", "c", "d"] {
            stored(&mut cache, key);
        }
        let retention = Retention {
            keep_unused_secs: 3600,
            max_entries: 2,
        };

        let mut evicted = cache.evict(Some(&"a".to_string()), retention, Utc::now());
        evicted.sort();
        // "a" is in use, so the next two oldest make room
        assert_eq!(evicted.len(), 2);
        assert!(!evicted.contains(&"a".to_string()));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&"a".to_string()).is_some());
    }

    #[test]
    fn test_evict_keeps_key_with_fetch_in_flight() {
        let mut cache: QueryCache<String, u32> = QueryCache::new();
        stored(&mut cache, "a");
        let _refetch = cache.issue("a".to_string(), &[Tag::Movies]);

        let later = Utc::now() + Duration::seconds(3600);
        assert!(cache.evict(None, Retention::LISTS, later).is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_abandon_forgets_key_without_entry() {
        let mut cache: QueryCache<&str, u32> = QueryCache::new();
        let ticket = cache.issue("q", &[Tag::Movies]);
        cache.abandon(&ticket);
        assert!(cache.invalidate(&[Tag::Movies]).is_empty());

        // An entry that is already cached survives a failed refetch
        let first = cache.issue("q", &[Tag::Movies]);
        cache.complete(&first, 1);
        let refetch = cache.issue("q", &[Tag::Movies]);
        cache.abandon(&refetch);
        assert_eq!(cache.fresh(&"q"), Some(&1));
    }

    #[test]
    fn test_clear_rejects_earlier_tickets() {
        let mut cache: QueryCache<&str, u32> = QueryCache::new();
        let before = cache.issue("q", &[Tag::Movies]);
        cache.clear();
        let after = cache.issue("q", &[Tag::Movies]);

        assert!(!cache.complete(&before, 1));
        assert!(cache.complete(&after, 2));
        assert_eq!(cache.fresh(&"q"), Some(&2));
    }

    #[test]
    fn test_remove_forgets_key() {
        let mut cache: QueryCache<&str, u32> = QueryCache::new();
        let ticket = cache.issue("q", &[Tag::Movies]);
        cache.complete(&ticket, 1);
        cache.remove(&"q");
        assert!(cache.is_empty());
        assert!(cache.invalidate(&[Tag::Movies]).is_empty());
    }
}
