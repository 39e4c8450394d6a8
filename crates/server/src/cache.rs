//! Response cache for projected bridge payloads.
//!
//! The cache holds three independently invalidated regions:
//! - **Chats**: a single entry for the first page of the chat list
//! - **Contacts**: a single entry for the unfiltered contact list
//! - **Messages**: a map from [`MessageKey`] to a message-query result
//!
//! Every entry expires after a fixed TTL (30 seconds by default). Expiry is a
//! predicate evaluated on read; nothing is evicted in the background, and the
//! messages map only shrinks when it is invalidated.
//!
//! # Concurrency Model
//!
//! The cache is shared as `Arc<parking_lot::Mutex<ResponseCache>>` across all
//! tool invocations:
//!
//! - every read or write is a short critical section (a hash lookup or insert)
//! - the lock is never held across a bridge request, so a slow bridge does not
//!   stall unrelated calls
//! - two calls racing on the same key may both miss and both fetch; the later
//!   `put` wins, and no reader ever sees a partially written entry
//! - each region carries a generation that [`ResponseCache::invalidate`] bumps;
//!   a fetch that started before an invalidation stores its result through
//!   [`ResponseCache::put_if_current`] and is dropped instead of resurrecting
//!   pre-invalidation data

use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Fixed lifetime of a cached entry.
pub const CACHE_TTL: Duration = Duration::from_secs(30);

/// An independently invalidated partition of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheRegion {
    Chats,
    Contacts,
    Messages,
}

/// Structured key for the messages region.
///
/// Keys are compared field by field, so distinct parameter combinations can
/// never alias one another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// Message listing, optionally scoped to one chat.
    Listing {
        chat_jid: Option<String>,
        limit: u32,
        offset: u32,
    },
    /// History lookup for one chat.
    History { chat_jid: String, limit: u32 },
}

/// Address of a single cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Chats,
    Contacts,
    Messages(MessageKey),
}

impl CacheKey {
    pub fn region(&self) -> CacheRegion {
        match self {
            CacheKey::Chats => CacheRegion::Chats,
            CacheKey::Contacts => CacheRegion::Contacts,
            CacheKey::Messages(_) => CacheRegion::Messages,
        }
    }
}

/// A stored payload and the moment it was written.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Value,
    pub stored_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// In-memory TTL cache for projected tool results.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    chats: Option<CacheEntry>,
    contacts: Option<CacheEntry>,
    messages: HashMap<MessageKey, CacheEntry>,
    generations: [u64; 3],
}

impl CacheRegion {
    fn index(self) -> usize {
        match self {
            CacheRegion::Chats => 0,
            CacheRegion::Contacts => 1,
            CacheRegion::Messages => 2,
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    /// Creates an empty cache with the standard 30 second TTL.
    pub fn new() -> Self {
        Self::new_with_ttl(CACHE_TTL)
    }

    /// Creates an empty cache with a custom TTL.
    pub fn new_with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            chats: None,
            contacts: None,
            messages: HashMap::new(),
            generations: [0; 3],
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the entry at `key`, fresh or stale.
    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        match key {
            CacheKey::Chats => self.chats.as_ref(),
            CacheKey::Contacts => self.contacts.as_ref(),
            CacheKey::Messages(k) => self.messages.get(k),
        }
    }

    /// True iff an entry exists at `key` and is younger than the TTL.
    pub fn is_valid(&self, key: &CacheKey) -> bool {
        self.get(key).is_some_and(|e| e.is_fresh(self.ttl))
    }

    /// Returns a copy of the payload at `key` if it is still fresh.
    pub fn fresh(&self, key: &CacheKey) -> Option<Value> {
        let hit = self
            .get(key)
            .filter(|e| e.is_fresh(self.ttl))
            .map(|e| e.data.clone());
        tracing::debug!(
            target: "wamcp::cache",
            key = ?key,
            hit = hit.is_some(),
            "cache lookup"
        );
        hit
    }

    /// Stores `value` at `key`, replacing any previous entry.
    pub fn put(&mut self, key: CacheKey, value: Value) {
        let entry = CacheEntry {
            data: value,
            stored_at: Instant::now(),
        };
        tracing::debug!(target: "wamcp::cache", key = ?key, "cache store");
        match key {
            CacheKey::Chats => self.chats = Some(entry),
            CacheKey::Contacts => self.contacts = Some(entry),
            CacheKey::Messages(k) => {
                self.messages.insert(k, entry);
            }
        }
    }

    /// Current invalidation generation of `region`.
    pub fn generation(&self, region: CacheRegion) -> u64 {
        self.generations[region.index()]
    }

    /// Stores `value` only if `key`'s region has not been invalidated since
    /// `generation` was read. Returns whether the value was stored.
    pub fn put_if_current(&mut self, key: CacheKey, value: Value, generation: u64) -> bool {
        if self.generation(key.region()) != generation {
            tracing::debug!(
                target: "wamcp::cache",
                key = ?key,
                "discarding fetch older than invalidation"
            );
            return false;
        }
        self.put(key, value);
        true
    }

    /// Clears one region, or every region when `region` is `None`.
    pub fn invalidate(&mut self, region: Option<CacheRegion>) {
        tracing::debug!(target: "wamcp::cache", region = ?region, "cache invalidate");
        let regions = match region {
            Some(r) => vec![r],
            None => vec![CacheRegion::Chats, CacheRegion::Contacts, CacheRegion::Messages],
        };
        for r in regions {
            match r {
                CacheRegion::Chats => self.chats = None,
                CacheRegion::Contacts => self.contacts = None,
                CacheRegion::Messages => self.messages.clear(),
            }
            self.generations[r.index()] += 1;
        }
    }

    /// Number of entries currently held in the messages region.
    pub fn message_entry_count(&self) -> usize {
        self.messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing(chat: Option<&str>, limit: u32, offset: u32) -> CacheKey {
        CacheKey::Messages(MessageKey::Listing {
            chat_jid: chat.map(str::to_string),
            limit,
            offset,
        })
    }

    fn history(chat: &str, limit: u32) -> CacheKey {
        CacheKey::Messages(MessageKey::History {
            chat_jid: chat.to_string(),
            limit,
        })
    }

    #[test]
    fn empty_cache_has_no_valid_entries() {
        let cache = ResponseCache::new();
        assert!(!cache.is_valid(&CacheKey::Chats));
        assert!(!cache.is_valid(&CacheKey::Contacts));
        assert!(!cache.is_valid(&listing(Some("a@s.whatsapp.net"), 50, 0)));
        assert!(cache.get(&CacheKey::Chats).is_none());
    }

    #[test]
    fn put_then_get_returns_same_value() {
        let mut cache = ResponseCache::new();
        let key = listing(Some("a@s.whatsapp.net"), 50, 0);
        let payload = json!({ "success": true, "messages": [{ "id": "1" }], "count": 1 });

        cache.put(key.clone(), payload.clone());

        assert!(cache.is_valid(&key));
        assert_eq!(cache.fresh(&key), Some(payload.clone()));
        assert_eq!(cache.get(&key).map(|e| &e.data), Some(&payload));
    }

    #[test]
    fn entries_expire_after_ttl() {
        let mut cache = ResponseCache::new_with_ttl(Duration::from_millis(20));
        cache.put(CacheKey::Chats, json!({ "chats": [] }));
        assert!(cache.is_valid(&CacheKey::Chats));

        std::thread::sleep(Duration::from_millis(40));

        assert!(!cache.is_valid(&CacheKey::Chats));
        assert!(cache.fresh(&CacheKey::Chats).is_none());
        // Stale entries remain readable until overwritten or invalidated.
        assert!(cache.get(&CacheKey::Chats).is_some());
    }

    #[test]
    fn zero_ttl_is_never_valid() {
        let mut cache = ResponseCache::new_with_ttl(Duration::ZERO);
        cache.put(CacheKey::Contacts, json!({}));
        assert!(!cache.is_valid(&CacheKey::Contacts));
    }

    #[test]
    fn put_refreshes_stale_entry() {
        let mut cache = ResponseCache::new_with_ttl(Duration::from_millis(20));
        cache.put(CacheKey::Contacts, json!({ "v": 1 }));
        std::thread::sleep(Duration::from_millis(40));
        assert!(!cache.is_valid(&CacheKey::Contacts));

        cache.put(CacheKey::Contacts, json!({ "v": 2 }));
        assert_eq!(cache.fresh(&CacheKey::Contacts), Some(json!({ "v": 2 })));
    }

    #[test]
    fn message_keys_do_not_alias() {
        let mut cache = ResponseCache::new();
        cache.put(listing(Some("a:b"), 50, 0), json!("listing"));
        cache.put(history("a:b", 50), json!("history"));
        cache.put(listing(None, 50, 0), json!("recent"));
        cache.put(listing(Some(""), 50, 0), json!("empty-jid"));
        cache.put(listing(Some("a:b"), 5, 0), json!("limit-5"));

        assert_eq!(cache.message_entry_count(), 5);
        assert_eq!(cache.fresh(&listing(Some("a:b"), 50, 0)), Some(json!("listing")));
        assert_eq!(cache.fresh(&history("a:b", 50)), Some(json!("history")));
        assert_eq!(cache.fresh(&listing(None, 50, 0)), Some(json!("recent")));
        assert_eq!(cache.fresh(&listing(Some("a:b"), 5, 0)), Some(json!("limit-5")));
        assert!(cache.fresh(&listing(Some("a:b"), 50, 10)).is_none());
    }

    #[test]
    fn invalidate_messages_leaves_other_regions() {
        let mut cache = ResponseCache::new();
        cache.put(CacheKey::Chats, json!("chats"));
        cache.put(CacheKey::Contacts, json!("contacts"));
        cache.put(listing(Some("a"), 50, 0), json!("m1"));
        cache.put(history("b", 20), json!("m2"));

        cache.invalidate(Some(CacheRegion::Messages));

        assert_eq!(cache.message_entry_count(), 0);
        assert!(!cache.is_valid(&listing(Some("a"), 50, 0)));
        assert!(cache.get(&history("b", 20)).is_none());
        assert!(cache.is_valid(&CacheKey::Chats));
        assert!(cache.is_valid(&CacheKey::Contacts));
    }

    #[test]
    fn invalidate_single_region() {
        let mut cache = ResponseCache::new();
        cache.put(CacheKey::Chats, json!("chats"));
        cache.put(CacheKey::Contacts, json!("contacts"));
        cache.put(listing(None, 50, 0), json!("m"));

        cache.invalidate(Some(CacheRegion::Contacts));

        assert!(cache.get(&CacheKey::Contacts).is_none());
        assert!(cache.is_valid(&CacheKey::Chats));
        assert!(cache.is_valid(&listing(None, 50, 0)));

        cache.invalidate(Some(CacheRegion::Chats));
        assert!(cache.get(&CacheKey::Chats).is_none());
        assert!(cache.is_valid(&listing(None, 50, 0)));
    }

    #[test]
    fn invalidate_all_clears_everything() {
        let mut cache = ResponseCache::new();
        cache.put(CacheKey::Chats, json!("chats"));
        cache.put(CacheKey::Contacts, json!("contacts"));
        cache.put(history("a", 50), json!("m"));

        cache.invalidate(None);

        assert!(cache.get(&CacheKey::Chats).is_none());
        assert!(cache.get(&CacheKey::Contacts).is_none());
        assert_eq!(cache.message_entry_count(), 0);
    }

    #[test]
    fn put_if_current_drops_writes_from_before_invalidation() {
        let mut cache = ResponseCache::new();
        let messages_gen = cache.generation(CacheRegion::Messages);
        let chats_gen = cache.generation(CacheRegion::Chats);

        cache.invalidate(Some(CacheRegion::Messages));

        assert!(!cache.put_if_current(listing(Some("a"), 50, 0), json!("old"), messages_gen));
        assert_eq!(cache.message_entry_count(), 0);

        // Other regions keep their generation.
        assert!(cache.put_if_current(CacheKey::Chats, json!("chats"), chats_gen));
        assert!(cache.is_valid(&CacheKey::Chats));

        let fresh_gen = cache.generation(CacheRegion::Messages);
        assert!(cache.put_if_current(listing(Some("a"), 50, 0), json!("new"), fresh_gen));
        assert_eq!(cache.message_entry_count(), 1);
    }

    #[test]
    fn invalidate_all_bumps_every_generation() {
        let mut cache = ResponseCache::new();
        cache.invalidate(None);
        assert_eq!(cache.generation(CacheRegion::Chats), 1);
        assert_eq!(cache.generation(CacheRegion::Contacts), 1);
        assert_eq!(cache.generation(CacheRegion::Messages), 1);
    }

    #[test]
    fn key_region_mapping() {
        assert_eq!(CacheKey::Chats.region(), CacheRegion::Chats);
        assert_eq!(CacheKey::Contacts.region(), CacheRegion::Contacts);
        assert_eq!(history("a", 1).region(), CacheRegion::Messages);
    }
}
