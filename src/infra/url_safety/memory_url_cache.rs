// Process-local URL verdict cache.
//
// Bounded and TTL-based so staleness and memory growth stay explicit.
// Race-tolerant: a lost write only means one redundant external lookup.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::core::url_safety::UrlVerdictCache;

pub struct MemoryUrlCache {
    entries: DashMap<String, (bool, Instant)>,
    capacity: usize,
    ttl: Duration,
}

impl MemoryUrlCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
            ttl,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl UrlVerdictCache for MemoryUrlCache {
    fn get(&self, url: &str) -> Option<bool> {
        let expired = match self.entries.get(url) {
            Some(entry) => {
                if entry.value().1.elapsed() <= self.ttl {
                    return Some(entry.value().0);
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(url);
        }
        None
    }

    fn insert(&self, url: &str, is_safe: bool) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(url) {
            // Sweep expired entries; if the cache is still full, skip the
            // write rather than grow without bound.
            self.entries.retain(|_, (_, at)| at.elapsed() <= self.ttl);
            if self.entries.len() >= self.capacity {
                tracing::debug!(capacity = self.capacity, "URL cache full, dropping insert");
                return;
            }
        }
        self.entries.insert(url.to_string(), (is_safe, Instant::now()));
    }
}
