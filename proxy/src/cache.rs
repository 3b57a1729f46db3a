use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;

/// Key-value store the fetch operations read through and write back to.
///
/// Implementations must be safe to share between requests. Entries are always
/// replaced whole; expiry policy belongs to the implementation.
pub trait ProxyCache: Send + Sync {
    fn get_feed(&self, uid: &str) -> Option<Bytes>;
    fn set_feed(&self, uid: &str, body: Bytes);
    fn get_image(&self, url: &str) -> Option<(Bytes, String)>;
    fn set_image(&self, url: &str, body: Bytes, content_type: &str);
}

struct Entry<T> {
    value: T,
    stored_at: Instant,
}

impl<T> Entry<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
        }
    }

    fn expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() >= ttl
    }
}

/// In-process cache with a separate TTL for feeds and images.
#[derive(Clone)]
pub struct MemoryCache {
    /// uid -> raw feed JSON
    feeds: Arc<DashMap<String, Entry<Bytes>>>,
    /// url -> (image bytes, content type)
    images: Arc<DashMap<String, Entry<(Bytes, String)>>>,
    pub feed_ttl: Duration,
    pub image_ttl: Duration,
}

impl MemoryCache {
    pub fn new(feed_ttl: Duration, image_ttl: Duration) -> Self {
        Self {
            feeds: Arc::new(DashMap::new()),
            images: Arc::new(DashMap::new()),
            feed_ttl,
            image_ttl,
        }
    }

    /// Drop every expired entry. Returns how many were removed.
    /// Call this from a background task.
    pub fn purge_expired(&self) -> usize {
        let before = self.len();
        self.feeds.retain(|_, e| !e.expired(self.feed_ttl));
        self.images.retain(|_, e| !e.expired(self.image_ttl));
        before.saturating_sub(self.len())
    }

    /// Stored entries, expired ones included until purged or read.
    pub fn len(&self) -> usize {
        self.feeds.len() + self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProxyCache for MemoryCache {
    fn get_feed(&self, uid: &str) -> Option<Bytes> {
        let expired = match self.feeds.get(uid) {
            Some(e) if !e.expired(self.feed_ttl) => return Some(e.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.feeds.remove_if(uid, |_, e| e.expired(self.feed_ttl));
        }
        None
    }

    fn set_feed(&self, uid: &str, body: Bytes) {
        self.feeds.insert(uid.to_string(), Entry::new(body));
    }

    fn get_image(&self, url: &str) -> Option<(Bytes, String)> {
        let expired = match self.images.get(url) {
            Some(e) if !e.expired(self.image_ttl) => return Some(e.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.images.remove_if(url, |_, e| e.expired(self.image_ttl));
        }
        None
    }

    fn set_image(&self, url: &str, body: Bytes, content_type: &str) {
        self.images.insert(
            url.to_string(),
            Entry::new((body, content_type.to_string())),
        );
    }
}
