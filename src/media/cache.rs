//! Time-bounded cache for folder listings.
//!
//! Entries are keyed by project and category. An entry older than the TTL
//! is treated as absent; there is no background sweeper.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use super::Category;
use crate::drive::RemoteFile;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cache key: one listing per project and category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub project_id: String,
    pub category: Category,
}

impl CacheKey {
    pub fn new(project_id: impl Into<String>, category: Category) -> Self {
        Self {
            project_id: project_id.into(),
            category,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    files: Vec<RemoteFile>,
    stored_at: Instant,
}

/// Listing cache with a fixed TTL.
pub struct FileListCache<C: Clock = SystemClock> {
    ttl: Duration,
    clock: C,
    entries: RwLock<HashMap<CacheKey, Entry>>,
}

impl FileListCache<SystemClock> {
    /// Create a cache on the wall clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<C: Clock> FileListCache<C> {
    /// Create a cache on a custom clock.
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached listing, if stored less than one TTL ago.
    pub fn get(&self, key: &CacheKey) -> Option<Vec<RemoteFile>> {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|e| now.saturating_duration_since(e.stored_at) < self.ttl)
            .map(|e| e.files.clone())
    }

    /// Store a listing, replacing any previous one.
    pub fn put(&self, key: CacheKey, files: Vec<RemoteFile>) {
        let stored_at = self.clock.now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // Expired entries are dropped opportunistically on write
        entries.retain(|_, e| stored_at.saturating_duration_since(e.stored_at) < self.ttl);
        entries.insert(key, Entry { files, stored_at });
    }

    /// Drop the listing for a key.
    pub fn invalidate(&self, key: &CacheKey) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
