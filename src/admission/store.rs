//! Per-network client records behind a single lock.

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::debug;

use super::bucket::TokenBucket;
use super::network::NetworkKey;

/// Tracking state for one client network.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    /// Rate accounting for the network
    pub limiter: TokenBucket,
    /// Whether the network is serving a cooldown
    pub blocked: bool,
    /// When the current cooldown began; only meaningful while `blocked`
    pub blocked_since: Option<Instant>,
    /// Most recent request seen from the network
    pub last_seen: Instant,
}

impl ClientRecord {
    fn new(rate_per_minute: u32, now: Instant) -> Self {
        Self {
            limiter: TokenBucket::new(rate_per_minute, now),
            blocked: false,
            blocked_since: None,
            last_seen: now,
        }
    }
}

/// Owner of every [`ClientRecord`].
///
/// All access goes through methods that hold the lock for the whole
/// read-modify-write, so no reference to a record outlives a critical section.
pub struct ClientStore {
    /// Records indexed by network key
    records: Mutex<HashMap<NetworkKey, ClientRecord>>,
    /// Budget given to buckets of newly created records
    rate_per_minute: u32,
}

impl ClientStore {
    /// Create an empty store whose new records refill at `rate_per_minute`.
    pub fn new(rate_per_minute: u32) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            rate_per_minute,
        }
    }

    /// Run `f` on the record for `key`, creating it first if absent.
    ///
    /// The lookup itself counts as a sighting: `last_seen` is set to `now`
    /// before `f` runs.
    pub fn with_record<R>(
        &self,
        key: NetworkKey,
        now: Instant,
        f: impl FnOnce(&mut ClientRecord) -> R,
    ) -> R {
        let mut records = self.records.lock();

        let record = records.entry(key).or_insert_with(|| {
            debug!(
                network = %key,
                limit_per_minute = self.rate_per_minute,
                "Creating new client record"
            );
            ClientRecord::new(self.rate_per_minute, now)
        });
        record.last_seen = now;

        f(record)
    }

    /// Remove every record matching `predicate`, returning how many were removed.
    pub fn delete_if(&self, mut predicate: impl FnMut(&NetworkKey, &ClientRecord) -> bool) -> usize {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|key, record| !predicate(key, record));
        before - records.len()
    }

    /// Discard all records, returning how many there were.
    pub fn reset_all(&self) -> usize {
        let mut records = self.records.lock();
        let count = records.len();
        records.clear();
        count
    }

    /// Copy of the record for `key`, if tracked. Does not count as a sighting.
    pub fn snapshot(&self, key: &NetworkKey) -> Option<ClientRecord> {
        self.records.lock().get(key).cloned()
    }

    /// Whether a record exists for `key`.
    pub fn contains(&self, key: &NetworkKey) -> bool {
        self.records.lock().contains_key(key)
    }

    /// Number of tracked networks.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether no networks are tracked.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}
