//! Admission decisions for client networks.

use std::time::{Duration, Instant};

use tracing::{debug, info, trace};

use super::network::NetworkKey;
use super::store::{ClientRecord, ClientStore};
use crate::config::LimitsConfig;
use crate::error::Result;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request may proceed
    Admit,
    /// The network is over budget or cooling down
    RateExceeded {
        /// How long the client should wait before retrying
        retry_after: Duration,
    },
}

impl Decision {
    /// Whether the request was admitted.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admit)
    }
}

/// Policy applied by the engine to every network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionPolicy {
    /// Requests per minute per network, also the bucket capacity
    pub limit_per_minute: u32,
    /// Time a network stays rejected once blocked
    pub cooldown: Duration,
    /// Prefix length that groups addresses into networks
    pub netmask: u8,
}

impl From<&LimitsConfig> for AdmissionPolicy {
    fn from(limits: &LimitsConfig) -> Self {
        Self {
            limit_per_minute: limits.limit_per_minute,
            cooldown: limits.cooldown_period(),
            netmask: limits.netmask,
        }
    }
}

/// Decides whether each request is admitted.
///
/// Networks move between three states. An unknown network gets a fresh
/// record and is admitted. An allowed network is admitted while its bucket has
/// credit and becomes blocked on the first request that finds it empty. A
/// blocked network is rejected without touching the bucket until the cooldown
/// has passed; after that the bucket decides, and an empty bucket restarts the
/// cooldown.
///
/// Every check runs as one critical section on the [`ClientStore`].
pub struct AdmissionEngine {
    /// Per-network state
    store: ClientStore,
    /// Limits applied to all networks
    policy: AdmissionPolicy,
}

impl AdmissionEngine {
    /// Create an engine with an empty store.
    pub fn new(policy: AdmissionPolicy) -> Self {
        Self {
            store: ClientStore::new(policy.limit_per_minute),
            policy,
        }
    }

    /// Check a request from `address` using the configured mask and the current time.
    pub fn check_request(&self, address: &str) -> Result<Decision> {
        self.decide(address, self.policy.netmask, Instant::now())
    }

    /// Check a request from `address` grouped under `mask` at instant `now`.
    ///
    /// Malformed addresses and masks fail before the store is touched.
    pub fn decide(&self, address: &str, mask: u8, now: Instant) -> Result<Decision> {
        let key = NetworkKey::resolve(address, mask)?;
        let cooldown = self.policy.cooldown;

        trace!(address, network = %key, "Checking admission");

        let admitted = self.store.with_record(key, now, |record| {
            Self::transition(record, key, cooldown, now)
        });

        if admitted {
            Ok(Decision::Admit)
        } else {
            Ok(Decision::RateExceeded { retry_after: cooldown })
        }
    }

    fn transition(record: &mut ClientRecord, key: NetworkKey, cooldown: Duration, now: Instant) -> bool {
        if record.blocked {
            let since = record.blocked_since.unwrap_or(now);
            if now.saturating_duration_since(since) < cooldown {
                return false;
            }
        }

        if record.limiter.allow(now) {
            if record.blocked {
                debug!(network = %key, "Cooldown over, network admitted again");
            }
            record.blocked = false;
            record.blocked_since = None;
            true
        } else {
            debug!(
                network = %key,
                restarted = record.blocked,
                cooldown_secs = cooldown.as_secs(),
                "Rate limit exceeded, network blocked"
            );
            record.blocked = true;
            record.blocked_since = Some(now);
            false
        }
    }

    /// Remove records unseen for longer than the cooldown period.
    ///
    /// Returns the number of records removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let horizon = self.policy.cooldown;
        self.store
            .delete_if(|_, record| now.saturating_duration_since(record.last_seen) > horizon)
    }

    /// Forget every tracked network.
    pub fn reset_all(&self) -> usize {
        let cleared = self.store.reset_all();
        info!(cleared, "All client limits cleared");
        cleared
    }

    /// Whether the network is currently marked blocked.
    pub fn is_blocked(&self, key: &NetworkKey) -> bool {
        self.store.snapshot(key).is_some_and(|record| record.blocked)
    }

    /// Number of networks currently tracked.
    pub fn tracked_networks(&self) -> usize {
        self.store.len()
    }

    /// The underlying record store.
    pub fn store(&self) -> &ClientStore {
        &self.store
    }
}
