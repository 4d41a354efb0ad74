//! Decision cache
//!
//! Short-TTL memoization of routing decisions. Each fingerprint owns a slot
//! with its own async lock, so identical concurrent requests compute once
//! while different fingerprints never wait on each other.
//!
//! A fingerprint covers a whole token bucket, but a decision only holds for
//! the token counts that fit the same providers. Every entry carries that
//! range, and a slot keeps one entry per range it has seen.

use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::{clock::Clock, error::AppResult, types::ProviderChoice};

use super::Fingerprint;

/// Token counts a cached decision is valid for
pub type TokenRange = RangeInclusive<u64>;

/// Entry in the decision cache with expiration
#[derive(Debug, Clone)]
struct CacheEntry {
    choice: ProviderChoice,
    tokens: TokenRange,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Per-fingerprint state
///
/// `entries` is only ever held briefly; `flight` is held for the duration of
/// a computation so concurrent callers wait for its result.
#[derive(Default)]
struct Slot {
    entries: Mutex<Vec<CacheEntry>>,
    flight: tokio::sync::Mutex<()>,
}

impl Slot {
    fn fresh(&self, now: DateTime<Utc>, tokens: Option<u64>) -> Option<ProviderChoice> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.is_fresh(now))
            .find(|e| tokens.map_or(true, |t| e.tokens.contains(&t)))
            .map(|e| e.choice.clone())
    }

    fn store(&self, entry: CacheEntry, now: DateTime<Utc>) {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|e| {
            e.is_fresh(now)
                && (e.tokens.end() < entry.tokens.start() || e.tokens.start() > entry.tokens.end())
        });
        entries.push(entry);
    }
}

/// Whether a lookup was served from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
        }
    }
}

/// Single-flight cache of provider choices
pub struct DecisionCache {
    slots: DashMap<Fingerprint, Arc<Slot>>,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl DecisionCache {
    /// Create a cache whose entries live for `ttl`
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: DashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            clock,
        }
    }

    fn slot(&self, key: &Fingerprint) -> Arc<Slot> {
        self.slots.entry(key.clone()).or_default().clone()
    }

    /// Return the cached choice for `key` covering `tokens`, or compute and
    /// store it
    ///
    /// `compute` returns the choice together with the token range it holds
    /// for. At most one `compute` runs per key at a time; concurrent callers
    /// for the same key wait and receive its result. Errors are not cached.
    pub async fn get_or_compute<F>(
        &self,
        key: &Fingerprint,
        tokens: u64,
        compute: F,
    ) -> AppResult<(ProviderChoice, CacheStatus)>
    where
        F: FnOnce() -> AppResult<(ProviderChoice, TokenRange)>,
    {
        let slot = self.slot(key);

        if let Some(choice) = slot.fresh(self.clock.now(), Some(tokens)) {
            return Ok((choice, CacheStatus::Hit));
        }

        let _flight = slot.flight.lock().await;

        // Another caller may have filled the slot while we waited
        let now = self.clock.now();
        if let Some(choice) = slot.fresh(now, Some(tokens)) {
            return Ok((choice, CacheStatus::Hit));
        }

        let (choice, range) = compute()?;
        debug!(
            fingerprint = %key,
            provider = %choice.provider_id,
            min_tokens = range.start(),
            max_tokens = range.end(),
            "Cached routing decision"
        );
        slot.store(
            CacheEntry {
                choice: choice.clone(),
                tokens: range,
                expires_at: now + self.ttl,
            },
            now,
        );

        Ok((choice, CacheStatus::Miss))
    }

    /// A fresh cached choice for `key`, if any
    pub fn get(&self, key: &Fingerprint) -> Option<ProviderChoice> {
        let slot = self.slots.get(key)?.clone();
        slot.fresh(self.clock.now(), None)
    }

    /// Drop every entry for one fingerprint
    pub fn invalidate(&self, key: &Fingerprint) {
        if let Some(slot) = self.slots.get(key) {
            slot.entries.lock().unwrap().clear();
        }
    }

    /// Drop every entry whose primary choice is `provider_id`
    ///
    /// Returns the number of entries dropped.
    pub fn invalidate_provider(&self, provider_id: &str) -> usize {
        let mut dropped = 0;
        for slot in self.slots.iter() {
            let mut entries = slot.entries.lock().unwrap();
            let before = entries.len();
            entries.retain(|e| e.choice.provider_id != provider_id);
            dropped += before - entries.len();
        }
        if dropped > 0 {
            debug!(provider = %provider_id, dropped, "Invalidated cached decisions");
        }
        dropped
    }

    /// Drop every entry
    pub fn invalidate_all(&self) {
        for slot in self.slots.iter() {
            slot.entries.lock().unwrap().clear();
        }
    }

    /// Drop expired entries, then remove slots left with no entry and no
    /// computation in flight
    ///
    /// Returns the number of slots removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.slots.len();
        self.slots.retain(|_, slot| {
            let mut entries = slot.entries.lock().unwrap();
            entries.retain(|e| e.is_fresh(now));
            slot.flight.try_lock().is_err() || !entries.is_empty()
        });
        before.saturating_sub(self.slots.len())
    }

    /// Number of fingerprints tracked, fresh or not
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
