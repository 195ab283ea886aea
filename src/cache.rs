//! In-memory observation cache with read-time freshness and a periodic sweep.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::weather::{Coordinate, Field, Observation};

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    lat_milli: i64,
    lng_milli: i64,
    start: NaiveDate,
    end: NaiveDate,
    fields: Vec<Field>,
}

impl CacheKey {
    pub fn new(coordinate: Coordinate, start: NaiveDate, end: NaiveDate, fields: &[Field]) -> Self {
        let (lat_milli, lng_milli) = coordinate.rounded();
        Self {
            lat_milli,
            lng_milli,
            start,
            end,
            fields: fields.to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    observation: Observation,
    created: Instant,
}

#[derive(Debug)]
pub struct WeatherCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
    retention: Duration,
}

impl Default for WeatherCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_RETENTION)
    }
}

impl WeatherCache {
    pub fn new(ttl: Duration, retention: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            retention: retention.max(ttl),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    // Writes replace whole entries, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cached observation for `key` if it is younger than the TTL.
    pub fn get_fresh(&self, key: &CacheKey, now: Instant) -> Option<Observation> {
        self.lock()
            .get(key)
            .filter(|entry| now.saturating_duration_since(entry.created) < self.ttl)
            .map(|entry| entry.observation.clone())
    }

    /// Stores an observation; a later insert for the same key replaces it.
    pub fn insert(&self, key: CacheKey, observation: Observation, now: Instant) {
        self.lock().insert(
            key,
            CacheEntry {
                observation,
                created: now,
            },
        );
    }

    /// Drops entries older than the retention window and returns how many went.
    pub fn purge(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| now.saturating_duration_since(entry.created) <= self.retention);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Runs [`purge`](Self::purge) every `every` on the current tokio runtime.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + every, every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let purged = cache.purge(Instant::now());
                if purged > 0 {
                    tracing::debug!(purged, remaining = cache.len(), "swept weather cache");
                }
            }
        })
    }
}
