//! Two-tier response cache in front of model calls.
//!
//! Entries are content-addressed by `sha256("{call_kind}:{prompt}")`. Reads check the
//! in-process map first and fall back to the disk tier, promoting disk hits into memory.
//! Writes go to both tiers. An entry is served only while `now - created_at < ttl`;
//! expired entries are dropped from both tiers on read and by [`ResponseCache::sweep_expired`].

mod disk;

pub use disk::{CacheRecord, DiskTier};

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::CacheError;
use crate::types::CallKind;

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cache key: call kind plus prompt text, hashed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: CallKind,
    pub prompt: String,
    hash: String,
}

impl CacheKey {
    pub fn new(kind: CallKind, prompt: &str) -> Self {
        let hash = sha256_hex(&format!("{}:{}", kind.as_str(), prompt));
        Self {
            kind,
            prompt: prompt.to_string(),
            hash,
        }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    result: String,
    created_at: DateTime<Utc>,
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub expirations: u64,
    /// Percentage of reads that hit, two decimals.
    pub hit_rate: f64,
    pub memory_entries: usize,
    pub disk_entries: usize,
}

#[derive(Debug)]
pub struct ResponseCache {
    memory: DashMap<String, MemoryEntry>,
    disk: Option<DiskTier>,
    ttl: chrono::Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    expirations: AtomicU64,
}

impl ResponseCache {
    /// Create a cache. `cache_dir = None` keeps everything in memory.
    pub fn new(cache_dir: Option<PathBuf>, ttl: Duration) -> Self {
        Self {
            memory: DashMap::new(),
            disk: cache_dir.map(DiskTier::new),
            ttl: chrono::Duration::from_std(ttl)
                .unwrap_or_else(|_| chrono::Duration::days(365 * 100)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    pub fn memory_only(ttl: Duration) -> Self {
        Self::new(None, ttl)
    }

    pub fn disk(&self) -> Option<&DiskTier> {
        self.disk.as_ref()
    }

    fn is_fresh(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - created_at < self.ttl
    }

    pub fn get(&self, key: &CacheKey) -> Option<String> {
        self.get_at(key, Utc::now())
    }

    /// Look up `key` as of `now`.
    pub fn get_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<String> {
        let hash = key.hash();

        // Clone out so no map guard is held while evicting.
        let in_memory = self
            .memory
            .get(hash)
            .map(|e| (e.result.clone(), e.created_at));

        if let Some((result, created_at)) = in_memory {
            if self.is_fresh(created_at, now) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(call_kind = %key.kind, prompt_hash = %hash, tier = "memory", "Cache hit");
                return Some(result);
            }
            self.evict(hash);
            self.expirations.fetch_add(1, Ordering::Relaxed);
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(call_kind = %key.kind, prompt_hash = %hash, "Cache entry expired");
            return None;
        }

        if let Some(disk) = &self.disk {
            match disk.read(hash) {
                Ok(Some(record)) if self.is_fresh(record.timestamp, now) => {
                    self.memory.insert(
                        hash.to_string(),
                        MemoryEntry {
                            result: record.result.clone(),
                            created_at: record.timestamp,
                        },
                    );
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(call_kind = %key.kind, prompt_hash = %hash, tier = "disk", "Cache hit");
                    return Some(record.result);
                }
                Ok(Some(_)) => {
                    self.evict(hash);
                    self.expirations.fetch_add(1, Ordering::Relaxed);
                    debug!(call_kind = %key.kind, prompt_hash = %hash, "Cache entry expired");
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(prompt_hash = %hash, error = %e, "Ignoring unreadable cache record");
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(call_kind = %key.kind, prompt_hash = %hash, "Cache miss");
        None
    }

    pub fn set(&self, key: &CacheKey, result: &str) {
        self.set_at(key, result, Utc::now());
    }

    /// Store `result` under `key` with creation time `now`, in both tiers.
    pub fn set_at(&self, key: &CacheKey, result: &str, now: DateTime<Utc>) {
        let hash = key.hash();
        self.memory.insert(
            hash.to_string(),
            MemoryEntry {
                result: result.to_string(),
                created_at: now,
            },
        );

        if let Some(disk) = &self.disk {
            let record = CacheRecord {
                timestamp: now,
                call_kind: key.kind,
                prompt: key.prompt.clone(),
                result: result.to_string(),
            };
            if let Err(e) = disk.write(hash, &record) {
                warn!(prompt_hash = %hash, error = %e, "Failed to write cache record");
            }
        }

        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    /// Remove every entry expired as of `now` from both tiers. Returns the number of keys removed.
    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut expired: HashSet<String> = self
            .memory
            .iter()
            .filter(|e| !self.is_fresh(e.created_at, now))
            .map(|e| e.key().clone())
            .collect();

        if let Some(disk) = &self.disk {
            for hash in disk.hashes() {
                match disk.read(&hash) {
                    Ok(Some(record)) if !self.is_fresh(record.timestamp, now) => {
                        expired.insert(hash);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(prompt_hash = %hash, error = %e, "Skipping unreadable cache record");
                    }
                }
            }
        }

        for hash in &expired {
            self.evict(hash);
        }

        let count = expired.len();
        self.expirations.fetch_add(count as u64, Ordering::Relaxed);
        debug!(removed = count, "Swept expired cache entries");
        count
    }

    fn evict(&self, hash: &str) {
        self.memory.remove(hash);
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.remove(hash) {
                warn!(prompt_hash = %hash, error = %e, "Failed to remove cache record");
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let reads = hits + misses;
        let hit_rate = if reads == 0 {
            0.0
        } else {
            (hits as f64 / reads as f64 * 100.0 * 100.0).round() / 100.0
        };

        CacheStats {
            hits,
            misses,
            writes: self.writes.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            hit_rate,
            memory_entries: self.memory.len(),
            disk_entries: self.disk.as_ref().map(DiskTier::count).unwrap_or(0),
        }
    }

    /// Drop every entry in both tiers. Counters are kept.
    pub fn clear(&self) -> Result<(), CacheError> {
        self.memory.clear();
        if let Some(disk) = &self.disk {
            disk.clear()?;
        }
        Ok(())
    }
}

/// Compute SHA256 hash and return as hex string.
fn sha256_hex(input: &str) -> String {
    Sha256::digest(input.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
