/*!
 * Read-through/write-through cache over the volatile and durable tiers.
 *
 * The volatile tier is an optimization only: when it is unreachable the
 * cache degrades to durable-only behavior with a warning, and a lookup
 * never fails because of it.
 */

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::key;
use super::volatile::VolatileCache;
use crate::database::{CacheEntry, Repository};

/// Which tier served a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Volatile,
    Durable,
}

/// A successful cache lookup
#[derive(Debug, Clone)]
pub struct CacheHit {
    /// Cached translation
    pub translated_text: String,
    /// Durable row id of the entry
    pub cache_id: i64,
    /// Durable hit count as of this lookup
    pub hit_count: i64,
    /// Tier that answered
    pub tier: CacheTier,
}

/// Aggregate cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Durable entries stored
    pub total_entries: i64,
    /// Durable lookups served across all entries
    pub total_hits: i64,
    /// Hits over hits plus stored-on-miss entries
    pub hit_rate: f64,
}

/// Record mirrored into the volatile tier
#[derive(Debug, Serialize, Deserialize)]
struct VolatileRecord {
    translated_text: String,
    cache_id: i64,
    hit_count: i64,
}

/// Two-tier translation cache
#[derive(Clone)]
pub struct TwoTierCache {
    repository: Repository,
    volatile: Arc<dyn VolatileCache>,
    volatile_ttl: Duration,
}

impl TwoTierCache {
    pub fn new(repository: Repository, volatile: Arc<dyn VolatileCache>, volatile_ttl: Duration) -> Self {
        Self {
            repository,
            volatile,
            volatile_ttl,
        }
    }

    /// Look up a cached translation for a text fragment and language pair.
    ///
    /// Probes the volatile tier first and returns without touching the
    /// durable tier on a hit. A durable hit counts: hit_count is
    /// incremented, last_used refreshed, and the entry is mirrored back
    /// into the volatile tier. Errors on either tier are logged and
    /// resolve to a miss.
    pub async fn lookup(
        &self,
        text: &str,
        source_language: Option<&str>,
        target_language: &str,
    ) -> Option<CacheHit> {
        let cache_key = key::derive_key(text, source_language, target_language);
        let source = source_language.unwrap_or(key::AUTO_SOURCE);

        match self.volatile.get(&cache_key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<VolatileRecord>(&bytes) {
                Ok(record) => {
                    debug!("Volatile cache hit: {}", cache_key);
                    return Some(CacheHit {
                        translated_text: record.translated_text,
                        cache_id: record.cache_id,
                        hit_count: record.hit_count,
                        tier: CacheTier::Volatile,
                    });
                }
                Err(e) => {
                    warn!("Corrupt volatile cache record for {}: {}", cache_key, e);
                    if let Err(e) = self.volatile.delete(&cache_key).await {
                        warn!("Failed to drop corrupt volatile record: {}", e);
                    }
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!("Volatile cache unavailable, falling back to durable tier: {}", e);
            }
        }

        match self
            .repository
            .touch_cache_entry(&cache_key, source, target_language)
            .await
        {
            Ok(Some(entry)) => {
                debug!("Durable cache hit: {}, hits: {}", cache_key, entry.hit_count);
                self.mirror(&cache_key, &entry).await;
                Some(CacheHit {
                    translated_text: entry.translated_text,
                    cache_id: entry.id,
                    hit_count: entry.hit_count,
                    tier: CacheTier::Durable,
                })
            }
            Ok(None) => {
                debug!("Cache miss: {}", cache_key);
                None
            }
            Err(e) => {
                warn!("Durable cache lookup failed for {}: {}", cache_key, e);
                None
            }
        }
    }

    /// Store a translation in both tiers.
    ///
    /// Idempotent and atomic per key: an entry already stored for the
    /// same key is returned unchanged, hit_count untouched.
    pub async fn store(
        &self,
        original_text: &str,
        translated_text: &str,
        source_language: Option<&str>,
        target_language: &str,
    ) -> Result<CacheEntry> {
        let cache_key = key::derive_key(original_text, source_language, target_language);
        let source = source_language.unwrap_or(key::AUTO_SOURCE);

        let entry = self
            .repository
            .insert_cache_entry(
                &cache_key,
                original_text,
                translated_text,
                source,
                target_language,
            )
            .await?;

        self.mirror(&cache_key, &entry).await;

        debug!(
            "Cache stored: {}, {} characters",
            cache_key,
            original_text.chars().count()
        );
        Ok(entry)
    }

    /// Remove durable entries unused for longer than `older_than`
    /// (hit_count zero only), along with their volatile mirrors.
    /// Returns the number of entries evicted.
    pub async fn evict(&self, older_than: Duration) -> Result<usize> {
        let cutoff = (chrono::Utc::now()
            - chrono::Duration::from_std(older_than).unwrap_or(chrono::Duration::zero()))
        .to_rfc3339();

        let hashes = self.repository.evict_cache_entries(&cutoff).await?;
        for hash in &hashes {
            if let Err(e) = self.volatile.delete(hash).await {
                warn!("Failed to drop volatile mirror {}: {}", hash, e);
            }
        }
        Ok(hashes.len())
    }

    /// Aggregate statistics over the durable tier
    pub async fn stats(&self) -> Result<CacheStats> {
        let (total_entries, total_hits) = self.repository.cache_totals().await?;
        let lookups = total_entries + total_hits;
        let hit_rate = if lookups > 0 {
            total_hits as f64 / lookups as f64
        } else {
            0.0
        };
        Ok(CacheStats {
            total_entries,
            total_hits,
            hit_rate,
        })
    }

    /// Best-effort write of an entry into the volatile tier
    async fn mirror(&self, cache_key: &str, entry: &CacheEntry) {
        let record = VolatileRecord {
            translated_text: entry.translated_text.clone(),
            cache_id: entry.id,
            hit_count: entry.hit_count,
        };
        let bytes = match serde_json::to_vec(&record) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to serialize volatile record: {}", e);
                return;
            }
        };
        if let Err(e) = self
            .volatile
            .set(cache_key, bytes, self.volatile_ttl)
            .await
        {
            warn!("Failed to mirror cache entry into volatile tier: {}", e);
        }
    }
}
