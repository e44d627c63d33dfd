use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::time::Instant;

/// Volatile key-value tier with per-entry time-to-live.
///
/// Implementations are external collaborators (an in-process map here, a
/// networked store in other deployments), so every operation can fail;
/// callers treat failure as a miss.
#[async_trait]
pub trait VolatileCache: Send + Sync {
    /// Fetch a value, None on miss or expiry
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a value for at most `ttl`
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Remove a value if present
    async fn delete(&self, key: &str) -> Result<()>;
}

/// In-process TTL map implementation
#[derive(Default)]
pub struct InMemoryVolatileCache {
    entries: RwLock<HashMap<String, (Vec<u8>, Instant)>>,
}

impl InMemoryVolatileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().values().filter(|(_, d)| *d > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VolatileCache for InMemoryVolatileCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some((value, deadline)) if *deadline > now => return Ok(Some(value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // expired, drop it
        self.entries.write().remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let deadline = Instant::now() + ttl;
        let mut entries = self.entries.write();
        let now = Instant::now();
        entries.retain(|_, (_, d)| *d > now);
        entries.insert(key.to_string(), (value, deadline));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_afterSet_shouldReturnValue() {
        let cache = InMemoryVolatileCache::new();
        cache
            .set("k", b"value".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"value".to_vec()));
    }

    #[tokio::test]
    async fn test_get_withUnknownKey_shouldReturnNone() {
        let cache = InMemoryVolatileCache::new();
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_afterTtlElapsed_shouldReturnNone() {
        let cache = InMemoryVolatileCache::new();
        cache
            .set("k", b"value".to_vec(), Duration::from_secs(10))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(cache.get("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("k").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_delete_shouldRemoveEntry() {
        let cache = InMemoryVolatileCache::new();
        cache
            .set("k", b"value".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_shouldOverwriteExistingValue() {
        let cache = InMemoryVolatileCache::new();
        cache
            .set("k", b"old".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set("k", b"new".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"new".to_vec()));
        assert_eq!(cache.len(), 1);
    }
}
