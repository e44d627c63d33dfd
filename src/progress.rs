/*!
 * Progress reporting.
 *
 * The orchestrator pushes per-job snapshots to a [`ProgressSink`] after
 * every resolved chunk. Writes are fire-and-forget: a sink failure is
 * logged by the caller and never fails the job.
 */

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Point-in-time view of a running job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Completion percentage, 0 to 100
    pub progress_percent: i64,
    /// Characters served from the cache so far
    pub saved_chars: i64,
    /// Snapshot timestamp (RFC 3339)
    pub updated_at: String,
}

impl ProgressSnapshot {
    pub fn new(progress_percent: i64, saved_chars: i64) -> Self {
        Self {
            progress_percent,
            saved_chars,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Destination for job progress snapshots
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Publish the latest snapshot for a job, kept for at most `ttl`
    async fn put(&self, job_id: &str, snapshot: ProgressSnapshot, ttl: Duration) -> Result<()>;
}

/// TTL-expiring in-memory sink, inspectable in tests
#[derive(Default)]
pub struct InMemoryProgressSink {
    snapshots: RwLock<HashMap<String, (ProgressSnapshot, Instant)>>,
}

impl InMemoryProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest unexpired snapshot for a job
    pub fn get(&self, job_id: &str) -> Option<ProgressSnapshot> {
        let now = Instant::now();
        self.snapshots
            .read()
            .get(job_id)
            .filter(|(_, deadline)| *deadline > now)
            .map(|(snapshot, _)| snapshot.clone())
    }
}

#[async_trait]
impl ProgressSink for InMemoryProgressSink {
    async fn put(&self, job_id: &str, snapshot: ProgressSnapshot, ttl: Duration) -> Result<()> {
        let deadline = Instant::now() + ttl;
        self.snapshots
            .write()
            .insert(job_id.to_string(), (snapshot, deadline));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_shouldStoreLatestSnapshot() {
        let sink = InMemoryProgressSink::new();
        sink.put("job-1", ProgressSnapshot::new(25, 100), Duration::from_secs(60))
            .await
            .unwrap();
        sink.put("job-1", ProgressSnapshot::new(50, 250), Duration::from_secs(60))
            .await
            .unwrap();

        let snapshot = sink.get("job-1").expect("Snapshot missing");
        assert_eq!(snapshot.progress_percent, 50);
        assert_eq!(snapshot.saved_chars, 250);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_afterTtlElapsed_shouldReturnNone() {
        let sink = InMemoryProgressSink::new();
        sink.put("job-1", ProgressSnapshot::new(10, 0), Duration::from_secs(30))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(sink.get("job-1").is_none());
    }

    #[tokio::test]
    async fn test_get_withUnknownJob_shouldReturnNone() {
        let sink = InMemoryProgressSink::new();
        assert!(sink.get("nope").is_none());
    }
}
