/*!
 * Repository layer for database operations.
 *
 * High-level, type-safe API over the jobs, chunks, translation_cache and
 * accounts tables. All async methods run their SQL on the blocking pool.
 */

use anyhow::Result;
use log::debug;
use rusqlite::{Connection, OptionalExtension, params};

use super::connection::DatabaseConnection;
use super::models::{AccountRecord, CacheEntry};
use crate::job::{Chunk, JobStatus, TranslationJob};

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Access the underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Job Operations
    // =========================================================================

    /// Insert a new job
    pub async fn insert_job(&self, job: &TranslationJob) -> Result<()> {
        let job = job.clone();

        self.db
            .execute_async(move |conn| {
                let glossary_json = job
                    .glossary
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;

                conn.execute(
                    r#"
                    INSERT INTO jobs (
                        id, account_id, source_text, total_characters, source_language,
                        target_language, glossary, preview, status, progress,
                        characters_billed, characters_saved, error_message,
                        created_at, started_at, completed_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                    "#,
                    params![
                        job.id,
                        job.account_id,
                        job.source_text,
                        job.total_characters,
                        job.source_language,
                        job.target_language,
                        glossary_json,
                        job.preview,
                        job.status.to_string(),
                        job.progress,
                        job.characters_billed,
                        job.characters_saved,
                        job.error_message,
                        job.created_at,
                        job.started_at,
                        job.completed_at,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Get a job by ID
    pub async fn get_job(&self, job_id: &str) -> Result<Option<TranslationJob>> {
        let job_id = job_id.to_string();

        self.db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(
                        r#"
                        SELECT id, account_id, source_text, total_characters, source_language,
                               target_language, glossary, preview, status, progress,
                               characters_billed, characters_saved, error_message,
                               created_at, started_at, completed_at
                        FROM jobs WHERE id = ?1
                        "#,
                        [job_id],
                        parse_job_row,
                    )
                    .optional()?;
                Ok(result)
            })
            .await
    }

    /// Persist a job snapshot produced by a state transition
    pub async fn update_job(&self, job: &TranslationJob) -> Result<()> {
        let job = job.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    UPDATE jobs
                    SET status = ?2, progress = ?3, characters_billed = ?4,
                        characters_saved = ?5, error_message = ?6,
                        started_at = ?7, completed_at = ?8
                    WHERE id = ?1
                    "#,
                    params![
                        job.id,
                        job.status.to_string(),
                        job.progress,
                        job.characters_billed,
                        job.characters_saved,
                        job.error_message,
                        job.started_at,
                        job.completed_at,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Update only the progress column of a running job
    pub async fn update_job_progress(&self, job_id: &str, progress: i64) -> Result<()> {
        let job_id = job_id.to_string();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "UPDATE jobs SET progress = ?2 WHERE id = ?1",
                    params![job_id, progress],
                )?;
                Ok(())
            })
            .await
    }

    /// IDs of all pending jobs, oldest first
    pub async fn list_pending_job_ids(&self) -> Result<Vec<String>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id FROM jobs WHERE status = 'pending' ORDER BY created_at ASC",
                )?;
                let ids = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                Ok(ids)
            })
            .await
    }

    /// Return jobs stuck in `processing` (e.g. after a crash) to `pending`.
    ///
    /// Their chunk rows are cleared so a re-run restarts chunking from
    /// scratch; chunks resolved before the interruption already populated
    /// the durable cache and cost nothing to re-serve.
    pub async fn reset_stale_jobs(&self) -> Result<i64> {
        self.db
            .transaction_async(|tx| {
                tx.execute(
                    "DELETE FROM chunks WHERE job_id IN (SELECT id FROM jobs WHERE status = 'processing')",
                    [],
                )?;
                let reset = tx.execute(
                    "UPDATE jobs SET status = 'pending', progress = 0, started_at = NULL WHERE status = 'processing'",
                    [],
                )?;
                debug!("Reset {} stale processing jobs to pending", reset);
                Ok(reset as i64)
            })
            .await
    }

    // =========================================================================
    // Chunk Operations
    // =========================================================================

    /// Insert a resolved or pending chunk row
    pub async fn insert_chunk(&self, chunk: &Chunk) -> Result<()> {
        let chunk = chunk.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO chunks (
                        job_id, chunk_order, original_text, translated_text,
                        cache_id, from_cache, character_count, resolved_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                    params![
                        chunk.job_id,
                        chunk.chunk_order,
                        chunk.original_text,
                        chunk.translated_text,
                        chunk.cache_id,
                        chunk.from_cache,
                        chunk.character_count,
                        chunk.resolved_at,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// All chunks of a job, in order
    pub async fn get_chunks(&self, job_id: &str) -> Result<Vec<Chunk>> {
        let job_id = job_id.to_string();

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT job_id, chunk_order, original_text, translated_text,
                           cache_id, from_cache, character_count, resolved_at
                    FROM chunks WHERE job_id = ?1 ORDER BY chunk_order ASC
                    "#,
                )?;
                let chunks = stmt
                    .query_map([job_id], parse_chunk_row)?
                    .collect::<rusqlite::Result<Vec<Chunk>>>()?;
                Ok(chunks)
            })
            .await
    }

    // =========================================================================
    // Translation Cache Operations
    // =========================================================================

    /// Look up a durable cache entry without touching its counters
    pub async fn peek_cache_entry(
        &self,
        text_hash: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<Option<CacheEntry>> {
        let text_hash = text_hash.to_string();
        let source_language = source_language.to_string();
        let target_language = target_language.to_string();

        self.db
            .execute_async(move |conn| {
                get_cache_entry_sync(conn, &text_hash, &source_language, &target_language)
            })
            .await
    }

    /// Look up a durable cache entry as a served hit: increments hit_count
    /// and refreshes last_used, returning the updated entry
    pub async fn touch_cache_entry(
        &self,
        text_hash: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<Option<CacheEntry>> {
        let text_hash = text_hash.to_string();
        let source_language = source_language.to_string();
        let target_language = target_language.to_string();

        self.db
            .transaction_async(move |tx| {
                let updated = tx.execute(
                    r#"
                    UPDATE translation_cache
                    SET hit_count = hit_count + 1, last_used = ?4
                    WHERE text_hash = ?1 AND source_language = ?2 AND target_language = ?3
                    "#,
                    params![
                        text_hash,
                        source_language,
                        target_language,
                        chrono::Utc::now().to_rfc3339(),
                    ],
                )?;
                if updated == 0 {
                    return Ok(None);
                }
                get_cache_entry_sync(tx, &text_hash, &source_language, &target_language)
            })
            .await
    }

    /// Idempotently insert a cache entry.
    ///
    /// A concurrent or earlier insert for the same key wins; the stored
    /// entry is returned either way, unchanged when it already existed.
    pub async fn insert_cache_entry(
        &self,
        text_hash: &str,
        original_text: &str,
        translated_text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<CacheEntry> {
        let text_hash = text_hash.to_string();
        let original_text = original_text.to_string();
        let translated_text = translated_text.to_string();
        let source_language = source_language.to_string();
        let target_language = target_language.to_string();

        self.db
            .transaction_async(move |tx| {
                let now = chrono::Utc::now().to_rfc3339();
                tx.execute(
                    r#"
                    INSERT INTO translation_cache (
                        text_hash, original_text, translated_text,
                        source_language, target_language, hit_count, created_at, last_used
                    ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)
                    ON CONFLICT(text_hash, source_language, target_language) DO NOTHING
                    "#,
                    params![
                        text_hash,
                        original_text,
                        translated_text,
                        source_language,
                        target_language,
                        now,
                    ],
                )?;

                get_cache_entry_sync(tx, &text_hash, &source_language, &target_language)?
                    .ok_or_else(|| anyhow::anyhow!("Cache entry vanished after insert"))
            })
            .await
    }

    /// Delete unused cache entries older than the cutoff, returning the
    /// text hashes of the deleted rows
    pub async fn evict_cache_entries(&self, cutoff_rfc3339: &str) -> Result<Vec<String>> {
        let cutoff = cutoff_rfc3339.to_string();

        self.db
            .transaction_async(move |tx| {
                let mut stmt = tx.prepare(
                    "SELECT text_hash FROM translation_cache WHERE last_used < ?1 AND hit_count = 0",
                )?;
                let hashes = stmt
                    .query_map([&cutoff], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                drop(stmt);

                tx.execute(
                    "DELETE FROM translation_cache WHERE last_used < ?1 AND hit_count = 0",
                    [&cutoff],
                )?;

                debug!("Evicted {} unused cache entries", hashes.len());
                Ok(hashes)
            })
            .await
    }

    /// Total entries and accumulated hits across the durable cache
    pub async fn cache_totals(&self) -> Result<(i64, i64)> {
        self.db
            .execute_async(|conn| {
                let totals = conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(hit_count), 0) FROM translation_cache",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                Ok(totals)
            })
            .await
    }

    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Create a credit account
    pub async fn create_account(&self, account: &AccountRecord) -> Result<()> {
        let account = account.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT INTO accounts (id, balance, created_at) VALUES (?1, ?2, ?3)",
                    params![account.id, account.balance, account.created_at],
                )?;
                Ok(())
            })
            .await
    }

    /// Current balance, None for unknown accounts
    pub async fn get_account_balance(&self, account_id: &str) -> Result<Option<i64>> {
        let account_id = account_id.to_string();

        self.db
            .execute_async(move |conn| {
                let balance = conn
                    .query_row(
                        "SELECT balance FROM accounts WHERE id = ?1",
                        [account_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(balance)
            })
            .await
    }

    /// Atomically debit an account; fails without mutating on
    /// insufficient funds or unknown account
    pub async fn debit_account(&self, account_id: &str, amount: i64) -> Result<()> {
        let account_id = account_id.to_string();

        self.db
            .execute_async(move |conn| {
                let updated = conn.execute(
                    "UPDATE accounts SET balance = balance - ?2 WHERE id = ?1 AND balance >= ?2",
                    params![account_id, amount],
                )?;
                if updated == 0 {
                    return Err(anyhow::anyhow!(
                        "Insufficient credits or unknown account: {}",
                        account_id
                    ));
                }
                Ok(())
            })
            .await
    }

    /// Atomically credit an account
    pub async fn credit_account(&self, account_id: &str, amount: i64) -> Result<()> {
        let account_id = account_id.to_string();

        self.db
            .execute_async(move |conn| {
                let updated = conn.execute(
                    "UPDATE accounts SET balance = balance + ?2 WHERE id = ?1",
                    params![account_id, amount],
                )?;
                if updated == 0 {
                    return Err(anyhow::anyhow!("Unknown account: {}", account_id));
                }
                Ok(())
            })
            .await
    }
}

fn get_cache_entry_sync(
    conn: &Connection,
    text_hash: &str,
    source_language: &str,
    target_language: &str,
) -> Result<Option<CacheEntry>> {
    let result = conn
        .query_row(
            r#"
            SELECT id, text_hash, original_text, translated_text,
                   source_language, target_language, hit_count, created_at, last_used
            FROM translation_cache
            WHERE text_hash = ?1 AND source_language = ?2 AND target_language = ?3
            "#,
            params![text_hash, source_language, target_language],
            |row| {
                Ok(CacheEntry {
                    id: row.get(0)?,
                    text_hash: row.get(1)?,
                    original_text: row.get(2)?,
                    translated_text: row.get(3)?,
                    source_language: row.get(4)?,
                    target_language: row.get(5)?,
                    hit_count: row.get(6)?,
                    created_at: row.get(7)?,
                    last_used: row.get(8)?,
                })
            },
        )
        .optional()?;
    Ok(result)
}

fn parse_job_row(row: &rusqlite::Row) -> rusqlite::Result<TranslationJob> {
    Ok(TranslationJob {
        id: row.get(0)?,
        account_id: row.get(1)?,
        source_text: row.get(2)?,
        total_characters: row.get(3)?,
        source_language: row.get(4)?,
        target_language: row.get(5)?,
        glossary: row
            .get::<_, Option<String>>(6)?
            .and_then(|s| serde_json::from_str(&s).ok()),
        preview: row.get(7)?,
        status: row
            .get::<_, String>(8)?
            .parse()
            .unwrap_or(JobStatus::Pending),
        progress: row.get(9)?,
        characters_billed: row.get(10)?,
        characters_saved: row.get(11)?,
        error_message: row.get(12)?,
        created_at: row.get(13)?,
        started_at: row.get(14)?,
        completed_at: row.get(15)?,
    })
}

fn parse_chunk_row(row: &rusqlite::Row) -> rusqlite::Result<Chunk> {
    Ok(Chunk {
        job_id: row.get(0)?,
        chunk_order: row.get(1)?,
        original_text: row.get(2)?,
        translated_text: row.get(3)?,
        cache_id: row.get(4)?,
        from_cache: row.get(5)?,
        character_count: row.get(6)?,
        resolved_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glossary::Glossary;
    use crate::job::NewJob;

    fn create_test_repo() -> Repository {
        Repository::new_in_memory().expect("Failed to create test repository")
    }

    fn sample_job() -> TranslationJob {
        TranslationJob::new(NewJob {
            account_id: "acct-1".to_string(),
            source_text: "Hello world. How are you?".to_string(),
            source_language: Some("en".to_string()),
            target_language: "pt".to_string(),
            glossary: Some(Glossary::identity(["Hello"])),
            preview: false,
        })
    }

    #[tokio::test]
    async fn test_insertJob_shouldRoundTripIncludingGlossary() {
        let repo = create_test_repo();
        let job = sample_job();

        repo.insert_job(&job).await.expect("Insert failed");

        let loaded = repo.get_job(&job.id).await.unwrap().expect("Job missing");
        assert_eq!(loaded.id, job.id);
        assert_eq!(loaded.status, JobStatus::Pending);
        assert_eq!(loaded.total_characters, job.total_characters);
        assert_eq!(loaded.glossary, job.glossary);
        assert_eq!(loaded.source_language.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn test_getJob_withUnknownId_shouldReturnNone() {
        let repo = create_test_repo();
        assert!(repo.get_job("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_updateJob_shouldPersistTransition() {
        let repo = create_test_repo();
        let job = sample_job();
        repo.insert_job(&job).await.unwrap();

        let started = job.start().unwrap();
        repo.update_job(&started).await.unwrap();

        let loaded = repo.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Processing);
        assert!(loaded.started_at.is_some());
    }

    #[tokio::test]
    async fn test_listPendingJobIds_shouldSkipNonPending() {
        let repo = create_test_repo();
        let pending = sample_job();
        let running = sample_job().start().unwrap();
        repo.insert_job(&pending).await.unwrap();
        repo.insert_job(&running).await.unwrap();

        let ids = repo.list_pending_job_ids().await.unwrap();
        assert_eq!(ids, vec![pending.id.clone()]);
    }

    #[tokio::test]
    async fn test_resetStaleJobs_shouldReturnProcessingJobsToPending() {
        let repo = create_test_repo();
        let job = sample_job().start().unwrap();
        repo.insert_job(&job).await.unwrap();
        repo.insert_chunk(&Chunk::new(&job.id, 0, "Hello world. ".to_string()))
            .await
            .unwrap();

        let reset = repo.reset_stale_jobs().await.unwrap();
        assert_eq!(reset, 1);

        let loaded = repo.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Pending);
        assert_eq!(loaded.progress, 0);
        assert!(loaded.started_at.is_none());
        assert!(repo.get_chunks(&job.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insertChunk_shouldRoundTripInOrder() {
        let repo = create_test_repo();
        let job = sample_job();
        repo.insert_job(&job).await.unwrap();

        let second = Chunk::new(&job.id, 1, "world".to_string());
        let first = Chunk::new(&job.id, 0, "Hello ".to_string()).resolve(
            "Olá ".to_string(),
            Some(3),
            true,
        );
        repo.insert_chunk(&second).await.unwrap();
        repo.insert_chunk(&first).await.unwrap();

        let chunks = repo.get_chunks(&job.id).await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_order, 0);
        assert_eq!(chunks[0].translated_text.as_deref(), Some("Olá "));
        assert_eq!(chunks[0].cache_id, Some(3));
        assert!(chunks[0].from_cache);
        assert_eq!(chunks[1].chunk_order, 1);
        assert!(chunks[1].translated_text.is_none());
    }

    #[tokio::test]
    async fn test_insertCacheEntry_shouldStartAtZeroHits() {
        let repo = create_test_repo();

        let entry = repo
            .insert_cache_entry("h1", "Hello", "Olá", "en", "pt")
            .await
            .unwrap();

        assert_eq!(entry.hit_count, 0);
        assert_eq!(entry.translated_text, "Olá");
        assert_eq!(entry.created_at, entry.last_used);
    }

    #[tokio::test]
    async fn test_insertCacheEntry_withExistingKey_shouldKeepFirstEntry() {
        let repo = create_test_repo();

        let first = repo
            .insert_cache_entry("h1", "Hello", "Olá", "en", "pt")
            .await
            .unwrap();
        let second = repo
            .insert_cache_entry("h1", "Hello", "Oi", "en", "pt")
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.translated_text, "Olá");
        assert_eq!(second.hit_count, 0);
    }

    #[tokio::test]
    async fn test_touchCacheEntry_shouldIncrementHitCount() {
        let repo = create_test_repo();
        repo.insert_cache_entry("h1", "Hello", "Olá", "en", "pt")
            .await
            .unwrap();

        let hit = repo
            .touch_cache_entry("h1", "en", "pt")
            .await
            .unwrap()
            .expect("Entry missing");
        assert_eq!(hit.hit_count, 1);

        let again = repo
            .touch_cache_entry("h1", "en", "pt")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.hit_count, 2);
    }

    #[tokio::test]
    async fn test_touchCacheEntry_withUnknownKey_shouldReturnNone() {
        let repo = create_test_repo();
        assert!(repo.touch_cache_entry("nope", "en", "pt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_evictCacheEntries_shouldOnlyDeleteUnusedOldEntries() {
        let repo = create_test_repo();
        repo.insert_cache_entry("old-unused", "a", "b", "en", "pt")
            .await
            .unwrap();
        repo.insert_cache_entry("old-hit", "c", "d", "en", "pt")
            .await
            .unwrap();
        repo.touch_cache_entry("old-hit", "en", "pt").await.unwrap();

        // everything inserted above is older than a future cutoff
        let cutoff = (chrono::Utc::now() + chrono::Duration::days(1)).to_rfc3339();
        let evicted = repo.evict_cache_entries(&cutoff).await.unwrap();

        assert_eq!(evicted, vec!["old-unused".to_string()]);
        assert!(repo.peek_cache_entry("old-unused", "en", "pt").await.unwrap().is_none());
        assert!(repo.peek_cache_entry("old-hit", "en", "pt").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cacheTotals_shouldSumEntriesAndHits() {
        let repo = create_test_repo();
        repo.insert_cache_entry("h1", "a", "b", "en", "pt").await.unwrap();
        repo.insert_cache_entry("h2", "c", "d", "en", "pt").await.unwrap();
        repo.touch_cache_entry("h1", "en", "pt").await.unwrap();
        repo.touch_cache_entry("h1", "en", "pt").await.unwrap();

        let (entries, hits) = repo.cache_totals().await.unwrap();
        assert_eq!(entries, 2);
        assert_eq!(hits, 2);
    }

    #[tokio::test]
    async fn test_debitAccount_shouldEnforceBalance() {
        let repo = create_test_repo();
        repo.create_account(&AccountRecord::new("acct-1", 100))
            .await
            .unwrap();

        repo.debit_account("acct-1", 60).await.unwrap();
        assert_eq!(repo.get_account_balance("acct-1").await.unwrap(), Some(40));

        // balance stays untouched on a failed debit
        assert!(repo.debit_account("acct-1", 50).await.is_err());
        assert_eq!(repo.get_account_balance("acct-1").await.unwrap(), Some(40));
    }

    #[tokio::test]
    async fn test_creditAccount_shouldIncreaseBalance() {
        let repo = create_test_repo();
        repo.create_account(&AccountRecord::new("acct-1", 0)).await.unwrap();

        repo.credit_account("acct-1", 25).await.unwrap();
        assert_eq!(repo.get_account_balance("acct-1").await.unwrap(), Some(25));

        assert!(repo.credit_account("ghost", 5).await.is_err());
        assert!(repo.get_account_balance("ghost").await.unwrap().is_none());
    }
}
