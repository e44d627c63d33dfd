/*!
 * Domain types for translation jobs.
 *
 * A job moves through an explicit state machine:
 * `pending -> processing -> completed | failed`. Transitions return a new
 * snapshot instead of mutating in place, and terminal states are absorbing.
 */

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::TranslationError;
use crate::glossary::Glossary;

/// Status of a translation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created but not yet picked up
    Pending,
    /// Currently being translated
    Processing,
    /// All chunks resolved and accounting settled
    Completed,
    /// Aborted on a terminal error
    Failed,
}

impl JobStatus {
    /// Whether this status admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// Parameters for creating a translation job
#[derive(Debug, Clone)]
pub struct NewJob {
    /// Owning account
    pub account_id: String,
    /// Full source document
    pub source_text: String,
    /// Source language, None for provider-side detection
    pub source_language: Option<String>,
    /// Target language
    pub target_language: String,
    /// Terms whose rendering is pinned during translation
    pub glossary: Option<Glossary>,
    /// Preview jobs translate only a prefix and are never billed
    pub preview: bool,
}

/// A translation job record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationJob {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Owning account
    pub account_id: String,
    /// Full source document
    pub source_text: String,
    /// Character count of the source document
    pub total_characters: i64,
    /// Source language, None when the provider detects it
    pub source_language: Option<String>,
    /// Target language
    pub target_language: String,
    /// Glossary applied to every chunk
    pub glossary: Option<Glossary>,
    /// Preview flag
    pub preview: bool,
    /// Current status
    pub status: JobStatus,
    /// Completion percentage, 0 to 100
    pub progress: i64,
    /// Characters paid for at the provider
    pub characters_billed: i64,
    /// Characters served from the cache
    pub characters_saved: i64,
    /// Error message for failed jobs
    pub error_message: Option<String>,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// When processing started
    pub started_at: Option<String>,
    /// When a terminal state was reached
    pub completed_at: Option<String>,
}

impl TranslationJob {
    /// Create a new pending job
    pub fn new(params: NewJob) -> Self {
        let total_characters = params.source_text.chars().count() as i64;
        Self {
            id: Uuid::new_v4().to_string(),
            account_id: params.account_id,
            source_text: params.source_text,
            total_characters,
            source_language: params.source_language,
            target_language: params.target_language,
            glossary: params.glossary,
            preview: params.preview,
            status: JobStatus::Pending,
            progress: 0,
            characters_billed: 0,
            characters_saved: 0,
            error_message: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Transition `pending -> processing`, returning the new snapshot
    pub fn start(&self) -> Result<Self, TranslationError> {
        if self.status != JobStatus::Pending {
            return Err(TranslationError::InvalidTransition(format!(
                "job {} cannot start from status '{}'",
                self.id, self.status
            )));
        }
        let mut next = self.clone();
        next.status = JobStatus::Processing;
        next.started_at = Some(chrono::Utc::now().to_rfc3339());
        Ok(next)
    }

    /// Transition `processing -> completed` with final accounting
    pub fn complete(&self, billed: i64, saved: i64) -> Result<Self, TranslationError> {
        if self.status != JobStatus::Processing {
            return Err(TranslationError::InvalidTransition(format!(
                "job {} cannot complete from status '{}'",
                self.id, self.status
            )));
        }
        let mut next = self.clone();
        next.status = JobStatus::Completed;
        next.progress = 100;
        next.characters_billed = billed;
        next.characters_saved = saved;
        next.completed_at = Some(chrono::Utc::now().to_rfc3339());
        Ok(next)
    }

    /// Transition `processing -> failed`, recording the error
    pub fn fail(&self, message: &str) -> Result<Self, TranslationError> {
        if self.status != JobStatus::Processing {
            return Err(TranslationError::InvalidTransition(format!(
                "job {} cannot fail from status '{}'",
                self.id, self.status
            )));
        }
        let mut next = self.clone();
        next.status = JobStatus::Failed;
        next.error_message = Some(message.to_string());
        next.completed_at = Some(chrono::Utc::now().to_rfc3339());
        Ok(next)
    }
}

/// A resolved or pending chunk of a job's source text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Owning job
    pub job_id: String,
    /// 0-based position within the job, contiguous
    pub chunk_order: i64,
    /// Slice of the source document
    pub original_text: String,
    /// Translation, None until resolved
    pub translated_text: Option<String>,
    /// Cache entry the translation came from, if any
    pub cache_id: Option<i64>,
    /// Whether the translation was served from the cache
    pub from_cache: bool,
    /// Character count of the original text
    pub character_count: i64,
    /// When the chunk was resolved (RFC 3339)
    pub resolved_at: Option<String>,
}

impl Chunk {
    /// Create an unresolved chunk
    pub fn new(job_id: &str, chunk_order: i64, original_text: String) -> Self {
        let character_count = original_text.chars().count() as i64;
        Self {
            job_id: job_id.to_string(),
            chunk_order,
            original_text,
            translated_text: None,
            cache_id: None,
            from_cache: false,
            character_count,
            resolved_at: None,
        }
    }

    /// Mark the chunk resolved with a translation
    pub fn resolve(mut self, translated: String, cache_id: Option<i64>, from_cache: bool) -> Self {
        self.translated_text = Some(translated);
        self.cache_id = cache_id;
        self.from_cache = from_cache;
        self.resolved_at = Some(chrono::Utc::now().to_rfc3339());
        self
    }
}
