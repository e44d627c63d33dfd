/*!
 * Job orchestration.
 *
 * Drives a translation job through its full pipeline: chunking, per-chunk
 * cache lookup, provider invocation, write-through caching, progress
 * reporting, and credit settlement. All collaborators are injected per
 * instance; there are no global singletons.
 */

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use log::{info, warn};

use crate::app_config::ChunkingConfig;
use crate::cache::TwoTierCache;
use crate::chunker::{self, ChunkText};
use crate::database::Repository;
use crate::errors::TranslationError;
use crate::job::{Chunk, JobStatus, NewJob, TranslationJob};
use crate::language_utils::{language_codes_match, normalize_language_code};
use crate::ledger::CreditLedger;
use crate::progress::{ProgressSink, ProgressSnapshot};
use crate::provider_client::RateLimitedProviderClient;

/// Outcome of draining the pending queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Jobs that reached `completed`
    pub completed: usize,
    /// Jobs that reached `failed`
    pub failed: usize,
}

/// The translation job pipeline
#[derive(Clone)]
pub struct Orchestrator {
    repository: Repository,
    cache: TwoTierCache,
    client: RateLimitedProviderClient,
    ledger: Arc<dyn CreditLedger>,
    progress: Arc<dyn ProgressSink>,
    chunking: ChunkingConfig,
    progress_ttl: Duration,
}

impl Orchestrator {
    pub fn new(
        repository: Repository,
        cache: TwoTierCache,
        client: RateLimitedProviderClient,
        ledger: Arc<dyn CreditLedger>,
        progress: Arc<dyn ProgressSink>,
        chunking: ChunkingConfig,
        progress_ttl: Duration,
    ) -> Self {
        Self {
            repository,
            cache,
            client,
            ledger,
            progress,
            chunking,
            progress_ttl,
        }
    }

    /// Validate and persist a new pending job
    pub async fn create_job(&self, mut params: NewJob) -> Result<TranslationJob, TranslationError> {
        params.target_language = normalize_language_code(&params.target_language)
            .map_err(|e| TranslationError::Validation(e.to_string()))?;
        if let Some(source) = &params.source_language {
            let source = normalize_language_code(source)
                .map_err(|e| TranslationError::Validation(e.to_string()))?;
            if language_codes_match(&source, &params.target_language) {
                return Err(TranslationError::Validation(format!(
                    "Source and target languages are both '{}'",
                    params.target_language
                )));
            }
            params.source_language = Some(source);
        }
        if params.account_id.trim().is_empty() {
            return Err(TranslationError::Validation(
                "Account id must not be empty".to_string(),
            ));
        }

        let job = TranslationJob::new(params);
        self.repository.insert_job(&job).await?;
        info!(
            "Created job {} ({} characters, {} -> {})",
            job.id,
            job.total_characters,
            job.source_language.as_deref().unwrap_or("auto"),
            job.target_language
        );
        Ok(job)
    }

    /// Run a pending job to a terminal state.
    ///
    /// Chunks are resolved strictly in order; the first terminal error
    /// fails the job and aborts the rest. Cache entries committed before
    /// a failure are kept.
    pub async fn run_job(&self, job_id: &str) -> Result<TranslationJob, TranslationError> {
        let job = self.job(job_id).await?;
        let job = job.start()?;
        self.repository.update_job(&job).await?;

        let chunk_texts = self.split_job(&job);
        let total_chunks = chunk_texts.len();
        let mut billed: i64 = 0;
        let mut saved: i64 = 0;

        for chunk_text in &chunk_texts {
            let (chunk, billed_delta, saved_delta) = match self.resolve_chunk(&job, chunk_text).await
            {
                Ok(resolved) => resolved,
                Err(e) => return self.fail_job(&job, e).await,
            };

            billed += billed_delta;
            saved += saved_delta;

            if let Err(e) = self.repository.insert_chunk(&chunk).await {
                return self.fail_job(&job, e.into()).await;
            }

            let progress = ((chunk_text.order + 1) * 100 / total_chunks) as i64;
            if let Err(e) = self.repository.update_job_progress(&job.id, progress).await {
                return self.fail_job(&job, e.into()).await;
            }
            self.push_progress(&job.id, progress, saved).await;
        }

        if !job.preview && billed > 0 {
            if let Err(e) = self.ledger.debit(&job.account_id, billed).await {
                return self
                    .fail_job(&job, TranslationError::Validation(format!(
                        "Credit settlement failed: {}",
                        e
                    )))
                    .await;
            }
        }

        let completed = job.complete(billed, saved)?;
        self.repository.update_job(&completed).await?;
        self.push_progress(&completed.id, 100, saved).await;

        info!(
            "Job {} completed: {} chunks, {} billed, {} saved",
            completed.id, total_chunks, billed, saved
        );
        Ok(completed)
    }

    /// Concatenation of a completed job's translated chunks, in order
    pub async fn assemble(&self, job_id: &str) -> Result<String, TranslationError> {
        let job = self.job(job_id).await?;
        if job.status != JobStatus::Completed {
            return Err(TranslationError::InvalidTransition(format!(
                "job {} is '{}', only completed jobs can be assembled",
                job.id, job.status
            )));
        }

        let chunks = self.repository.get_chunks(job_id).await?;
        Ok(chunks
            .iter()
            .filter_map(|c| c.translated_text.as_deref())
            .collect())
    }

    /// Fetch a job, JobNotFound when absent
    pub async fn job(&self, job_id: &str) -> Result<TranslationJob, TranslationError> {
        self.repository
            .get_job(job_id)
            .await?
            .ok_or_else(|| TranslationError::JobNotFound(job_id.to_string()))
    }

    /// Fetch a job's status, JobNotFound when absent
    pub async fn job_status(&self, job_id: &str) -> Result<JobStatus, TranslationError> {
        Ok(self.job(job_id).await?.status)
    }

    /// Drain all pending jobs with bounded concurrency.
    ///
    /// Jobs share the rate limiter, both cache tiers and the ledger; a
    /// failing job never stops the drain.
    pub async fn run_pending(&self, concurrency: usize) -> Result<RunSummary, TranslationError> {
        let ids = self.repository.list_pending_job_ids().await?;
        let mut summary = RunSummary::default();

        let mut outcomes = futures::stream::iter(ids.into_iter().map(|id| {
            let orchestrator = self.clone();
            async move { orchestrator.run_job(&id).await }
        }))
        .buffer_unordered(concurrency.max(1));

        while let Some(outcome) = outcomes.next().await {
            match outcome {
                Ok(_) => summary.completed += 1,
                Err(e) => {
                    warn!("Job failed during drain: {}", e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    fn split_job(&self, job: &TranslationJob) -> Vec<ChunkText> {
        if job.preview {
            chunker::split_preview(
                &job.source_text,
                self.chunking.max_chunk_size,
                job.glossary.as_ref(),
                self.chunking.preview_max_chunks,
                self.chunking.preview_max_chars,
            )
        } else {
            chunker::split(
                &job.source_text,
                self.chunking.max_chunk_size,
                job.glossary.as_ref(),
            )
        }
    }

    /// Resolve one chunk: serve it from the cache, or translate and
    /// write through. Returns the chunk row plus its billed/saved deltas.
    async fn resolve_chunk(
        &self,
        job: &TranslationJob,
        chunk_text: &ChunkText,
    ) -> Result<(Chunk, i64, i64), TranslationError> {
        let source = job.source_language.as_deref();
        let chunk = Chunk::new(&job.id, chunk_text.order as i64, chunk_text.text.clone());
        let characters = chunk.character_count;

        if let Some(hit) = self
            .cache
            .lookup(&chunk_text.text, source, &job.target_language)
            .await
        {
            let chunk = chunk.resolve(hit.translated_text, Some(hit.cache_id), true);
            return Ok((chunk, 0, characters));
        }

        let translated = self
            .client
            .translate(
                &chunk_text.text,
                source,
                &job.target_language,
                job.glossary.as_ref(),
            )
            .await?;

        let entry = self
            .cache
            .store(&chunk_text.text, &translated, source, &job.target_language)
            .await?;

        let chunk = chunk.resolve(translated, Some(entry.id), false);
        Ok((chunk, characters, 0))
    }

    /// Persist the failure and surface the causing error. A failure to
    /// persist is logged; the causing error always wins.
    async fn fail_job(
        &self,
        job: &TranslationJob,
        error: TranslationError,
    ) -> Result<TranslationJob, TranslationError> {
        warn!("Job {} failed: {}", job.id, error);
        match job.fail(&error.to_string()) {
            Ok(failed) => {
                if let Err(e) = self.repository.update_job(&failed).await {
                    warn!("Could not persist failure of job {}: {}", job.id, e);
                }
            }
            Err(e) => warn!("Could not mark job {} failed: {}", job.id, e),
        }
        Err(error)
    }

    /// Fire-and-forget progress write
    async fn push_progress(&self, job_id: &str, progress: i64, saved: i64) {
        let snapshot = ProgressSnapshot::new(progress, saved);
        if let Err(e) = self.progress.put(job_id, snapshot, self.progress_ttl).await {
            warn!("Progress write failed for job {}: {}", job_id, e);
        }
    }
}
