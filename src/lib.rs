/*!
 * # tradux - document translation orchestration and caching engine
 *
 * A Rust library for translating long documents through an external
 * machine translation provider, with aggressive reuse of previously
 * computed translations.
 *
 * ## Features
 *
 * - Paragraph/sentence-aware chunking of long documents
 * - Two-tier translation cache (volatile TTL tier over a durable
 *   SQLite store) keyed by normalized content hashes
 * - Glossary term protection around every provider call
 * - Rate-limited, retrying provider invocation with exponential backoff
 * - Credit accounting: characters billed at the provider vs. characters
 *   saved by the cache
 * - Per-job progress snapshots with TTL
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `chunker`: Document splitting
 * - `cache`: Cache key derivation and the two-tier cache
 * - `glossary`: Placeholder protection for pinned terms
 * - `providers`: Translation provider clients
 * - `provider_client`: Rate limiting, retries and glossary wrapping
 * - `rate_limit`: The sliding-window limiter and backoff policy
 * - `database`: SQLite persistence (jobs, chunks, cache, accounts)
 * - `ledger`: Credit accounting
 * - `progress`: Progress snapshot sinks
 * - `orchestrator`: The job pipeline
 * - `job`: Job and chunk domain types
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the engine
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod cache;
pub mod chunker;
pub mod database;
pub mod errors;
pub mod glossary;
pub mod job;
pub mod language_utils;
pub mod ledger;
pub mod orchestrator;
pub mod progress;
pub mod provider_client;
pub mod providers;
pub mod rate_limit;

// Re-export main types for easier usage
pub use app_config::Config;
pub use cache::{TwoTierCache, VolatileCache};
pub use database::Repository;
pub use errors::{ProviderError, TranslationError};
pub use job::{JobStatus, NewJob, TranslationJob};
pub use orchestrator::Orchestrator;
