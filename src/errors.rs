/*!
 * Error types for the tradux engine.
 *
 * This module contains custom error types for the different parts of the
 * translation pipeline, using the thiserror crate for ergonomic error
 * definitions. The taxonomy distinguishes transient provider failures
 * (retried with backoff) from terminal ones (failed fast).
 */

use thiserror::Error;

/// Errors that can occur when talking to the translation provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails (network-level)
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Terminal error after the retry budget is exhausted
    #[error("Provider failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// The last failure observed
        #[source]
        source: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Whether this failure is worth retrying with backoff.
    ///
    /// Network failures, server errors (5xx) and rate-limit responses (429)
    /// are transient; everything else fails fast.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::RequestFailed(_) => true,
            ProviderError::ApiError { status_code, .. } => {
                *status_code >= 500 || *status_code == 429
            }
            ProviderError::ParseError(_)
            | ProviderError::AuthenticationError(_)
            | ProviderError::RetriesExhausted { .. } => false,
        }
    }
}

/// Errors that can occur while running a translation job
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Invalid input: oversized payload, missing or unknown language
    #[error("Validation error: {0}")]
    Validation(String),

    /// Error from the provider, terminal after retries
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The requested job does not exist
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// An illegal job state transition was attempted
    #[error("Invalid job transition: {0}")]
    InvalidTransition(String),

    /// Error from the durable store
    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for TranslationError {
    fn from(error: anyhow::Error) -> Self {
        Self::Database(error.to_string())
    }
}
