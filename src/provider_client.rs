/*!
 * Rate-limited, retrying front over the translation provider.
 *
 * Every provider call goes through here: input validation, glossary
 * protection, the shared rate limiter, and retry-with-backoff for
 * transient failures.
 */

use std::sync::Arc;

use log::{debug, warn};

use crate::errors::{ProviderError, TranslationError};
use crate::glossary::{self, Glossary};
use crate::providers::TranslationProvider;
use crate::rate_limit::{BackoffPolicy, RateLimiter};

/// Provider client shared by all running jobs
#[derive(Clone)]
pub struct RateLimitedProviderClient {
    provider: Arc<dyn TranslationProvider>,
    limiter: Arc<RateLimiter>,
    backoff: BackoffPolicy,
    max_chars_per_request: usize,
}

impl RateLimitedProviderClient {
    pub fn new(
        provider: Arc<dyn TranslationProvider>,
        limiter: Arc<RateLimiter>,
        backoff: BackoffPolicy,
        max_chars_per_request: usize,
    ) -> Self {
        Self {
            provider,
            limiter,
            backoff,
            max_chars_per_request,
        }
    }

    /// Translate one text fragment.
    ///
    /// Blank input is returned unchanged without a provider call, so
    /// whitespace-only chunks survive reassembly. Oversized input fails
    /// fast. With a glossary, the provider only ever sees placeholder
    /// tokens in place of the pinned terms.
    pub async fn translate(
        &self,
        text: &str,
        source_language: Option<&str>,
        target_language: &str,
        glossary: Option<&Glossary>,
    ) -> Result<String, TranslationError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let char_count = text.chars().count();
        if char_count > self.max_chars_per_request {
            return Err(TranslationError::Validation(format!(
                "Input of {} characters exceeds the {} character request limit",
                char_count, self.max_chars_per_request
            )));
        }

        let protected = match glossary {
            Some(glossary) if !glossary.is_empty() => glossary::protect(text, glossary),
            _ => glossary::Protected {
                text: text.to_string(),
                placeholders: Vec::new(),
            },
        };

        let translated = self
            .call_with_retry(&protected.text, source_language, target_language)
            .await?;

        Ok(glossary::restore(&translated, &protected.placeholders))
    }

    /// One rate-limited provider call per attempt, retrying transient
    /// failures per the backoff policy
    async fn call_with_retry(
        &self,
        text: &str,
        source_language: Option<&str>,
        target_language: &str,
    ) -> Result<String, TranslationError> {
        let mut attempt: u32 = 0;

        loop {
            self.limiter.acquire().await;

            match self
                .provider
                .translate(text, source_language, target_language)
                .await
            {
                Ok(translated) => {
                    debug!(
                        "Provider {} translated {} characters on attempt {}",
                        self.provider.name(),
                        text.chars().count(),
                        attempt + 1
                    );
                    return Ok(translated);
                }
                Err(e) if e.is_transient() && attempt + 1 < self.backoff.max_attempts => {
                    let delay = self.backoff.delay_for(attempt);
                    warn!(
                        "Transient provider failure (attempt {}/{}), retrying in {:?}: {}",
                        attempt + 1,
                        self.backoff.max_attempts,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_transient() => {
                    return Err(ProviderError::RetriesExhausted {
                        attempts: attempt + 1,
                        source: Box::new(e),
                    }
                    .into());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockProvider;
    use std::time::Duration;
    use tokio::time::Instant;

    fn client_with(provider: MockProvider, backoff: BackoffPolicy) -> RateLimitedProviderClient {
        RateLimitedProviderClient::new(
            Arc::new(provider),
            Arc::new(RateLimiter::new(0)),
            backoff,
            1000,
        )
    }

    #[tokio::test]
    async fn test_translate_withBlankInput_shouldSkipProvider() {
        let provider = MockProvider::working();
        let client = client_with(provider.clone(), BackoffPolicy::default());

        assert_eq!(client.translate("", Some("en"), "pt", None).await.unwrap(), "");
        assert_eq!(
            client.translate("  \n ", Some("en"), "pt", None).await.unwrap(),
            "  \n "
        );
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_translate_withOversizedInput_shouldFailValidation() {
        let provider = MockProvider::working();
        let client = client_with(provider.clone(), BackoffPolicy::default());

        let result = client.translate(&"x".repeat(1001), None, "pt", None).await;
        assert!(matches!(result, Err(TranslationError::Validation(_))));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_translate_shouldHideGlossaryTermsFromProvider() {
        let provider = MockProvider::working();
        let client = client_with(provider.clone(), BackoffPolicy::default());
        let glossary = Glossary::identity(["Rivendell"]);

        let result = client
            .translate("Welcome to Rivendell", Some("en"), "pt", Some(&glossary))
            .await
            .unwrap();

        let submitted = provider.requests();
        assert!(!submitted[0].contains("Rivendell"));
        assert!(submitted[0].contains("GLOSSARY_TERM_"));
        assert!(result.contains("Rivendell"));
        assert!(!result.contains("GLOSSARY_TERM_"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_translate_withTransientFailures_shouldRetryWithIncreasingDelays() {
        let provider = MockProvider::fail_then_succeed(2);
        let backoff = BackoffPolicy::new(3, Duration::from_millis(100), 2);
        let client = client_with(provider.clone(), backoff);
        let start = Instant::now();

        let result = client.translate("Hello", Some("en"), "pt", None).await.unwrap();

        assert_eq!(result, "[PT] Hello");
        assert_eq!(provider.call_count(), 3);
        // 100ms after the first failure, 200ms after the second
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_translate_withPersistentTransientFailure_shouldExhaustRetries() {
        let provider = MockProvider::fail_then_succeed(100);
        let backoff = BackoffPolicy::new(3, Duration::from_millis(10), 2);
        let client = client_with(provider.clone(), backoff);

        let result = client.translate("Hello", Some("en"), "pt", None).await;

        assert_eq!(provider.call_count(), 3);
        match result {
            Err(TranslationError::Provider(ProviderError::RetriesExhausted {
                attempts, ..
            })) => assert_eq!(attempts, 3),
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_translate_withTerminalFailure_shouldNotRetry() {
        let provider = MockProvider::failing(400);
        let client = client_with(provider.clone(), BackoffPolicy::default());

        let result = client.translate("Hello", Some("en"), "pt", None).await;

        assert_eq!(provider.call_count(), 1);
        assert!(matches!(
            result,
            Err(TranslationError::Provider(ProviderError::ApiError { status_code: 400, .. }))
        ));
    }
}
