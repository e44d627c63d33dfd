/*!
 * Scripted provider for tests.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::TranslationProvider;
use crate::errors::ProviderError;
use crate::language_utils::provider_language_code;

/// Scripted behavior of a [`MockProvider`]
#[derive(Debug, Clone)]
enum Behavior {
    /// Always succeed, tagging the text with the target language
    Working,
    /// Always fail with the given API status code
    Failing(u16),
    /// Fail with a network error for the first `n` calls, then succeed
    FailThenSucceed(usize),
}

/// Test provider with scripted outcomes and call recording
#[derive(Debug, Clone)]
pub struct MockProvider {
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    /// Provider that succeeds on every call
    pub fn working() -> Self {
        Self::with_behavior(Behavior::Working)
    }

    /// Provider that fails every call with the given status code
    pub fn failing(status_code: u16) -> Self {
        Self::with_behavior(Behavior::Failing(status_code))
    }

    /// Provider that fails the first `failures` calls with a transient
    /// network error and succeeds afterwards
    pub fn fail_then_succeed(failures: usize) -> Self {
        Self::with_behavior(Behavior::FailThenSucceed(failures))
    }

    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of translate calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Texts submitted so far, in call order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    /// The translation [`Self::working`] produces for a given input
    pub fn expected_translation(text: &str, target_language: &str) -> String {
        format!("[{}] {}", provider_language_code(target_language), text)
    }
}

#[async_trait]
impl TranslationProvider for MockProvider {
    async fn translate(
        &self,
        text: &str,
        _source_language: Option<&str>,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(text.to_string());

        match self.behavior {
            Behavior::Working => Ok(Self::expected_translation(text, target_language)),
            Behavior::Failing(status_code) => Err(ProviderError::ApiError {
                status_code,
                message: "scripted failure".to_string(),
            }),
            Behavior::FailThenSucceed(failures) if call < failures => Err(
                ProviderError::RequestFailed("scripted network failure".to_string()),
            ),
            Behavior::FailThenSucceed(_) => Ok(Self::expected_translation(text, target_language)),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_working_shouldTranslateAndRecordCalls() {
        let provider = MockProvider::working();
        let result = provider.translate("Hello", Some("en"), "pt").await.unwrap();
        assert_eq!(result, "[PT] Hello");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.requests(), vec!["Hello".to_string()]);
    }

    #[tokio::test]
    async fn test_failing_shouldReturnApiError() {
        let provider = MockProvider::failing(400);
        let result = provider.translate("Hello", None, "pt").await;
        match result {
            Err(ProviderError::ApiError { status_code, .. }) => assert_eq!(status_code, 400),
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failThenSucceed_shouldRecoverAfterConfiguredFailures() {
        let provider = MockProvider::fail_then_succeed(2);

        assert!(provider.translate("a", None, "pt").await.is_err());
        assert!(provider.translate("a", None, "pt").await.is_err());
        let result = provider.translate("a", None, "pt").await.unwrap();
        assert_eq!(result, "[PT] a");
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_clone_shouldShareCallCounter() {
        let provider = MockProvider::working();
        let clone = provider.clone();
        clone.translate("x", None, "pt").await.unwrap();
        assert_eq!(provider.call_count(), 1);
    }
}
