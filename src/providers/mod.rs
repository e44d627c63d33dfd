/*!
 * Translation provider implementations.
 *
 * A provider is the external machine translation service behind the
 * engine. The shipped implementations are the DeepL-style HTTP client
 * and a scripted mock for tests.
 */

use std::fmt::Debug;

use async_trait::async_trait;

use crate::errors::ProviderError;

/// Common trait for translation providers
///
/// Providers translate a single text fragment per call. Retries, rate
/// limiting and glossary handling live above this seam; a provider only
/// reports each attempt's outcome.
#[async_trait]
pub trait TranslationProvider: Send + Sync + Debug {
    /// Translate `text` into `target_language`.
    ///
    /// `source_language` of None asks the provider to detect the source.
    async fn translate(
        &self,
        text: &str,
        source_language: Option<&str>,
        target_language: &str,
    ) -> Result<String, ProviderError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

pub mod deepl;
pub mod mock;

pub use deepl::DeepLProvider;
pub use mock::MockProvider;
