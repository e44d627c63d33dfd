use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::TranslationProvider;
use crate::errors::ProviderError;
use crate::language_utils::provider_language_code;

/// HTTP client for the DeepL translation API
#[derive(Debug)]
pub struct DeepLProvider {
    /// Base URL of the API, e.g. `https://api-free.deepl.com/v2`
    base_url: String,
    /// API key sent as the DeepL-Auth-Key authorization credential
    api_key: String,
    /// HTTP client for making requests
    client: Client,
}

/// Translation request body
#[derive(Debug, Serialize)]
struct TranslateRequest {
    text: Vec<String>,
    target_lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_lang: Option<String>,
}

/// Translation response body
#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    text: String,
}

impl DeepLProvider {
    /// Create a new client, validating the endpoint URL up front
    pub fn new(
        endpoint: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let base_url = Url::parse(endpoint)
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid endpoint URL: {}", e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.to_string().trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }
}

#[async_trait]
impl TranslationProvider for DeepLProvider {
    async fn translate(
        &self,
        text: &str,
        source_language: Option<&str>,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let request = TranslateRequest {
            text: vec![text.to_string()],
            target_lang: provider_language_code(target_language),
            source_lang: source_language.map(provider_language_code),
        };

        debug!(
            "Sending translation request: {} characters to {}",
            text.chars().count(),
            request.target_lang
        );

        let response = self
            .client
            .post(format!("{}/translate", self.base_url))
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Translation API error ({}): {}", status, body);

            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(ProviderError::AuthenticationError(format!(
                    "API rejected credentials ({})",
                    status
                )));
            }
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: body,
            });
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Invalid response body: {}", e)))?;

        parsed
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| ProviderError::ParseError("Response carried no translations".to_string()))
    }

    fn name(&self) -> &str {
        "deepl"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_withValidEndpoint_shouldTrimTrailingSlash() {
        let provider =
            DeepLProvider::new("https://api-free.deepl.com/v2/", "key", Duration::from_secs(30))
                .unwrap();
        assert_eq!(provider.base_url, "https://api-free.deepl.com/v2");
        assert_eq!(provider.name(), "deepl");
    }

    #[test]
    fn test_new_withInvalidEndpoint_shouldFail() {
        let result = DeepLProvider::new("not a url", "key", Duration::from_secs(30));
        assert!(matches!(result, Err(ProviderError::RequestFailed(_))));
    }

    #[test]
    fn test_translateRequest_shouldSkipAbsentSourceLanguage() {
        let request = TranslateRequest {
            text: vec!["Hello".to_string()],
            target_lang: "PT".to_string(),
            source_lang: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("source_lang"));

        let with_source = TranslateRequest {
            text: vec!["Hello".to_string()],
            target_lang: "PT".to_string(),
            source_lang: Some("EN".to_string()),
        };
        let json = serde_json::to_string(&with_source).unwrap();
        assert!(json.contains("\"source_lang\":\"EN\""));
    }

    #[test]
    fn test_translateResponse_shouldParseTranslations() {
        let body = r#"{"translations":[{"detected_source_language":"EN","text":"Olá"}]}"#;
        let parsed: TranslateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.translations[0].text, "Olá");
    }

    #[tokio::test]
    async fn test_translate_withUnreachableEndpoint_shouldReturnRequestFailed() {
        let provider =
            DeepLProvider::new("http://127.0.0.1:1", "key", Duration::from_millis(200)).unwrap();
        let result = provider.translate("Hello", Some("en"), "pt").await;
        match result {
            Err(e) => assert!(e.is_transient()),
            Ok(_) => panic!("Expected a network failure"),
        }
    }
}
