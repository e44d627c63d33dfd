use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// This module provides functions for validating and normalizing the
/// ISO 639-1 (2-letter) language codes carried by translation jobs and
/// cache entries, and for formatting codes the way the provider API
/// expects them (upper-case, by convention).

/// Validate and normalize a language code to lower-case ISO 639-1
pub fn normalize_language_code(code: &str) -> Result<String> {
    let normalized = code.trim().to_lowercase();

    if normalized.len() == 2 && Language::from_639_1(&normalized).is_some() {
        return Ok(normalized);
    }

    // Accept 3-letter codes too, but store them as their 2-letter form
    // when one exists (the cache key space stays consistent that way).
    if normalized.len() == 3 {
        if let Some(lang) = Language::from_639_3(&normalized) {
            if let Some(part1) = lang.to_639_1() {
                return Ok(part1.to_string());
            }
            return Ok(normalized);
        }
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Format a language code for the provider API (upper-case by convention)
pub fn provider_language_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Get the English name of a language from its code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = code.trim().to_lowercase();

    let lang = if normalized.len() == 2 {
        Language::from_639_1(&normalized)
    } else {
        Language::from_639_3(&normalized)
    };

    lang.map(|l| l.to_name().to_string())
        .ok_or_else(|| anyhow!("Unknown language code: {}", code))
}

/// Check whether two language codes refer to the same language
pub fn language_codes_match(a: &str, b: &str) -> bool {
    match (normalize_language_code(a), normalize_language_code(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizeLanguageCode_withPart1Code_shouldLowercase() {
        assert_eq!(normalize_language_code("EN").unwrap(), "en");
        assert_eq!(normalize_language_code(" pt ").unwrap(), "pt");
    }

    #[test]
    fn test_normalizeLanguageCode_withPart3Code_shouldMapToPart1() {
        assert_eq!(normalize_language_code("eng").unwrap(), "en");
        assert_eq!(normalize_language_code("por").unwrap(), "pt");
    }

    #[test]
    fn test_normalizeLanguageCode_withInvalidCode_shouldFail() {
        assert!(normalize_language_code("xx").is_err());
        assert!(normalize_language_code("").is_err());
        assert!(normalize_language_code("english").is_err());
    }

    #[test]
    fn test_providerLanguageCode_shouldUppercase() {
        assert_eq!(provider_language_code("pt"), "PT");
        assert_eq!(provider_language_code(" en"), "EN");
    }

    #[test]
    fn test_getLanguageName_shouldReturnEnglishName() {
        assert_eq!(get_language_name("en").unwrap(), "English");
        assert_eq!(get_language_name("pt").unwrap(), "Portuguese");
    }

    #[test]
    fn test_languageCodesMatch_shouldMatchAcrossForms() {
        assert!(language_codes_match("en", "ENG"));
        assert!(!language_codes_match("en", "pt"));
        assert!(!language_codes_match("en", "zz"));
    }
}
