use sha2::{Digest, Sha256};

/// Sentinel used in the key when the source language is provider-detected
pub const AUTO_SOURCE: &str = "auto";

/// Normalize text for key derivation: trim, lowercase, collapse
/// whitespace runs to single spaces
pub fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Derive the cache key for a text fragment and language pair.
///
/// The key is the SHA-256 hex digest of `normalized|source|target`, so
/// fragments differing only in leading/trailing/internal whitespace runs or
/// letter case share an entry, while the same fragment translated to a
/// different language pair does not.
pub fn derive_key(text: &str, source_language: Option<&str>, target_language: &str) -> String {
    let normalized = normalize(text);
    let source = source_language.unwrap_or(AUTO_SOURCE);
    let input = format!("{}|{}|{}", normalized, source, target_language);
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_shouldCollapseWhitespaceAndLowercase() {
        assert_eq!(normalize("  The   Cat\n\tSat.  "), "the cat sat.");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_deriveKey_shouldBe64HexChars() {
        let key = derive_key("Hello", Some("en"), "pt");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_deriveKey_withWhitespaceAndCaseVariants_shouldMatch() {
        let a = derive_key("The cat sat.", Some("en"), "pt");
        let b = derive_key("  the   CAT  sat.  ", Some("en"), "pt");
        assert_eq!(a, b);
    }

    #[test]
    fn test_deriveKey_withDifferentLanguagePair_shouldDiffer() {
        let a = derive_key("The cat sat.", Some("en"), "pt");
        let b = derive_key("The cat sat.", Some("en"), "fr");
        let c = derive_key("The cat sat.", Some("de"), "pt");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_deriveKey_withoutSourceLanguage_shouldUseAutoSentinel() {
        let auto = derive_key("Hello", None, "pt");
        let explicit = derive_key("Hello", Some("auto"), "pt");
        let english = derive_key("Hello", Some("en"), "pt");
        assert_eq!(auto, explicit);
        assert_ne!(auto, english);
    }

    #[test]
    fn test_deriveKey_isDeterministic() {
        assert_eq!(
            derive_key("same input", Some("en"), "de"),
            derive_key("same input", Some("en"), "de")
        );
    }
}
