/*!
 * Persistence records for the translation cache and credit accounts.
 */

use serde::{Deserialize, Serialize};

/// A durable cached translation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Row id, used as the chunk's cache reference
    pub id: i64,
    /// SHA-256 key over normalized text and language pair
    pub text_hash: String,
    /// Text as submitted (pre-normalization)
    pub original_text: String,
    /// Cached translation
    pub translated_text: String,
    /// Source language, `auto` when provider-detected
    pub source_language: String,
    /// Target language
    pub target_language: String,
    /// Durable lookups served since insertion
    pub hit_count: i64,
    /// Insertion timestamp (RFC 3339)
    pub created_at: String,
    /// Last durable lookup or insertion timestamp (RFC 3339)
    pub last_used: String,
}

/// A credit account row
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub id: String,
    pub balance: i64,
    pub created_at: String,
}

impl AccountRecord {
    pub fn new(id: &str, balance: i64) -> Self {
        Self {
            id: id.to_string(),
            balance,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accountRecord_new_shouldStampCreation() {
        let account = AccountRecord::new("acct-1", 500);
        assert_eq!(account.id, "acct-1");
        assert_eq!(account.balance, 500);
        assert!(!account.created_at.is_empty());
    }

    #[test]
    fn test_cacheEntry_shouldRoundTripThroughJson() {
        let entry = CacheEntry {
            id: 7,
            text_hash: "abc".to_string(),
            original_text: "Hello".to_string(),
            translated_text: "Olá".to_string(),
            source_language: "en".to_string(),
            target_language: "pt".to_string(),
            hit_count: 0,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            last_used: "2024-01-01T00:00:00Z".to_string(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, 7);
        assert_eq!(back.translated_text, "Olá");
    }
}
