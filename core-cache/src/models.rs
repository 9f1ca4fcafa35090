//! Cached shelf entry model

use sqlx::FromRow;

/// MIME type of EPUB attachments
pub const EPUB_MIME: &str = "application/epub+zip";

/// MIME type of PDF attachments
pub const PDF_MIME: &str = "application/pdf";

/// One row of the offline shelf cache
///
/// `year` stores 9999 for unknown dates so ascending sorts push unknowns
/// last. `collection_keys` stores every collection the item belongs to in
/// the form `;KEY1;KEY2;`, which lets SQL membership checks match on the
/// delimited `;KEY;` token without prefix collisions.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CachedEntry {
    /// Zotero attachment item key
    pub item_key: String,

    /// Resolved display title
    pub title: String,

    /// Pre-joined creator display string, may be empty
    pub authors: String,

    /// Publication year, 9999 when unknown
    pub year: i64,

    /// Attachment MIME type
    pub mime_type: String,

    /// Whether the parent record has a book-like item type
    pub is_book_like: bool,

    /// Path of the extracted cover artifact, absent for degraded items
    pub cover_path: Option<String>,

    /// Path of the downloaded attachment binary
    pub download_path: Option<String>,

    /// Zotero username, used to rebuild the web permalink
    pub username: String,

    /// Delimited collection membership, `;KEY1;KEY2;` or empty
    pub collection_keys: String,

    /// Last refresh that touched this row, in epoch seconds
    pub updated_at: i64,
}

impl CachedEntry {
    /// Collection keys this entry belongs to
    pub fn collection_list(&self) -> Vec<&str> {
        self.collection_keys
            .split(';')
            .filter(|key| !key.is_empty())
            .collect()
    }

    /// Whether this entry belongs to the given collection
    pub fn in_collection(&self, collection_key: &str) -> bool {
        self.collection_keys
            .contains(&format!(";{};", collection_key))
    }
}

/// Encode collection keys for storage as `;KEY1;KEY2;`
pub fn encode_collection_keys(keys: &[String]) -> String {
    if keys.is_empty() {
        String::new()
    } else {
        format!(";{};", keys.join(";"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with_collections(encoded: &str) -> CachedEntry {
        CachedEntry {
            item_key: "ATTACH01".to_string(),
            title: "The Dispossessed".to_string(),
            authors: "Le Guin, Ursula K.".to_string(),
            year: 1974,
            mime_type: EPUB_MIME.to_string(),
            is_book_like: true,
            cover_path: None,
            download_path: None,
            username: "reader42".to_string(),
            collection_keys: encoded.to_string(),
            updated_at: 0,
        }
    }

    #[test]
    fn test_encode_collection_keys() {
        assert_eq!(encode_collection_keys(&[]), "");
        assert_eq!(encode_collection_keys(&["C1".to_string()]), ";C1;");
        assert_eq!(
            encode_collection_keys(&["C1".to_string(), "C2".to_string()]),
            ";C1;C2;"
        );
    }

    #[test]
    fn test_collection_list_round_trip() {
        let keys = vec!["C1".to_string(), "C2".to_string()];
        let entry = entry_with_collections(&encode_collection_keys(&keys));

        assert_eq!(entry.collection_list(), vec!["C1", "C2"]);
        assert!(entry_with_collections("").collection_list().is_empty());
    }

    #[test]
    fn test_in_collection_matches_whole_keys_only() {
        let entry = entry_with_collections(";C12;C3;");

        assert!(entry.in_collection("C12"));
        assert!(entry.in_collection("C3"));
        // "C1" is a prefix of "C12" but not a member
        assert!(!entry.in_collection("C1"));
        assert!(!entry_with_collections("").in_collection("C1"));
    }
}
