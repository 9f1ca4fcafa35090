//! # Shelf Items
//!
//! Display-ready shelf entries and the resolved-metadata view behind them.
//!
//! ## Overview
//!
//! Attachments arrive with thin metadata; the bibliographic record lives
//! on the parent item. [`ResolvedMetadata`] is built exactly once after
//! parent resolution and prefers parent fields, so no downstream code
//! ever re-decides between parent and attachment values. Missing fields
//! get sentinels ([`UNKNOWN_TITLE`], [`UNKNOWN_YEAR`]) rather than
//! options, which keeps sorting and display total.

use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use core_cache::{encode_collection_keys, CachedEntry};
use core_runtime::prefs::DisplayMode;
use provider_zotero::ZoteroItem;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Title sentinel for items with no usable title anywhere
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Year sentinel; large so unknown years sort after real ones
pub const UNKNOWN_YEAR: i32 = 9999;

/// Parent item types the books-only filter accepts
pub const BOOK_LIKE_TYPES: &[&str] = &[
    "book",
    "bookSection",
    "encyclopediaArticle",
    "dictionaryEntry",
    "manuscript",
    "thesis",
    "report",
    "document",
];

static YEAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{4}\b").unwrap());

/// First standalone four-digit run in a free-text date
///
/// Zotero dates are whatever the user typed: "2023-05-01", "May 1974",
/// "circa 1850". Returns [`UNKNOWN_YEAR`] when nothing matches.
pub fn extract_year(date: &str) -> i32 {
    YEAR_PATTERN
        .find(date)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(UNKNOWN_YEAR)
}

// ============================================================================
// Resolved Metadata
// ============================================================================

/// Bibliographic view of one attachment, resolved against its parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMetadata {
    /// Effective display title, never empty
    pub title: String,

    /// Pre-joined creator display string, empty when no creators exist
    pub authors: String,

    /// Publication year, [`UNKNOWN_YEAR`] when unparseable
    pub year: i32,

    /// Zotero item type of the resolved parent, `None` when the
    /// attachment is parentless or the parent fetch failed
    pub parent_type: Option<String>,

    /// Whether the attachment references a parent record at all
    pub has_parent: bool,
}

impl ResolvedMetadata {
    /// Build the resolved view from an attachment and its (possibly
    /// unresolved) parent
    ///
    /// Parent fields win whenever present; attachment fields back them
    /// up; sentinels close the gaps. `parent` is `None` both for
    /// parentless attachments and for failed parent fetches, which the
    /// `has_parent` flag keeps apart.
    pub fn resolve(attachment: &ZoteroItem, parent: Option<&ZoteroItem>) -> Self {
        let parent_data = parent.map(|p| &p.data);

        let title = parent_data
            .map(|d| d.title.as_str())
            .filter(|t| !t.is_empty())
            .or_else(|| Some(attachment.data.title.as_str()).filter(|t| !t.is_empty()))
            .unwrap_or(UNKNOWN_TITLE)
            .to_string();

        let authors = parent_data
            .map(|d| d.authors_display())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| attachment.data.authors_display());

        let date = parent_data
            .and_then(|d| d.date.as_deref())
            .or(attachment.data.date.as_deref())
            .unwrap_or("");

        Self {
            title,
            authors,
            year: extract_year(date),
            parent_type: parent.map(|p| p.data.item_type.clone()),
            has_parent: attachment.data.parent_item.is_some(),
        }
    }

    /// Whether this item passes the books-only filter
    ///
    /// Parentless attachments count as standalone books. Attachments
    /// whose parent fetch failed have an undetermined type and are
    /// rejected, matching the filter's "known book-like" contract.
    pub fn is_book_like(&self) -> bool {
        if !self.has_parent {
            return true;
        }

        match &self.parent_type {
            Some(item_type) => BOOK_LIKE_TYPES.contains(&item_type.as_str()),
            None => false,
        }
    }
}

// ============================================================================
// Shelf Item
// ============================================================================

/// One display-ready entry on the shelf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfItem {
    /// Zotero attachment item key
    pub key: String,

    /// Resolved bibliographic view
    pub metadata: ResolvedMetadata,

    /// Attachment MIME type
    pub mime_type: String,

    /// Remote URL the binary downloads from
    pub download_href: String,

    /// Local path of the downloaded binary, `None` when the download
    /// failed or has not run
    pub download_path: Option<PathBuf>,

    /// Local path of the extracted cover thumbnail, `None` renders as
    /// a placeholder downstream
    pub cover_path: Option<PathBuf>,

    /// Keys of collections the attachment belongs to
    pub collection_keys: Vec<String>,
}

impl ShelfItem {
    /// Grid label under the given display mode
    ///
    /// Author-based modes fall back to the title when no creator
    /// display string exists.
    pub fn display_label(&self, mode: DisplayMode) -> String {
        match mode {
            DisplayMode::TitleOnly => self.metadata.title.clone(),
            DisplayMode::AuthorOnly => {
                if self.metadata.authors.is_empty() {
                    self.metadata.title.clone()
                } else {
                    self.metadata.authors.clone()
                }
            }
            DisplayMode::AuthorDashTitle => {
                if self.metadata.authors.is_empty() {
                    self.metadata.title.clone()
                } else {
                    format!("{} - {}", self.metadata.authors, self.metadata.title)
                }
            }
        }
    }

    /// Rebuild a shelf item from an offline cache row
    ///
    /// Cache rows keep only the book-likeness bit, so the reconstructed
    /// view encodes it through the parent fields: book-like rows read as
    /// standalone, others as an unresolved parent.
    pub fn from_cached(entry: CachedEntry) -> Self {
        let collection_keys = entry
            .collection_list()
            .into_iter()
            .map(String::from)
            .collect();

        let metadata = ResolvedMetadata {
            title: entry.title,
            authors: entry.authors,
            year: entry.year as i32,
            parent_type: None,
            has_parent: !entry.is_book_like,
        };

        Self {
            key: entry.item_key,
            metadata,
            mime_type: entry.mime_type,
            download_href: String::new(),
            download_path: entry.download_path.map(PathBuf::from),
            cover_path: entry.cover_path.map(PathBuf::from),
            collection_keys,
        }
    }

    /// Project this item into an offline cache row
    pub fn to_cached(&self, username: &str, updated_at: DateTime<Utc>) -> CachedEntry {
        CachedEntry {
            item_key: self.key.clone(),
            title: self.metadata.title.clone(),
            authors: self.metadata.authors.clone(),
            year: self.metadata.year as i64,
            mime_type: self.mime_type.clone(),
            is_book_like: self.metadata.is_book_like(),
            cover_path: self
                .cover_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            download_path: self
                .download_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            username: username.to_string(),
            collection_keys: encode_collection_keys(&self.collection_keys),
            updated_at: updated_at.timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use provider_zotero::{Creator, ItemData};

    fn attachment(parent_item: Option<&str>) -> ZoteroItem {
        ZoteroItem {
            key: "ATTACH01".to_string(),
            data: ItemData {
                key: "ATTACH01".to_string(),
                item_type: "attachment".to_string(),
                title: "dispossessed.epub".to_string(),
                parent_item: parent_item.map(String::from),
                content_type: Some("application/epub+zip".to_string()),
                filename: Some("dispossessed.epub".to_string()),
                date: None,
                creators: Vec::new(),
                collections: vec!["COLL0001".to_string()],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn parent(item_type: &str) -> ZoteroItem {
        ZoteroItem {
            key: "BOOK0001".to_string(),
            data: ItemData {
                key: "BOOK0001".to_string(),
                item_type: item_type.to_string(),
                title: "The Dispossessed".to_string(),
                date: Some("May 1974".to_string()),
                creators: vec![Creator {
                    creator_type: "author".to_string(),
                    first_name: Some("Ursula K.".to_string()),
                    last_name: Some("Le Guin".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("2023-05-01"), 2023);
        assert_eq!(extract_year("circa 1850"), 1850);
        assert_eq!(extract_year("May 1974"), 1974);
        assert_eq!(extract_year("n.d."), UNKNOWN_YEAR);
        assert_eq!(extract_year(""), UNKNOWN_YEAR);
        // Five digits in a row is not a year
        assert_eq!(extract_year("12345"), UNKNOWN_YEAR);
    }

    #[test]
    fn test_resolve_prefers_parent_fields() {
        let metadata = ResolvedMetadata::resolve(&attachment(Some("BOOK0001")), Some(&parent("book")));

        assert_eq!(metadata.title, "The Dispossessed");
        assert_eq!(metadata.authors, "Le Guin, Ursula K.");
        assert_eq!(metadata.year, 1974);
        assert_eq!(metadata.parent_type.as_deref(), Some("book"));
        assert!(metadata.has_parent);
    }

    #[test]
    fn test_resolve_falls_back_to_attachment_on_failed_parent() {
        let metadata = ResolvedMetadata::resolve(&attachment(Some("BOOK0001")), None);

        assert_eq!(metadata.title, "dispossessed.epub");
        assert_eq!(metadata.authors, "");
        assert_eq!(metadata.year, UNKNOWN_YEAR);
        assert_eq!(metadata.parent_type, None);
        assert!(metadata.has_parent);
    }

    #[test]
    fn test_resolve_sentinels_when_everything_is_empty() {
        let mut bare = attachment(None);
        bare.data.title = String::new();

        let metadata = ResolvedMetadata::resolve(&bare, None);
        assert_eq!(metadata.title, UNKNOWN_TITLE);
        assert_eq!(metadata.year, UNKNOWN_YEAR);
    }

    #[test]
    fn test_book_like_filter() {
        // Parentless attachments are standalone books
        let standalone = ResolvedMetadata::resolve(&attachment(None), None);
        assert!(standalone.is_book_like());

        let section =
            ResolvedMetadata::resolve(&attachment(Some("BOOK0001")), Some(&parent("bookSection")));
        assert!(section.is_book_like());

        let article =
            ResolvedMetadata::resolve(&attachment(Some("BOOK0001")), Some(&parent("journalArticle")));
        assert!(!article.is_book_like());

        // Unresolved parent means undetermined type
        let unresolved = ResolvedMetadata::resolve(&attachment(Some("BOOK0001")), None);
        assert!(!unresolved.is_book_like());
    }

    #[test]
    fn test_cache_round_trip_preserves_book_likeness() {
        let item = ShelfItem {
            key: "ATTACH01".to_string(),
            metadata: ResolvedMetadata::resolve(&attachment(Some("BOOK0001")), Some(&parent("book"))),
            mime_type: "application/epub+zip".to_string(),
            download_href: "https://api.zotero.org/users/1/items/ATTACH01/file".to_string(),
            download_path: Some(PathBuf::from("/data/downloads/ATTACH01_dispossessed.epub")),
            cover_path: Some(PathBuf::from("/data/covers/ATTACH01_dispossessed.jpg")),
            collection_keys: vec!["COLL0001".to_string()],
        };

        let when = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let entry = item.to_cached("reader", when);
        assert!(entry.is_book_like);
        assert_eq!(entry.year, 1974);
        assert_eq!(entry.collection_keys, ";COLL0001;");
        assert_eq!(entry.updated_at, 1_700_000_000);

        let restored = ShelfItem::from_cached(entry);
        assert_eq!(restored.key, "ATTACH01");
        assert_eq!(restored.metadata.title, "The Dispossessed");
        assert_eq!(restored.metadata.year, 1974);
        assert!(restored.metadata.is_book_like());
        assert_eq!(restored.collection_keys, vec!["COLL0001".to_string()]);
        assert_eq!(
            restored.cover_path,
            Some(PathBuf::from("/data/covers/ATTACH01_dispossessed.jpg"))
        );
    }

    #[test]
    fn test_cache_round_trip_preserves_non_book_likeness() {
        let item = ShelfItem {
            key: "ATTACH02".to_string(),
            metadata: ResolvedMetadata::resolve(
                &attachment(Some("BOOK0001")),
                Some(&parent("journalArticle")),
            ),
            mime_type: "application/pdf".to_string(),
            download_href: String::new(),
            download_path: None,
            cover_path: None,
            collection_keys: Vec::new(),
        };

        let entry = item.to_cached("reader", Utc::now());
        assert!(!entry.is_book_like);

        let restored = ShelfItem::from_cached(entry);
        assert!(!restored.metadata.is_book_like());
    }

    #[test]
    fn test_display_label_modes() {
        let item = ShelfItem {
            key: "ATTACH01".to_string(),
            metadata: ResolvedMetadata::resolve(&attachment(Some("BOOK0001")), Some(&parent("book"))),
            mime_type: "application/epub+zip".to_string(),
            download_href: String::new(),
            download_path: None,
            cover_path: None,
            collection_keys: Vec::new(),
        };

        assert_eq!(item.display_label(DisplayMode::TitleOnly), "The Dispossessed");
        assert_eq!(item.display_label(DisplayMode::AuthorOnly), "Le Guin, Ursula K.");
        assert_eq!(
            item.display_label(DisplayMode::AuthorDashTitle),
            "Le Guin, Ursula K. - The Dispossessed"
        );

        let mut anonymous = item.clone();
        anonymous.metadata.authors = String::new();
        assert_eq!(
            anonymous.display_label(DisplayMode::AuthorDashTitle),
            "The Dispossessed"
        );
    }
}
