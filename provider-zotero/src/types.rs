//! Zotero API response types
//!
//! Data structures for deserializing Zotero web API v3 responses.

use serde::{Deserialize, Deserializer};

/// Zotero item resource (attachment or parent bibliographic record)
///
/// See: https://www.zotero.org/support/dev/web_api/v3/basics#items
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ZoteroItem {
    /// Item key, unique within the library
    pub key: String,

    /// Library version at which this item last changed
    #[serde(default)]
    pub version: i64,

    /// Navigation links attached to the item
    #[serde(default)]
    pub links: ItemLinks,

    /// Server-computed display hints
    #[serde(default)]
    pub meta: ItemMeta,

    /// Item fields
    pub data: ItemData,
}

impl ZoteroItem {
    /// Direct download URL for the attachment binary, when the API exposes one
    pub fn enclosure_href(&self) -> Option<&str> {
        self.links.enclosure.as_ref().map(|l| l.href.as_str())
    }
}

/// The `meta` object of an item resource
///
/// Zotero precomputes display strings here ("Le Guin", "Le Guin et al.");
/// resolution builds its own author display from the creator records
/// instead, so these stay informational.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMeta {
    /// Short creator summary as shown in the Zotero web UI
    #[serde(default)]
    pub creator_summary: Option<String>,

    /// Date normalized by the server, when it could parse one
    #[serde(default)]
    pub parsed_date: Option<String>,
}

/// Links block on an item resource
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemLinks {
    /// Direct file download link (imported attachments only)
    #[serde(default)]
    pub enclosure: Option<Link>,
}

/// A single hyperlink entry
#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,

    /// MIME type of the linked resource
    #[serde(rename = "type", default)]
    pub content_type: Option<String>,
}

/// The `data` object of an item resource
///
/// Fields vary by item type: attachments carry `parentItem`, `contentType`
/// and `filename`, while parent records carry `creators` and `date`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemData {
    /// Item key (repeated from the envelope)
    pub key: String,

    /// Zotero item type (attachment, book, journalArticle, ...)
    pub item_type: String,

    /// Display title
    #[serde(default)]
    pub title: String,

    /// Key of the parent record, for child attachments
    #[serde(default)]
    pub parent_item: Option<String>,

    /// MIME type of the stored file, for attachments
    #[serde(default)]
    pub content_type: Option<String>,

    /// Original file name, for attachments
    #[serde(default)]
    pub filename: Option<String>,

    /// Publication date as entered by the user (free text)
    #[serde(default)]
    pub date: Option<String>,

    /// Creators (authors, editors, translators, ...)
    #[serde(default)]
    pub creators: Vec<Creator>,

    /// Keys of collections this item belongs to
    #[serde(default)]
    pub collections: Vec<String>,

    /// Tags attached to this item
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl ItemData {
    /// Pre-joined creator display string, `"Last, First; Last, First"`.
    ///
    /// Prefers creators with the `author` role; falls back to all creators
    /// when a record has none (edited volumes, translations).
    pub fn authors_display(&self) -> String {
        let authors: Vec<&Creator> = self
            .creators
            .iter()
            .filter(|c| c.creator_type == "author")
            .collect();

        let picked = if authors.is_empty() {
            self.creators.iter().collect()
        } else {
            authors
        };

        picked
            .iter()
            .filter_map(|c| c.display_name())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// One tag entry on an item
///
/// Tag filtering happens server-side via `tag=` query parameters; the
/// tags on the response are carried for display only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tag {
    pub tag: String,
}

/// A single creator entry on a parent record
///
/// Zotero stores either split `firstName`/`lastName` fields or a single
/// `name` field for institutional creators.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creator {
    #[serde(default)]
    pub creator_type: String,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,

    #[serde(default)]
    pub name: Option<String>,
}

impl Creator {
    /// `"Last, First"` for split names, the raw name for single-field
    /// creators, `None` when every name field is empty.
    pub fn display_name(&self) -> Option<String> {
        match (self.last_name.as_deref(), self.first_name.as_deref()) {
            (Some(last), Some(first)) if !last.is_empty() && !first.is_empty() => {
                Some(format!("{}, {}", last, first))
            }
            (Some(last), _) if !last.is_empty() => Some(last.to_string()),
            _ => self.name.clone().filter(|n| !n.is_empty()),
        }
    }
}

/// Zotero collection resource
///
/// See: https://www.zotero.org/support/dev/web_api/v3/basics#collections
#[derive(Debug, Clone, Deserialize)]
pub struct ZoteroCollection {
    /// Collection key, unique within the library
    pub key: String,

    /// Collection fields
    pub data: CollectionData,
}

/// The `data` object of a collection resource
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionData {
    /// Collection key (repeated from the envelope)
    pub key: String,

    /// Display name
    pub name: String,

    /// Parent collection key. The wire encodes top-level collections as the
    /// JSON literal `false` instead of null, so this needs a custom decoder.
    #[serde(default, deserialize_with = "deserialize_parent_collection")]
    pub parent_collection: Option<String>,
}

fn deserialize_parent_collection<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Parent {
        Root(bool),
        Key(String),
    }

    match Option::<Parent>::deserialize(deserializer)? {
        Some(Parent::Key(key)) => Ok(Some(key)),
        Some(Parent::Root(_)) | None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_attachment_item() {
        let json = r#"{
            "key": "ATTACH01",
            "version": 120,
            "links": {
                "enclosure": {
                    "href": "https://api.zotero.org/users/12345/items/ATTACH01/file/view",
                    "type": "application/epub+zip",
                    "title": "dispossessed.epub"
                }
            },
            "data": {
                "key": "ATTACH01",
                "itemType": "attachment",
                "parentItem": "PARENT01",
                "linkMode": "imported_file",
                "title": "The Dispossessed",
                "contentType": "application/epub+zip",
                "filename": "dispossessed.epub",
                "collections": []
            }
        }"#;

        let item: ZoteroItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.key, "ATTACH01");
        assert_eq!(item.version, 120);
        assert_eq!(item.data.item_type, "attachment");
        assert_eq!(item.data.parent_item.as_deref(), Some("PARENT01"));
        assert_eq!(
            item.data.content_type.as_deref(),
            Some("application/epub+zip")
        );
        assert_eq!(
            item.enclosure_href(),
            Some("https://api.zotero.org/users/12345/items/ATTACH01/file/view")
        );
    }

    #[test]
    fn test_deserialize_parent_book_item() {
        let json = r#"{
            "key": "PARENT01",
            "version": 95,
            "meta": {
                "creatorSummary": "Le Guin",
                "parsedDate": "1974-05"
            },
            "data": {
                "key": "PARENT01",
                "itemType": "book",
                "title": "The Dispossessed",
                "creators": [
                    {
                        "creatorType": "author",
                        "firstName": "Ursula K.",
                        "lastName": "Le Guin"
                    },
                    {
                        "creatorType": "editor",
                        "firstName": "Some",
                        "lastName": "Editor"
                    }
                ],
                "date": "May 1974",
                "collections": ["COLL0001", "COLL0002"],
                "tags": [
                    { "tag": "anarchism", "type": 1 },
                    { "tag": "utopia" }
                ]
            }
        }"#;

        let item: ZoteroItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.data.title, "The Dispossessed");
        assert_eq!(item.data.date.as_deref(), Some("May 1974"));
        assert_eq!(item.data.collections, vec!["COLL0001", "COLL0002"]);
        assert_eq!(item.meta.creator_summary.as_deref(), Some("Le Guin"));
        assert_eq!(item.meta.parsed_date.as_deref(), Some("1974-05"));
        let tags: Vec<&str> = item.data.tags.iter().map(|t| t.tag.as_str()).collect();
        assert_eq!(tags, vec!["anarchism", "utopia"]);
        // Editors are ignored when an author is present
        assert_eq!(item.data.authors_display(), "Le Guin, Ursula K.");
        assert!(item.enclosure_href().is_none());
    }

    #[test]
    fn test_authors_display_falls_back_to_all_creators() {
        let data = ItemData {
            creators: vec![
                Creator {
                    creator_type: "editor".to_string(),
                    first_name: Some("Ellen".to_string()),
                    last_name: Some("Datlow".to_string()),
                    ..Default::default()
                },
                Creator {
                    creator_type: "editor".to_string(),
                    name: Some("Clarion Workshop".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        assert_eq!(data.authors_display(), "Datlow, Ellen; Clarion Workshop");
    }

    #[test]
    fn test_authors_display_empty_when_no_creators() {
        assert_eq!(ItemData::default().authors_display(), "");
    }

    #[test]
    fn test_deserialize_top_level_collection() {
        let json = r#"{
            "key": "COLL0001",
            "version": 10,
            "data": {
                "key": "COLL0001",
                "name": "Fiction",
                "parentCollection": false
            }
        }"#;

        let collection: ZoteroCollection = serde_json::from_str(json).unwrap();
        assert_eq!(collection.data.name, "Fiction");
        assert!(collection.data.parent_collection.is_none());
    }

    #[test]
    fn test_deserialize_nested_collection() {
        let json = r#"{
            "key": "COLL0002",
            "version": 11,
            "data": {
                "key": "COLL0002",
                "name": "Science Fiction",
                "parentCollection": "COLL0001"
            }
        }"#;

        let collection: ZoteroCollection = serde_json::from_str(json).unwrap();
        assert_eq!(
            collection.data.parent_collection.as_deref(),
            Some("COLL0001")
        );
    }
}
