//! # Collection Tree
//!
//! Rebuilds the hierarchical collection sidebar from the flat record
//! list the API returns.
//!
//! ## Overview
//!
//! Every fetch rebuilds the tree from scratch. [`build_tree`] is a pure
//! function and never fails: dangling parent references re-anchor at the
//! root, parent cycles render flat under it, and duplicate keys collapse
//! to the last record seen. The output is a pre-order list ready for an
//! indented sidebar, with a synthetic "All Collections" node in front.

use std::collections::{HashMap, HashSet};

use provider_zotero::ZoteroCollection;
use serde::{Deserialize, Serialize};

/// Display name of the synthetic root node
pub const ALL_COLLECTIONS_LABEL: &str = "All Collections";

/// Flat collection record as listed by the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRecord {
    pub key: String,
    pub name: String,
    pub parent_key: Option<String>,
}

impl CollectionRecord {
    pub fn from_collection(collection: &ZoteroCollection) -> Self {
        Self {
            key: collection.key.clone(),
            name: collection.data.name.clone(),
            parent_key: collection.data.parent_collection.clone(),
        }
    }
}

/// One row of the rendered tree, in pre-order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionNode {
    /// Collection key; empty for the synthetic root
    pub key: String,

    /// Display name
    pub name: String,

    /// Indentation depth; the synthetic root is 0, its children 1
    pub level: u32,

    /// Whether any node renders beneath this one
    pub has_children: bool,

    /// Whether this node matches the currently selected key
    pub selected: bool,
}

/// Build the pre-order sidebar tree from flat collection records
///
/// The result always starts with the synthetic root and contains exactly
/// one node per distinct input key afterwards. Malformed input degrades
/// to flat rows under the root rather than failing or dropping records.
pub fn build_tree(records: &[CollectionRecord], selected_key: &str) -> Vec<CollectionNode> {
    // Duplicate keys: the last record wins
    let mut by_key: HashMap<&str, &CollectionRecord> = HashMap::with_capacity(records.len());
    for record in records {
        by_key.insert(record.key.as_str(), record);
    }

    let mut children: HashMap<&str, Vec<&CollectionRecord>> = HashMap::new();
    let mut roots: Vec<&CollectionRecord> = Vec::new();

    for record in by_key.values().copied() {
        match record.parent_key.as_deref() {
            // The web API marks top-level collections with the JSON
            // literal false, which survives some clients as "false"
            None | Some("") | Some("false") => roots.push(record),
            Some(parent) if by_key.contains_key(parent) => {
                children.entry(parent).or_default().push(record);
            }
            // Dangling parent reference: keep the record visible at the
            // root instead of dropping its subtree
            Some(_) => roots.push(record),
        }
    }

    sort_group(&mut roots);
    for bucket in children.values_mut() {
        sort_group(bucket);
    }

    let mut nodes = Vec::with_capacity(by_key.len() + 1);
    nodes.push(CollectionNode {
        key: String::new(),
        name: ALL_COLLECTIONS_LABEL.to_string(),
        level: 0,
        has_children: !records.is_empty(),
        selected: selected_key.is_empty(),
    });

    let mut visited: HashSet<&str> = HashSet::with_capacity(by_key.len());
    for root in roots {
        emit(root, 1, &children, selected_key, &mut visited, &mut nodes);
    }

    // Records caught in a parent cycle are unreachable from any root.
    // Render them flat so no collection silently disappears.
    let mut stranded: Vec<&CollectionRecord> = by_key
        .values()
        .copied()
        .filter(|record| !visited.contains(record.key.as_str()))
        .collect();
    sort_group(&mut stranded);
    for record in stranded {
        nodes.push(CollectionNode {
            key: record.key.clone(),
            name: record.name.clone(),
            level: 1,
            has_children: false,
            selected: record.key == selected_key,
        });
    }

    nodes
}

fn emit<'a>(
    record: &'a CollectionRecord,
    level: u32,
    children: &HashMap<&'a str, Vec<&'a CollectionRecord>>,
    selected_key: &str,
    visited: &mut HashSet<&'a str>,
    nodes: &mut Vec<CollectionNode>,
) {
    // A key reachable twice means a parent cycle; the first visit wins
    if !visited.insert(record.key.as_str()) {
        return;
    }

    let bucket = children.get(record.key.as_str());
    nodes.push(CollectionNode {
        key: record.key.clone(),
        name: record.name.clone(),
        level,
        has_children: bucket.is_some_and(|b| !b.is_empty()),
        selected: record.key == selected_key,
    });

    if let Some(bucket) = bucket {
        for child in bucket {
            emit(child, level + 1, children, selected_key, visited, nodes);
        }
    }
}

fn sort_group(group: &mut [&CollectionRecord]) {
    group.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.key.cmp(&b.key))
    });
}
