//! Stable in-memory ordering for the shelf grid.
//!
//! Both orders are total: resolved metadata carries sentinels instead of
//! nulls, and unknown authors get a key that sorts after every real
//! surname.

use core_runtime::prefs::SortMode;

use crate::item::ShelfItem;

/// Sort key for authors that cannot be parsed; sorts after real surnames
pub const UNKNOWN_AUTHOR_KEY: &str = "zzz";

/// Case-insensitive title key with one leading English article removed
///
/// "The Hobbit" files under H alongside "Hobbit". Only a full article
/// followed by a space counts, so "Their Eyes Were Watching God" keeps
/// its T.
pub fn title_sort_key(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    for article in ["the ", "an ", "a "] {
        if let Some(rest) = lowered.strip_prefix(article) {
            return rest.trim_start().to_string();
        }
    }
    lowered
}

/// First author's surname as a case-insensitive sort key
///
/// Takes the text before the first comma ("Le Guin, Ursula K." keys as
/// "le guin"), else the final whitespace token ("Ursula K. Le Guin" keys
/// as "guin"), else [`UNKNOWN_AUTHOR_KEY`].
pub fn author_sort_key(authors: &str) -> String {
    let trimmed = authors.trim();
    if trimmed.is_empty() {
        return UNKNOWN_AUTHOR_KEY.to_string();
    }

    if let Some((surname, _)) = trimmed.split_once(',') {
        let surname = surname.trim();
        if !surname.is_empty() {
            return surname.to_lowercase();
        }
    }

    trimmed
        .split_whitespace()
        .last()
        .map(|token| token.to_lowercase())
        .unwrap_or_else(|| UNKNOWN_AUTHOR_KEY.to_string())
}

/// Stable in-place sort under the given mode
///
/// Author mode breaks surname ties by title so the order stays
/// deterministic across refreshes.
pub fn sort_items(items: &mut [ShelfItem], mode: SortMode) {
    match mode {
        SortMode::Title => {
            items.sort_by_cached_key(|item| title_sort_key(&item.metadata.title));
        }
        SortMode::Author => {
            items.sort_by_cached_key(|item| {
                (
                    author_sort_key(&item.metadata.authors),
                    title_sort_key(&item.metadata.title),
                )
            });
        }
    }
}
