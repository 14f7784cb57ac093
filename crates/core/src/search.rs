//! Site search over document titles.
//!
//! Matching is a plain substring test on normalized titles. Titles that
//! start with the query rank ahead of titles that merely contain it; within
//! each group the incoming order (newest first, as fetched) is kept.

use serde::Serialize;

use crate::document::{Collection, ContentDocument, DocumentId};
use crate::media::MediaSlot;

/// Documents fetched per collection before filtering.
pub const DEFAULT_LIMIT_PER_COLLECTION: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub collection: Collection,
    pub id: DocumentId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Lowercase, collapse whitespace runs to a single space, and trim.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Filter `docs` to those whose title contains `query` and rank prefix
/// matches first.
pub fn filter_and_rank<'a, I>(query: &str, docs: I) -> Vec<SearchHit>
where
    I: IntoIterator<Item = &'a ContentDocument>,
{
    let needle = normalize_query(query);
    if needle.is_empty() {
        return Vec::new();
    }

    let mut prefix = Vec::new();
    let mut contains = Vec::new();
    for doc in docs {
        let Some(title) = doc.title() else { continue };
        let haystack = normalize_query(title);
        if haystack.starts_with(&needle) {
            prefix.push(hit(doc, title));
        } else if haystack.contains(&needle) {
            contains.push(hit(doc, title));
        }
    }
    prefix.extend(contains);
    prefix
}

fn hit(doc: &ContentDocument, title: &str) -> SearchHit {
    let image_url = [MediaSlot::Image, MediaSlot::Thumbnail]
        .iter()
        .find_map(|slot| doc.str_field(slot.url_field()))
        .map(str::to_string);
    SearchHit {
        collection: doc.collection,
        id: doc.id.clone(),
        title: title.to_string(),
        image_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn doc(collection: Collection, title: &str) -> ContentDocument {
        let field = collection.title_field();
        let mut fields = serde_json::Map::new();
        fields.insert(field.to_string(), Value::String(title.to_string()));
        ContentDocument::new(collection, fields)
    }

    #[test]
    fn normalizes_whitespace_and_case() {
        assert_eq!(normalize_query("  Travel   To END"), "travel to end");
        assert_eq!(normalize_query("\tA\n\nb "), "a b");
        assert_eq!(normalize_query("   "), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        for s in ["  Travel   To END", "ÀB  c", "", "x\u{3000}y", "already fine"] {
            let once = normalize_query(s);
            assert_eq!(normalize_query(&once), once);
        }
    }

    #[test]
    fn prefix_matches_come_first() {
        let docs = vec![
            doc(Collection::Blogs, "Back to school"),
            doc(Collection::Videos, "School garden"),
            doc(Collection::TeamMembers, "Schoolteacher Ana"),
            doc(Collection::Pdfs, "Annual report"),
            doc(Collection::FeatureStories, "A new   SCHOOL roof"),
        ];
        let hits = filter_and_rank("  SCHOOL ", &docs);
        let titles: Vec<_> = hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "School garden",
                "Schoolteacher Ana",
                "Back to school",
                "A new   SCHOOL roof"
            ]
        );

        let first_contains = hits
            .iter()
            .position(|h| !normalize_query(&h.title).starts_with("school"))
            .unwrap();
        assert!(hits[first_contains..]
            .iter()
            .all(|h| !normalize_query(&h.title).starts_with("school")));
    }

    #[test]
    fn empty_query_matches_nothing() {
        let docs = vec![doc(Collection::Blogs, "Anything")];
        assert!(filter_and_rank("   ", &docs).is_empty());
    }

    #[test]
    fn hit_carries_preview_image() {
        let mut d = doc(Collection::Photos, "Harvest");
        d.fields
            .insert("imageUrl".into(), json!("http://cdn/photos/image/h.jpg"));
        let hits = filter_and_rank("harv", [&d]);
        assert_eq!(hits[0].image_url.as_deref(), Some("http://cdn/photos/image/h.jpg"));
    }
}
