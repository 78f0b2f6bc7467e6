//! Ranked search across the fields of the index.
//!
//! The engine only ranks within one field, so fields are queried one after
//! another in priority order (title, text, aux_text). A page already
//! returned for a higher-priority field is skipped in the lower ones, and
//! the total number of hits never exceeds `max_count`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::document::Identity;
use crate::index::{Field, IndexError, QueryError};

/// One search result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "uid")]
    pub identity: Identity,
    pub url: String,
    pub title: String,
    pub snippet: String,
}

#[derive(thiserror::Error, Debug)]
pub enum SearchError {
    #[error("invalid query: {0}")]
    Query(#[from] QueryError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    /// Wrap matched terms in `<b>`…`</b>`.
    pub highlight: bool,
    /// Maximum number of tokens in a snippet.
    pub snippet_size: u32,
    pub max_count: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            highlight: false,
            snippet_size: 16,
            max_count: 5,
        }
    }
}

/// Query of a single field.
#[derive(Clone, Copy, Debug)]
pub struct FieldQuery<'a> {
    pub field: Field,
    pub text: &'a str,
    pub snippet_size: u32,
    pub highlight: bool,
    pub limit: usize,
}

/// An index that can answer single-field queries, best match first.
pub trait FieldSearch {
    fn query_field(&self, query: &FieldQuery<'_>) -> Result<Vec<SearchHit>, SearchError>;
}

/// Search `query` across all fields.
pub fn search(
    index: &dyn FieldSearch,
    query: &str,
    opts: &SearchOptions,
) -> Result<Vec<SearchHit>, SearchError> {
    let mut hits = Vec::new();
    if query.trim().is_empty() {
        return Ok(hits);
    }

    let mut seen_urls = HashSet::new();

    for field in Field::PRIORITY {
        let remaining = opts.max_count.saturating_sub(hits.len());
        if remaining == 0 {
            break;
        }

        // pages already taken by a higher field may come back again
        let field_hits = index.query_field(&FieldQuery {
            field,
            text: query,
            snippet_size: opts.snippet_size,
            highlight: opts.highlight,
            limit: remaining + seen_urls.len(),
        })?;

        for hit in field_hits {
            if hits.len() >= opts.max_count {
                break;
            }
            if hit.title.is_empty() || seen_urls.contains(&hit.url) {
                continue;
            }
            seen_urls.insert(hit.url.clone());
            hits.push(hit);
        }
    }

    log::debug!("search {query:?}: {} hits", hits.len());

    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Canned hits per field, records the limits it was asked for.
    #[derive(Default)]
    struct FakeIndex {
        title: Vec<SearchHit>,
        text: Vec<SearchHit>,
        aux_text: Vec<SearchHit>,
        calls: RefCell<Vec<(Field, usize)>>,
    }

    impl FieldSearch for FakeIndex {
        fn query_field(&self, query: &FieldQuery<'_>) -> Result<Vec<SearchHit>, SearchError> {
            self.calls.borrow_mut().push((query.field, query.limit));
            let hits = match query.field {
                Field::Title => &self.title,
                Field::Text => &self.text,
                Field::AuxText => &self.aux_text,
            };
            Ok(hits.iter().take(query.limit).cloned().collect())
        }
    }

    struct FailingIndex;

    impl FieldSearch for FailingIndex {
        fn query_field(&self, _query: &FieldQuery<'_>) -> Result<Vec<SearchHit>, SearchError> {
            Err(QueryError("fts5: syntax error near \"\"\"".to_string()).into())
        }
    }

    fn hit(id: i64, url: &str, title: &str, snippet: &str) -> SearchHit {
        SearchHit {
            identity: Identity::new(id),
            url: url.to_string(),
            title: title.to_string(),
            snippet: snippet.to_string(),
        }
    }

    fn opts(max_count: usize) -> SearchOptions {
        SearchOptions {
            max_count,
            ..Default::default()
        }
    }

    #[test]
    fn test_title_match_wins_over_body_match() {
        let index = FakeIndex {
            title: vec![hit(1, "https://a/", "Rust", "title snippet")],
            text: vec![
                hit(1, "https://a/", "Rust", "body snippet"),
                hit(2, "https://b/", "Other", "b body"),
            ],
            ..Default::default()
        };

        let hits = search(&index, "rust", &opts(5)).unwrap();
        assert_eq!(
            hits,
            vec![
                hit(1, "https://a/", "Rust", "title snippet"),
                hit(2, "https://b/", "Other", "b body"),
            ]
        );
    }

    #[test]
    fn test_budget_caps_results() {
        let index = FakeIndex {
            title: vec![hit(1, "https://a/", "A", ""), hit(2, "https://b/", "B", "")],
            text: vec![hit(3, "https://c/", "C", "")],
            aux_text: vec![hit(4, "https://d/", "D", "")],
            ..Default::default()
        };

        let hits = search(&index, "q", &opts(2)).unwrap();
        assert_eq!(hits.len(), 2);
        // budget exhausted after the title field
        assert_eq!(*index.calls.borrow(), vec![(Field::Title, 2)]);
    }

    #[test]
    fn test_remaining_budget_is_passed_down() {
        let index = FakeIndex {
            title: vec![hit(1, "https://a/", "A", "")],
            text: vec![hit(1, "https://a/", "A", ""), hit(2, "https://b/", "B", "")],
            aux_text: vec![hit(3, "https://c/", "C", "")],
            ..Default::default()
        };

        let hits = search(&index, "q", &opts(3)).unwrap();
        let urls: Vec<_> = hits.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a/", "https://b/", "https://c/"]);
        assert_eq!(
            *index.calls.borrow(),
            vec![(Field::Title, 3), (Field::Text, 3), (Field::AuxText, 3)]
        );
    }

    #[test]
    fn test_duplicates_do_not_consume_budget() {
        let index = FakeIndex {
            title: vec![hit(1, "https://a/", "A", "")],
            aux_text: vec![hit(1, "https://a/", "A", ""), hit(2, "https://b/", "B", "")],
            ..Default::default()
        };

        let hits = search(&index, "q", &opts(2)).unwrap();
        let urls: Vec<_> = hits.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a/", "https://b/"]);
    }

    #[test]
    fn test_hits_without_title_are_dropped() {
        let index = FakeIndex {
            text: vec![hit(1, "https://a/", "", "untitled"), hit(2, "https://b/", "B", "")],
            ..Default::default()
        };

        let hits = search(&index, "q", &opts(5)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://b/");
    }

    #[test]
    fn test_zero_budget_queries_nothing() {
        let index = FakeIndex {
            title: vec![hit(1, "https://a/", "A", "")],
            ..Default::default()
        };

        assert!(search(&index, "q", &opts(0)).unwrap().is_empty());
        assert!(index.calls.borrow().is_empty());
    }

    #[test]
    fn test_blank_query_returns_nothing() {
        assert!(search(&FailingIndex, "  ", &opts(5)).unwrap().is_empty());
    }

    #[test]
    fn test_query_error_is_surfaced() {
        let err = search(&FailingIndex, "\"", &opts(5)).unwrap_err();
        assert!(matches!(err, SearchError::Query(_)));
        assert_eq!(err.to_string(), "invalid query: fts5: syntax error near \"\"\"");
    }

    #[test]
    fn test_hit_serializes_identity_as_uid() {
        let json = serde_json::to_value(hit(42, "https://a/", "A", "s")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"uid": 42, "url": "https://a/", "title": "A", "snippet": "s"})
        );
    }
}
