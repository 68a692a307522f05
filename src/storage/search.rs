//! In-memory text search over a [`MemoryRepository`]

use std::collections::HashMap;

use super::{MemoryRepository, RepositoryError, SearchHit, SearchProvider};
use crate::models::{ContentKind, NodeId};

const NAME_WEIGHT: f32 = 2.0;
const PROPERTY_WEIGHT: f32 = 1.0;
const PREFIX_FACTOR: f32 = 0.5;

#[derive(Debug, Clone)]
struct IndexedDocument {
    id: NodeId,
    path: String,
    name_words: Vec<String>,
    property_words: Vec<String>,
}

/// Search provider over a snapshot of a repository's documents
///
/// Names weigh twice as much as property text. With wildcards enabled a
/// term also matches words it is a prefix of, at half weight; a trailing
/// `*` on a term asks for the same explicitly.
#[derive(Debug, Clone, Default)]
pub struct MemorySearch {
    documents: Vec<IndexedDocument>,
}

impl MemorySearch {
    /// Index every document currently in `repo`
    pub fn index(repo: &MemoryRepository) -> Self {
        let mut documents: Vec<IndexedDocument> = repo
            .records(ContentKind::Document)
            .map(|record| {
                let property_words = repo
                    .properties_of(record.id)
                    .map(|props| {
                        props
                            .values()
                            .flatten()
                            .flat_map(|raw| words(raw))
                            .collect()
                    })
                    .unwrap_or_default();
                IndexedDocument {
                    id: record.id,
                    path: record.path.clone(),
                    name_words: words(&record.name),
                    property_words,
                }
            })
            .collect();
        documents.sort_by_key(|d| d.id);
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn in_scope(path: &str, scope: &str) -> bool {
    scope.is_empty()
        || path == scope
        || path
            .strip_prefix(scope)
            .is_some_and(|rest| rest.starts_with(','))
}

fn term_score(term: &str, prefix: bool, words: &[String], weight: f32) -> f32 {
    words
        .iter()
        .map(|word| {
            if word == term {
                weight
            } else if prefix && word.starts_with(term) {
                weight * PREFIX_FACTOR
            } else {
                0.0
            }
        })
        .sum()
}

impl SearchProvider for MemorySearch {
    fn search(
        &self,
        query: &str,
        scope_path_prefix: &str,
        use_wildcards: bool,
    ) -> Result<Vec<SearchHit>, RepositoryError> {
        let terms: Vec<(String, bool)> = query
            .split_whitespace()
            .map(|raw| {
                let explicit = raw.ends_with('*');
                let term = raw.trim_end_matches('*').to_lowercase();
                (term, use_wildcards || explicit)
            })
            .filter(|(term, _)| !term.is_empty())
            .collect();
        if terms.is_empty() {
            return Err(RepositoryError::Search("empty search query".to_string()));
        }

        let mut scores: HashMap<NodeId, f32> = HashMap::new();
        for doc in self.documents.iter().filter(|d| in_scope(&d.path, scope_path_prefix)) {
            let score: f32 = terms
                .iter()
                .map(|(term, prefix)| {
                    term_score(term, *prefix, &doc.name_words, NAME_WEIGHT)
                        + term_score(term, *prefix, &doc.property_words, PROPERTY_WEIGHT)
                })
                .sum();
            if score > 0.0 {
                scores.insert(doc.id, score / terms.len() as f32);
            }
        }

        let mut hits: Vec<SearchHit> = scores
            .into_iter()
            .map(|(id, score)| SearchHit { id, score })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> MemoryRepository {
        MemoryRepository::from_yaml_str(
            r#"
documents:
  - id: 1
    name: Home
    type: home
    children:
      - id: 2
        name: Summer news
        type: article
        properties:
          bodyText: "Sunny days ahead"
      - id: 3
        name: Winter
        type: article
        properties:
          bodyText: "Summertime is far away"
  - id: 10
    name: Summer archive
    type: archive
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_name_matches_outrank_property_matches() {
        let search = MemorySearch::index(&repo());
        let hits = search.search("summer", "", true).unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![NodeId(2), NodeId(10), NodeId(3)]);
        assert!(hits[0].score > hits[2].score);
    }

    #[test]
    fn test_scope_prefix_limits_results() {
        let search = MemorySearch::index(&repo());
        let hits = search.search("summer", "-1,1", false).unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![NodeId(2)]);
    }

    #[test]
    fn test_explicit_wildcard() {
        let search = MemorySearch::index(&repo());
        let hits = search.search("summ*", "-1,1", false).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_empty_query_is_error() {
        let search = MemorySearch::index(&repo());
        assert!(matches!(
            search.search("  ", "", true),
            Err(RepositoryError::Search(_))
        ));
    }
}
