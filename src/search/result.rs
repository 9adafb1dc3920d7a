//! Ranked hits and the shapes they are mapped into

use crate::search::document::DescriptionFields;
use crate::search::error::{SearchError, SearchResult};
use crate::search::index::Snapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tantivy::schema::Value;
use tantivy::{DocAddress, Score, TantivyDocument};

/// A single search result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ResultItem {
    /// Matched description text
    pub term: String,

    /// Owning concept
    pub concept_id: u64,

    /// Display label of the concept; the matched term if none was stored
    pub preferred_term: String,
}

impl ResultItem {
    /// Build a result without running a search
    pub fn new(concept_id: u64, term: impl Into<String>, preferred_term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            concept_id,
            preferred_term: preferred_term.into(),
        }
    }

    /// Result for a concept already known by its preferred term
    pub fn for_concept(concept_id: u64, preferred_term: impl Into<String>) -> Self {
        let preferred_term = preferred_term.into();
        Self {
            term: preferred_term.clone(),
            concept_id,
            preferred_term,
        }
    }
}

impl std::fmt::Display for ResultItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.term, self.concept_id)
    }
}

/// A ranked hit: engine address plus final score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedHit {
    pub score: Score,
    pub address: DocAddress,
}

/// Hits of one query, best first, pinned to the snapshot they came from.
///
/// Stored fields are read from that same snapshot, so mapping is unaffected by
/// any rebuild that completes in between.
pub struct TopHits {
    snapshot: Arc<Snapshot>,
    fields: DescriptionFields,
    hits: Vec<RankedHit>,
}

impl TopHits {
    pub(crate) fn new(snapshot: Arc<Snapshot>, fields: DescriptionFields, hits: Vec<RankedHit>) -> Self {
        Self {
            snapshot,
            fields,
            hits,
        }
    }

    pub fn hits(&self) -> &[RankedHit] {
        &self.hits
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Generation of the snapshot the query ran against
    pub fn generation(&self) -> u64 {
        self.snapshot.generation()
    }

    fn doc(&self, hit: &RankedHit) -> SearchResult<TantivyDocument> {
        Ok(self.snapshot.searcher().doc(hit.address)?)
    }

    fn text(&self, doc: &TantivyDocument, field: tantivy::schema::Field) -> Option<String> {
        doc.get_first(field)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    fn term(&self, doc: &TantivyDocument) -> SearchResult<String> {
        self.text(doc, self.fields.term)
            .ok_or_else(|| SearchError::IndexCorruption("stored document without term".to_string()))
    }

    fn concept_id(&self, doc: &TantivyDocument) -> SearchResult<u64> {
        doc.get_first(self.fields.concept_id)
            .and_then(|v| v.as_u64())
            .ok_or_else(|| {
                SearchError::IndexCorruption("stored document without concept id".to_string())
            })
    }

    fn result_item(&self, hit: &RankedHit) -> SearchResult<ResultItem> {
        let doc = self.doc(hit)?;
        let term = self.term(&doc)?;
        let preferred_term = self
            .text(&doc, self.fields.preferred_term)
            .unwrap_or_else(|| term.clone());
        Ok(ResultItem {
            concept_id: self.concept_id(&doc)?,
            term,
            preferred_term,
        })
    }

    /// Result items in rank order
    pub fn to_result_items(&self) -> SearchResult<Vec<ResultItem>> {
        self.hits.iter().map(|hit| self.result_item(hit)).collect()
    }

    /// Matched terms in rank order; repeats are kept
    pub fn to_description_texts(&self) -> SearchResult<Vec<String>> {
        self.hits
            .iter()
            .map(|hit| self.doc(hit).and_then(|doc| self.term(&doc)))
            .collect()
    }

    /// Concept ids in order of first appearance, each once
    pub fn to_concept_ids(&self) -> SearchResult<Vec<u64>> {
        let mut seen = HashSet::with_capacity(self.hits.len());
        let mut concepts = Vec::with_capacity(self.hits.len());
        for hit in &self.hits {
            let concept_id = self.concept_id(&self.doc(hit)?)?;
            if seen.insert(concept_id) {
                concepts.push(concept_id);
            }
        }
        Ok(concepts)
    }

    /// The best hit, if any
    pub fn top_hit(&self) -> SearchResult<Option<ResultItem>> {
        self.hits.first().map(|hit| self.result_item(hit)).transpose()
    }
}

impl std::fmt::Debug for TopHits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopHits")
            .field("generation", &self.generation())
            .field("hits", &self.hits)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_concept_uses_preferred_term_twice() {
        let item = ResultItem::for_concept(195967001, "Asthma");
        assert_eq!(item.term, "Asthma");
        assert_eq!(item.preferred_term, "Asthma");
        assert_eq!(item.to_string(), "Asthma (195967001)");
    }

    #[test]
    fn test_new_keeps_distinct_terms() {
        let item = ResultItem::new(22298006, "Heart attack", "Myocardial infarction");
        assert_eq!(item.term, "Heart attack");
        assert_eq!(item.preferred_term, "Myocardial infarction");
    }
}
