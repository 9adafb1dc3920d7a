//! Common test utilities for index and search testing

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::Path;
use terminology_search::models::{ConceptStatus, DescriptionType};
use terminology_search::search::{IndexedDescription, MemorySource, Search, SearchConfig};

/// Small-footprint configuration for an index under `path`
pub fn test_config(path: &Path) -> SearchConfig {
    SearchConfig {
        index_path: path.to_path_buf(),
        writer_heap_size: 30_000_000,
        indexing_threads: 1,
        ..Default::default()
    }
}

/// An active synonym with no parents
pub fn description(description_id: u64, concept_id: u64, term: &str) -> IndexedDescription {
    IndexedDescription {
        description_id,
        concept_id,
        term: term.to_string(),
        preferred_term: None,
        language_code: "en".to_string(),
        description_status_code: 0,
        concept_status_code: ConceptStatus::Current.code(),
        description_type_code: DescriptionType::Synonym.code(),
        direct_parent_concept_ids: BTreeSet::new(),
        recursive_parent_concept_ids: BTreeSet::new(),
    }
}

/// A description whose concept sits directly under `parent`
pub fn child_description(
    description_id: u64,
    concept_id: u64,
    term: &str,
    parent: u64,
) -> IndexedDescription {
    let mut d = description(description_id, concept_id, term);
    d.direct_parent_concept_ids.insert(parent);
    d.recursive_parent_concept_ids.insert(parent);
    d
}

/// Open a search at `path` and rebuild it from `records`
pub fn indexed_search(path: &Path, records: Vec<IndexedDescription>) -> Search {
    let search = Search::open(test_config(path)).unwrap();
    search.rebuild(&MemorySource::new(records)).unwrap();
    search
}
