//! Terminology description search powered by Tantivy
//!
//! This module indexes the descriptions (labels and synonyms) of a clinical
//! terminology and answers free-text lookups over them:
//!
//! - **Hybrid matching**: every token must match exactly, as a prefix, or within
//!   a bounded edit distance
//! - **Short-label ranking**: concise labels outrank verbose ones that contain
//!   the same words
//! - **Hierarchy filters**: restrict by direct or recursive parent concepts,
//!   description type, or concept status without changing rank order
//! - **Batched rebuilds**: commit per batch, merge once, then swap the reader
//!   snapshot atomically
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │        SearchRegistry (one per location)         │
//! └─────────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────────┐
//! │                   Search                         │
//! ├─────────────────────────────────────────────────┤
//! │  - new_request() → RequestBuilder → Request     │
//! │  - execute()       - rebuild()                  │
//! └─────────────────────────────────────────────────┘
//!          │                          │
//!          ▼                          ▼
//! ┌──────────────────────┐  ┌──────────────────────┐
//! │    QueryCompiler     │  │      IndexStore      │
//! ├──────────────────────┤  ├──────────────────────┤
//! │  - tokens → clauses  │  │  - WriterSession     │
//! │  - Filter constraints│  │  - Snapshot (swap)   │
//! └──────────────────────┘  └──────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────────┐
//! │              Tantivy Index                       │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use terminology_search::search::{Search, SearchConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let search = Search::open(SearchConfig::default())?;
//!
//!     let items = search
//!         .new_request()
//!         .search("myocardial infarct")
//!         .use_fuzzy(1)
//!         .only_active()
//!         .without_fully_specified_names()
//!         .max_hits(20)
//!         .build()
//!         .search()?;
//!
//!     for item in items {
//!         println!("{} → {}", item.term, item.preferred_term);
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod document;
mod error;
mod filter;
mod index;
mod query;
mod registry;
mod result;
mod service;
mod similarity;
mod source;
mod tokenizer;

pub use config::{SearchConfig, SearchConfigBuilder, MIN_HEAP_PER_THREAD};
pub use document::{build_description_schema, DescriptionFields, IndexedDescription};
pub use error::{SearchError, SearchResult};
pub use filter::Filter;
pub use index::{FinalizeReport, IndexStats, IndexStore, Snapshot, WriterSession};
pub use query::{
    clamp_fuzzy_edits, parse_id_list, try_parse_id_list, QueryCompiler, QueryOptions,
    MAX_FUZZY_EDITS,
};
pub use registry::SearchRegistry;
pub use result::{RankedHit, ResultItem, TopHits};
pub use service::{RebuildReport, Request, RequestBuilder, Search};
pub use similarity::{NeutralSimilarity, ShortTermSimilarity, Similarity};
pub use source::{BatchIter, DescriptionSource, JsonLinesSource, MemorySource};
pub use tokenizer::TERMINOLOGY_TOKENIZER;
