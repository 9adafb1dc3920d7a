//! Main search service implementation

use crate::search::config::SearchConfig;
use crate::search::error::SearchResult;
use crate::search::filter::Filter;
use crate::search::index::{IndexStats, IndexStore, Snapshot, WriterSession};
use crate::search::query::{clamp_fuzzy_edits, QueryCompiler, QueryOptions};
use crate::search::result::{RankedHit, ResultItem, TopHits};
use crate::search::similarity::{ShortTermSimilarity, Similarity};
use crate::search::source::DescriptionSource;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tantivy::collector::TopDocs;
use tantivy::fieldnorm::FieldNormReader;
use tantivy::query::Query;
use tantivy::{DocId, Score, SegmentReader};
use tracing::{debug, info};

/// Summary of a completed rebuild
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RebuildReport {
    /// Descriptions written to the index
    pub documents_indexed: u64,

    /// Descriptions skipped for having no term
    pub documents_skipped: u64,

    /// Durable commits made, one per batch
    pub batches_committed: u64,

    /// Segment merges performed at the end
    pub merges: u32,

    /// Wall-clock duration
    pub elapsed: Duration,
}

/// Search over the description index at one location
pub struct Search {
    store: IndexStore,
    compiler: QueryCompiler,
    similarity: Arc<dyn Similarity>,
    config: SearchConfig,
}

impl Search {
    /// Open the index at `config.index_path`, ranking shorter labels first
    pub fn open(config: SearchConfig) -> SearchResult<Self> {
        Self::open_with(config, Arc::new(ShortTermSimilarity))
    }

    /// Open with a caller-supplied length normalization
    pub fn open_with(config: SearchConfig, similarity: Arc<dyn Similarity>) -> SearchResult<Self> {
        let store = IndexStore::open(&config)?;
        let compiler = QueryCompiler::new(
            store.index().clone(),
            *store.fields(),
            QueryOptions::from(&config),
        );
        debug!(similarity = ?similarity, "Search ready");

        Ok(Self {
            store,
            compiler,
            similarity,
            config,
        })
    }

    pub fn index_location(&self) -> &Path {
        self.store.location()
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    pub fn stats(&self) -> SearchResult<IndexStats> {
        self.store.stats()
    }

    /// The snapshot new searches will run against
    pub fn current_reader(&self) -> Arc<Snapshot> {
        self.store.current_reader()
    }

    /// Start an exclusive writer session for incremental maintenance
    pub fn begin_session(&self) -> SearchResult<WriterSession<'_>> {
        self.store.begin_session()
    }

    /// Start a fluent request
    pub fn new_request(&self) -> RequestBuilder<'_> {
        RequestBuilder::new(self)
    }

    /// Run `query` against the current snapshot, best first.
    ///
    /// The engine score of each hit is scaled by the configured length
    /// normalization of the matched term field. Equal scores keep the engine's
    /// document order.
    pub fn execute(&self, query: &dyn Query, max_hits: usize) -> SearchResult<TopHits> {
        let snapshot = self.current_reader();
        let fields = *self.store.fields();
        // No query can return more than num_docs hits
        let max_hits = max_hits.min(snapshot.num_docs() as usize);
        if max_hits == 0 {
            return Ok(TopHits::new(snapshot, fields, Vec::new()));
        }

        let start_time = Instant::now();
        let term_field = fields.term;
        let similarity = Arc::clone(&self.similarity);
        let collector = TopDocs::with_limit(max_hits).tweak_score(
            move |segment_reader: &SegmentReader| {
                let fieldnorms = segment_reader
                    .get_fieldnorms_reader(term_field)
                    .unwrap_or_else(|_| FieldNormReader::constant(segment_reader.max_doc(), 1));
                let similarity = Arc::clone(&similarity);
                move |doc: DocId, score: Score| {
                    score * similarity.length_norm(fieldnorms.fieldnorm(doc))
                }
            },
        );

        let top_docs = snapshot.searcher().search(query, &collector)?;
        let hits: Vec<RankedHit> = top_docs
            .into_iter()
            .map(|(score, address)| RankedHit { score, address })
            .collect();

        debug!(
            hits = hits.len(),
            max_hits = max_hits,
            generation = snapshot.generation(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Executed search"
        );
        Ok(TopHits::new(snapshot, fields, hits))
    }

    /// Index every description from `source`, committing once per batch, then
    /// merge and install a fresh snapshot.
    ///
    /// On failure the session is dropped, uncommitted documents are rolled
    /// back, and searches keep using the previous snapshot.
    pub fn rebuild(&self, source: &dyn DescriptionSource) -> SearchResult<RebuildReport> {
        let start_time = Instant::now();
        let mut session = self.store.begin_session()?;
        let mut report = RebuildReport::default();

        info!(
            location = %self.index_location().display(),
            batch_size = self.config.batch_size,
            expected = ?source.len_hint(),
            "Starting index rebuild"
        );

        for (batch_no, batch) in source.batches(self.config.batch_size).enumerate() {
            let batch = batch?;
            for description in &batch {
                if session.upsert(description)? {
                    report.documents_indexed += 1;
                } else {
                    report.documents_skipped += 1;
                }
            }
            session.commit_batch()?;
            info!(
                location = %self.index_location().display(),
                batch = batch_no + 1,
                documents = report.documents_indexed,
                "Indexed batch"
            );
        }

        report.batches_committed = session.batches_committed();
        let finalized = session.finalize_rebuild()?;
        report.merges = finalized.merges;
        report.elapsed = start_time.elapsed();

        info!(
            location = %self.index_location().display(),
            documents = report.documents_indexed,
            skipped = report.documents_skipped,
            batches = report.batches_committed,
            generation = finalized.generation,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Index rebuild complete"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for Search {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Search")
            .field("location", &self.index_location())
            .field("similarity", &self.similarity)
            .finish()
    }
}

/// Fluent builder for a [`Request`]
pub struct RequestBuilder<'a> {
    search: &'a Search,
    text: Option<String>,
    query: Option<Box<dyn Query>>,
    fuzzy_max_edits: u8,
    filters: Vec<Filter>,
    max_hits: usize,
}

impl<'a> RequestBuilder<'a> {
    fn new(search: &'a Search) -> Self {
        Self {
            search,
            text: None,
            query: None,
            fuzzy_max_edits: 0,
            filters: Vec::new(),
            max_hits: search.config.max_hits,
        }
    }

    /// Search `text` with the built-in compiler, replacing any explicit query
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self.query = None;
        self
    }

    /// Fuzzy matching for the built-in compiler; 0 turns it off, above 2 is clamped
    pub fn use_fuzzy(mut self, max_edits: u8) -> Self {
        self.fuzzy_max_edits = clamp_fuzzy_edits(max_edits);
        self
    }

    pub fn use_default_fuzzy(self) -> Self {
        let edits = self.search.config.default_fuzzy_edits;
        self.use_fuzzy(edits)
    }

    /// Use a caller-built query instead of the built-in compiler
    pub fn search_using_query(mut self, query: Box<dyn Query>) -> Self {
        self.query = Some(query);
        self
    }

    /// Parse `text` with the engine query parser instead of the built-in compiler
    pub fn search_using_query_parser(mut self, text: &str) -> SearchResult<Self> {
        self.query = Some(self.search.compiler.parse(text)?);
        Ok(self)
    }

    pub fn with_recursive_parent(self, parent: u64) -> Self {
        self.with_filter(Filter::by_recursive_parent([parent]))
    }

    pub fn with_recursive_parents(self, parents: impl IntoIterator<Item = u64>) -> Self {
        self.with_filter(Filter::by_recursive_parent(parents))
    }

    pub fn with_direct_parent(self, parent: u64) -> Self {
        self.with_filter(Filter::by_direct_parent([parent]))
    }

    pub fn with_direct_parents(self, parents: impl IntoIterator<Item = u64>) -> Self {
        self.with_filter(Filter::by_direct_parent(parents))
    }

    pub fn without_fully_specified_names(self) -> Self {
        self.with_filter(Filter::without_fully_specified_names())
    }

    pub fn only_active(self) -> Self {
        self.with_filter(Filter::active_concepts_only())
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn clear_filters(mut self) -> Self {
        self.filters.clear();
        self
    }

    pub fn max_hits(mut self, max_hits: usize) -> Self {
        self.max_hits = max_hits;
        self
    }

    /// Compile into an executable request
    pub fn build(self) -> Request<'a> {
        let query = self.search.compiler.compile(
            self.query,
            self.text.as_deref(),
            self.fuzzy_max_edits,
            &self.filters,
        );
        Request {
            search: self.search,
            query,
            max_hits: self.max_hits,
        }
    }
}

/// A compiled request, executable any number of times
pub struct Request<'a> {
    search: &'a Search,
    query: Box<dyn Query>,
    max_hits: usize,
}

impl Request<'_> {
    pub fn query(&self) -> &dyn Query {
        self.query.as_ref()
    }

    pub fn max_hits(&self) -> usize {
        self.max_hits
    }

    /// Raw ranked hits
    pub fn search_for_top_hits(&self) -> SearchResult<TopHits> {
        self.search.execute(self.query.as_ref(), self.max_hits)
    }

    /// Result items in rank order
    pub fn search(&self) -> SearchResult<Vec<ResultItem>> {
        self.search_for_top_hits()?.to_result_items()
    }

    /// The best result only
    pub fn search_for_single(&self) -> SearchResult<Option<ResultItem>> {
        self.search.execute(self.query.as_ref(), 1)?.top_hit()
    }

    /// Matching concept ids, each once, in rank order
    pub fn search_for_concepts(&self) -> SearchResult<Vec<u64>> {
        self.search_for_top_hits()?.to_concept_ids()
    }

    /// Matching description texts in rank order
    pub fn search_for_descriptions(&self) -> SearchResult<Vec<String>> {
        self.search_for_top_hits()?.to_description_texts()
    }
}

impl std::fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("query", &self.query)
            .field("max_hits", &self.max_hits)
            .finish()
    }
}
