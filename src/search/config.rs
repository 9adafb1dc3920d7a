//! Search configuration

use crate::search::error::{SearchError, SearchResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Smallest per-thread writer arena the index engine accepts
pub const MIN_HEAP_PER_THREAD: usize = 15_000_000;

/// Search service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Path to the search index directory
    pub index_path: PathBuf,

    /// Index writer heap size in bytes, shared by all indexing threads
    pub writer_heap_size: usize,

    /// Number of threads for indexing
    pub indexing_threads: usize,

    /// Descriptions processed between commits during a rebuild
    pub batch_size: usize,

    /// Maximum hits returned by a request unless overridden
    pub max_hits: usize,

    /// Tokens at least this long also match as a prefix
    pub prefix_min_chars: usize,

    /// Tokens longer than this are eligible for fuzzy matching
    pub fuzzy_min_chars: usize,

    /// Edit distance used when fuzzy matching is switched on without a distance
    pub default_fuzzy_edits: u8,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("./data/sct_index"),
            writer_heap_size: 64_000_000, // 64MB
            indexing_threads: 2,
            batch_size: 500,
            max_hits: 200,
            prefix_min_chars: 3,
            fuzzy_min_chars: 3,
            default_fuzzy_edits: 2,
        }
    }
}

impl SearchConfig {
    /// Check the values the index engine would otherwise reject at writer time
    pub fn validate(&self) -> SearchResult<()> {
        if self.indexing_threads == 0 {
            return Err(SearchError::InvalidConfiguration(
                "indexing_threads must be at least 1".to_string(),
            ));
        }
        if self.writer_heap_size / self.indexing_threads < MIN_HEAP_PER_THREAD {
            return Err(SearchError::InvalidConfiguration(format!(
                "writer_heap_size {} gives less than {} bytes per indexing thread",
                self.writer_heap_size, MIN_HEAP_PER_THREAD
            )));
        }
        if self.batch_size == 0 {
            return Err(SearchError::InvalidConfiguration(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.default_fuzzy_edits > 2 {
            return Err(SearchError::InvalidConfiguration(
                "default_fuzzy_edits cannot exceed 2".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.index_path = path.into();
        self
    }

    pub fn writer_heap_size(mut self, size: usize) -> Self {
        self.config.writer_heap_size = size;
        self
    }

    pub fn indexing_threads(mut self, threads: usize) -> Self {
        self.config.indexing_threads = threads;
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    pub fn max_hits(mut self, max: usize) -> Self {
        self.config.max_hits = max;
        self
    }

    pub fn prefix_min_chars(mut self, chars: usize) -> Self {
        self.config.prefix_min_chars = chars;
        self
    }

    pub fn fuzzy_min_chars(mut self, chars: usize) -> Self {
        self.config.fuzzy_min_chars = chars;
        self
    }

    pub fn default_fuzzy_edits(mut self, edits: u8) -> Self {
        self.config.default_fuzzy_edits = edits;
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
