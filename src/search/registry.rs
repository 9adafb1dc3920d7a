//! Registry of open search handles, one per index location

use crate::search::config::SearchConfig;
use crate::search::error::{SearchError, SearchResult};
use crate::search::service::Search;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

static GLOBAL: OnceCell<SearchRegistry> = OnceCell::new();

/// Shares one [`Search`] per index location.
///
/// Concurrent first callers for a location may each open the index, but only
/// the first to insert is kept; the others drop theirs and adopt it.
pub struct SearchRegistry {
    /// Open handles keyed by canonical index location
    searches: DashMap<PathBuf, Arc<Search>>,

    /// Used by [`default_search`](SearchRegistry::default_search)
    default_config: SearchConfig,
}

impl SearchRegistry {
    pub fn new(default_config: SearchConfig) -> Self {
        Self {
            searches: DashMap::new(),
            default_config,
        }
    }

    /// Install the process-wide registry. Fails if one is already installed.
    pub fn init_global(default_config: SearchConfig) -> SearchResult<&'static SearchRegistry> {
        GLOBAL
            .set(SearchRegistry::new(default_config))
            .map_err(|_| {
                SearchError::InvalidConfiguration(
                    "global search registry already initialized".to_string(),
                )
            })?;
        info!("Initialized global search registry");
        Self::global()
            .ok_or_else(|| SearchError::Engine("global search registry missing".to_string()))
    }

    /// The process-wide registry, if [`init_global`](SearchRegistry::init_global) was called
    pub fn global() -> Option<&'static SearchRegistry> {
        GLOBAL.get()
    }

    pub fn default_config(&self) -> &SearchConfig {
        &self.default_config
    }

    /// Handle for the default location
    pub fn default_search(&self) -> SearchResult<Arc<Search>> {
        self.get_or_open(self.default_config.clone())
    }

    /// Handle for `config.index_path`, opening it on first use.
    ///
    /// Later calls for the same location return the existing handle and ignore
    /// the rest of `config`.
    pub fn get_or_open(&self, config: SearchConfig) -> SearchResult<Arc<Search>> {
        let key = canonical_location(&config.index_path)?;
        if let Some(existing) = self.searches.get(&key) {
            return Ok(Arc::clone(existing.value()));
        }

        // Built outside the map so a slow open never holds a shard lock
        let search = Arc::new(Search::open(SearchConfig {
            index_path: key.clone(),
            ..config
        })?);

        match self.searches.entry(key.clone()) {
            Entry::Occupied(entry) => {
                debug!(location = %key.display(), "Lost registry race; adopting existing handle");
                Ok(Arc::clone(entry.get()))
            }
            Entry::Vacant(entry) => {
                info!(location = %key.display(), "Registered search handle");
                Ok(Arc::clone(entry.insert(search).value()))
            }
        }
    }

    /// Handle for `location` if one is already open
    pub fn get(&self, location: impl AsRef<Path>) -> Option<Arc<Search>> {
        let key = std::fs::canonicalize(location.as_ref()).ok()?;
        self.searches.get(&key).map(|entry| Arc::clone(entry.value()))
    }

    /// Forget the handle for `location`; clones already handed out stay usable
    pub fn remove(&self, location: impl AsRef<Path>) -> Option<Arc<Search>> {
        let key = std::fs::canonicalize(location.as_ref()).ok()?;
        self.searches.remove(&key).map(|(_, search)| search)
    }

    pub fn locations(&self) -> Vec<PathBuf> {
        self.searches.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.searches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.searches.is_empty()
    }
}

impl Default for SearchRegistry {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

fn canonical_location(path: &Path) -> SearchResult<PathBuf> {
    std::fs::create_dir_all(path).map_err(|e| {
        SearchError::StorageIo(format!(
            "Failed to create index directory {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(std::fs::canonicalize(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(path: &Path) -> SearchConfig {
        SearchConfig {
            index_path: path.to_path_buf(),
            writer_heap_size: 30_000_000,
            indexing_threads: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_same_location_shares_handle() {
        let temp_dir = TempDir::new().unwrap();
        let registry = SearchRegistry::default();
        let first = registry.get_or_open(test_config(temp_dir.path())).unwrap();
        let second = registry
            .get_or_open(test_config(&temp_dir.path().join(".")))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_locations() {
        let temp_dir = TempDir::new().unwrap();
        let registry = SearchRegistry::default();
        registry
            .get_or_open(test_config(&temp_dir.path().join("a")))
            .unwrap();
        registry
            .get_or_open(test_config(&temp_dir.path().join("b")))
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.get(temp_dir.path().join("a")).is_some());
        assert!(registry.get(temp_dir.path().join("c")).is_none());
    }

    #[test]
    fn test_concurrent_first_access_converges() {
        let temp_dir = TempDir::new().unwrap();
        let registry = SearchRegistry::default();
        let handles: Vec<Arc<Search>> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| registry.get_or_open(test_config(temp_dir.path())).unwrap()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(registry.len(), 1);
        let winner = registry.get(temp_dir.path()).unwrap();
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, &winner)));
    }

    #[test]
    fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let registry = SearchRegistry::default();
        let search = registry.get_or_open(test_config(temp_dir.path())).unwrap();
        assert!(registry.remove(temp_dir.path()).is_some());
        assert!(registry.is_empty());
        assert_eq!(search.stats().unwrap().total_documents, 0);
    }
}
