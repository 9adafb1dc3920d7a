//! Search index management

use crate::search::config::SearchConfig;
use crate::search::document::{build_description_schema, DescriptionFields, IndexedDescription};
use crate::search::error::{SearchError, SearchResult};
use crate::search::tokenizer;
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tantivy::merge_policy::NoMergePolicy;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyError};
use tracing::{debug, info, warn};

/// Index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Documents visible in the live snapshot
    pub total_documents: u64,

    /// Index size in bytes
    pub index_size_bytes: u64,

    /// Number of segments in the live snapshot
    pub num_segments: usize,

    /// Generation of the live snapshot
    pub generation: u64,

    /// Last successful commit made through this handle
    pub last_commit: Option<DateTime<Utc>>,
}

/// Immutable point-in-time view of the index.
///
/// Any number of threads may search one snapshot concurrently; a rebuild
/// installs a new snapshot without disturbing searches already holding this one.
pub struct Snapshot {
    searcher: Searcher,
    generation: u64,
    loaded_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn searcher(&self) -> &Searcher {
        &self.searcher
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn num_docs(&self) -> u64 {
        self.searcher.num_docs()
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("generation", &self.generation)
            .field("num_docs", &self.num_docs())
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

/// Durable description index at one location
pub struct IndexStore {
    location: PathBuf,
    index: Index,
    fields: DescriptionFields,
    reader: IndexReader,
    snapshot: ArcSwap<Snapshot>,
    generation: AtomicU64,
    writer_active: AtomicBool,
    last_commit: Mutex<Option<DateTime<Utc>>>,
    config: SearchConfig,
}

impl IndexStore {
    /// Open the index at `config.index_path`, creating an empty one if none exists
    pub fn open(config: &SearchConfig) -> SearchResult<Self> {
        config.validate()?;
        let location = config.index_path.clone();

        std::fs::create_dir_all(&location).map_err(|e| {
            SearchError::StorageIo(format!(
                "Failed to create index directory {}: {}",
                location.display(),
                e
            ))
        })?;

        let index = Self::open_or_create(&location)?;
        tokenizer::register(&index);
        let fields = DescriptionFields::from_schema(&index.schema())?;

        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        let generation = index
            .load_metas()
            .map(|metas| metas.opstamp)
            .map_err(SearchError::from)?;

        let snapshot = Snapshot {
            searcher: reader.searcher(),
            generation,
            loaded_at: Utc::now(),
        };
        info!(
            location = %location.display(),
            documents = snapshot.num_docs(),
            generation = generation,
            "Opened description index"
        );

        Ok(Self {
            location,
            index,
            fields,
            reader,
            snapshot: ArcSwap::from_pointee(snapshot),
            generation: AtomicU64::new(generation),
            writer_active: AtomicBool::new(false),
            last_commit: Mutex::new(None),
            config: config.clone(),
        })
    }

    /// Check if an index exists at the given path
    fn index_exists(path: &Path) -> bool {
        path.join("meta.json").exists()
    }

    fn open_or_create(path: &Path) -> SearchResult<Index> {
        if Self::index_exists(path) {
            return Ok(Index::open_in_dir(path)?);
        }
        match Index::create_in_dir(path, build_description_schema()) {
            Ok(index) => {
                debug!(location = %path.display(), "Created empty description index");
                Ok(index)
            }
            // Another handle created it between our check and create
            Err(TantivyError::IndexAlreadyExists) => Ok(Index::open_in_dir(path)?),
            Err(e) => Err(e.into()),
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn fields(&self) -> &DescriptionFields {
        &self.fields
    }

    /// The most recently installed snapshot
    pub fn current_reader(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    /// Generation of the last commit made through this handle
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Start the exclusive writer session for this location.
    ///
    /// Fails fast with [`SearchError::WriterLockUnavailable`] if a session is
    /// already open here or another process holds the index lock.
    pub fn begin_session(&self) -> SearchResult<WriterSession<'_>> {
        if self
            .writer_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(location = %self.location.display(), "Writer session already active");
            return Err(SearchError::WriterLockUnavailable(
                self.location.display().to_string(),
            ));
        }
        let guard = SessionGuard { store: self };

        let writer: IndexWriter = self
            .index
            .writer_with_num_threads(self.config.indexing_threads, self.config.writer_heap_size)
            .map_err(|e| match SearchError::from(e) {
                SearchError::WriterLockUnavailable(_) => {
                    warn!(location = %self.location.display(), "Index locked by another writer");
                    SearchError::WriterLockUnavailable(self.location.display().to_string())
                }
                other => other,
            })?;
        writer.set_merge_policy(Box::new(NoMergePolicy));

        debug!(location = %self.location.display(), "Writer session started");
        Ok(WriterSession {
            store: self,
            writer: Some(writer),
            pending: 0,
            dirty: false,
            batches_committed: 0,
            _guard: guard,
        })
    }

    /// Reload from the last commit and atomically install the new snapshot
    fn install_snapshot(&self) -> SearchResult<Arc<Snapshot>> {
        self.reader.reload()?;
        let snapshot = Arc::new(Snapshot {
            searcher: self.reader.searcher(),
            generation: self.generation(),
            loaded_at: Utc::now(),
        });
        self.snapshot.store(Arc::clone(&snapshot));
        info!(
            location = %self.location.display(),
            generation = snapshot.generation,
            documents = snapshot.num_docs(),
            "Installed new reader snapshot"
        );
        Ok(snapshot)
    }

    fn record_commit(&self, opstamp: u64) {
        self.generation.store(opstamp, Ordering::Release);
        *self.last_commit.lock() = Some(Utc::now());
    }

    /// Get index statistics for the live snapshot
    pub fn stats(&self) -> SearchResult<IndexStats> {
        let snapshot = self.current_reader();

        let index_size_bytes = std::fs::read_dir(&self.location)?
            .filter_map(|e| e.ok())
            .filter_map(|e| e.metadata().ok())
            .filter(|m| m.is_file())
            .map(|m| m.len())
            .sum();

        Ok(IndexStats {
            total_documents: snapshot.num_docs(),
            index_size_bytes,
            num_segments: snapshot.searcher.segment_readers().len(),
            generation: snapshot.generation,
            last_commit: *self.last_commit.lock(),
        })
    }
}

impl std::fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexStore")
            .field("location", &self.location)
            .field("generation", &self.generation())
            .finish()
    }
}

/// Releases the in-process writer flag however the session ends
struct SessionGuard<'a> {
    store: &'a IndexStore,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.store.writer_active.store(false, Ordering::Release);
    }
}

/// Outcome of a completed writer session
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinalizeReport {
    /// Segment merges performed while finalizing
    pub merges: u32,

    /// Segments left after finalizing
    pub segments: usize,

    /// Generation of the installed snapshot
    pub generation: u64,
}

/// Exclusive context for adding and removing documents.
///
/// Nothing written here is visible to searches until
/// [`finalize_rebuild`](WriterSession::finalize_rebuild) installs a new
/// snapshot. Each [`commit_batch`](WriterSession::commit_batch) is a durability
/// checkpoint: dropping the session discards only uncommitted documents.
pub struct WriterSession<'a> {
    store: &'a IndexStore,
    writer: Option<IndexWriter>,
    pending: usize,
    /// Adds or deletes queued since the last commit
    dirty: bool,
    batches_committed: u64,
    _guard: SessionGuard<'a>,
}

impl<'a> WriterSession<'a> {
    fn writer(&mut self) -> SearchResult<&mut IndexWriter> {
        self.writer
            .as_mut()
            .ok_or_else(|| SearchError::Engine("writer session already closed".to_string()))
    }

    /// Replace any document with the same description id by `description`.
    ///
    /// Returns `false` when the description has no term content; any earlier
    /// document for that id is still removed.
    pub fn upsert(&mut self, description: &IndexedDescription) -> SearchResult<bool> {
        let fields = *self.store.fields();
        self.writer()?.delete_term(description.id_term(&fields));
        self.dirty = true;

        if !description.has_content() {
            debug!(
                description_id = description.description_id,
                "Skipping description without term"
            );
            return Ok(false);
        }

        self.writer()?
            .add_document(description.to_tantivy_doc(&fields))?;
        self.pending += 1;
        Ok(true)
    }

    /// Remove the document for `description_id`, if any
    pub fn delete(&mut self, description_id: u64) -> SearchResult<()> {
        let term = tantivy::Term::from_field_u64(self.store.fields().description_id, description_id);
        self.writer()?.delete_term(term);
        self.dirty = true;
        Ok(())
    }

    /// Remove every document; takes effect at the next commit
    pub fn clear_all(&mut self) -> SearchResult<()> {
        self.writer()?.delete_all_documents()?;
        self.dirty = true;
        Ok(())
    }

    /// Documents added since the last commit
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn batches_committed(&self) -> u64 {
        self.batches_committed
    }

    /// Durably flush everything added so far and advance the generation
    pub fn commit_batch(&mut self) -> SearchResult<u64> {
        let opstamp = self.writer()?.commit()?;
        self.store.record_commit(opstamp);
        self.batches_committed += 1;
        debug!(
            location = %self.store.location.display(),
            documents = self.pending,
            generation = opstamp,
            "Committed batch"
        );
        self.pending = 0;
        self.dirty = false;
        Ok(opstamp)
    }

    /// Commit what remains, merge all segments into one, and install a fresh
    /// snapshot for readers.
    ///
    /// A lone segment is still merged when it carries deleted documents, so the
    /// result never holds dead entries.
    pub fn finalize_rebuild(mut self) -> SearchResult<FinalizeReport> {
        if self.dirty {
            self.commit_batch()?;
        }

        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| SearchError::Engine("writer session already closed".to_string()))?;

        let segments = self.store.index.searchable_segment_metas()?;
        let segment_ids: Vec<_> = segments.iter().map(|meta| meta.id()).collect();
        let has_deletes = segments.iter().any(|meta| meta.has_deletes());
        let mut merges = 0;
        if segment_ids.len() > 1 || (segment_ids.len() == 1 && has_deletes) {
            info!(
                location = %self.store.location.display(),
                segments = segment_ids.len(),
                "Merging segments"
            );
            writer.merge(&segment_ids).wait()?;
            merges += 1;
        }
        writer.wait_merging_threads()?;

        let snapshot = self.store.install_snapshot()?;
        Ok(FinalizeReport {
            merges,
            segments: snapshot.searcher.segment_readers().len(),
            generation: snapshot.generation,
        })
    }
}

impl Drop for WriterSession<'_> {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if self.dirty {
                warn!(
                    location = %self.store.location.display(),
                    documents = self.pending,
                    "Writer session dropped; rolling back uncommitted documents"
                );
            }
            if let Err(e) = writer.rollback() {
                warn!(error = %e, "Rollback of writer session failed");
            }
        }
    }
}
