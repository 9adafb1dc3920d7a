//! Tests for batched rebuilds and snapshot swapping

mod common;

use common::{description, indexed_search, test_config};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use terminology_search::search::*;
use tempfile::TempDir;

/// Yields its records in batches, then fails
struct FailingSource {
    records: Vec<IndexedDescription>,
}

impl DescriptionSource for FailingSource {
    fn batches(&self, batch_size: usize) -> BatchIter<'_> {
        let good = self.records.chunks(batch_size).map(|chunk| Ok(chunk.to_vec()));
        let bad = std::iter::once(Err(SearchError::SourceError(
            "connection reset".to_string(),
        )));
        Box::new(good.chain(bad))
    }
}

fn corpus(count: u64, term: &str) -> Vec<IndexedDescription> {
    (1..=count)
        .map(|i| description(i, 100_000 + i, &format!("{} {}", term, i)))
        .collect()
}

#[test]
fn test_rebuild_commits_per_batch_and_merges_once() {
    let temp_dir = TempDir::new().unwrap();
    let search = Search::open(SearchConfig {
        batch_size: 500,
        ..test_config(temp_dir.path())
    })
    .unwrap();

    let report = search
        .rebuild(&MemorySource::new(corpus(10_000, "Paracetamol")))
        .unwrap();

    assert_eq!(report.documents_indexed, 10_000);
    assert_eq!(report.documents_skipped, 0);
    assert_eq!(report.batches_committed, 20);
    assert_eq!(report.merges, 1);

    let stats = search.stats().unwrap();
    assert_eq!(stats.total_documents, 10_000);
    assert_eq!(stats.num_segments, 1);
}

#[test]
fn test_rebuild_replaces_by_description_id() {
    let temp_dir = TempDir::new().unwrap();
    let search = indexed_search(temp_dir.path(), corpus(10, "Asthma"));
    search.rebuild(&MemorySource::new(corpus(10, "Eczema"))).unwrap();

    assert_eq!(search.current_reader().num_docs(), 10);
    assert!(search.new_request().search("asthma").build().search().unwrap().is_empty());
    assert_eq!(
        search.new_request().search("eczema").build().search().unwrap().len(),
        10
    );
}

#[test]
fn test_hits_taken_before_rebuild_stay_consistent() {
    let temp_dir = TempDir::new().unwrap();
    let search = indexed_search(temp_dir.path(), corpus(5, "Asthma"));

    let before = search.current_reader();
    let hits = search.new_request().search("asthma").build().search_for_top_hits().unwrap();
    let texts_before = hits.to_description_texts().unwrap();

    search
        .rebuild(&MemorySource::new(corpus(5, "Bronchitis")))
        .unwrap();

    // Mapped against the snapshot the query ran on, not the new one
    assert_eq!(hits.to_description_texts().unwrap(), texts_before);
    assert_eq!(hits.generation(), before.generation());
    assert!(search.current_reader().generation() > before.generation());
    assert_eq!(before.num_docs(), 5);
}

#[test]
fn test_concurrent_search_never_sees_partial_rebuild() {
    let temp_dir = TempDir::new().unwrap();
    let search = Search::open(SearchConfig {
        batch_size: 100,
        ..test_config(temp_dir.path())
    })
    .unwrap();
    search.rebuild(&MemorySource::new(corpus(200, "Asthma"))).unwrap();

    let mut records = corpus(200, "Asthma");
    records.extend((201..=1_000).map(|i| description(i, 100_000 + i, &format!("Asthma {}", i))));
    let done = AtomicBool::new(false);

    std::thread::scope(|scope| {
        let reader = scope.spawn(|| {
            let mut observed = Vec::new();
            while !done.load(Ordering::Acquire) {
                let count = search
                    .new_request()
                    .search("asthma")
                    .max_hits(2_000)
                    .build()
                    .search_for_top_hits()
                    .unwrap()
                    .len();
                observed.push(count);
            }
            observed
        });

        search.rebuild(&MemorySource::new(records)).unwrap();
        done.store(true, Ordering::Release);

        let observed = reader.join().unwrap();
        assert!(observed.iter().all(|&count| count == 200 || count == 1_000));
    });

    assert_eq!(search.current_reader().num_docs(), 1_000);
}

#[test]
fn test_failed_source_keeps_previous_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let search = indexed_search(temp_dir.path(), corpus(3, "Asthma"));
    let before = search.current_reader();

    let err = search
        .rebuild(&FailingSource {
            records: corpus(20, "Eczema"),
        })
        .unwrap_err();
    assert!(matches!(err, SearchError::SourceError(_)));

    let after = search.current_reader();
    assert_eq!(after.generation(), before.generation());
    assert_eq!(after.num_docs(), 3);
    assert_eq!(
        search.new_request().search("asthma").build().search().unwrap().len(),
        3
    );
    assert!(search.new_request().search("eczema").build().search().unwrap().is_empty());

    // The writer lock was released with the failed session
    assert!(search.begin_session().is_ok());
}

#[test]
fn test_rebuild_from_json_lines() {
    let temp_dir = TempDir::new().unwrap();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for record in corpus(30, "Migraine") {
        writeln!(file, "{}", serde_json::to_string(&record).unwrap()).unwrap();
    }

    let search = Search::open(SearchConfig {
        batch_size: 8,
        ..test_config(&temp_dir.path().join("index"))
    })
    .unwrap();
    let report = search.rebuild(&JsonLinesSource::new(file.path())).unwrap();

    assert_eq!(report.documents_indexed, 30);
    assert_eq!(report.batches_committed, 4);
    assert_eq!(
        search.new_request().search("migr").build().search_for_concepts().unwrap().len(),
        30
    );
}

#[test]
fn test_reopen_after_rebuild() {
    let temp_dir = TempDir::new().unwrap();
    {
        indexed_search(temp_dir.path(), corpus(12, "Psoriasis"));
    }
    let search = Search::open(test_config(temp_dir.path())).unwrap();
    assert_eq!(search.current_reader().num_docs(), 12);
    assert_eq!(search.stats().unwrap().num_segments, 1);
}
