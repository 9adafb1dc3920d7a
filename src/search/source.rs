//! Batched description feeds consumed by a rebuild

use crate::search::document::IndexedDescription;
use crate::search::error::{SearchError, SearchResult};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Iterator over batches handed out by a [`DescriptionSource`]
pub type BatchIter<'a> = Box<dyn Iterator<Item = SearchResult<Vec<IndexedDescription>>> + 'a>;

/// Supplies every description of the terminology in ordered batches.
///
/// The index performs no joins or hierarchy traversal of its own; records must
/// arrive with concept status, preferred term and both parent sets filled in.
pub trait DescriptionSource {
    /// Total number of records, if cheaply known
    fn len_hint(&self) -> Option<u64> {
        None
    }

    /// Batches of at most `batch_size` records
    fn batches(&self, batch_size: usize) -> BatchIter<'_>;
}

/// Records already held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<IndexedDescription>,
}

impl MemorySource {
    pub fn new(records: Vec<IndexedDescription>) -> Self {
        Self { records }
    }
}

impl From<Vec<IndexedDescription>> for MemorySource {
    fn from(records: Vec<IndexedDescription>) -> Self {
        Self::new(records)
    }
}

impl DescriptionSource for MemorySource {
    fn len_hint(&self) -> Option<u64> {
        Some(self.records.len() as u64)
    }

    fn batches(&self, batch_size: usize) -> BatchIter<'_> {
        Box::new(
            self.records
                .chunks(batch_size.max(1))
                .map(|chunk| Ok(chunk.to_vec())),
        )
    }
}

/// One JSON-encoded [`IndexedDescription`] per line; blank lines are skipped
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    path: PathBuf,
}

impl JsonLinesSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DescriptionSource for JsonLinesSource {
    fn batches(&self, batch_size: usize) -> BatchIter<'_> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) => {
                return Box::new(std::iter::once(Err(SearchError::SourceError(format!(
                    "Failed to open {}: {}",
                    self.path.display(),
                    e
                )))))
            }
        };

        Box::new(JsonLinesBatches {
            lines: BufReader::new(file).lines(),
            line_no: 0,
            batch_size: batch_size.max(1),
            failed: false,
        })
    }
}

struct JsonLinesBatches {
    lines: std::io::Lines<BufReader<File>>,
    line_no: usize,
    batch_size: usize,
    failed: bool,
}

impl Iterator for JsonLinesBatches {
    type Item = SearchResult<Vec<IndexedDescription>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.failed = true;
                    return Some(Err(SearchError::SourceError(e.to_string())));
                }
                None => break,
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<IndexedDescription>(&line) {
                Ok(record) => batch.push(record),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(SearchError::SourceError(format!(
                        "line {}: {}",
                        self.line_no, e
                    ))));
                }
            }
        }

        if batch.is_empty() {
            None
        } else {
            Some(Ok(batch))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn record(id: u64) -> IndexedDescription {
        IndexedDescription {
            description_id: id,
            concept_id: id,
            term: format!("term {}", id),
            preferred_term: None,
            language_code: "en".to_string(),
            description_status_code: 0,
            concept_status_code: 0,
            description_type_code: 2,
            direct_parent_concept_ids: Default::default(),
            recursive_parent_concept_ids: Default::default(),
        }
    }

    #[test]
    fn test_memory_source_batches() {
        let source = MemorySource::new((0..7).map(record).collect());
        let sizes: Vec<usize> = source.batches(3).map(|b| b.unwrap().len()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(source.len_hint(), Some(7));
    }

    #[test]
    fn test_json_lines_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for id in 0..5 {
            writeln!(file, "{}", serde_json::to_string(&record(id)).unwrap()).unwrap();
            writeln!(file).unwrap();
        }
        let source = JsonLinesSource::new(file.path());
        let batches: Vec<_> = source.batches(2).map(|b| b.unwrap()).collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2][0].description_id, 4);
    }

    #[test]
    fn test_json_lines_malformed_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", serde_json::to_string(&record(1)).unwrap()).unwrap();
        writeln!(file, "not json").unwrap();
        let source = JsonLinesSource::new(file.path());
        let results: Vec<_> = source.batches(10).collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(SearchError::SourceError(_))));
    }

    #[test]
    fn test_json_lines_missing_file() {
        let source = JsonLinesSource::new("/nonexistent/descriptions.jsonl");
        let first = source.batches(10).next().unwrap();
        assert!(matches!(first, Err(SearchError::SourceError(_))));
    }
}
