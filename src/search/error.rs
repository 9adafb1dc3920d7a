//! Error types for search operations

use tantivy::directory::error::LockError;
use tantivy::TantivyError;

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The on-disk index is unreadable or inconsistent; fatal for that
    /// location until it is rebuilt
    #[error("Index corruption detected: {0}")]
    IndexCorruption(String),

    /// Another writer session already holds the lock for this location
    #[error("Index writer lock unavailable for {0}")]
    WriterLockUnavailable(String),

    /// Caller-supplied query syntax could not be parsed
    #[error("Query parsing failed: {0}")]
    QuerySyntax(String),

    /// Read or write failure against index storage
    #[error("Storage I/O error: {0}")]
    StorageIo(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The description source failed to supply a batch
    #[error("Description source error: {0}")]
    SourceError(String),

    /// A comma-delimited identifier list contained a malformed element
    #[error("Invalid identifier list: {0}")]
    InvalidIdList(String),

    /// Any other failure reported by the index engine
    #[error("Index engine error: {0}")]
    Engine(String),
}

impl SearchError {
    /// Whether retrying the same operation later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SearchError::WriterLockUnavailable(_) | SearchError::StorageIo(_)
        )
    }
}

impl From<std::io::Error> for SearchError {
    fn from(err: std::io::Error) -> Self {
        SearchError::StorageIo(err.to_string())
    }
}

impl From<TantivyError> for SearchError {
    fn from(err: TantivyError) -> Self {
        match err {
            TantivyError::DataCorruption(corruption) => {
                SearchError::IndexCorruption(format!("{:?}", corruption))
            }
            TantivyError::IncompatibleIndex(incompatibility) => {
                SearchError::IndexCorruption(format!("{:?}", incompatibility))
            }
            TantivyError::SchemaError(msg) => SearchError::IndexCorruption(msg),
            TantivyError::LockFailure(LockError::LockBusy, msg) => {
                SearchError::WriterLockUnavailable(msg.unwrap_or_else(|| "lock busy".to_string()))
            }
            TantivyError::LockFailure(LockError::IoError(e), _) => {
                SearchError::StorageIo(e.to_string())
            }
            TantivyError::IoError(e) => SearchError::StorageIo(e.to_string()),
            TantivyError::OpenDirectoryError(e) => SearchError::StorageIo(e.to_string()),
            TantivyError::OpenReadError(e) => SearchError::StorageIo(e.to_string()),
            TantivyError::OpenWriteError(e) => SearchError::StorageIo(e.to_string()),
            other => SearchError::Engine(other.to_string()),
        }
    }
}

impl From<tantivy::query::QueryParserError> for SearchError {
    fn from(err: tantivy::query::QueryParserError) -> Self {
        SearchError::QuerySyntax(err.to_string())
    }
}
