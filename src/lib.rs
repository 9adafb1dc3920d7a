//! Free-text search over the descriptions of a hierarchical clinical terminology.
//!
//! See [`search`] for the index, query and result APIs.

pub mod config;
pub mod models;
pub mod search;
