//! Sample Store
//!
//! SQLite persistence for samples and the home location. All mutations
//! are funneled through one serial writer lane; reads go straight to the
//! pool and only ever observe committed state (WAL journal mode).

mod store;

pub use store::{CacheWriteRequest, SampleStore};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Writer lane unavailable: {0}")]
    WriterLane(String),
    #[error("Corrupt stored record: {0}")]
    Corrupt(String),
}
