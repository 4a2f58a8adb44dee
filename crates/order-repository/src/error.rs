//! Repository error types.

use order_store::StoreError;
use thiserror::Error;

use crate::SubGraphKind;

/// Errors that can occur while loading or removing order aggregates.
///
/// Any error aborts the whole operation; no partial aggregates are returned.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Loading roots or staging a loaded graph for removal failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// One of the optional sub-graph fetches failed.
    #[error("Failed to load {sub_graph}: {source}")]
    SubGraphFetch {
        sub_graph: SubGraphKind,
        source: StoreError,
    },
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
