use common::EntityId;
use thiserror::Error;

use crate::StoreTable;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A persisted row could not be mapped onto its entity.
    #[error("Invalid row in {table}: {message}")]
    InvalidRow { table: StoreTable, message: String },

    /// A graph staged for removal does not list every row it owns.
    #[error("Order {order_id} cannot be removed from a partial graph: {missing} not loaded")]
    IncompleteGraph {
        order_id: EntityId,
        missing: &'static str,
    },

    /// The backend failed to serve a request for a table.
    #[error("Backend failure on {table}: {message}")]
    Backend { table: StoreTable, message: String },
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
