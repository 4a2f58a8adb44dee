//! Selective hydration and cascading removal of customer order aggregates.
//!
//! [`OrderRepository`] loads roots for a set of ids, then fetches only the
//! sub-graphs named by the caller's [`ResponseGroup`], concurrently when the
//! store allows it, and attaches them to the roots through an explicit
//! [`AggregateContext`] index. Removal reloads full aggregates and stages
//! them in a [`UnitOfWork`].

pub mod config;
pub mod context;
pub mod error;
pub mod loader;
pub mod plan;
pub mod remover;

pub use config::{FetchMode, RepositoryConfig};
pub use context::AggregateContext;
pub use error::{RepositoryError, Result};
pub use loader::OrderRepository;
pub use order_model::ResponseGroup;
pub use order_store::UnitOfWork;
pub use plan::{LoadPlan, SubGraph, SubGraphFetch, SubGraphKind};
