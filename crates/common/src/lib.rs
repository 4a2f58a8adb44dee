//! Shared types for the order aggregate workspace.

mod types;

pub use types::{EntityId, Money};
