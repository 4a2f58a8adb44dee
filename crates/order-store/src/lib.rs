//! Store accessor for customer order aggregates.
//!
//! Exposes per-kind filtered, eager-including bulk loads through the
//! [`OrderReader`] and [`OrderStore`] traits, a [`UnitOfWork`] staging
//! cascading removals, and two backends: [`InMemoryOrderStore`] and
//! [`PostgresOrderStore`].

pub mod cascade;
pub mod config;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;
pub mod table;
pub mod unit_of_work;

pub use cascade::CascadeSet;
pub use common::EntityId;
pub use config::PostgresConfig;
pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use query::{Include, LoadQuery};
pub use store::{OrderReader, OrderStore};
pub use table::StoreTable;
pub use unit_of_work::UnitOfWork;
