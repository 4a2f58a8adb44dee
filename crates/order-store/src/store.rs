use async_trait::async_trait;
use order_model::{Address, CustomerOrder, LineItem, PaymentIn, Shipment};

use crate::{CascadeSet, LoadQuery, Result};

/// Typed read access to persisted order aggregates.
///
/// Every load filters by order id membership and returns matched rows with
/// the requested relations attached (`Some`, possibly empty). Relations
/// that were not requested stay `None`. Loads never merge results into
/// previously returned values; attaching sub-graphs to their roots is the
/// caller's job.
///
/// Each individual load observes one consistent state of the store. Use
/// [`OrderStore::snapshot`] when several loads must agree with each other.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderReader: Send + Sync {
    /// Loads roots whose id is in `query.ids`.
    ///
    /// Honours [`Include::Discounts`](crate::Include::Discounts) and
    /// [`Include::TaxDetails`](crate::Include::TaxDetails). Sub-graph
    /// collections of the returned roots are `None`.
    async fn load_orders(&self, query: &LoadQuery) -> Result<Vec<CustomerOrder>>;

    /// Loads addresses owned directly by the given orders.
    async fn load_addresses(&self, query: &LoadQuery) -> Result<Vec<Address>>;

    /// Loads in-payments of the given orders.
    ///
    /// Honours discounts, tax details, addresses, transactions and dynamic
    /// properties.
    async fn load_in_payments(&self, query: &LoadQuery) -> Result<Vec<PaymentIn>>;

    /// Loads line items of the given orders.
    ///
    /// Honours discounts, tax details and dynamic properties.
    async fn load_line_items(&self, query: &LoadQuery) -> Result<Vec<LineItem>>;

    /// Loads shipments of the given orders.
    ///
    /// Honours discounts, tax details, addresses, items, packages and
    /// dynamic properties.
    async fn load_shipments(&self, query: &LoadQuery) -> Result<Vec<Shipment>>;

    /// Whether loads initiated concurrently from one task are executed
    /// safely. When false, callers must await loads one at a time.
    fn supports_concurrent_reads(&self) -> bool;
}

/// Read and delete access to persisted order aggregates.
#[async_trait]
pub trait OrderStore: OrderReader {
    /// Opens a reader whose loads all observe the same state of the store,
    /// whether they run one after another or concurrently.
    ///
    /// The view stays pinned until the reader is dropped.
    async fn snapshot<'a>(&'a self) -> Result<Box<dyn OrderReader + 'a>>;

    /// Deletes every row named in `set`, children before owners, atomically.
    ///
    /// Returns the number of roots deleted.
    async fn delete_cascade(&self, set: &CascadeSet) -> Result<u64>;
}
