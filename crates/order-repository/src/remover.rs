//! Staging of order aggregates for cascading removal.

use common::EntityId;
use order_model::ResponseGroup;
use order_store::{OrderStore, UnitOfWork};

use crate::{OrderRepository, Result};

impl<S: OrderStore> OrderRepository<S> {
    /// Stages the orders with the given ids for removal.
    ///
    /// Each aggregate is loaded with its full graph so the eventual commit
    /// deletes everything it owns. Ids with no stored order are skipped.
    /// Nothing reaches the store until `uow` is committed.
    #[tracing::instrument(skip(self, ids, uow), fields(requested = ids.len()))]
    pub async fn remove_by_ids(&self, ids: &[EntityId], uow: &mut UnitOfWork) -> Result<()> {
        let orders = self
            .get_by_ids_with_group(ids, ResponseGroup::FULL)
            .await?;

        let staged = orders.len();
        for order in orders {
            uow.stage_removal(order)?;
        }

        metrics::counter!("orders_staged_for_removal_total").increment(staged as u64);
        tracing::info!(staged, "staged orders for removal");
        Ok(())
    }
}
