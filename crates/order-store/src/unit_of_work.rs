use order_model::CustomerOrder;

use crate::{CascadeSet, OrderStore, Result, StoreError};

/// Staged changes awaiting a single commit.
///
/// Only removals are tracked. Staging keeps the loaded graph so the commit
/// can cascade through everything the aggregate owns. Dropping a unit of
/// work without committing discards what was staged.
#[derive(Debug, Default)]
pub struct UnitOfWork {
    removals: Vec<CustomerOrder>,
}

impl UnitOfWork {
    /// Creates an empty unit of work.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an aggregate, with its loaded sub-graphs, for deletion.
    ///
    /// The graph must be fully loaded with prices: every relation `Some` at
    /// every level. Anything less is rejected with
    /// [`StoreError::IncompleteGraph`], since rows the graph does not list
    /// would outlive their owner. Staging the same root twice keeps the
    /// first staged graph.
    pub fn stage_removal(&mut self, order: CustomerOrder) -> Result<()> {
        if let Some(missing) = order.missing_relation() {
            return Err(StoreError::IncompleteGraph {
                order_id: order.id,
                missing,
            });
        }
        if !self.removals.iter().any(|staged| staged.id == order.id) {
            self.removals.push(order);
        }
        Ok(())
    }

    /// Aggregates currently staged for deletion.
    pub fn staged_removals(&self) -> &[CustomerOrder] {
        &self.removals
    }

    /// Returns true if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty()
    }

    /// Rows the commit would delete.
    pub fn cascade_set(&self) -> CascadeSet {
        CascadeSet::from_orders(&self.removals)
    }

    /// Applies staged removals to the store in one atomic delete.
    ///
    /// Returns the number of roots deleted.
    pub async fn commit<S: OrderStore + ?Sized>(self, store: &S) -> Result<u64> {
        if self.is_empty() {
            return Ok(0);
        }

        let set = self.cascade_set();
        let deleted = store.delete_cascade(&set).await?;

        metrics::counter!("orders_deleted_total").increment(deleted);
        tracing::info!(
            staged = self.removals.len(),
            deleted,
            "committed order removals"
        );
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{EntityId, Money};
    use order_model::LineItem;

    fn complete_order(id: &str) -> CustomerOrder {
        let mut order = CustomerOrder::new(id, format!("CO-{id}"), "customer-1");
        order.discounts = Some(vec![]);
        order.tax_details = Some(vec![]);
        order.addresses = Some(vec![]);
        order.in_payments = Some(vec![]);
        order.shipments = Some(vec![]);

        let mut item = LineItem::new(
            format!("{id}-li"),
            id,
            "SKU-1",
            "Widget",
            1,
            Money::from_cents(100),
        );
        item.discounts = Some(vec![]);
        item.tax_details = Some(vec![]);
        item.dynamic_properties = Some(vec![]);
        order.items = Some(vec![item]);
        order
    }

    #[test]
    fn staging_is_idempotent_per_root() {
        let mut uow = UnitOfWork::new();
        uow.stage_removal(complete_order("A")).unwrap();
        uow.stage_removal(complete_order("A")).unwrap();
        uow.stage_removal(complete_order("B")).unwrap();

        assert_eq!(uow.staged_removals().len(), 2);
        assert_eq!(uow.cascade_set().len(crate::StoreTable::LineItems), 2);
    }

    #[test]
    fn unloaded_sub_graph_is_rejected() {
        let mut order = complete_order("A");
        order.shipments = None;

        let mut uow = UnitOfWork::new();
        let err = uow.stage_removal(order).unwrap_err();

        assert!(matches!(
            &err,
            StoreError::IncompleteGraph { order_id, missing: "shipments" }
                if *order_id == EntityId::from("A")
        ));
        assert!(uow.is_empty());
    }

    #[test]
    fn unloaded_nested_relation_is_rejected() {
        let mut order = complete_order("A");
        order.items.as_mut().unwrap()[0].tax_details = None;

        let err = UnitOfWork::new().stage_removal(order).unwrap_err();
        assert!(matches!(
            err,
            StoreError::IncompleteGraph {
                missing: "items.tax_details",
                ..
            }
        ));
    }

    #[test]
    fn graph_with_hidden_prices_is_rejected() {
        let mut order = complete_order("A");
        order.reset_prices();

        let err = UnitOfWork::new().stage_removal(order).unwrap_err();
        assert!(matches!(
            err,
            StoreError::IncompleteGraph {
                missing: "prices",
                ..
            }
        ));
    }
}
