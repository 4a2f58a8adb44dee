//! Explicit attachment of fetched sub-graphs to their roots.

use std::collections::HashMap;

use common::EntityId;
use order_model::CustomerOrder;

use crate::SubGraph;

/// Loaded roots plus an index from root id to position.
///
/// Sub-graph rows are attached by looking up their owning order id in the
/// index. Nothing is merged implicitly; a row whose owner is not among the
/// loaded roots is dropped.
#[derive(Debug, Default)]
pub struct AggregateContext {
    roots: Vec<CustomerOrder>,
    index: HashMap<EntityId, usize>,
}

impl AggregateContext {
    pub fn new(roots: Vec<CustomerOrder>) -> Self {
        let index = roots
            .iter()
            .enumerate()
            .map(|(position, order)| (order.id.clone(), position))
            .collect();
        Self { roots, index }
    }

    /// Ids of the loaded roots, in load order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.roots.iter().map(|order| order.id.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Attaches every row of `sub_graph` to its root.
    ///
    /// Each root's collection for this kind becomes `Some`, even when no
    /// rows belong to it.
    pub fn attach(&mut self, sub_graph: SubGraph) {
        let kind = sub_graph.kind();
        let mut orphans = 0usize;

        match sub_graph {
            SubGraph::Addresses(rows) => {
                self.roots
                    .iter_mut()
                    .for_each(|order| order.addresses = Some(Vec::new()));
                for row in rows {
                    match self.root_mut(&row.owner.id) {
                        Some(order) => order.addresses.get_or_insert_with(Vec::new).push(row),
                        None => orphans += 1,
                    }
                }
            }
            SubGraph::InPayments(rows) => {
                self.roots
                    .iter_mut()
                    .for_each(|order| order.in_payments = Some(Vec::new()));
                for row in rows {
                    match self.root_mut(&row.order_id) {
                        Some(order) => order.in_payments.get_or_insert_with(Vec::new).push(row),
                        None => orphans += 1,
                    }
                }
            }
            SubGraph::LineItems(rows) => {
                self.roots
                    .iter_mut()
                    .for_each(|order| order.items = Some(Vec::new()));
                for row in rows {
                    match self.root_mut(&row.order_id) {
                        Some(order) => order.items.get_or_insert_with(Vec::new).push(row),
                        None => orphans += 1,
                    }
                }
            }
            SubGraph::Shipments(rows) => {
                self.roots
                    .iter_mut()
                    .for_each(|order| order.shipments = Some(Vec::new()));
                for row in rows {
                    match self.root_mut(&row.order_id) {
                        Some(order) => order.shipments.get_or_insert_with(Vec::new).push(row),
                        None => orphans += 1,
                    }
                }
            }
        }

        if orphans > 0 {
            tracing::warn!(sub_graph = %kind, orphans, "dropped rows with no loaded owner");
        }
    }

    /// Clears prices across every loaded root and its loaded sub-graphs.
    pub fn reset_prices(&mut self) {
        self.roots.iter_mut().for_each(CustomerOrder::reset_prices);
    }

    pub fn into_roots(self) -> Vec<CustomerOrder> {
        self.roots
    }

    fn root_mut(&mut self, id: &EntityId) -> Option<&mut CustomerOrder> {
        let position = *self.index.get(id)?;
        self.roots.get_mut(position)
    }
}
