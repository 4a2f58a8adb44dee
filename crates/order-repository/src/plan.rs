//! Translation of a response group into store fetches.

use common::EntityId;
use order_model::{Address, LineItem, PaymentIn, ResponseGroup, Shipment};
use order_store::{Include, LoadQuery, OrderReader};

use crate::{RepositoryError, Result};

/// Optional sub-graph of an order that is fetched separately from the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubGraphKind {
    Addresses,
    InPayments,
    LineItems,
    Shipments,
}

impl SubGraphKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubGraphKind::Addresses => "addresses",
            SubGraphKind::InPayments => "in_payments",
            SubGraphKind::LineItems => "line_items",
            SubGraphKind::Shipments => "shipments",
        }
    }
}

impl std::fmt::Display for SubGraphKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rows returned by one sub-graph fetch.
#[derive(Debug, Clone)]
pub enum SubGraph {
    Addresses(Vec<Address>),
    InPayments(Vec<PaymentIn>),
    LineItems(Vec<LineItem>),
    Shipments(Vec<Shipment>),
}

impl SubGraph {
    pub fn kind(&self) -> SubGraphKind {
        match self {
            SubGraph::Addresses(_) => SubGraphKind::Addresses,
            SubGraph::InPayments(_) => SubGraphKind::InPayments,
            SubGraph::LineItems(_) => SubGraphKind::LineItems,
            SubGraph::Shipments(_) => SubGraphKind::Shipments,
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            SubGraph::Addresses(rows) => rows.len(),
            SubGraph::InPayments(rows) => rows.len(),
            SubGraph::LineItems(rows) => rows.len(),
            SubGraph::Shipments(rows) => rows.len(),
        }
    }
}

/// One independent fetch of a sub-graph kind for a set of orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubGraphFetch {
    pub kind: SubGraphKind,
    pub query: LoadQuery,
}

impl SubGraphFetch {
    /// Runs the fetch against `reader`.
    pub async fn run<R: OrderReader + ?Sized>(&self, reader: &R) -> Result<SubGraph> {
        let rows = match self.kind {
            SubGraphKind::Addresses => reader
                .load_addresses(&self.query)
                .await
                .map(SubGraph::Addresses),
            SubGraphKind::InPayments => reader
                .load_in_payments(&self.query)
                .await
                .map(SubGraph::InPayments),
            SubGraphKind::LineItems => reader
                .load_line_items(&self.query)
                .await
                .map(SubGraph::LineItems),
            SubGraphKind::Shipments => reader
                .load_shipments(&self.query)
                .await
                .map(SubGraph::Shipments),
        };

        let rows = rows.map_err(|source| RepositoryError::SubGraphFetch {
            sub_graph: self.kind,
            source,
        })?;
        metrics::counter!("order_subgraph_fetches_total", "sub_graph" => self.kind.as_str())
            .increment(1);
        tracing::debug!(sub_graph = %self.kind, rows = rows.len(), "fetched sub-graph");
        Ok(rows)
    }
}

/// Query for roots; discounts and tax details are always part of a root.
pub fn root_query(ids: &[EntityId]) -> LoadQuery {
    LoadQuery::for_ids(ids.iter().cloned())
        .include(Include::Discounts)
        .include(Include::TaxDetails)
}

/// Sub-graph fetches needed for a response group, at most one per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadPlan {
    fetches: Vec<SubGraphFetch>,
}

impl LoadPlan {
    /// Builds the fetches for every optional bit set in `group`, each
    /// filtered to `order_ids`.
    pub fn for_group(group: ResponseGroup, order_ids: &[EntityId]) -> Self {
        let dynamic = group.loads_dynamic_properties();
        let base = || LoadQuery::for_ids(order_ids.iter().cloned());
        let mut fetches = Vec::new();

        if group.contains(ResponseGroup::WITH_ADDRESSES) {
            fetches.push(SubGraphFetch {
                kind: SubGraphKind::Addresses,
                query: base(),
            });
        }

        if group.contains(ResponseGroup::WITH_IN_PAYMENTS) {
            fetches.push(SubGraphFetch {
                kind: SubGraphKind::InPayments,
                query: base()
                    .include(Include::Discounts)
                    .include(Include::TaxDetails)
                    .include(Include::Addresses)
                    .include(Include::Transactions)
                    .include_if(dynamic, Include::DynamicProperties),
            });
        }

        if group.contains(ResponseGroup::WITH_ITEMS) {
            fetches.push(SubGraphFetch {
                kind: SubGraphKind::LineItems,
                query: base()
                    .include(Include::Discounts)
                    .include(Include::TaxDetails)
                    .include_if(dynamic, Include::DynamicProperties),
            });
        }

        if group.contains(ResponseGroup::WITH_SHIPMENTS) {
            fetches.push(SubGraphFetch {
                kind: SubGraphKind::Shipments,
                query: base()
                    .include(Include::Discounts)
                    .include(Include::TaxDetails)
                    .include(Include::Addresses)
                    .include(Include::Items)
                    .include(Include::Packages)
                    .include_if(dynamic, Include::DynamicProperties),
            });
        }

        Self { fetches }
    }

    pub fn fetches(&self) -> &[SubGraphFetch] {
        &self.fetches
    }

    pub fn kinds(&self) -> Vec<SubGraphKind> {
        self.fetches.iter().map(|f| f.kind).collect()
    }

    pub fn len(&self) -> usize {
        self.fetches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> Vec<EntityId> {
        vec![EntityId::from("A"), EntityId::from("B")]
    }

    fn fetch(plan: &LoadPlan, kind: SubGraphKind) -> &SubGraphFetch {
        plan.fetches().iter().find(|f| f.kind == kind).unwrap()
    }

    #[test]
    fn root_query_always_includes_pricing() {
        let query = root_query(&ids());
        assert!(query.includes(Include::Discounts));
        assert!(query.includes(Include::TaxDetails));
        assert_eq!(query.includes.len(), 2);
    }

    #[test]
    fn empty_group_plans_nothing() {
        let plan = LoadPlan::for_group(ResponseGroup::empty(), &ids());
        assert!(plan.is_empty());

        let plan = LoadPlan::for_group(ResponseGroup::WITH_PRICES, &ids());
        assert!(plan.is_empty());
    }

    #[test]
    fn full_group_plans_one_fetch_per_kind() {
        let plan = LoadPlan::for_group(ResponseGroup::FULL, &ids());
        assert_eq!(
            plan.kinds(),
            vec![
                SubGraphKind::Addresses,
                SubGraphKind::InPayments,
                SubGraphKind::LineItems,
                SubGraphKind::Shipments,
            ]
        );
        for f in plan.fetches() {
            assert_eq!(f.query.ids, ids());
        }
    }

    #[test]
    fn addresses_are_fetched_flat() {
        let plan = LoadPlan::for_group(ResponseGroup::FULL, &ids());
        assert!(fetch(&plan, SubGraphKind::Addresses).query.includes.is_empty());
    }

    #[test]
    fn nested_includes_follow_ownership() {
        let plan = LoadPlan::for_group(ResponseGroup::FULL, &ids());

        let payments = &fetch(&plan, SubGraphKind::InPayments).query;
        assert!(payments.includes(Include::Transactions));
        assert!(payments.includes(Include::Addresses));
        assert!(!payments.includes(Include::Items));

        let items = &fetch(&plan, SubGraphKind::LineItems).query;
        assert!(items.includes(Include::Discounts));
        assert!(!items.includes(Include::Addresses));

        let shipments = &fetch(&plan, SubGraphKind::Shipments).query;
        assert!(shipments.includes(Include::Items));
        assert!(shipments.includes(Include::Packages));
        assert!(shipments.includes(Include::DynamicProperties));
    }

    #[test]
    fn dynamic_properties_need_their_own_bit() {
        let group = ResponseGroup::WITH_ITEMS
            | ResponseGroup::WITH_SHIPMENTS
            | ResponseGroup::WITH_IN_PAYMENTS;
        let plan = LoadPlan::for_group(group, &ids());

        assert!(
            plan.fetches()
                .iter()
                .all(|f| !f.query.includes(Include::DynamicProperties))
        );
    }

    #[test]
    fn dynamic_properties_bit_alone_plans_nothing() {
        let plan = LoadPlan::for_group(ResponseGroup::WITH_DYNAMIC_PROPERTIES, &ids());
        assert!(plan.is_empty());
    }
}
