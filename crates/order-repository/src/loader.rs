//! Selective loading of order aggregates.

use std::collections::HashSet;
use std::time::Instant;

use common::EntityId;
use futures_util::future::try_join_all;
use order_model::{CustomerOrder, ResponseGroup};
use order_store::{OrderReader, OrderStore};

use crate::plan::{LoadPlan, root_query};
use crate::{AggregateContext, FetchMode, RepositoryConfig, Result};

/// Repository over customer order aggregates.
///
/// Loads roots first, then the optional sub-graphs named by a
/// [`ResponseGroup`], and attaches them through an [`AggregateContext`].
/// Every load of one call reads through a single store snapshot, so the
/// sub-graphs always agree with their roots.
pub struct OrderRepository<S: OrderStore> {
    store: S,
    config: RepositoryConfig,
}

impl<S: OrderStore> OrderRepository<S> {
    /// Creates a repository with the default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, RepositoryConfig::default())
    }

    pub fn with_config(store: S, config: RepositoryConfig) -> Self {
        Self { store, config }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Loads the orders with the given ids, hydrated per a textual response
    /// group.
    ///
    /// A missing or unparseable group loads everything. Ids with no stored
    /// order are skipped, so the result may be shorter than `ids`.
    #[tracing::instrument(skip(self, ids), fields(requested = ids.len()))]
    pub async fn get_by_ids(
        &self,
        ids: &[EntityId],
        response_group: Option<&str>,
    ) -> Result<Vec<CustomerOrder>> {
        self.get_by_ids_with_group(ids, ResponseGroup::decode(response_group))
            .await
    }

    /// Loads the orders with the given ids, hydrated per `group`.
    ///
    /// Sub-graph collections whose bit is not set stay `None`. Without
    /// [`ResponseGroup::WITH_PRICES`] every monetary amount of the returned
    /// graphs is zero and pricing collections are empty.
    pub async fn get_by_ids_with_group(
        &self,
        ids: &[EntityId],
        group: ResponseGroup,
    ) -> Result<Vec<CustomerOrder>> {
        let ids = dedupe(ids);
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let reader = self.store.snapshot().await?;
        let roots = reader.load_orders(&root_query(&ids)).await?;
        let mut ctx = AggregateContext::new(roots);

        if !ctx.is_empty() {
            let plan = LoadPlan::for_group(group, &ctx.ids());
            tracing::trace!(sub_graphs = ?plan.kinds(), "executing load plan");
            for sub_graph in self.execute(&*reader, &plan).await? {
                ctx.attach(sub_graph);
            }
        }
        drop(reader);

        if !group.keeps_prices() {
            ctx.reset_prices();
        }

        let orders = ctx.into_roots();
        metrics::counter!("order_loads_total").increment(1);
        metrics::histogram!("order_load_duration_seconds").record(start.elapsed().as_secs_f64());
        tracing::debug!(
            requested = ids.len(),
            loaded = orders.len(),
            %group,
            "loaded orders"
        );
        Ok(orders)
    }

    /// Runs every fetch of `plan` through `reader`, overlapping them only
    /// when configured to and when the reader can serve concurrent reads.
    async fn execute(
        &self,
        reader: &dyn OrderReader,
        plan: &LoadPlan,
    ) -> Result<Vec<crate::SubGraph>> {
        let concurrent = self.config.fetch_mode == FetchMode::Concurrent
            && reader.supports_concurrent_reads();

        if concurrent {
            return try_join_all(plan.fetches().iter().map(|fetch| fetch.run(reader))).await;
        }

        let mut sub_graphs = Vec::with_capacity(plan.len());
        for fetch in plan.fetches() {
            sub_graphs.push(fetch.run(reader).await?);
        }
        Ok(sub_graphs)
    }
}

/// Drops repeated ids, keeping first occurrences in order.
fn dedupe(ids: &[EntityId]) -> Vec<EntityId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_first_occurrences() {
        let ids = ["B", "A", "B", "C", "A"].map(EntityId::from);
        assert_eq!(dedupe(&ids), ["B", "A", "C"].map(EntityId::from).to_vec());
    }

    #[test]
    fn dedupe_of_nothing_is_empty() {
        assert!(dedupe(&[]).is_empty());
    }
}
