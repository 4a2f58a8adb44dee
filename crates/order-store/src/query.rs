use std::collections::{BTreeSet, HashSet};

use common::EntityId;

/// Nested relation that a load should eagerly include.
///
/// Each load honours the relations its entity kind actually has and
/// ignores the rest (line items have no transactions, for instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Include {
    Discounts,
    TaxDetails,
    Addresses,
    Transactions,
    Items,
    Packages,
    DynamicProperties,
}

/// Builder for a filtered, eager-including bulk load.
///
/// `ids` filters roots by their own id and every sub-graph kind by the
/// id of the order owning it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadQuery {
    /// Order ids to match.
    pub ids: Vec<EntityId>,

    /// Relations to load together with the matched rows.
    pub includes: BTreeSet<Include>,
}

impl LoadQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query matching the given order ids.
    pub fn for_ids<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EntityId>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Adds an order id to match.
    pub fn id(mut self, id: impl Into<EntityId>) -> Self {
        self.ids.push(id.into());
        self
    }

    /// Eagerly includes a relation.
    pub fn include(mut self, include: Include) -> Self {
        self.includes.insert(include);
        self
    }

    /// Eagerly includes a relation when `condition` holds.
    pub fn include_if(self, condition: bool, include: Include) -> Self {
        if condition {
            self.include(include)
        } else {
            self
        }
    }

    /// Returns true if the relation was requested.
    pub fn includes(&self, include: Include) -> bool {
        self.includes.contains(&include)
    }

    /// Returns true if no id can match.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns the ids as a lookup set.
    pub fn id_set(&self) -> HashSet<&EntityId> {
        self.ids.iter().collect()
    }

    /// Returns the ids as owned strings, ready to bind as a SQL array.
    pub fn id_strings(&self) -> Vec<String> {
        self.ids.iter().map(|id| id.as_str().to_string()).collect()
    }
}
