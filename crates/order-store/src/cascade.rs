use std::collections::{BTreeMap, BTreeSet};

use common::EntityId;
use order_model::{Address, CustomerOrder, Discount, DynamicPropertyValue, TaxDetail};

use crate::StoreTable;

/// Ids of every row reachable from a set of loaded aggregates, by table.
///
/// Built from fully loaded graphs so a delete removes exactly what the
/// aggregates own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeSet {
    rows: BTreeMap<StoreTable, BTreeSet<EntityId>>,
}

impl CascadeSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects every row of the given aggregates.
    pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a CustomerOrder>) -> Self {
        let mut set = Self::new();
        for order in orders {
            set.add_order(order);
        }
        set
    }

    /// Adds one aggregate and everything loaded beneath it.
    pub fn add_order(&mut self, order: &CustomerOrder) {
        self.insert(StoreTable::Orders, &order.id);
        self.add_pricing(order.discounts.as_deref(), order.tax_details.as_deref());
        self.add_addresses(order.addresses.as_deref());

        for item in order.items.iter().flatten() {
            self.insert(StoreTable::LineItems, &item.id);
            self.add_pricing(item.discounts.as_deref(), item.tax_details.as_deref());
            self.add_dynamic_properties(item.dynamic_properties.as_deref());
        }

        for shipment in order.shipments.iter().flatten() {
            self.insert(StoreTable::Shipments, &shipment.id);
            self.add_pricing(shipment.discounts.as_deref(), shipment.tax_details.as_deref());
            self.add_addresses(shipment.addresses.as_deref());
            self.add_dynamic_properties(shipment.dynamic_properties.as_deref());
            for item in shipment.items.iter().flatten() {
                self.insert(StoreTable::ShipmentItems, &item.id);
            }
            for package in shipment.packages.iter().flatten() {
                self.insert(StoreTable::ShipmentPackages, &package.id);
            }
        }

        for payment in order.in_payments.iter().flatten() {
            self.insert(StoreTable::PaymentsIn, &payment.id);
            self.add_pricing(payment.discounts.as_deref(), payment.tax_details.as_deref());
            self.add_addresses(payment.addresses.as_deref());
            self.add_dynamic_properties(payment.dynamic_properties.as_deref());
            for transaction in payment.transactions.iter().flatten() {
                self.insert(StoreTable::PaymentTransactions, &transaction.id);
            }
        }
    }

    fn add_pricing(&mut self, discounts: Option<&[Discount]>, tax_details: Option<&[TaxDetail]>) {
        for discount in discounts.unwrap_or_default() {
            self.insert(StoreTable::Discounts, &discount.id);
        }
        for tax in tax_details.unwrap_or_default() {
            self.insert(StoreTable::TaxDetails, &tax.id);
        }
    }

    fn add_addresses(&mut self, addresses: Option<&[Address]>) {
        for address in addresses.unwrap_or_default() {
            self.insert(StoreTable::Addresses, &address.id);
        }
    }

    fn add_dynamic_properties(&mut self, values: Option<&[DynamicPropertyValue]>) {
        for value in values.unwrap_or_default() {
            self.insert(StoreTable::DynamicPropertyValues, &value.id);
        }
    }

    fn insert(&mut self, table: StoreTable, id: &EntityId) {
        self.rows.entry(table).or_default().insert(id.clone());
    }

    /// Returns true if the row is part of the set.
    pub fn contains(&self, table: StoreTable, id: &EntityId) -> bool {
        self.rows.get(&table).is_some_and(|ids| ids.contains(id))
    }

    /// Iterates the ids collected for a table.
    pub fn ids(&self, table: StoreTable) -> impl Iterator<Item = &EntityId> {
        self.rows.get(&table).into_iter().flatten()
    }

    /// Returns the ids of a table as owned strings, ready to bind as a SQL array.
    pub fn id_strings(&self, table: StoreTable) -> Vec<String> {
        self.ids(table).map(|id| id.as_str().to_string()).collect()
    }

    /// Number of rows collected for a table.
    pub fn len(&self, table: StoreTable) -> usize {
        self.rows.get(&table).map_or(0, BTreeSet::len)
    }

    /// Number of aggregate roots in the set.
    pub fn root_count(&self) -> usize {
        self.len(StoreTable::Orders)
    }

    /// Returns true if nothing would be deleted.
    pub fn is_empty(&self) -> bool {
        self.rows.values().all(BTreeSet::is_empty)
    }
}
