use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use common::EntityId;
use order_model::{
    Address, CustomerOrder, Discount, DynamicPropertyValue, LineItem, OwnerKind, PaymentIn,
    PaymentTransaction, Shipment, ShipmentItem, ShipmentPackage, TaxDetail,
};
use tokio::sync::{RwLock, RwLockReadGuard};

use crate::{
    CascadeSet, Include, LoadQuery, Result, StoreError, StoreTable,
    store::{OrderReader, OrderStore},
};

const ORDER_INCLUDES: &[Include] = &[Include::Discounts, Include::TaxDetails];

const PAYMENT_INCLUDES: &[Include] = &[
    Include::Discounts,
    Include::TaxDetails,
    Include::Addresses,
    Include::Transactions,
    Include::DynamicProperties,
];

const LINE_ITEM_INCLUDES: &[Include] = &[
    Include::Discounts,
    Include::TaxDetails,
    Include::DynamicProperties,
];

const SHIPMENT_INCLUDES: &[Include] = &[
    Include::Discounts,
    Include::TaxDetails,
    Include::Addresses,
    Include::Items,
    Include::Packages,
    Include::DynamicProperties,
];

/// Flat rows, one collection per table. Relations on stored rows are `None`.
#[derive(Debug, Default)]
struct Tables {
    orders: Vec<CustomerOrder>,
    addresses: Vec<Address>,
    payments_in: Vec<PaymentIn>,
    transactions: Vec<PaymentTransaction>,
    line_items: Vec<LineItem>,
    shipments: Vec<Shipment>,
    shipment_items: Vec<ShipmentItem>,
    shipment_packages: Vec<ShipmentPackage>,
    discounts: Vec<Discount>,
    tax_details: Vec<TaxDetail>,
    dynamic_properties: Vec<DynamicPropertyValue>,
}

impl Tables {
    fn discounts_of(&self, kind: OwnerKind, id: &EntityId) -> Vec<Discount> {
        self.discounts
            .iter()
            .filter(|d| d.owner.kind == kind && &d.owner.id == id)
            .cloned()
            .collect()
    }

    fn tax_details_of(&self, kind: OwnerKind, id: &EntityId) -> Vec<TaxDetail> {
        self.tax_details
            .iter()
            .filter(|t| t.owner.kind == kind && &t.owner.id == id)
            .cloned()
            .collect()
    }

    fn addresses_of(&self, kind: OwnerKind, id: &EntityId) -> Vec<Address> {
        self.addresses
            .iter()
            .filter(|a| a.owner.kind == kind && &a.owner.id == id)
            .cloned()
            .collect()
    }

    fn dynamic_properties_of(&self, kind: OwnerKind, id: &EntityId) -> Vec<DynamicPropertyValue> {
        self.dynamic_properties
            .iter()
            .filter(|v| v.owner.kind == kind && &v.owner.id == id)
            .cloned()
            .collect()
    }

    fn orders(&self, query: &LoadQuery) -> Vec<CustomerOrder> {
        let ids = query.id_set();

        self.orders
            .iter()
            .filter(|o| is_requested(&ids, &o.id))
            .cloned()
            .map(|mut order| {
                if query.includes(Include::Discounts) {
                    order.discounts = Some(self.discounts_of(OwnerKind::Order, &order.id));
                }
                if query.includes(Include::TaxDetails) {
                    order.tax_details = Some(self.tax_details_of(OwnerKind::Order, &order.id));
                }
                order
            })
            .collect()
    }

    fn root_addresses(&self, query: &LoadQuery) -> Vec<Address> {
        let ids = query.id_set();

        self.addresses
            .iter()
            .filter(|a| a.owner.kind == OwnerKind::Order && is_requested(&ids, &a.owner.id))
            .cloned()
            .collect()
    }

    fn in_payments(&self, query: &LoadQuery) -> Vec<PaymentIn> {
        let ids = query.id_set();
        let kind = OwnerKind::PaymentIn;

        self.payments_in
            .iter()
            .filter(|p| is_requested(&ids, &p.order_id))
            .cloned()
            .map(|mut payment| {
                if query.includes(Include::Discounts) {
                    payment.discounts = Some(self.discounts_of(kind, &payment.id));
                }
                if query.includes(Include::TaxDetails) {
                    payment.tax_details = Some(self.tax_details_of(kind, &payment.id));
                }
                if query.includes(Include::Addresses) {
                    payment.addresses = Some(self.addresses_of(kind, &payment.id));
                }
                if query.includes(Include::Transactions) {
                    payment.transactions = Some(
                        self.transactions
                            .iter()
                            .filter(|tx| tx.payment_in_id == payment.id)
                            .cloned()
                            .collect(),
                    );
                }
                if query.includes(Include::DynamicProperties) {
                    payment.dynamic_properties =
                        Some(self.dynamic_properties_of(kind, &payment.id));
                }
                payment
            })
            .collect()
    }

    fn line_items(&self, query: &LoadQuery) -> Vec<LineItem> {
        let ids = query.id_set();
        let kind = OwnerKind::LineItem;

        self.line_items
            .iter()
            .filter(|li| is_requested(&ids, &li.order_id))
            .cloned()
            .map(|mut item| {
                if query.includes(Include::Discounts) {
                    item.discounts = Some(self.discounts_of(kind, &item.id));
                }
                if query.includes(Include::TaxDetails) {
                    item.tax_details = Some(self.tax_details_of(kind, &item.id));
                }
                if query.includes(Include::DynamicProperties) {
                    item.dynamic_properties = Some(self.dynamic_properties_of(kind, &item.id));
                }
                item
            })
            .collect()
    }

    fn shipments(&self, query: &LoadQuery) -> Vec<Shipment> {
        let ids = query.id_set();
        let kind = OwnerKind::Shipment;

        self.shipments
            .iter()
            .filter(|s| is_requested(&ids, &s.order_id))
            .cloned()
            .map(|mut shipment| {
                if query.includes(Include::Discounts) {
                    shipment.discounts = Some(self.discounts_of(kind, &shipment.id));
                }
                if query.includes(Include::TaxDetails) {
                    shipment.tax_details = Some(self.tax_details_of(kind, &shipment.id));
                }
                if query.includes(Include::Addresses) {
                    shipment.addresses = Some(self.addresses_of(kind, &shipment.id));
                }
                if query.includes(Include::Items) {
                    shipment.items = Some(
                        self.shipment_items
                            .iter()
                            .filter(|i| i.shipment_id == shipment.id)
                            .cloned()
                            .collect(),
                    );
                }
                if query.includes(Include::Packages) {
                    shipment.packages = Some(
                        self.shipment_packages
                            .iter()
                            .filter(|p| p.shipment_id == shipment.id)
                            .cloned()
                            .collect(),
                    );
                }
                if query.includes(Include::DynamicProperties) {
                    shipment.dynamic_properties =
                        Some(self.dynamic_properties_of(kind, &shipment.id));
                }
                shipment
            })
            .collect()
    }

    fn remove(&mut self, set: &CascadeSet) -> u64 {
        fn keep<T>(rows: &mut Vec<T>, set: &CascadeSet, table: StoreTable, id: fn(&T) -> &EntityId) {
            rows.retain(|row| !set.contains(table, id(row)));
        }

        let before = self.orders.len();
        keep(&mut self.dynamic_properties, set, StoreTable::DynamicPropertyValues, |r| &r.id);
        keep(&mut self.discounts, set, StoreTable::Discounts, |r| &r.id);
        keep(&mut self.tax_details, set, StoreTable::TaxDetails, |r| &r.id);
        keep(&mut self.addresses, set, StoreTable::Addresses, |r| &r.id);
        keep(&mut self.transactions, set, StoreTable::PaymentTransactions, |r| &r.id);
        keep(&mut self.shipment_items, set, StoreTable::ShipmentItems, |r| &r.id);
        keep(&mut self.shipment_packages, set, StoreTable::ShipmentPackages, |r| &r.id);
        keep(&mut self.payments_in, set, StoreTable::PaymentsIn, |r| &r.id);
        keep(&mut self.shipments, set, StoreTable::Shipments, |r| &r.id);
        keep(&mut self.line_items, set, StoreTable::LineItems, |r| &r.id);
        keep(&mut self.orders, set, StoreTable::Orders, |r| &r.id);
        (before - self.orders.len()) as u64
    }
}

/// In-memory order store for tests and benchmarks.
///
/// Holds flat tables behind a shared lock and assembles requested relations
/// on every load, the way a relational backend would. Clones share the
/// same tables and counters.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    tables: Arc<RwLock<Tables>>,
    fetches: Arc<AtomicUsize>,
    failing: Option<StoreTable>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle whose loads fail whenever they touch `table`.
    pub fn fail_on(&self, table: StoreTable) -> Self {
        Self {
            failing: Some(table),
            ..self.clone()
        }
    }

    /// Number of load operations served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Returns the number of stored roots.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Returns the total number of stored rows across every table.
    pub async fn row_count(&self) -> usize {
        let t = self.tables.read().await;
        t.orders.len()
            + t.addresses.len()
            + t.payments_in.len()
            + t.transactions.len()
            + t.line_items.len()
            + t.shipments.len()
            + t.shipment_items.len()
            + t.shipment_packages.len()
            + t.discounts.len()
            + t.tax_details.len()
            + t.dynamic_properties.len()
    }

    /// Stores a fully built aggregate as flat rows.
    ///
    /// Every `Some` collection of the graph is flattened into its table;
    /// `None` collections store nothing.
    pub async fn seed(&self, mut order: CustomerOrder) {
        let mut t = self.tables.write().await;

        t.discounts.extend(order.discounts.take().unwrap_or_default());
        t.tax_details.extend(order.tax_details.take().unwrap_or_default());
        t.addresses.extend(order.addresses.take().unwrap_or_default());

        for mut item in order.items.take().unwrap_or_default() {
            t.discounts.extend(item.discounts.take().unwrap_or_default());
            t.tax_details.extend(item.tax_details.take().unwrap_or_default());
            t.dynamic_properties
                .extend(item.dynamic_properties.take().unwrap_or_default());
            t.line_items.push(item);
        }

        for mut shipment in order.shipments.take().unwrap_or_default() {
            t.discounts.extend(shipment.discounts.take().unwrap_or_default());
            t.tax_details.extend(shipment.tax_details.take().unwrap_or_default());
            t.addresses.extend(shipment.addresses.take().unwrap_or_default());
            t.shipment_items.extend(shipment.items.take().unwrap_or_default());
            t.shipment_packages
                .extend(shipment.packages.take().unwrap_or_default());
            t.dynamic_properties
                .extend(shipment.dynamic_properties.take().unwrap_or_default());
            t.shipments.push(shipment);
        }

        for mut payment in order.in_payments.take().unwrap_or_default() {
            t.discounts.extend(payment.discounts.take().unwrap_or_default());
            t.tax_details.extend(payment.tax_details.take().unwrap_or_default());
            t.addresses.extend(payment.addresses.take().unwrap_or_default());
            t.transactions
                .extend(payment.transactions.take().unwrap_or_default());
            t.dynamic_properties
                .extend(payment.dynamic_properties.take().unwrap_or_default());
            t.payments_in.push(payment);
        }

        t.orders.push(order);
    }

    /// Clears all tables.
    pub async fn clear(&self) {
        *self.tables.write().await = Tables::default();
    }

    /// Counts the load, failing if any table it touches has been marked as
    /// failing.
    fn begin_load(&self, touched: &[StoreTable]) -> Result<()> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(table) = self.failing
            && touched.contains(&table)
        {
            return Err(StoreError::Backend {
                table,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

/// Tables a load touches: its primary table plus every included relation
/// the kind supports.
fn touched(primary: StoreTable, query: &LoadQuery, supported: &[Include]) -> Vec<StoreTable> {
    let mut tables = vec![primary];
    for include in supported.iter().filter(|i| query.includes(**i)) {
        tables.push(match include {
            Include::Discounts => StoreTable::Discounts,
            Include::TaxDetails => StoreTable::TaxDetails,
            Include::Addresses => StoreTable::Addresses,
            Include::Transactions => StoreTable::PaymentTransactions,
            Include::Items => StoreTable::ShipmentItems,
            Include::Packages => StoreTable::ShipmentPackages,
            Include::DynamicProperties => StoreTable::DynamicPropertyValues,
        });
    }
    tables
}

fn is_requested(ids: &HashSet<&EntityId>, id: &EntityId) -> bool {
    ids.contains(id)
}

#[async_trait]
impl OrderReader for InMemoryOrderStore {
    async fn load_orders(&self, query: &LoadQuery) -> Result<Vec<CustomerOrder>> {
        self.begin_load(&touched(StoreTable::Orders, query, ORDER_INCLUDES))?;
        Ok(self.tables.read().await.orders(query))
    }

    async fn load_addresses(&self, query: &LoadQuery) -> Result<Vec<Address>> {
        self.begin_load(&[StoreTable::Addresses])?;
        Ok(self.tables.read().await.root_addresses(query))
    }

    async fn load_in_payments(&self, query: &LoadQuery) -> Result<Vec<PaymentIn>> {
        self.begin_load(&touched(StoreTable::PaymentsIn, query, PAYMENT_INCLUDES))?;
        Ok(self.tables.read().await.in_payments(query))
    }

    async fn load_line_items(&self, query: &LoadQuery) -> Result<Vec<LineItem>> {
        self.begin_load(&touched(StoreTable::LineItems, query, LINE_ITEM_INCLUDES))?;
        Ok(self.tables.read().await.line_items(query))
    }

    async fn load_shipments(&self, query: &LoadQuery) -> Result<Vec<Shipment>> {
        self.begin_load(&touched(StoreTable::Shipments, query, SHIPMENT_INCLUDES))?;
        Ok(self.tables.read().await.shipments(query))
    }

    fn supports_concurrent_reads(&self) -> bool {
        true
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn snapshot<'a>(&'a self) -> Result<Box<dyn OrderReader + 'a>> {
        Ok(Box::new(InMemorySnapshot {
            store: self,
            tables: self.tables.read().await,
        }))
    }

    async fn delete_cascade(&self, set: &CascadeSet) -> Result<u64> {
        let mut t = self.tables.write().await;
        Ok(t.remove(set))
    }
}

/// Reader holding one shared lock on the tables for its whole lifetime.
///
/// Deletes wait until the snapshot is dropped.
struct InMemorySnapshot<'a> {
    store: &'a InMemoryOrderStore,
    tables: RwLockReadGuard<'a, Tables>,
}

#[async_trait]
impl OrderReader for InMemorySnapshot<'_> {
    async fn load_orders(&self, query: &LoadQuery) -> Result<Vec<CustomerOrder>> {
        self.store
            .begin_load(&touched(StoreTable::Orders, query, ORDER_INCLUDES))?;
        Ok(self.tables.orders(query))
    }

    async fn load_addresses(&self, query: &LoadQuery) -> Result<Vec<Address>> {
        self.store.begin_load(&[StoreTable::Addresses])?;
        Ok(self.tables.root_addresses(query))
    }

    async fn load_in_payments(&self, query: &LoadQuery) -> Result<Vec<PaymentIn>> {
        self.store
            .begin_load(&touched(StoreTable::PaymentsIn, query, PAYMENT_INCLUDES))?;
        Ok(self.tables.in_payments(query))
    }

    async fn load_line_items(&self, query: &LoadQuery) -> Result<Vec<LineItem>> {
        self.store
            .begin_load(&touched(StoreTable::LineItems, query, LINE_ITEM_INCLUDES))?;
        Ok(self.tables.line_items(query))
    }

    async fn load_shipments(&self, query: &LoadQuery) -> Result<Vec<Shipment>> {
        self.store
            .begin_load(&touched(StoreTable::Shipments, query, SHIPMENT_INCLUDES))?;
        Ok(self.tables.shipments(query))
    }

    fn supports_concurrent_reads(&self) -> bool {
        true
    }
}
