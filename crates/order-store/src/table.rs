/// Persisted collections of the order aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreTable {
    Orders,
    Addresses,
    PaymentsIn,
    PaymentTransactions,
    LineItems,
    Shipments,
    ShipmentItems,
    ShipmentPackages,
    Discounts,
    TaxDetails,
    DynamicPropertyValues,
}

impl StoreTable {
    /// Tables in an order that deletes children before their owners.
    pub const DELETE_ORDER: [StoreTable; 11] = [
        StoreTable::DynamicPropertyValues,
        StoreTable::Discounts,
        StoreTable::TaxDetails,
        StoreTable::Addresses,
        StoreTable::PaymentTransactions,
        StoreTable::ShipmentItems,
        StoreTable::ShipmentPackages,
        StoreTable::PaymentsIn,
        StoreTable::Shipments,
        StoreTable::LineItems,
        StoreTable::Orders,
    ];

    /// Returns the SQL table name.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreTable::Orders => "customer_orders",
            StoreTable::Addresses => "order_addresses",
            StoreTable::PaymentsIn => "order_payments_in",
            StoreTable::PaymentTransactions => "order_payment_transactions",
            StoreTable::LineItems => "order_line_items",
            StoreTable::Shipments => "order_shipments",
            StoreTable::ShipmentItems => "order_shipment_items",
            StoreTable::ShipmentPackages => "order_shipment_packages",
            StoreTable::Discounts => "order_discounts",
            StoreTable::TaxDetails => "order_tax_details",
            StoreTable::DynamicPropertyValues => "order_dynamic_property_values",
        }
    }
}

impl std::fmt::Display for StoreTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
