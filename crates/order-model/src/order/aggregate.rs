//! Customer order aggregate root.

use chrono::{DateTime, Utc};
use common::{EntityId, Money};
use serde::{Deserialize, Serialize};

use super::{Address, Discount, LineItem, PaymentIn, Shipment, TaxDetail};

/// The customer order aggregate root.
///
/// Every collection is `None` until it has been fetched. A fetched
/// collection is always complete for the response group it was loaded
/// with, so `Some(vec![])` means "loaded, nothing there" while `None`
/// means "not requested".
///
/// `prices_hidden` is set by [`CustomerOrder::reset_prices`]; such a graph
/// no longer lists its pricing rows and cannot be used to delete them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerOrder {
    pub id: EntityId,
    pub number: String,
    pub customer_id: String,
    pub store_id: String,
    pub status: String,
    pub currency: String,
    pub created_at: DateTime<Utc>,

    pub sub_total: Money,
    pub shipping_total: Money,
    pub payment_total: Money,
    pub handling_total: Money,
    pub discount_amount: Money,
    pub discount_total: Money,
    pub tax_total: Money,
    pub fee: Money,
    pub total: Money,
    pub tax_percent_rate: f64,

    pub discounts: Option<Vec<Discount>>,
    pub tax_details: Option<Vec<TaxDetail>>,
    pub addresses: Option<Vec<Address>>,
    pub in_payments: Option<Vec<PaymentIn>>,
    pub items: Option<Vec<LineItem>>,
    pub shipments: Option<Vec<Shipment>>,

    #[serde(default)]
    pub prices_hidden: bool,
}

impl CustomerOrder {
    /// Creates an order header with zero totals and no loaded sub-graphs.
    pub fn new(
        id: impl Into<EntityId>,
        number: impl Into<String>,
        customer_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            number: number.into(),
            customer_id: customer_id.into(),
            store_id: "default".to_string(),
            status: "New".to_string(),
            currency: "USD".to_string(),
            created_at: Utc::now(),
            sub_total: Money::zero(),
            shipping_total: Money::zero(),
            payment_total: Money::zero(),
            handling_total: Money::zero(),
            discount_amount: Money::zero(),
            discount_total: Money::zero(),
            tax_total: Money::zero(),
            fee: Money::zero(),
            total: Money::zero(),
            tax_percent_rate: 0.0,
            discounts: None,
            tax_details: None,
            addresses: None,
            in_payments: None,
            items: None,
            shipments: None,
            prices_hidden: false,
        }
    }

    /// Hides prices on a loaded aggregate.
    ///
    /// Zeroes the root totals, clears root discounts and tax details, then
    /// resets every loaded line item, shipment and payment the same way.
    /// Structural data and unloaded sub-graphs are left untouched.
    pub fn reset_prices(&mut self) {
        for amount in [
            &mut self.sub_total,
            &mut self.shipping_total,
            &mut self.payment_total,
            &mut self.handling_total,
            &mut self.discount_amount,
            &mut self.discount_total,
            &mut self.tax_total,
            &mut self.fee,
            &mut self.total,
        ] {
            amount.clear();
        }
        self.tax_percent_rate = 0.0;
        self.prices_hidden = true;
        clear_pricing(&mut self.discounts, &mut self.tax_details);

        for item in self.items.iter_mut().flatten() {
            item.reset_prices();
        }
        for shipment in self.shipments.iter_mut().flatten() {
            shipment.reset_prices();
        }
        for payment in self.in_payments.iter_mut().flatten() {
            payment.reset_prices();
        }
    }

    /// Returns true when every monetary field on the root is zero.
    pub fn has_zero_prices(&self) -> bool {
        [
            self.sub_total,
            self.shipping_total,
            self.payment_total,
            self.handling_total,
            self.discount_amount,
            self.discount_total,
            self.tax_total,
            self.fee,
            self.total,
        ]
        .iter()
        .all(Money::is_zero)
            && self.tax_percent_rate == 0.0
    }

    /// Names the first relation of the graph that was not loaded, or
    /// `"prices"` when prices were hidden. `None` means the graph lists
    /// every row the aggregate owns.
    pub fn missing_relation(&self) -> Option<&'static str> {
        if self.prices_hidden {
            return Some("prices");
        }

        let root = [
            ("discounts", self.discounts.is_some()),
            ("tax_details", self.tax_details.is_some()),
            ("addresses", self.addresses.is_some()),
            ("in_payments", self.in_payments.is_some()),
            ("items", self.items.is_some()),
            ("shipments", self.shipments.is_some()),
        ];
        let items = self.items.iter().flatten().flat_map(|item| {
            [
                ("items.discounts", item.discounts.is_some()),
                ("items.tax_details", item.tax_details.is_some()),
                ("items.dynamic_properties", item.dynamic_properties.is_some()),
            ]
        });
        let shipments = self.shipments.iter().flatten().flat_map(|shipment| {
            [
                ("shipments.discounts", shipment.discounts.is_some()),
                ("shipments.tax_details", shipment.tax_details.is_some()),
                ("shipments.addresses", shipment.addresses.is_some()),
                ("shipments.items", shipment.items.is_some()),
                ("shipments.packages", shipment.packages.is_some()),
                (
                    "shipments.dynamic_properties",
                    shipment.dynamic_properties.is_some(),
                ),
            ]
        });
        let payments = self.in_payments.iter().flatten().flat_map(|payment| {
            [
                ("in_payments.discounts", payment.discounts.is_some()),
                ("in_payments.tax_details", payment.tax_details.is_some()),
                ("in_payments.addresses", payment.addresses.is_some()),
                ("in_payments.transactions", payment.transactions.is_some()),
                (
                    "in_payments.dynamic_properties",
                    payment.dynamic_properties.is_some(),
                ),
            ]
        });

        root.into_iter()
            .chain(items)
            .chain(shipments)
            .chain(payments)
            .find(|(_, loaded)| !loaded)
            .map(|(name, _)| name)
    }
}

/// Empties loaded discount and tax-detail collections; unloaded ones stay `None`.
pub(super) fn clear_pricing(
    discounts: &mut Option<Vec<Discount>>,
    tax_details: &mut Option<Vec<TaxDetail>>,
) {
    if let Some(discounts) = discounts {
        discounts.clear();
    }
    if let Some(tax_details) = tax_details {
        tax_details.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OwnerRef, ShipmentItem};

    fn priced_order() -> CustomerOrder {
        let mut order = CustomerOrder::new("A", "CO-1", "customer-1");
        order.sub_total = Money::from_cents(2000);
        order.shipping_total = Money::from_cents(500);
        order.tax_total = Money::from_cents(250);
        order.total = Money::from_cents(2750);
        order.tax_percent_rate = 0.1;
        order.discounts = Some(vec![Discount {
            id: EntityId::from("d-1"),
            owner: OwnerRef::order("A"),
            promotion_id: Some("promo".to_string()),
            coupon_code: None,
            description: None,
            currency: "USD".to_string(),
            discount_amount: Money::from_cents(100),
        }]);
        order.tax_details = Some(vec![]);
        order
    }

    #[test]
    fn reset_prices_zeroes_root_totals_and_pricing_relations() {
        let mut order = priced_order();
        assert!(!order.has_zero_prices());

        order.reset_prices();

        assert!(order.has_zero_prices());
        assert_eq!(order.discounts, Some(vec![]));
        assert_eq!(order.tax_details, Some(vec![]));
        assert_eq!(order.number, "CO-1");
    }

    #[test]
    fn reset_prices_keeps_unloaded_sub_graphs_absent() {
        let mut order = priced_order();
        order.reset_prices();

        assert!(order.items.is_none());
        assert!(order.shipments.is_none());
        assert!(order.in_payments.is_none());
        assert!(order.addresses.is_none());
    }

    #[test]
    fn reset_prices_cascades_to_loaded_children_without_touching_structure() {
        let mut order = priced_order();
        let mut shipment = Shipment::new("s-1", "A", "ground", Money::from_cents(500));
        shipment.items = Some(vec![ShipmentItem {
            id: EntityId::from("si-1"),
            shipment_id: EntityId::from("s-1"),
            line_item_id: EntityId::from("li-1"),
            package_id: None,
            quantity: 2,
            barcode: None,
        }]);
        order.items = Some(vec![LineItem::new(
            "li-1",
            "A",
            "SKU-1",
            "Widget",
            2,
            Money::from_cents(1000),
        )]);
        order.shipments = Some(vec![shipment]);
        order.in_payments = Some(vec![PaymentIn::new(
            "p-1",
            "A",
            "card",
            Money::from_cents(2750),
        )]);

        order.reset_prices();

        let item = &order.items.as_ref().unwrap()[0];
        assert!(item.price.is_zero());
        assert!(item.list_price.is_zero());
        assert_eq!(item.quantity, 2);

        let shipment = &order.shipments.as_ref().unwrap()[0];
        assert!(shipment.price.is_zero());
        assert!(shipment.total.is_zero());
        assert_eq!(shipment.items.as_ref().unwrap().len(), 1);

        let payment = &order.in_payments.as_ref().unwrap()[0];
        assert!(payment.total.is_zero());
        assert_eq!(payment.sum, Money::from_cents(2750));
    }

    fn complete_order() -> CustomerOrder {
        let mut order = priced_order();
        order.addresses = Some(vec![]);
        order.in_payments = Some(vec![]);
        order.shipments = Some(vec![]);
        let mut item = LineItem::new("li-1", "A", "SKU-1", "Widget", 1, Money::from_cents(1000));
        item.discounts = Some(vec![]);
        item.tax_details = Some(vec![]);
        item.dynamic_properties = Some(vec![]);
        order.items = Some(vec![item]);
        order
    }

    #[test]
    fn complete_graph_has_no_missing_relation() {
        assert_eq!(complete_order().missing_relation(), None);
    }

    #[test]
    fn missing_relation_reports_unloaded_collections_at_any_depth() {
        let mut order = complete_order();
        order.shipments = None;
        assert_eq!(order.missing_relation(), Some("shipments"));

        let mut order = complete_order();
        order.items.as_mut().unwrap()[0].dynamic_properties = None;
        assert_eq!(order.missing_relation(), Some("items.dynamic_properties"));
    }

    #[test]
    fn hidden_prices_count_as_missing() {
        let mut order = complete_order();
        order.reset_prices();
        assert!(order.prices_hidden);
        assert_eq!(order.missing_relation(), Some("prices"));
    }
}
