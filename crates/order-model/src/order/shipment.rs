use common::{EntityId, Money};
use serde::{Deserialize, Serialize};

use super::{Address, Discount, DynamicPropertyValue, TaxDetail};

/// A shipment fulfilling part or all of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: EntityId,
    pub order_id: EntityId,
    pub number: String,
    pub shipment_method_code: String,
    pub status: String,
    pub currency: String,
    pub price: Money,
    pub discount_amount: Money,
    pub tax_total: Money,
    pub total: Money,
    pub discounts: Option<Vec<Discount>>,
    pub tax_details: Option<Vec<TaxDetail>>,
    pub addresses: Option<Vec<Address>>,
    pub items: Option<Vec<ShipmentItem>>,
    pub packages: Option<Vec<ShipmentPackage>>,
    pub dynamic_properties: Option<Vec<DynamicPropertyValue>>,
}

impl Shipment {
    /// Creates a shipment with the given price and no loaded relations.
    pub fn new(
        id: impl Into<EntityId>,
        order_id: impl Into<EntityId>,
        shipment_method_code: impl Into<String>,
        price: Money,
    ) -> Self {
        let id = id.into();
        Self {
            number: format!("SH-{id}"),
            id,
            order_id: order_id.into(),
            shipment_method_code: shipment_method_code.into(),
            status: "New".to_string(),
            currency: "USD".to_string(),
            price,
            discount_amount: Money::zero(),
            tax_total: Money::zero(),
            total: price,
            discounts: None,
            tax_details: None,
            addresses: None,
            items: None,
            packages: None,
            dynamic_properties: None,
        }
    }

    /// Zeroes every price field and clears pricing relations.
    pub fn reset_prices(&mut self) {
        self.price.clear();
        self.discount_amount.clear();
        self.tax_total.clear();
        self.total.clear();
        super::aggregate::clear_pricing(&mut self.discounts, &mut self.tax_details);
    }
}

/// A quantity of one line item placed in a shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentItem {
    pub id: EntityId,
    pub shipment_id: EntityId,
    pub line_item_id: EntityId,
    pub package_id: Option<EntityId>,
    pub quantity: u32,
    pub barcode: Option<String>,
}

/// A physical package of a shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentPackage {
    pub id: EntityId,
    pub shipment_id: EntityId,
    pub barcode: Option<String>,
    pub package_type: String,
    pub weight: Option<f64>,
}
