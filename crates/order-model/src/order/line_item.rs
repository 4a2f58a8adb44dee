use common::{EntityId, Money};
use serde::{Deserialize, Serialize};

use super::{Discount, DynamicPropertyValue, TaxDetail};

/// A product line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: EntityId,
    pub order_id: EntityId,
    pub sku: String,
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub currency: String,
    pub price: Money,
    pub list_price: Money,
    pub discount_amount: Money,
    pub tax_total: Money,
    pub fee: Money,
    pub discounts: Option<Vec<Discount>>,
    pub tax_details: Option<Vec<TaxDetail>>,
    pub dynamic_properties: Option<Vec<DynamicPropertyValue>>,
}

impl LineItem {
    /// Creates a line item with the given unit price and no loaded relations.
    pub fn new(
        id: impl Into<EntityId>,
        order_id: impl Into<EntityId>,
        sku: impl Into<String>,
        name: impl Into<String>,
        quantity: u32,
        price: Money,
    ) -> Self {
        let sku = sku.into();
        Self {
            id: id.into(),
            order_id: order_id.into(),
            product_id: sku.clone(),
            sku,
            name: name.into(),
            quantity,
            currency: "USD".to_string(),
            price,
            list_price: price,
            discount_amount: Money::zero(),
            tax_total: Money::zero(),
            fee: Money::zero(),
            discounts: None,
            tax_details: None,
            dynamic_properties: None,
        }
    }

    /// Zeroes every price field and clears pricing relations.
    pub fn reset_prices(&mut self) {
        self.price.clear();
        self.list_price.clear();
        self.discount_amount.clear();
        self.tax_total.clear();
        self.fee.clear();
        super::aggregate::clear_pricing(&mut self.discounts, &mut self.tax_details);
    }
}
