use chrono::{DateTime, Utc};
use common::{EntityId, Money};
use serde::{Deserialize, Serialize};

use super::{Address, Discount, DynamicPropertyValue, TaxDetail};

/// An incoming payment registered against an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIn {
    pub id: EntityId,
    pub order_id: EntityId,
    pub number: String,
    pub gateway_code: String,
    pub status: String,
    pub currency: String,
    /// Amount requested from the gateway. Not a price, kept by price reset.
    pub sum: Money,
    pub price: Money,
    pub discount_amount: Money,
    pub tax_total: Money,
    pub total: Money,
    pub discounts: Option<Vec<Discount>>,
    pub tax_details: Option<Vec<TaxDetail>>,
    pub addresses: Option<Vec<Address>>,
    pub transactions: Option<Vec<PaymentTransaction>>,
    pub dynamic_properties: Option<Vec<DynamicPropertyValue>>,
}

impl PaymentIn {
    /// Creates a payment for `sum` with no loaded relations.
    pub fn new(
        id: impl Into<EntityId>,
        order_id: impl Into<EntityId>,
        gateway_code: impl Into<String>,
        sum: Money,
    ) -> Self {
        let id = id.into();
        Self {
            number: format!("PI-{id}"),
            id,
            order_id: order_id.into(),
            gateway_code: gateway_code.into(),
            status: "New".to_string(),
            currency: "USD".to_string(),
            sum,
            price: Money::zero(),
            discount_amount: Money::zero(),
            tax_total: Money::zero(),
            total: Money::zero(),
            discounts: None,
            tax_details: None,
            addresses: None,
            transactions: None,
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

/// A payment gateway transaction recorded for an in-payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: EntityId,
    pub payment_in_id: EntityId,
    pub amount: Money,
    pub currency: String,
    pub status: String,
    pub is_processed: bool,
    pub created_at: DateTime<Utc>,
}
