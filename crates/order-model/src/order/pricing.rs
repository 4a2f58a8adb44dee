//! Discounts and tax details, owned by the root or by a priced child.

use common::{EntityId, Money};
use serde::{Deserialize, Serialize};

use super::OwnerRef;

/// A discount applied to an order, line item, shipment or payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub id: EntityId,
    pub owner: OwnerRef,
    pub promotion_id: Option<String>,
    pub coupon_code: Option<String>,
    pub description: Option<String>,
    pub currency: String,
    pub discount_amount: Money,
}

/// A tax line computed for an order, line item, shipment or payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxDetail {
    pub id: EntityId,
    pub owner: OwnerRef,
    pub name: String,
    pub rate: f64,
    pub amount: Money,
}
