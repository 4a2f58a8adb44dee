use common::EntityId;
use serde::{Deserialize, Serialize};

use super::OwnerRef;

/// Purpose of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    Billing,
    Shipping,
    Pickup,
    BillingAndShipping,
}

impl AddressType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressType::Billing => "billing",
            AddressType::Shipping => "shipping",
            AddressType::Pickup => "pickup",
            AddressType::BillingAndShipping => "billing_and_shipping",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "billing" => Some(AddressType::Billing),
            "shipping" => Some(AddressType::Shipping),
            "pickup" => Some(AddressType::Pickup),
            "billing_and_shipping" => Some(AddressType::BillingAndShipping),
            _ => None,
        }
    }
}

/// A postal address owned by an order, shipment or payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: EntityId,
    pub owner: OwnerRef,
    pub address_type: AddressType,
    pub first_name: String,
    pub last_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    pub country_code: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}
