//! Ownership references for child kinds shared between several owners.

use common::EntityId;
use serde::{Deserialize, Serialize};

/// Kind of entity that can own discounts, tax details, addresses and
/// dynamic property values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Order,
    LineItem,
    Shipment,
    PaymentIn,
}

impl OwnerKind {
    /// Returns the storage discriminator for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Order => "order",
            OwnerKind::LineItem => "line_item",
            OwnerKind::Shipment => "shipment",
            OwnerKind::PaymentIn => "payment_in",
        }
    }

    /// Parses a storage discriminator.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "order" => Some(OwnerKind::Order),
            "line_item" => Some(OwnerKind::LineItem),
            "shipment" => Some(OwnerKind::Shipment),
            "payment_in" => Some(OwnerKind::PaymentIn),
            _ => None,
        }
    }
}

impl std::fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference from a shared child row to the single entity owning it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: OwnerKind,
    pub id: EntityId,
}

impl OwnerRef {
    pub fn new(kind: OwnerKind, id: impl Into<EntityId>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn order(id: impl Into<EntityId>) -> Self {
        Self::new(OwnerKind::Order, id)
    }

    pub fn line_item(id: impl Into<EntityId>) -> Self {
        Self::new(OwnerKind::LineItem, id)
    }

    pub fn shipment(id: impl Into<EntityId>) -> Self {
        Self::new(OwnerKind::Shipment, id)
    }

    pub fn payment_in(id: impl Into<EntityId>) -> Self {
        Self::new(OwnerKind::PaymentIn, id)
    }
}
