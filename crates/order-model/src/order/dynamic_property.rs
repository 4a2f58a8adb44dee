use common::EntityId;
use serde::{Deserialize, Serialize};

use super::OwnerRef;

/// Value of a dynamic (schema-less) property attached to a line item,
/// shipment or payment. Never owned by the order root itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicPropertyValue {
    pub id: EntityId,
    pub owner: OwnerRef,
    pub property_name: String,
    pub locale: Option<String>,
    pub value: serde_json::Value,
}
