//! Model of the customer order aggregate.
//!
//! This crate provides:
//! - the aggregate root [`CustomerOrder`] and every sub-graph entity it owns
//! - polymorphic ownership references ([`OwnerRef`]) for shared child kinds
//! - price reset for display-only reads
//! - the [`ResponseGroup`] codec selecting which sub-graphs to load

pub mod order;
pub mod response_group;

pub use order::{
    Address, AddressType, CustomerOrder, Discount, DynamicPropertyValue, LineItem, OwnerKind,
    OwnerRef, PaymentIn, PaymentTransaction, Shipment, ShipmentItem, ShipmentPackage, TaxDetail,
};
pub use response_group::ResponseGroup;
