//! Customer order aggregate and its sub-graph entities.

mod address;
mod aggregate;
mod dynamic_property;
mod line_item;
mod owner;
mod payment;
mod pricing;
mod shipment;

pub use address::{Address, AddressType};
pub use aggregate::CustomerOrder;
pub use dynamic_property::DynamicPropertyValue;
pub use line_item::LineItem;
pub use owner::{OwnerKind, OwnerRef};
pub use payment::{PaymentIn, PaymentTransaction};
pub use pricing::{Discount, TaxDetail};
pub use shipment::{Shipment, ShipmentItem, ShipmentPackage};
