pub mod audit_logs;
pub mod cart_items;
pub mod order_items;
pub mod order_tracking;
pub mod orders;
pub mod products;
pub mod tracking_events;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use order_items::Entity as OrderItems;
pub use order_tracking::Entity as OrderTracking;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use tracking_events::Entity as TrackingEvents;
pub use users::Entity as Users;
