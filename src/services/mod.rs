// Catalog and logistics
pub mod catalog;
pub mod shipping;

// Orders and checkout
pub mod checkout;
pub mod orders;

// External providers
pub mod notifications;
pub mod payments;
