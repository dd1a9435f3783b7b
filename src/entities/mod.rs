pub mod commerce;
pub mod delivery_city;
pub mod order;
pub mod order_item;
pub mod product;
pub mod shipping_rate;

pub use order::OrderStatus;
