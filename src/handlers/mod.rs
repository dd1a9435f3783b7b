pub mod checkout;
pub mod common;
pub mod health;
pub mod orders;
pub mod products;
pub mod shipping;

use crate::{
    auth::AuthService,
    db::DbPool,
    services::{
        catalog::ProductCatalogService,
        checkout::CheckoutService,
        notifications::Notifier,
        orders::OrderLedger,
        payments::PaymentGateway,
        shipping::ShippingService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<ProductCatalogService>,
    pub shipping: Arc<ShippingService>,
    pub orders: Arc<OrderLedger>,
    pub checkout: Arc<CheckoutService>,
    pub auth: Arc<AuthService>,
}

impl AppServices {
    /// Wire every service over one pool. Payment providers and the notifier
    /// are injected so tests can point them at mock servers.
    pub fn new(
        db_pool: Arc<DbPool>,
        auth: Arc<AuthService>,
        gateway: Arc<PaymentGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let catalog = Arc::new(ProductCatalogService::new(db_pool.clone()));
        let shipping = Arc::new(ShippingService::new(db_pool.clone()));
        let orders = Arc::new(OrderLedger::new(db_pool));
        let checkout = Arc::new(CheckoutService::new(
            catalog.clone(),
            shipping.clone(),
            orders.clone(),
            gateway,
            notifier,
        ));

        Self {
            catalog,
            shipping,
            orders,
            checkout,
            auth,
        }
    }
}
