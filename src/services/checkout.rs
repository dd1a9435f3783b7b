//! Checkout orchestration.
//!
//! One call validates the cart and prices it again from the catalog. It then
//! persists the order atomically and asks the payment gateway for a link.
//! The confirmation email is queued on its own task.

use crate::{
    errors::ServiceError,
    services::{
        catalog::ProductCatalogService,
        notifications::{self, ConfirmationLine, Notifier, OrderConfirmation},
        orders::{NewOrder, NewOrderItem, OrderLedger},
        payments::{PaymentGateway, PaymentLine, PaymentRequest},
        shipping::{normalize_city, ShippingService},
    },
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CheckoutItem {
    #[serde(alias = "id")]
    pub product_id: Uuid,
    #[serde(default)]
    pub variant_id: Option<Uuid>,
    /// Informational; the catalog name is what gets stored
    #[serde(default)]
    pub name: Option<String>,
    /// Price the client displayed. Must match the catalog when present.
    #[serde(default, alias = "price")]
    pub unit_price: Option<Decimal>,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "customer_name is required"))]
    pub customer_name: String,
    #[serde(default)]
    #[validate(email(message = "customer_email must be a valid email"))]
    pub customer_email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "customer_address is required"))]
    pub customer_address: String,
    #[serde(default)]
    pub items: Vec<CheckoutItem>,
    #[serde(default)]
    pub city: Option<String>,
}

impl CheckoutRequest {
    /// Trims customer fields and lowercases the email.
    fn normalized(self) -> Self {
        Self {
            customer_name: self.customer_name.trim().to_string(),
            customer_email: self.customer_email.trim().to_lowercase(),
            customer_address: self.customer_address.trim().to_string(),
            ..self
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub message: String,
    pub order_id: Uuid,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    pub external_id: String,
    pub products_total: Decimal,
    pub shipping_cost: Decimal,
    pub total_amount: Decimal,
    pub shipping_quote_on_request: bool,
}

/// Two decimal places, always rendered with both digits.
fn money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp(2);
    rounded.rescale(2);
    rounded
}

/// Composition root for a single checkout.
#[derive(Clone)]
pub struct CheckoutService {
    catalog: Arc<ProductCatalogService>,
    shipping: Arc<ShippingService>,
    orders: Arc<OrderLedger>,
    gateway: Arc<PaymentGateway>,
    notifier: Arc<dyn Notifier>,
}

impl CheckoutService {
    pub fn new(
        catalog: Arc<ProductCatalogService>,
        shipping: Arc<ShippingService>,
        orders: Arc<OrderLedger>,
        gateway: Arc<PaymentGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            catalog,
            shipping,
            orders,
            gateway,
            notifier,
        }
    }

    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutResponse, ServiceError> {
        let request = request.normalized();
        validate_request(&request)?;

        // Pricing
        let mut lines = Vec::with_capacity(request.items.len());
        let mut products_total = Decimal::ZERO;
        for item in &request.items {
            let priced = self
                .catalog
                .price_item(item.product_id, item.variant_id)
                .await?;

            if let Some(client_price) = item.unit_price {
                if client_price.round_dp(2) != priced.unit_price {
                    warn!(
                        product_id = %item.product_id,
                        client = %client_price,
                        catalog = %priced.unit_price,
                        "Cart price differs from catalog"
                    );
                    return Err(ServiceError::ValidationError(format!(
                        "price of {} changed to {}; refresh the cart",
                        priced.name,
                        money(priced.unit_price)
                    )));
                }
            }

            products_total += priced.unit_price * Decimal::from(item.quantity);
            lines.push(NewOrderItem {
                product_id: priced.product_id,
                variant_id: priced.variant_id,
                product_name: priced.name,
                quantity: item.quantity,
                unit_price: priced.unit_price,
            });
        }

        let city = request.city.as_deref().and_then(normalize_city);
        let (shipping_cost, quote_on_request) = match &city {
            Some(city) => {
                let quote = self.shipping.quote(city).await?;
                (quote.cost(), quote.is_quote_on_request())
            }
            None => (Decimal::ZERO, true),
        };

        let products_total = money(products_total);
        let shipping_cost = money(shipping_cost);
        let total_amount = money(products_total + shipping_cost);

        // Persist
        let created = self
            .orders
            .create_with_items(NewOrder {
                customer_name: request.customer_name,
                customer_email: request.customer_email,
                customer_address: request.customer_address,
                city,
                products_total,
                shipping_cost,
                total_amount,
                items: lines,
            })
            .await?;
        let order = created.order;
        let items = created.items;

        // Payment
        let payment_request = PaymentRequest {
            order_id: order.id,
            amount: total_amount,
            shipping_cost,
            description: format!("Pedido #{}", order.id),
            customer_name: order.customer_name.clone(),
            customer_email: order.customer_email.clone(),
            items: items
                .iter()
                .map(|item| PaymentLine {
                    product_id: item.product_id,
                    name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
        };
        let link = self.gateway.request_payment(&payment_request).await;

        if let Err(e) = self.orders.attach_payment_reference(order.id, &link).await {
            error!(
                order_id = %order.id,
                provider = %link.provider,
                error = %e,
                "Failed to attach payment reference; order stays pending without one"
            );
        }

        notifications::dispatch(
            self.notifier.clone(),
            OrderConfirmation {
                order_id: order.id,
                customer_name: order.customer_name.clone(),
                customer_email: order.customer_email.clone(),
                lines: items
                    .iter()
                    .map(|item| ConfirmationLine {
                        name: item.product_name.clone(),
                        quantity: item.quantity,
                        unit_price: item.unit_price,
                    })
                    .collect(),
                shipping_cost,
                total_amount,
                payment_url: link.url.clone(),
            },
        );

        info!(order_id = %order.id, provider = %link.provider, total = %total_amount, "Checkout completed");

        Ok(CheckoutResponse {
            message: "Order created successfully".to_string(),
            order_id: order.id,
            provider: link.provider,
            payment_url: link.url,
            qr_code: link.qr_payload,
            external_id: link.external_id,
            products_total,
            shipping_cost,
            total_amount,
            shipping_quote_on_request: quote_on_request,
        })
    }
}

fn validate_request(request: &CheckoutRequest) -> Result<(), ServiceError> {
    if request.items.is_empty() {
        return Err(ServiceError::ValidationError(
            "cart must contain at least one item".to_string(),
        ));
    }
    if let Some(item) = request.items.iter().find(|i| i.quantity <= 0) {
        return Err(ServiceError::ValidationError(format!(
            "quantity for product {} must be greater than zero",
            item.product_id
        )));
    }
    if request.customer_name.is_empty() || request.customer_address.is_empty() {
        return Err(ServiceError::ValidationError(
            "customer name and address are required".to_string(),
        ));
    }
    request.validate()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_in_memory, DbPool};
    use crate::entities::order;
    use crate::services::catalog::tests::dress_input;
    use crate::services::notifications::tests::RecordingNotifier;
    use crate::services::payments::MockProvider;
    use crate::services::shipping::UpsertRateInput;
    use axum::http::StatusCode;
    use rust_decimal_macros::dec;
    use crate::entities::OrderStatus;
    use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait};
    use std::time::Duration;

    struct Fixture {
        checkout: CheckoutService,
        catalog: Arc<ProductCatalogService>,
        notifier: Arc<RecordingNotifier>,
        db: Arc<DbPool>,
    }

    async fn fixture() -> Fixture {
        let db = Arc::new(establish_in_memory().await.unwrap());
        let catalog = Arc::new(ProductCatalogService::new(db.clone()));
        let shipping = Arc::new(ShippingService::new(db.clone()));
        shipping
            .upsert_rate(UpsertRateInput {
                city: "SAO PAULO".into(),
                price: dec!(20),
                active: None,
            })
            .await
            .unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let gateway = PaymentGateway::new(
            vec![],
            MockProvider::new("http://shop.test"),
            Duration::from_secs(1),
        );
        let checkout = CheckoutService::new(
            catalog.clone(),
            shipping,
            Arc::new(OrderLedger::new(db.clone())),
            Arc::new(gateway),
            notifier.clone(),
        );
        Fixture {
            checkout,
            catalog,
            notifier,
            db,
        }
    }

    fn item(product_id: Uuid, unit_price: Option<Decimal>, quantity: i32) -> CheckoutItem {
        CheckoutItem {
            product_id,
            variant_id: None,
            name: None,
            unit_price,
            quantity,
        }
    }

    fn request(items: Vec<CheckoutItem>, city: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            customer_name: "Maria Silva".into(),
            customer_email: "maria@example.com".into(),
            customer_address: "Rua A, 1".into(),
            items,
            city: city.map(str::to_string),
        }
    }

    async fn two_products(f: &Fixture) -> (Uuid, Uuid) {
        let dress = f.catalog.create_product(dress_input()).await.unwrap();
        let mut skirt = dress_input();
        skirt.title = "Saia".into();
        skirt.base_price = dec!(50);
        skirt.variants.clear();
        let skirt = f.catalog.create_product(skirt).await.unwrap();
        (dress.id, skirt.id)
    }

    #[tokio::test]
    async fn prices_cart_and_returns_mock_link() {
        let f = fixture().await;
        let (dress, skirt) = two_products(&f).await;

        let response = f
            .checkout
            .checkout(request(
                vec![item(dress, Some(dec!(100)), 2), item(skirt, None, 1)],
                Some("sao paulo"),
            ))
            .await
            .unwrap();

        assert_eq!(response.products_total, dec!(250));
        assert_eq!(response.shipping_cost, dec!(20));
        assert_eq!(response.total_amount, dec!(270));
        assert_eq!(response.total_amount.to_string(), "270.00");
        assert!(!response.shipping_quote_on_request);
        assert_eq!(response.provider, "MOCK");
        assert_eq!(
            response.payment_url.as_deref(),
            Some("http://shop.test/checkout/success?mock=true")
        );

        let stored = order::Entity::find_by_id(response.order_id)
            .one(&*f.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payment_provider.as_deref(), Some("MOCK"));
        assert_eq!(stored.external_id.as_deref(), Some(response.external_id.as_str()));
        assert_eq!(stored.city.as_deref(), Some("SAO PAULO"));
    }

    #[tokio::test]
    async fn price_mismatch_is_rejected_without_writing() {
        let f = fixture().await;
        let (dress, _) = two_products(&f).await;

        let err = f
            .checkout
            .checkout(request(vec![item(dress, Some(dec!(1)), 1)], None))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(order::Entity::find().count(&*f.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let f = fixture().await;
        let err = f
            .checkout
            .checkout(request(vec![item(Uuid::new_v4(), None, 1)], None))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_or_unknown_city_is_quote_on_request() {
        let f = fixture().await;
        let (dress, _) = two_products(&f).await;

        for city in [None, Some("Manaus"), Some("   ")] {
            let response = f
                .checkout
                .checkout(request(vec![item(dress, None, 1)], city))
                .await
                .unwrap();
            assert!(response.shipping_quote_on_request);
            assert_eq!(response.shipping_cost, Decimal::ZERO);
            assert_eq!(response.total_amount, dec!(100));
        }
    }

    #[tokio::test]
    async fn empty_cart_and_bad_quantities_are_rejected() {
        let f = fixture().await;
        let (dress, _) = two_products(&f).await;

        for items in [vec![], vec![item(dress, None, 0)], vec![item(dress, None, -2)]] {
            let err = f.checkout.checkout(request(items, None)).await.unwrap_err();
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn blank_customer_fields_are_rejected() {
        let f = fixture().await;
        let (dress, _) = two_products(&f).await;
        let mut req = request(vec![item(dress, None, 1)], None);
        req.customer_address = "   ".into();
        let err = f.checkout.checkout(req).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let mut req = request(vec![item(dress, None, 1)], None);
        req.customer_email = "maria".into();
        let err = f.checkout.checkout(req).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn resubmitting_creates_independent_orders() {
        let f = fixture().await;
        let (dress, _) = two_products(&f).await;
        let cart = || request(vec![item(dress, None, 1)], Some("SAO PAULO"));

        let first = f.checkout.checkout(cart()).await.unwrap();
        let second = f.checkout.checkout(cart()).await.unwrap();
        assert_ne!(first.order_id, second.order_id);
        assert_eq!(order::Entity::find().count(&*f.db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn confirmation_is_dispatched() {
        let f = fixture().await;
        let (dress, _) = two_products(&f).await;
        let response = f
            .checkout
            .checkout(request(vec![item(dress, None, 3)], None))
            .await
            .unwrap();

        // The notifier runs on a spawned task.
        for _ in 0..50 {
            if !f.notifier.sent.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let sent = f.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].order_id, response.order_id);
        assert_eq!(sent[0].lines[0].quantity, 3);
    }

    #[tokio::test]
    async fn padded_email_is_trimmed_before_validation() {
        let f = fixture().await;
        let (dress, _) = two_products(&f).await;
        let mut req = request(vec![item(dress, None, 1)], None);
        req.customer_email = "  Maria@Example.com ".into();
        req.customer_name = " Maria Silva ".into();

        let response = f.checkout.checkout(req).await.unwrap();
        let stored = order::Entity::find_by_id(response.order_id)
            .one(&*f.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.customer_email, "maria@example.com");
        assert_eq!(stored.customer_name, "Maria Silva");
    }

    #[tokio::test]
    async fn failed_reference_update_keeps_order_pending_and_returns_link() {
        let f = fixture().await;
        let (dress, _) = two_products(&f).await;
        f.db.execute_unprepared(
            "CREATE TRIGGER orders_read_only BEFORE UPDATE ON orders \
             BEGIN SELECT RAISE(ABORT, 'orders are read-only'); END;",
        )
        .await
        .unwrap();

        let response = f
            .checkout
            .checkout(request(vec![item(dress, None, 1)], None))
            .await
            .unwrap();
        assert_eq!(response.provider, "MOCK");
        assert!(response.payment_url.is_some());

        let stored = order::Entity::find_by_id(response.order_id)
            .one(&*f.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
        assert!(!stored.has_payment_reference());
        assert!(stored.external_id.is_none());
    }
}
