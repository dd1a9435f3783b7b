use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::openapi::server::Server;
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "1.0.0",
        description = r#"
# Storefront API

Catalog, shipping quotes and checkout for an online clothing store.

## Checkout

`POST /api/checkout` re-prices the cart from the catalog, stores the order
with its items, and returns a payment link. Payment providers are tried in
order (AbacatePay, Mercado Pago); when none answers, a mock link is returned
so the order is never lost.

## Authentication

Administrative routes require a bearer token from `POST /api/auth/login`:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

Errors share one body shape:

```json
{
  "error": "Bad Request",
  "message": "Validation error: cart must contain at least one item",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    tags(
        (name = "products", description = "Catalog browsing and administration"),
        (name = "checkout", description = "Order placement and payment links"),
        (name = "shipping", description = "Shipping quotes, rates and delivery cities"),
        (name = "orders", description = "Order administration"),
        (name = "auth", description = "Accounts and tokens"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        // Catalog
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::get_variant,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::list_categories,
        crate::handlers::products::list_tags,

        // Checkout
        crate::handlers::checkout::checkout,

        // Shipping
        crate::handlers::shipping::calculate_shipping,
        crate::handlers::shipping::list_rates,
        crate::handlers::shipping::upsert_rate,
        crate::handlers::shipping::delete_rate,
        crate::handlers::shipping::list_delivery_cities,
        crate::handlers::shipping::add_delivery_city,

        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::admin_stats,

        // Auth
        crate::auth::login_handler,
        crate::auth::register_handler,
        crate::auth::me_handler,

        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::services::catalog::ProductPage,
            crate::services::catalog::ProductDetails,
            crate::services::catalog::VariantSummary,
            crate::services::catalog::ImageSummary,
            crate::services::catalog::VariantView,
            crate::services::catalog::CreateProductInput,
            crate::services::catalog::UpdateProductInput,
            crate::services::catalog::ImageInput,
            crate::services::catalog::VariantInput,

            crate::services::checkout::CheckoutRequest,
            crate::services::checkout::CheckoutItem,
            crate::services::checkout::CheckoutResponse,

            crate::handlers::shipping::ShippingCalcResponse,
            crate::services::shipping::UpsertRateInput,
            crate::services::shipping::CreateDeliveryCityInput,

            crate::entities::OrderStatus,
            crate::services::orders::UpdateOrderStatusRequest,
            crate::handlers::orders::AdminStats,

            crate::auth::LoginCredentials,
            crate::auth::RegisterRequest,
            crate::auth::AuthResponse,
            crate::auth::UserSummary,
            crate::auth::AuthUser,

            crate::handlers::health::HealthResponse,

            // Error types
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::builder().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
        );
    }
}

/// Document with the public backend address as its only server.
pub fn api_doc(backend_url: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.servers = Some(vec![Server::new(backend_url.trim_end_matches('/'))]);
    doc
}

pub fn swagger_ui(backend_url: &str) -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", api_doc(backend_url))
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_storefront_paths() {
        let json = serde_json::to_string_pretty(&api_doc("http://localhost:3000/")).unwrap();
        assert!(json.contains("Storefront API"));
        assert!(json.contains("/api/checkout"));
        assert!(json.contains("/api/shipping/calc"));
        assert!(json.contains("bearer_auth"));
        assert!(json.contains("http://localhost:3000\""));
    }
}
