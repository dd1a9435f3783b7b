#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use storefront_api::{
    auth::{AuthConfig, AuthService, RegisterRequest},
    config::AppConfig,
    db,
    handlers::AppServices,
    services::{
        notifications::notifier_from_config,
        payments::PaymentGateway,
        shipping::UpsertRateInput,
    },
    AppState,
};
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@loja.test";
pub const ADMIN_PASSWORD: &str = "admin-s3nha";

/// Test configuration: no payment providers, no email key.
pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::new(
        "sqlite::memory:".to_string(),
        "test_secret_key_for_testing_purposes_only_32chars".to_string(),
        "127.0.0.1".to_string(),
        18_080,
        "test".to_string(),
    );
    cfg.frontend_url = "http://loja.test".to_string();
    cfg.payment_timeout_secs = 2;
    cfg
}

/// Application router over a fresh in-memory SQLite database, with an admin
/// and a customer token ready to use.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    admin_token: String,
    customer_token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(cfg: AppConfig) -> Self {
        let pool = db::establish_in_memory()
            .await
            .expect("failed to create test database");
        let db_arc = Arc::new(pool);

        let auth_service = Arc::new(AuthService::new(AuthConfig::from(&cfg), db_arc.clone()));
        let admin = auth_service
            .ensure_admin(ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .expect("seed admin");
        let admin_token = auth_service.generate_token(&admin).expect("admin token");
        let customer_token = auth_service
            .register(RegisterRequest {
                name: "Cliente".to_string(),
                email: "cliente@loja.test".to_string(),
                password: "cliente-123".to_string(),
            })
            .await
            .expect("register customer")
            .token;

        let gateway = Arc::new(PaymentGateway::from_config(&cfg).expect("payment gateway"));
        let notifier = notifier_from_config(&cfg).expect("notifier");
        let services = AppServices::new(db_arc.clone(), auth_service, gateway, notifier);

        let state = AppState {
            db: db_arc,
            config: Arc::new(cfg),
            services,
        };

        Self {
            router: storefront_api::build_router(state.clone()),
            state,
            admin_token,
            customer_token,
        }
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    pub fn customer_token(&self) -> &str {
        &self.customer_token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Method::GET, uri, None, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Response {
        self.request(Method::POST, uri, Some(body), None).await
    }

    /// Request carrying the admin bearer token.
    pub async fn as_admin(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(self.admin_token())).await
    }

    /// A dress with a base-priced variant, a priced variant, and a second
    /// product, created through the admin API.
    pub async fn seed_catalog(&self) -> SeededCatalog {
        let dress = self
            .as_admin(
                Method::POST,
                "/api/products",
                Some(json!({
                    "title": "Vestido Longo",
                    "description": "Vestido de festa",
                    "base_price": "100.00",
                    "images": [{"url": "https://cdn.loja.test/vestido.jpg"}],
                    "variants": [
                        {"sku": "VEST-M", "stock": 4, "attributes": {"color": "vermelho", "size": "M"}},
                        {"sku": "VEST-G", "price": "120.00", "stock": 2, "attributes": {"size": "G"}}
                    ],
                    "categories": ["Vestidos"],
                    "tags": ["novidade"]
                })),
            )
            .await;
        assert_eq!(dress.status(), 201, "seed dress");
        let dress = response_json(dress).await;

        let scarf = self
            .as_admin(
                Method::POST,
                "/api/products",
                Some(json!({
                    "title": "Lenço de Seda",
                    "base_price": "50.00",
                    "categories": ["Acessórios"]
                })),
            )
            .await;
        assert_eq!(scarf.status(), 201, "seed scarf");
        let scarf = response_json(scarf).await;

        let variant_by_sku = |sku: &str| {
            dress["variants"]
                .as_array()
                .and_then(|vs| vs.iter().find(|v| v["sku"] == sku))
                .and_then(|v| v["id"].as_str())
                .map(str::to_string)
                .expect("seeded variant")
        };

        SeededCatalog {
            dress_id: dress["id"].as_str().expect("dress id").to_string(),
            dress_m_id: variant_by_sku("VEST-M"),
            dress_g_id: variant_by_sku("VEST-G"),
            scarf_id: scarf["id"].as_str().expect("scarf id").to_string(),
        }
    }

    pub async fn seed_rate(&self, city: &str, price: Decimal) {
        self.state
            .services
            .shipping
            .upsert_rate(UpsertRateInput {
                city: city.to_string(),
                price,
                active: None,
            })
            .await
            .expect("seed shipping rate");
    }
}

pub struct SeededCatalog {
    pub dress_id: String,
    pub dress_m_id: String,
    pub dress_g_id: String,
    pub scarf_id: String,
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Decimal from a JSON string or number, whatever scale the database kept.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        other => Decimal::from_str(&other.to_string()).expect("decimal number"),
    }
}
