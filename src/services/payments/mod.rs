//! Hosted payment links through an ordered chain of providers.
//!
//! [`PaymentGateway::request_payment`] tries each configured provider in
//! priority order and falls back to [`MockProvider`], so checkout always gets
//! a link back.

pub mod abacatepay;
pub mod mercadopago;
pub mod mock;

pub use abacatepay::{AbacatePayMode, AbacatePayProvider};
pub use mercadopago::MercadoPagoProvider;
pub use mock::MockProvider;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::AppConfig;

/// Errors raised by a single provider attempt. They never leave the gateway.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Provider returned neither a payment url nor a QR code")]
    EmptyLink,

    #[error("Provider did not answer within {0:?}")]
    Timeout(Duration),
}

/// One cart line as sent to a provider.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentLine {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub order_id: Uuid,
    /// Grand total, shipping included
    pub amount: Decimal,
    pub shipping_cost: Decimal,
    pub description: String,
    pub customer_name: String,
    pub customer_email: String,
    pub items: Vec<PaymentLine>,
}

/// A hosted checkout URL or a PIX copy-and-paste payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentLink {
    pub provider: String,
    pub url: Option<String>,
    pub qr_payload: Option<String>,
    pub external_id: String,
}

impl PaymentLink {
    pub fn is_usable(&self) -> bool {
        self.url.as_deref().map_or(false, |u| !u.is_empty())
            || self.qr_payload.as_deref().map_or(false, |q| !q.is_empty())
    }
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentLink, PaymentError>;
}

/// Amount in the smallest currency unit.
pub(crate) fn to_cents(amount: Decimal) -> i64 {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .unwrap_or_default()
}

/// Reads a provider response, turning non-2xx statuses and bad bodies into
/// [`PaymentError`].
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, PaymentError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(PaymentError::Api {
            status: status.as_u16(),
            message: body.chars().take(512).collect(),
        });
    }

    serde_json::from_str(&body).map_err(|e| PaymentError::Parse(e.to_string()))
}

/// Provider chain with a deterministic fallback.
#[derive(Clone)]
pub struct PaymentGateway {
    providers: Vec<Arc<dyn PaymentProvider>>,
    fallback: MockProvider,
    attempt_timeout: Duration,
}

impl PaymentGateway {
    pub fn new(
        providers: Vec<Arc<dyn PaymentProvider>>,
        fallback: MockProvider,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            providers,
            fallback,
            attempt_timeout,
        }
    }

    /// Builds the chain from configuration: AbacatePay when its secret is
    /// set, then Mercado Pago when its token is set.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(cfg.payment_timeout())
            .build()?;

        let mut providers: Vec<Arc<dyn PaymentProvider>> = Vec::new();

        if let Some(secret) = non_empty(cfg.abacatepay_secret.as_deref()) {
            let mode = if cfg.abacatepay_pix {
                AbacatePayMode::Pix
            } else {
                AbacatePayMode::Billing
            };
            providers.push(Arc::new(AbacatePayProvider::new(
                client.clone(),
                &cfg.abacatepay_base_url,
                secret,
                mode,
                &cfg.frontend_url,
            )));
        }

        if let Some(token) = non_empty(cfg.mercadopago_access_token.as_deref()) {
            providers.push(Arc::new(MercadoPagoProvider::new(
                client,
                &cfg.mercadopago_base_url,
                token,
                &cfg.frontend_url,
                &cfg.currency,
            )));
        }

        let gateway = Self::new(
            providers,
            MockProvider::new(&cfg.frontend_url),
            cfg.payment_timeout(),
        );
        info!(providers = ?gateway.provider_names(), "Payment gateway configured");
        Ok(gateway)
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Returns the first usable link from the chain, or the mock link.
    #[instrument(skip(self, request), fields(order_id = %request.order_id, amount = %request.amount))]
    pub async fn request_payment(&self, request: &PaymentRequest) -> PaymentLink {
        for provider in &self.providers {
            let attempt = tokio::time::timeout(self.attempt_timeout, provider.create_payment(request))
                .await
                .unwrap_or(Err(PaymentError::Timeout(self.attempt_timeout)))
                .and_then(|link| {
                    if link.is_usable() {
                        Ok(link)
                    } else {
                        Err(PaymentError::EmptyLink)
                    }
                });

            match attempt {
                Ok(link) => {
                    info!(provider = provider.name(), external_id = %link.external_id, "Payment link created");
                    return link;
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "Payment provider failed, trying next");
                }
            }
        }

        if !self.providers.is_empty() {
            warn!("All payment providers failed; returning mock payment link");
        }
        self.fallback.link()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
