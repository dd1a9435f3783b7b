use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{read_json, PaymentError, PaymentLink, PaymentProvider, PaymentRequest};

const PROVIDER_NAME: &str = "MERCADOPAGO";

/// Mercado Pago Checkout Pro preferences.
#[derive(Clone)]
pub struct MercadoPagoProvider {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    frontend_url: String,
    currency: String,
}

#[derive(Debug, Serialize)]
struct PreferenceItem {
    title: String,
    unit_price: f64,
    quantity: i32,
    currency_id: String,
}

#[derive(Debug, Serialize)]
struct Payer<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct BackUrls {
    success: String,
    failure: String,
    pending: String,
}

#[derive(Debug, Serialize)]
struct PreferenceBody<'a> {
    items: Vec<PreferenceItem>,
    payer: Payer<'a>,
    external_reference: String,
    back_urls: BackUrls,
    auto_return: &'static str,
}

#[derive(Debug, Deserialize)]
struct PreferenceResponse {
    id: String,
    init_point: Option<String>,
}

impl MercadoPagoProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        access_token: &str,
        frontend_url: &str,
        currency: &str,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
            currency: currency.to_string(),
        }
    }

    fn item(&self, title: String, unit_price: Decimal, quantity: i32) -> PreferenceItem {
        PreferenceItem {
            title,
            unit_price: unit_price.round_dp(2).to_f64().unwrap_or_default(),
            quantity,
            currency_id: self.currency.clone(),
        }
    }

    fn preference_body<'a>(&self, request: &'a PaymentRequest) -> PreferenceBody<'a> {
        let mut items: Vec<PreferenceItem> = request
            .items
            .iter()
            .map(|line| self.item(line.name.clone(), line.unit_price, line.quantity))
            .collect();

        // Shipping travels as its own line so the preference total matches the order.
        if request.shipping_cost > Decimal::ZERO {
            items.push(self.item("Frete".to_string(), request.shipping_cost, 1));
        }

        PreferenceBody {
            items,
            payer: Payer {
                name: &request.customer_name,
                email: &request.customer_email,
            },
            external_reference: request.order_id.to_string(),
            back_urls: BackUrls {
                success: format!("{}/checkout/success", self.frontend_url),
                failure: format!("{}/checkout/failure", self.frontend_url),
                pending: format!("{}/checkout/pending", self.frontend_url),
            },
            auto_return: "approved",
        }
    }
}

#[async_trait]
impl PaymentProvider for MercadoPagoProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentLink, PaymentError> {
        debug!("Creating Mercado Pago preference");
        let response = self
            .client
            .post(format!("{}/checkout/preferences", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&self.preference_body(request))
            .send()
            .await?;

        let preference: PreferenceResponse = read_json(response).await?;

        Ok(PaymentLink {
            provider: PROVIDER_NAME.to_string(),
            url: preference.init_point,
            qr_payload: None,
            external_id: preference.id,
        })
    }
}
