//! AbacatePay client.
//!
//! - Billing mode creates a hosted billing page restricted to PIX.
//! - PIX mode creates a QR code whose `brCode` is returned as the payload.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{read_json, to_cents, PaymentError, PaymentLink, PaymentProvider, PaymentRequest};

const PROVIDER_NAME: &str = "ABACATEPAY";
const PIX_EXPIRES_IN_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbacatePayMode {
    Billing,
    Pix,
}

#[derive(Clone)]
pub struct AbacatePayProvider {
    client: reqwest::Client,
    base_url: String,
    secret: String,
    mode: AbacatePayMode,
    frontend_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BillingProduct {
    external_id: String,
    name: String,
    quantity: i32,
    price: i64,
}

#[derive(Debug, Serialize)]
struct BillingCustomer<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BillingBody<'a> {
    frequency: &'static str,
    methods: [&'static str; 1],
    products: Vec<BillingProduct>,
    return_url: String,
    completion_url: String,
    customer: BillingCustomer<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PixBody<'a> {
    amount: i64,
    description: &'a str,
    expires_in: u64,
}

/// Every AbacatePay response is wrapped as `{data, error}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct BillingData {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PixData {
    id: String,
    br_code: String,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T, PaymentError> {
        match (self.data, self.error) {
            (Some(data), _) => Ok(data),
            (None, error) => Err(PaymentError::Parse(format!(
                "response without data: {}",
                error.unwrap_or(serde_json::Value::Null)
            ))),
        }
    }
}

impl AbacatePayProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        secret: &str,
        mode: AbacatePayMode,
        frontend_url: &str,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret: secret.to_string(),
            mode,
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        }
    }

    fn billing_body<'a>(&self, request: &'a PaymentRequest) -> BillingBody<'a> {
        let mut products: Vec<BillingProduct> = request
            .items
            .iter()
            .map(|line| BillingProduct {
                external_id: line.product_id.to_string(),
                name: line.name.clone(),
                quantity: line.quantity,
                price: to_cents(line.unit_price),
            })
            .collect();

        if request.shipping_cost > rust_decimal::Decimal::ZERO {
            products.push(BillingProduct {
                external_id: "shipping".to_string(),
                name: "Frete".to_string(),
                quantity: 1,
                price: to_cents(request.shipping_cost),
            });
        }

        BillingBody {
            frequency: "ONE_TIME",
            methods: ["PIX"],
            products,
            return_url: format!("{}/checkout", self.frontend_url),
            completion_url: format!(
                "{}/checkout/success?order={}",
                self.frontend_url, request.order_id
            ),
            customer: BillingCustomer {
                name: &request.customer_name,
                email: &request.customer_email,
            },
        }
    }

    async fn create_billing(&self, request: &PaymentRequest) -> Result<PaymentLink, PaymentError> {
        let response = self
            .client
            .post(format!("{}/v1/billing/create", self.base_url))
            .bearer_auth(&self.secret)
            .json(&self.billing_body(request))
            .send()
            .await?;

        let billing = read_json::<Envelope<BillingData>>(response)
            .await?
            .into_data()?;

        Ok(PaymentLink {
            provider: PROVIDER_NAME.to_string(),
            url: Some(billing.url),
            qr_payload: None,
            external_id: billing.id,
        })
    }

    async fn create_pix(&self, request: &PaymentRequest) -> Result<PaymentLink, PaymentError> {
        let body = PixBody {
            amount: to_cents(request.amount),
            description: &request.description,
            expires_in: PIX_EXPIRES_IN_SECS,
        };

        let response = self
            .client
            .post(format!("{}/v1/pixQrCode/create", self.base_url))
            .bearer_auth(&self.secret)
            .json(&body)
            .send()
            .await?;

        let pix = read_json::<Envelope<PixData>>(response).await?.into_data()?;

        Ok(PaymentLink {
            provider: PROVIDER_NAME.to_string(),
            url: None,
            qr_payload: Some(pix.br_code),
            external_id: pix.id,
        })
    }
}

#[async_trait]
impl PaymentProvider for AbacatePayProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    #[instrument(skip(self, request), fields(order_id = %request.order_id, mode = ?self.mode))]
    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentLink, PaymentError> {
        debug!("Creating AbacatePay charge");
        match self.mode {
            AbacatePayMode::Billing => self.create_billing(request).await,
            AbacatePayMode::Pix => self.create_pix(request).await,
        }
    }
}
