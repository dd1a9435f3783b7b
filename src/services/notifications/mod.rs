//! Order confirmation emails.
//!
//! Sending happens on a spawned task via [`dispatch`]; a failed send is logged
//! and never reaches the caller.

pub mod brevo;

pub use brevo::BrevoNotifier;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Clone)]
pub struct ConfirmationLine {
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Everything the confirmation email shows.
#[derive(Debug, Clone)]
pub struct OrderConfirmation {
    pub order_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub lines: Vec<ConfirmationLine>,
    pub shipping_cost: Decimal,
    pub total_amount: Decimal,
    pub payment_url: Option<String>,
}

impl OrderConfirmation {
    pub fn subject(&self) -> String {
        format!("Pedido #{} Confirmado", self.order_id)
    }

    /// Plain HTML order summary.
    pub fn html_body(&self) -> String {
        let lines: String = self
            .lines
            .iter()
            .map(|line| {
                format!(
                    "<li>{}x {} - R$ {:.2}</li>",
                    line.quantity,
                    escape_html(&line.name),
                    line.unit_price
                )
            })
            .collect();

        let payment = self
            .payment_url
            .as_deref()
            .map(|url| format!("<p><a href=\"{}\">Pagar pedido</a></p>", escape_html(url)))
            .unwrap_or_default();

        format!(
            "<html><body>\
             <h1>Obrigado pela sua compra!</h1>\
             <p>Olá {name},</p>\
             <p>Seu pedido <strong>#{id}</strong> foi recebido com sucesso.</p>\
             <h3>Resumo do pedido:</h3><ul>{lines}</ul>\
             <p>Frete: R$ {shipping:.2}</p>\
             <p><strong>Total: R$ {total:.2}</strong></p>\
             {payment}\
             <p>Assim que o pagamento for confirmado, enviaremos seus produtos.</p>\
             </body></html>",
            name = escape_html(&self.customer_name),
            id = self.order_id,
            lines = lines,
            shipping = self.shipping_cost,
            total = self.total_amount,
            payment = payment,
        )
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send_order_confirmation(
        &self,
        confirmation: &OrderConfirmation,
    ) -> Result<(), NotificationError>;
}

/// Used when no email provider is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send_order_confirmation(
        &self,
        confirmation: &OrderConfirmation,
    ) -> Result<(), NotificationError> {
        warn!(
            order_id = %confirmation.order_id,
            "Brevo API key missing; skipping order confirmation email"
        );
        Ok(())
    }
}

/// Brevo when `brevo_api_key` is set, otherwise [`LogNotifier`].
pub fn notifier_from_config(cfg: &AppConfig) -> Result<Arc<dyn Notifier>, NotificationError> {
    match cfg.brevo_api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => {
            let client = reqwest::Client::builder()
                .timeout(cfg.payment_timeout())
                .build()?;
            Ok(Arc::new(BrevoNotifier::new(
                client,
                &cfg.brevo_base_url,
                key,
                &cfg.brevo_sender_email,
                &cfg.brevo_sender_name,
            )))
        }
        _ => Ok(Arc::new(LogNotifier)),
    }
}

/// Sends the confirmation on its own task.
pub fn dispatch(notifier: Arc<dyn Notifier>, confirmation: OrderConfirmation) -> JoinHandle<()> {
    let span = tracing::info_span!(
        "order_confirmation",
        order_id = %confirmation.order_id,
        notifier = notifier.name()
    );
    tokio::spawn(
        async move {
            match notifier.send_order_confirmation(&confirmation).await {
                Ok(()) => info!("Order confirmation handled"),
                Err(e) => error!(error = %e, "Failed to send order confirmation"),
            }
        }
        .instrument(span),
    )
}
