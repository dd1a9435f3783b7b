use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

use super::{NotificationError, Notifier, OrderConfirmation};

/// Brevo transactional email (`POST /v3/smtp/email`).
#[derive(Clone)]
pub struct BrevoNotifier {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    sender_email: String,
    sender_name: String,
}

#[derive(Debug, Serialize)]
struct Contact<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailBody<'a> {
    sender: Contact<'a>,
    to: [Contact<'a>; 1],
    subject: String,
    html_content: String,
}

impl BrevoNotifier {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: &str,
        sender_email: &str,
        sender_name: &str,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            sender_email: sender_email.to_string(),
            sender_name: sender_name.to_string(),
        }
    }
}

#[async_trait]
impl Notifier for BrevoNotifier {
    fn name(&self) -> &'static str {
        "brevo"
    }

    #[instrument(skip(self, confirmation), fields(order_id = %confirmation.order_id))]
    async fn send_order_confirmation(
        &self,
        confirmation: &OrderConfirmation,
    ) -> Result<(), NotificationError> {
        let body = EmailBody {
            sender: Contact {
                email: &self.sender_email,
                name: Some(&self.sender_name),
            },
            to: [Contact {
                email: &confirmation.customer_email,
                name: Some(&confirmation.customer_name),
            }],
            subject: confirmation.subject(),
            html_content: confirmation.html_body(),
        };

        let response = self
            .client
            .post(format!("{}/v3/smtp/email", self.base_url))
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotificationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Confirmation email accepted by Brevo");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notifications::tests::sample_confirmation;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notifier(server: &MockServer) -> BrevoNotifier {
        BrevoNotifier::new(
            reqwest::Client::new(),
            &server.uri(),
            "xkeysib-test",
            "loja@example.com",
            "Loja",
        )
    }

    #[tokio::test]
    async fn sends_transactional_email() {
        let server = MockServer::start().await;
        let confirmation = sample_confirmation();
        Mock::given(method("POST"))
            .and(path("/v3/smtp/email"))
            .and(header("api-key", "xkeysib-test"))
            .and(body_partial_json(json!({
                "sender": {"email": "loja@example.com", "name": "Loja"},
                "to": [{"email": "maria@example.com"}],
                "subject": format!("Pedido #{} Confirmado", confirmation.order_id)
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"messageId": "<m1@brevo>"})))
            .expect(1)
            .mount(&server)
            .await;

        notifier(&server)
            .send_order_confirmation(&confirmation)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejected_request_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let err = notifier(&server)
            .send_order_confirmation(&sample_confirmation())
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::Api { status: 401, .. }));
    }
}
