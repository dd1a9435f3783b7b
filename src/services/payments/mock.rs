use async_trait::async_trait;
use chrono::Utc;

use super::{PaymentError, PaymentLink, PaymentProvider, PaymentRequest};

/// Last link in the chain. Points back at the storefront success page.
#[derive(Debug, Clone)]
pub struct MockProvider {
    frontend_url: String,
}

impl MockProvider {
    pub fn new(frontend_url: &str) -> Self {
        Self {
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn link(&self) -> PaymentLink {
        PaymentLink {
            provider: "MOCK".to_string(),
            url: Some(format!("{}/checkout/success?mock=true", self.frontend_url)),
            qr_payload: None,
            external_id: format!("mock_{}", Utc::now().timestamp_millis()),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockProvider {
    fn name(&self) -> &'static str {
        "MOCK"
    }

    async fn create_payment(&self, _request: &PaymentRequest) -> Result<PaymentLink, PaymentError> {
        Ok(self.link())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_not_doubled() {
        let link = MockProvider::new("https://loja.example/").link();
        assert_eq!(
            link.url.as_deref(),
            Some("https://loja.example/checkout/success?mock=true")
        );
        assert!(link.external_id["mock_".len()..].parse::<i64>().is_ok());
    }
}
