use crate::{
    db::DbPool,
    entities::{delivery_city, shipping_rate},
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Shown instead of a price when a city has no configured rate.
pub const QUOTE_ON_REQUEST_LABEL: &str = "Consulte";

/// Result of a shipping lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShippingQuote {
    Rate { city: String, price: Decimal },
    QuoteOnRequest { city: String },
}

impl ShippingQuote {
    /// Amount charged at checkout. Quote-on-request cities are charged nothing
    /// up front.
    pub fn cost(&self) -> Decimal {
        match self {
            ShippingQuote::Rate { price, .. } => *price,
            ShippingQuote::QuoteOnRequest { .. } => Decimal::ZERO,
        }
    }

    pub fn is_quote_on_request(&self) -> bool {
        matches!(self, ShippingQuote::QuoteOnRequest { .. })
    }

    pub fn city(&self) -> &str {
        match self {
            ShippingQuote::Rate { city, .. } | ShippingQuote::QuoteOnRequest { city } => city,
        }
    }
}

/// Trimmed, uppercased city; `None` when blank.
pub fn normalize_city(raw: &str) -> Option<String> {
    let city = raw.trim();
    if city.is_empty() {
        None
    } else {
        Some(city.to_uppercase())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpsertRateInput {
    #[validate(length(min = 1, max = 120, message = "city is required"))]
    pub city: String,
    pub price: Decimal,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateDeliveryCityInput {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    #[validate(length(max = 2, message = "state must be a 2-letter code"))]
    pub state: Option<String>,
}

/// Shipping rates and delivery cities.
#[derive(Clone)]
pub struct ShippingService {
    db: Arc<DbPool>,
}

impl ShippingService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Exact match on the normalized city among active rates.
    #[instrument(skip(self))]
    pub async fn quote(&self, city: &str) -> Result<ShippingQuote, ServiceError> {
        let city = normalize_city(city)
            .ok_or_else(|| ServiceError::ValidationError("city is required".to_string()))?;

        let rate = shipping_rate::Entity::find()
            .filter(shipping_rate::Column::City.eq(city.as_str()))
            .filter(shipping_rate::Column::Active.eq(true))
            .one(&*self.db)
            .await?;

        Ok(match rate {
            Some(rate) => ShippingQuote::Rate {
                city,
                price: rate.price.round_dp(2),
            },
            None => ShippingQuote::QuoteOnRequest { city },
        })
    }

    pub async fn list_rates(&self) -> Result<Vec<shipping_rate::Model>, ServiceError> {
        Ok(shipping_rate::Entity::find()
            .order_by_asc(shipping_rate::Column::City)
            .all(&*self.db)
            .await?)
    }

    /// Inserts a rate for a new city or replaces the price of an existing one.
    #[instrument(skip(self))]
    pub async fn upsert_rate(
        &self,
        input: UpsertRateInput,
    ) -> Result<shipping_rate::Model, ServiceError> {
        input.validate()?;
        if input.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "price cannot be negative".to_string(),
            ));
        }
        let city = normalize_city(&input.city)
            .ok_or_else(|| ServiceError::ValidationError("city is required".to_string()))?;
        let price = input.price.round_dp(2);
        let active = input.active.unwrap_or(true);

        let existing = shipping_rate::Entity::find()
            .filter(shipping_rate::Column::City.eq(city.as_str()))
            .one(&*self.db)
            .await?;

        let saved = match existing {
            Some(rate) => {
                let mut active_model: shipping_rate::ActiveModel = rate.into();
                active_model.price = Set(price);
                active_model.active = Set(active);
                active_model.updated_at = Set(Utc::now());
                active_model.update(&*self.db).await?
            }
            None => shipping_rate::ActiveModel {
                id: Set(Uuid::new_v4()),
                city: Set(city.clone()),
                price: Set(price),
                active: Set(active),
                updated_at: Set(Utc::now()),
            }
            .insert(&*self.db)
            .await
            .map_err(|e| {
                ServiceError::from_db_write(e, format!("Shipping rate for {} already exists", city))
            })?,
        };

        info!(city = %saved.city, price = %saved.price, "Shipping rate saved");
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn delete_rate(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = shipping_rate::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Shipping rate {} not found",
                id
            )));
        }
        info!(rate_id = %id, "Shipping rate deleted");
        Ok(())
    }

    pub async fn list_delivery_cities(&self) -> Result<Vec<delivery_city::Model>, ServiceError> {
        Ok(delivery_city::Entity::find()
            .order_by_asc(delivery_city::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn add_delivery_city(
        &self,
        input: CreateDeliveryCityInput,
    ) -> Result<delivery_city::Model, ServiceError> {
        input.validate()?;
        let name = normalize_city(&input.name)
            .ok_or_else(|| ServiceError::ValidationError("name is required".to_string()))?;
        let state = input
            .state
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_uppercase);

        delivery_city::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.clone()),
            state: Set(state),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_db_write(e, format!("Delivery city {} already exists", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::establish_in_memory;
    use axum::http::StatusCode;
    use rust_decimal_macros::dec;

    async fn service() -> ShippingService {
        ShippingService::new(Arc::new(establish_in_memory().await.unwrap()))
    }

    fn rate(city: &str, price: Decimal) -> UpsertRateInput {
        UpsertRateInput {
            city: city.into(),
            price,
            active: None,
        }
    }

    #[tokio::test]
    async fn quote_matches_case_insensitively() {
        let svc = service().await;
        svc.upsert_rate(rate("São Paulo", dec!(20))).await.unwrap();

        let quote = svc.quote("  são paulo ").await.unwrap();
        assert_eq!(
            quote,
            ShippingQuote::Rate {
                city: "SÃO PAULO".into(),
                price: dec!(20)
            }
        );
        assert_eq!(quote.cost(), dec!(20));
    }

    #[tokio::test]
    async fn unknown_city_is_quote_on_request() {
        let svc = service().await;
        let quote = svc.quote("Manaus").await.unwrap();
        assert!(quote.is_quote_on_request());
        assert_eq!(quote.city(), "MANAUS");
        assert_eq!(quote.cost(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn inactive_rate_is_ignored() {
        let svc = service().await;
        svc.upsert_rate(UpsertRateInput {
            city: "Recife".into(),
            price: dec!(35),
            active: Some(false),
        })
        .await
        .unwrap();
        assert!(svc.quote("recife").await.unwrap().is_quote_on_request());
    }

    #[tokio::test]
    async fn upsert_replaces_existing_price() {
        let svc = service().await;
        let first = svc.upsert_rate(rate("curitiba", dec!(15))).await.unwrap();
        let second = svc.upsert_rate(rate("CURITIBA", dec!(18.5))).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(svc.list_rates().await.unwrap().len(), 1);
        assert_eq!(svc.quote("Curitiba").await.unwrap().cost(), dec!(18.5));
    }

    #[tokio::test]
    async fn negative_price_and_blank_city_are_rejected() {
        let svc = service().await;
        let err = svc.upsert_rate(rate("Natal", dec!(-1))).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let err = svc.upsert_rate(rate("   ", dec!(10))).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_unknown_rate_is_not_found() {
        let svc = service().await;
        let err = svc.delete_rate(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delivery_cities_are_unique() {
        let svc = service().await;
        let input = CreateDeliveryCityInput {
            name: "Campinas".into(),
            state: Some("sp".into()),
        };
        let city = svc.add_delivery_city(input.clone()).await.unwrap();
        assert_eq!(city.name, "CAMPINAS");
        assert_eq!(city.state.as_deref(), Some("SP"));

        let err = svc.add_delivery_city(input).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(svc.list_delivery_cities().await.unwrap().len(), 1);
    }
}
