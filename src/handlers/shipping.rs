use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;
use crate::handlers::common::{created_response, no_content_response, success_response, AppJson};
use crate::{
    errors::ServiceError,
    services::shipping::{
        CreateDeliveryCityInput, ShippingQuote, UpsertRateInput, QUOTE_ON_REQUEST_LABEL,
    },
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub fn shipping_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/shipping/rates", get(list_rates).post(upsert_rate))
        .route("/shipping/rates/:id", delete(delete_rate))
        .route("/delivery-cities", post(add_delivery_city))
        .with_permission(perm::SHIPPING_MANAGE);

    Router::new()
        .route("/shipping/calc", get(calculate_shipping))
        .route("/delivery-cities", get(list_delivery_cities))
        .merge(protected)
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ShippingCalcQuery {
    /// Destination city, matched case-insensitively
    pub city: Option<String>,
}

/// Numeric rate, or the quote-on-request label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuotedPrice {
    Amount(#[serde(with = "rust_decimal::serde::float")] Decimal),
    Label(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShippingCalcResponse {
    pub city: String,
    /// A number, or `"Consulte"` when the city has no rate
    #[schema(value_type = Object)]
    pub price: QuotedPrice,
}

impl From<ShippingQuote> for ShippingCalcResponse {
    fn from(quote: ShippingQuote) -> Self {
        match quote {
            ShippingQuote::Rate { city, price } => Self {
                city,
                price: QuotedPrice::Amount(price),
            },
            ShippingQuote::QuoteOnRequest { city } => Self {
                city,
                price: QuotedPrice::Label(QUOTE_ON_REQUEST_LABEL.to_string()),
            },
        }
    }
}

/// Shipping quote for a city
#[utoipa::path(
    get,
    path = "/api/shipping/calc",
    params(ShippingCalcQuery),
    responses(
        (status = 200, description = "Rate or quote on request", body = ShippingCalcResponse),
        (status = 400, description = "City missing", body = crate::errors::ErrorResponse),
    ),
    tag = "shipping"
)]
pub async fn calculate_shipping(
    State(state): State<AppState>,
    Query(query): Query<ShippingCalcQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let city = query.city.unwrap_or_default();
    let quote = state.services.shipping.quote(&city).await?;
    Ok(success_response(ShippingCalcResponse::from(quote)))
}

#[utoipa::path(
    get,
    path = "/api/shipping/rates",
    responses((status = 200, description = "Configured rates")),
    security(("bearer_auth" = [])),
    tag = "shipping"
)]
pub async fn list_rates(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let rates = state.services.shipping.list_rates().await?;
    Ok(success_response(rates))
}

/// Create or replace the rate for a city
#[utoipa::path(
    post,
    path = "/api/shipping/rates",
    request_body = UpsertRateInput,
    responses(
        (status = 200, description = "Rate saved"),
        (status = 400, description = "Invalid rate", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "shipping"
)]
pub async fn upsert_rate(
    State(state): State<AppState>,
    AppJson(input): AppJson<UpsertRateInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let rate = state.services.shipping.upsert_rate(input).await?;
    Ok(success_response(rate))
}

#[utoipa::path(
    delete,
    path = "/api/shipping/rates/{id}",
    params(("id" = Uuid, Path, description = "Rate ID")),
    responses(
        (status = 204, description = "Rate deleted"),
        (status = 404, description = "Rate not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "shipping"
)]
pub async fn delete_rate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.shipping.delete_rate(id).await?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/delivery-cities",
    responses((status = 200, description = "Cities served by delivery")),
    tag = "shipping"
)]
pub async fn list_delivery_cities(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let cities = state.services.shipping.list_delivery_cities().await?;
    Ok(success_response(cities))
}

#[utoipa::path(
    post,
    path = "/api/delivery-cities",
    request_body = CreateDeliveryCityInput,
    responses(
        (status = 201, description = "City added"),
        (status = 409, description = "City already listed", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "shipping"
)]
pub async fn add_delivery_city(
    State(state): State<AppState>,
    AppJson(input): AppJson<CreateDeliveryCityInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let city = state.services.shipping.add_delivery_city(input).await?;
    Ok(created_response(city))
}
