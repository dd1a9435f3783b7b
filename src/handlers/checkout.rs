use crate::{
    errors::ServiceError,
    handlers::common::{created_response, AppJson},
    services::checkout::{CheckoutRequest, CheckoutResponse},
    AppState,
};
use axum::{
    extract::State,
    response::IntoResponse,
    routing::post,
    Router,
};

pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/checkout", post(checkout))
}

/// Price the cart server-side, persist the order and open a payment
#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order created, payment link attached", body = CheckoutResponse),
        (status = 400, description = "Invalid cart or customer data", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product or variant", body = crate::errors::ErrorResponse),
    ),
    tag = "checkout"
)]
pub async fn checkout(
    State(state): State<AppState>,
    AppJson(request): AppJson<CheckoutRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let response = state.services.checkout.checkout(request).await?;
    Ok(created_response(response))
}
