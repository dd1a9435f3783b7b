use crate::auth::{consts as perm, roles};
use crate::auth::AuthRouterExt;
use crate::handlers::common::{success_response, validate_input, AppJson};
use crate::{
    errors::ServiceError,
    services::orders::{OrderListQuery, UpdateOrderStatusRequest},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Dashboard figures for the admin panel
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminStats {
    pub users: u64,
    pub orders: u64,
    /// Paid and shipped orders only
    pub revenue: Decimal,
}

/// Order administration. Every route here is admin-only.
pub fn orders_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .with_permission(perm::ORDERS_READ);

    let update = Router::new()
        .route("/orders/:id/status", put(update_order_status))
        .with_permission(perm::ORDERS_UPDATE);

    let stats = Router::new()
        .route("/admin/stats", get(admin_stats))
        .with_role(roles::ADMIN);

    Router::new().merge(read).merge(update).merge(stats)
}

/// List orders with their items, newest first
#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders with items"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let orders = state.services.orders.list(query).await?;
    Ok(success_response(orders))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with items"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.get_with_items(id).await?;
    Ok(success_response(order))
}

/// Move an order to a new status
#[utoipa::path(
    put,
    path = "/api/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order updated"),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateOrderStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let order = state.services.orders.update_status(id, payload.status).await?;
    Ok(success_response(order))
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Dashboard figures", body = AdminStats),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn admin_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let users = state.services.auth.count_users().await?;
    let order_stats = state.services.orders.stats().await?;
    Ok(success_response(AdminStats {
        users,
        orders: order_stats.orders,
        revenue: order_stats.revenue,
    }))
}
