use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;
use crate::handlers::common::{
    created_response, no_content_response, success_response, validate_input, AppJson,
    PaginationParams,
};
use crate::{
    errors::ServiceError,
    services::catalog::{CreateProductInput, ProductDetails, ProductPage, UpdateProductInput, VariantView},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

/// Catalog routes. Reads are public, writes need `products:manage`.
pub fn products_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/products", post(create_product))
        .route("/products/:id", axum::routing::put(update_product).delete(delete_product))
        .with_permission(perm::PRODUCTS_MANAGE);

    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/variants/:id", get(get_variant))
        .route("/categories", get(list_categories))
        .route("/tags", get(list_tags))
        .merge(protected)
}

/// List products, newest first
#[utoipa::path(
    get,
    path = "/api/products",
    params(PaginationParams),
    responses(
        (status = 200, description = "Page of products", body = ProductPage),
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = state
        .services
        .catalog
        .list_products(params.page, params.per_page)
        .await?;
    Ok(success_response(page))
}

/// Product with images, variants, categories and tags
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product details", body = ProductDetails),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.catalog.get_product(id).await?;
    Ok(success_response(product))
}

/// Variant with its effective price
#[utoipa::path(
    get,
    path = "/api/variants/{id}",
    params(("id" = Uuid, Path, description = "Variant ID")),
    responses(
        (status = 200, description = "Variant", body = VariantView),
        (status = 404, description = "Variant not found", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn get_variant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let variant = state.services.catalog.get_variant(id).await?;
    Ok(success_response(variant))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created", body = ProductDetails),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let product = state.services.catalog.create_product(payload).await?;
    Ok(created_response(product))
}

/// Update product fields. Images, variants, categories and tags are replaced
/// when present in the payload.
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductInput,
    responses(
        (status = 200, description = "Product updated", body = ProductDetails),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let product = state.services.catalog.update_product(id, payload).await?;
    Ok(success_response(product))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.catalog.delete_product(id).await?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses((status = 200, description = "All categories")),
    tag = "products"
)]
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(success_response(categories))
}

#[utoipa::path(
    get,
    path = "/api/tags",
    responses((status = 200, description = "All tags")),
    tag = "products"
)]
pub async fn list_tags(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let tags = state.services.catalog.list_tags().await?;
    Ok(success_response(tags))
}
