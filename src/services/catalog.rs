use crate::{
    db::{DbPool, UnitOfWork},
    entities::commerce::{
        category, product_category, product_image, product_tag, product_variant, tag,
        Category, Product, ProductImage, ProductModel, ProductVariant, Tag,
    },
    entities::product,
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_PER_PAGE: u64 = 20;
const MAX_PER_PAGE: u64 = 100;

/// Variant as exposed by the catalog, with its resolved price.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VariantSummary {
    pub id: Uuid,
    pub sku: String,
    /// Stored override, if any
    pub price: Option<Decimal>,
    pub effective_price: Decimal,
    pub stock: i32,
    pub attributes: BTreeMap<String, String>,
}

impl VariantSummary {
    fn from_model(variant: &product_variant::Model, base_price: Decimal) -> Self {
        Self {
            id: variant.id,
            sku: variant.sku.clone(),
            price: variant.price,
            effective_price: variant.effective_price(base_price).round_dp(2),
            stock: variant.stock,
            attributes: variant.attribute_map(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImageSummary {
    pub id: Uuid,
    pub url: String,
    pub is_primary: bool,
    pub sort_order: i32,
}

impl From<product_image::Model> for ImageSummary {
    fn from(image: product_image::Model) -> Self {
        Self {
            id: image.id,
            url: image.url,
            is_primary: image.is_primary,
            sort_order: image.sort_order,
        }
    }
}

/// Product with everything hanging off it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductDetails {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub base_price: Decimal,
    pub images: Vec<ImageSummary>,
    pub variants: Vec<VariantSummary>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

/// A single variant with the price checkout will charge for it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VariantView {
    pub variant: VariantSummary,
    pub product_id: Uuid,
    pub effective_price: Decimal,
    pub stock: i32,
}

/// Authoritative price and display name for one cart line.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedItem {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub name: String,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductPage {
    pub items: Vec<ProductDetails>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ImageInput {
    pub url: String,
    #[serde(default)]
    pub is_primary: bool,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct VariantInput {
    pub sku: String,
    pub price: Option<Decimal>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// Input for creating a product
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 255, message = "title is required"))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub base_price: Decimal,
    #[serde(default)]
    pub images: Vec<ImageInput>,
    #[serde(default)]
    pub variants: Vec<VariantInput>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Input for updating a product. Collections that are present replace the
/// stored ones; absent collections are left alone.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 255, message = "title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub base_price: Option<Decimal>,
    pub images: Option<Vec<ImageInput>>,
    pub variants: Option<Vec<VariantInput>>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

/// Product catalog service for managing products and variants
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DbPool>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Create a product with its images, variants and taxonomy in one unit
    /// of work.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductDetails, ServiceError> {
        input.validate()?;
        validate_price("base_price", input.base_price)?;
        validate_variants(&input.variants)?;
        validate_images(&input.images)?;

        let uow = UnitOfWork::begin(&self.db, "catalog.create_product").await?;
        let staged = stage_new_product(uow.conn(), input).await;
        let product_id = uow.finish(staged).await?;

        info!(%product_id, "Created product");
        self.get_product(product_id).await
    }

    /// Update an existing product
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductDetails, ServiceError> {
        input.validate()?;
        if let Some(price) = input.base_price {
            validate_price("base_price", price)?;
        }
        if let Some(variants) = &input.variants {
            validate_variants(variants)?;
        }
        if let Some(images) = &input.images {
            validate_images(images)?;
        }

        let uow = UnitOfWork::begin(&self.db, "catalog.update_product").await?;
        let staged = stage_product_update(uow.conn(), product_id, input).await;
        uow.finish(staged).await?;

        info!(%product_id, "Updated product");
        self.get_product(product_id).await
    }

    /// Delete a product together with its images, variants and links.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let uow = UnitOfWork::begin(&self.db, "catalog.delete_product").await?;
        let staged = async {
            let conn = uow.conn();
            let product = find_product(conn, product_id).await?;
            clear_children(conn, product_id, true, true, true, true).await?;
            product.delete(conn).await?;
            Ok::<(), ServiceError>(())
        }
        .await;
        uow.finish(staged).await?;

        info!(%product_id, "Deleted product");
        Ok(())
    }

    /// Get a product by ID
    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductDetails, ServiceError> {
        let product = find_product(&*self.db, product_id).await?;
        self.details(product).await
    }

    /// Get a product variant by its identifier
    #[instrument(skip(self))]
    pub async fn get_variant(&self, variant_id: Uuid) -> Result<VariantView, ServiceError> {
        let variant = find_variant(&*self.db, variant_id).await?;
        let product = find_product(&*self.db, variant.product_id).await?;
        let summary = VariantSummary::from_model(&variant, product.base_price);

        Ok(VariantView {
            product_id: product.id,
            effective_price: summary.effective_price,
            stock: summary.stock,
            variant: summary,
        })
    }

    /// Price checkout charges for a product, or for one of its variants.
    pub async fn effective_price(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<Decimal, ServiceError> {
        Ok(self.price_item(product_id, variant_id).await?.unit_price)
    }

    /// Re-reads a cart line from the catalog.
    #[instrument(skip(self))]
    pub async fn price_item(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<PricedItem, ServiceError> {
        let product = find_product(&*self.db, product_id).await?;

        let Some(variant_id) = variant_id else {
            return Ok(PricedItem {
                product_id,
                variant_id: None,
                name: product.title,
                unit_price: product.base_price.round_dp(2),
            });
        };

        let variant = find_variant(&*self.db, variant_id).await?;
        if variant.product_id != product_id {
            return Err(ServiceError::BadRequest(format!(
                "Variant {} does not belong to product {}",
                variant_id, product_id
            )));
        }

        let attributes = variant.attribute_map();
        let name = if attributes.is_empty() {
            product.title.clone()
        } else {
            let labels: Vec<&str> = attributes.values().map(String::as_str).collect();
            format!("{} ({})", product.title, labels.join(" / "))
        };

        Ok(PricedItem {
            product_id,
            variant_id: Some(variant_id),
            name,
            unit_price: variant.effective_price(product.base_price).round_dp(2),
        })
    }

    /// List products, newest first
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: Option<u64>,
        per_page: Option<u64>,
    ) -> Result<ProductPage, ServiceError> {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);

        let paginator = Product::find()
            .order_by_desc(product::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page - 1).await?;

        let mut items = Vec::with_capacity(products.len());
        for product in products {
            items.push(self.details(product).await?);
        }

        Ok(ProductPage {
            items,
            total,
            page,
            per_page,
            total_pages: total.div_ceil(per_page),
        })
    }

    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        Ok(Category::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn list_tags(&self) -> Result<Vec<tag::Model>, ServiceError> {
        Ok(Tag::find().order_by_asc(tag::Column::Name).all(&*self.db).await?)
    }

    async fn details(&self, product: ProductModel) -> Result<ProductDetails, ServiceError> {
        let db = &*self.db;
        let images = product
            .find_related(ProductImage)
            .order_by_asc(product_image::Column::SortOrder)
            .all(db)
            .await?;
        let variants = product
            .find_related(ProductVariant)
            .order_by_asc(product_variant::Column::Sku)
            .all(db)
            .await?;
        let categories = product
            .find_related(Category)
            .order_by_asc(category::Column::Name)
            .all(db)
            .await?;
        let tags = product
            .find_related(Tag)
            .order_by_asc(tag::Column::Name)
            .all(db)
            .await?;

        Ok(ProductDetails {
            id: product.id,
            variants: variants
                .iter()
                .map(|v| VariantSummary::from_model(v, product.base_price))
                .collect(),
            images: images.into_iter().map(ImageSummary::from).collect(),
            categories: categories.into_iter().map(|c| c.name).collect(),
            tags: tags.into_iter().map(|t| t.name).collect(),
            title: product.title,
            description: product.description,
            base_price: product.base_price.round_dp(2),
            created_at: product.created_at,
            updated_at: product.updated_at,
        })
    }
}

async fn find_product<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> Result<ProductModel, ServiceError> {
    Product::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
}

async fn find_variant<C: ConnectionTrait>(
    conn: &C,
    variant_id: Uuid,
) -> Result<product_variant::Model, ServiceError> {
    ProductVariant::find_by_id(variant_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product variant {} not found", variant_id)))
}

fn validate_price(field: &str, price: Decimal) -> Result<(), ServiceError> {
    if price < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "{} cannot be negative",
            field
        )));
    }
    Ok(())
}

fn validate_variants(variants: &[VariantInput]) -> Result<(), ServiceError> {
    let mut seen = HashSet::new();
    for variant in variants {
        let sku = variant.sku.trim();
        if sku.is_empty() {
            return Err(ServiceError::ValidationError(
                "variant sku is required".to_string(),
            ));
        }
        if !seen.insert(sku.to_string()) {
            return Err(ServiceError::ValidationError(format!(
                "duplicate sku {} in request",
                sku
            )));
        }
        if variant.stock < 0 {
            return Err(ServiceError::ValidationError(format!(
                "stock for {} cannot be negative",
                sku
            )));
        }
        if let Some(price) = variant.price {
            validate_price("variant price", price)?;
        }
    }
    Ok(())
}

fn validate_images(images: &[ImageInput]) -> Result<(), ServiceError> {
    if images.iter().any(|i| i.url.trim().is_empty()) {
        return Err(ServiceError::ValidationError(
            "image url cannot be empty".to_string(),
        ));
    }
    if images.iter().filter(|i| i.is_primary).count() > 1 {
        return Err(ServiceError::ValidationError(
            "only one image can be primary".to_string(),
        ));
    }
    Ok(())
}

async fn stage_new_product<C: ConnectionTrait>(
    conn: &C,
    input: CreateProductInput,
) -> Result<Uuid, ServiceError> {
    let now = Utc::now();
    let product = product::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(input.title.trim().to_string()),
        description: Set(input.description),
        base_price: Set(input.base_price.round_dp(2)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;

    insert_images(conn, product.id, &input.images).await?;
    insert_variants(conn, product.id, &input.variants).await?;
    link_categories(conn, product.id, &input.categories).await?;
    link_tags(conn, product.id, &input.tags).await?;
    Ok(product.id)
}

async fn stage_product_update<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    input: UpdateProductInput,
) -> Result<(), ServiceError> {
    let product = find_product(conn, product_id).await?;
    let mut active: product::ActiveModel = product.into();
    if let Some(title) = input.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = input.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = input.base_price {
        active.base_price = Set(price.round_dp(2));
    }
    active.update(conn).await?;

    clear_children(
        conn,
        product_id,
        input.images.is_some(),
        input.variants.is_some(),
        input.categories.is_some(),
        input.tags.is_some(),
    )
    .await?;

    if let Some(images) = &input.images {
        insert_images(conn, product_id, images).await?;
    }
    if let Some(variants) = &input.variants {
        insert_variants(conn, product_id, variants).await?;
    }
    if let Some(categories) = &input.categories {
        link_categories(conn, product_id, categories).await?;
    }
    if let Some(tags) = &input.tags {
        link_tags(conn, product_id, tags).await?;
    }
    Ok(())
}

async fn clear_children<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    images: bool,
    variants: bool,
    categories: bool,
    tags: bool,
) -> Result<(), ServiceError> {
    if images {
        ProductImage::delete_many()
            .filter(product_image::Column::ProductId.eq(product_id))
            .exec(conn)
            .await?;
    }
    if variants {
        ProductVariant::delete_many()
            .filter(product_variant::Column::ProductId.eq(product_id))
            .exec(conn)
            .await?;
    }
    if categories {
        product_category::Entity::delete_many()
            .filter(product_category::Column::ProductId.eq(product_id))
            .exec(conn)
            .await?;
    }
    if tags {
        product_tag::Entity::delete_many()
            .filter(product_tag::Column::ProductId.eq(product_id))
            .exec(conn)
            .await?;
    }
    Ok(())
}

async fn insert_images<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    images: &[ImageInput],
) -> Result<(), ServiceError> {
    // Without an explicit primary, the first image is the cover.
    let has_primary = images.iter().any(|i| i.is_primary);
    for (position, image) in images.iter().enumerate() {
        product_image::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            url: Set(image.url.trim().to_string()),
            is_primary: Set(image.is_primary || (!has_primary && position == 0)),
            sort_order: Set(image.sort_order.unwrap_or(position as i32)),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

async fn insert_variants<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    variants: &[VariantInput],
) -> Result<(), ServiceError> {
    for variant in variants {
        let sku = variant.sku.trim().to_string();
        let attributes = serde_json::to_value(&variant.attributes)
            .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;
        product_variant::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            sku: Set(sku.clone()),
            price: Set(variant.price.map(|p| p.round_dp(2))),
            stock: Set(variant.stock),
            attributes: Set(attributes),
            created_at: Set(Utc::now()),
        }
        .insert(conn)
        .await
        .map_err(|e| ServiceError::from_db_write(e, format!("SKU {} already exists", sku)))?;
    }
    Ok(())
}

fn clean_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty() && seen.insert(n.to_lowercase()))
        .collect()
}

async fn link_categories<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    names: &[String],
) -> Result<(), ServiceError> {
    for name in clean_names(names) {
        let existing = Category::find()
            .filter(category::Column::Name.eq(name.as_str()))
            .one(conn)
            .await?;
        let category_id = match existing {
            Some(found) => found.id,
            None => {
                category::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    slug: Set(category::slugify(&name)),
                    name: Set(name),
                }
                .insert(conn)
                .await?
                .id
            }
        };
        product_category::ActiveModel {
            product_id: Set(product_id),
            category_id: Set(category_id),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

async fn link_tags<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    names: &[String],
) -> Result<(), ServiceError> {
    for name in clean_names(names) {
        let existing = Tag::find()
            .filter(tag::Column::Name.eq(name.as_str()))
            .one(conn)
            .await?;
        let tag_id = match existing {
            Some(found) => found.id,
            None => {
                tag::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    name: Set(name),
                }
                .insert(conn)
                .await?
                .id
            }
        };
        product_tag::ActiveModel {
            product_id: Set(product_id),
            tag_id: Set(tag_id),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::establish_in_memory;
    use axum::http::StatusCode;
    use rust_decimal_macros::dec;

    pub(crate) fn dress_input() -> CreateProductInput {
        CreateProductInput {
            title: "Vestido Longo".into(),
            description: Some("Vermelho".into()),
            base_price: dec!(100),
            images: vec![
                ImageInput {
                    url: "https://cdn.test/vestido-1.jpg".into(),
                    is_primary: false,
                    sort_order: None,
                },
                ImageInput {
                    url: "https://cdn.test/vestido-2.jpg".into(),
                    is_primary: false,
                    sort_order: None,
                },
            ],
            variants: vec![
                VariantInput {
                    sku: "VEST-M".into(),
                    price: None,
                    stock: 4,
                    attributes: BTreeMap::from([
                        ("color".to_string(), "vermelho".to_string()),
                        ("size".to_string(), "M".to_string()),
                    ]),
                },
                VariantInput {
                    sku: "VEST-G".into(),
                    price: Some(dec!(120)),
                    stock: 1,
                    attributes: BTreeMap::from([("size".to_string(), "G".to_string())]),
                },
            ],
            categories: vec!["Vestidos".into(), "Festa".into(), "vestidos".into()],
            tags: vec!["novidade".into()],
        }
    }

    async fn service() -> ProductCatalogService {
        ProductCatalogService::new(Arc::new(establish_in_memory().await.unwrap()))
    }

    #[tokio::test]
    async fn create_product_stages_everything() {
        let svc = service().await;
        let details = svc.create_product(dress_input()).await.unwrap();

        assert_eq!(details.title, "Vestido Longo");
        assert_eq!(details.images.len(), 2);
        assert!(details.images[0].is_primary);
        assert!(!details.images[1].is_primary);
        assert_eq!(details.variants.len(), 2);
        assert_eq!(details.categories, vec!["Festa", "Vestidos"]);
        assert_eq!(details.tags, vec!["novidade"]);
        assert_eq!(svc.list_categories().await.unwrap()[1].slug, "vestidos");
    }

    #[tokio::test]
    async fn variant_prices_fall_back_to_base() {
        let svc = service().await;
        let details = svc.create_product(dress_input()).await.unwrap();
        let medium = details.variants.iter().find(|v| v.sku == "VEST-M").unwrap();
        let large = details.variants.iter().find(|v| v.sku == "VEST-G").unwrap();

        let view = svc.get_variant(medium.id).await.unwrap();
        assert_eq!(view.effective_price, dec!(100));
        assert_eq!(view.stock, 4);
        assert_eq!(view.product_id, details.id);
        assert_eq!(
            svc.effective_price(details.id, Some(large.id)).await.unwrap(),
            dec!(120)
        );
        assert_eq!(svc.effective_price(details.id, None).await.unwrap(), dec!(100));
    }

    #[tokio::test]
    async fn priced_item_names_variant_attributes() {
        let svc = service().await;
        let details = svc.create_product(dress_input()).await.unwrap();
        let medium = details.variants.iter().find(|v| v.sku == "VEST-M").unwrap();

        let item = svc.price_item(details.id, Some(medium.id)).await.unwrap();
        assert_eq!(item.name, "Vestido Longo (vermelho / M)");
    }

    #[tokio::test]
    async fn foreign_variant_is_bad_request() {
        let svc = service().await;
        let dress = svc.create_product(dress_input()).await.unwrap();
        let mut other = dress_input();
        other.title = "Saia".into();
        other.variants = vec![VariantInput {
            sku: "SAIA-P".into(),
            price: None,
            stock: 1,
            attributes: BTreeMap::new(),
        }];
        let skirt = svc.create_product(other).await.unwrap();

        let err = svc
            .price_item(dress.id, Some(skirt.variants[0].id))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let svc = service().await;
        assert_eq!(
            svc.get_product(Uuid::new_v4()).await.unwrap_err().status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            svc.get_variant(Uuid::new_v4()).await.unwrap_err().status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn duplicate_sku_rolls_back_whole_product() {
        let svc = service().await;
        svc.create_product(dress_input()).await.unwrap();

        let mut clash = dress_input();
        clash.title = "Outro".into();
        clash.categories = vec!["Nova Categoria".into()];
        let err = svc.create_product(clash).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let page = svc.list_products(None, None).await.unwrap();
        assert_eq!(page.total, 1);
        assert!(svc
            .list_categories()
            .await
            .unwrap()
            .iter()
            .all(|c| c.name != "Nova Categoria"));
    }

    #[tokio::test]
    async fn update_replaces_only_given_collections() {
        let svc = service().await;
        let created = svc.create_product(dress_input()).await.unwrap();

        let updated = svc
            .update_product(
                created.id,
                UpdateProductInput {
                    base_price: Some(dec!(90)),
                    tags: Some(vec!["promo".into()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.base_price, dec!(90));
        assert_eq!(updated.tags, vec!["promo"]);
        assert_eq!(updated.variants.len(), 2);
        assert_eq!(updated.images.len(), 2);
        let medium = updated.variants.iter().find(|v| v.sku == "VEST-M").unwrap();
        assert_eq!(medium.effective_price, dec!(90));
    }

    #[tokio::test]
    async fn delete_removes_product_and_children() {
        let svc = service().await;
        let created = svc.create_product(dress_input()).await.unwrap();
        let variant_id = created.variants[0].id;

        svc.delete_product(created.id).await.unwrap();
        assert_eq!(
            svc.get_variant(variant_id).await.unwrap_err().status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            svc.delete_product(created.id).await.unwrap_err().status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_writing() {
        let svc = service().await;
        let mut input = dress_input();
        input.base_price = dec!(-5);
        assert_eq!(
            svc.create_product(input).await.unwrap_err().status_code(),
            StatusCode::BAD_REQUEST
        );

        let mut input = dress_input();
        input.variants[1].sku = "VEST-M".into();
        assert_eq!(
            svc.create_product(input).await.unwrap_err().status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(svc.list_products(None, None).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn list_paginates() {
        let svc = service().await;
        for i in 0..3 {
            let mut input = dress_input();
            input.title = format!("Produto {}", i);
            input.variants.clear();
            svc.create_product(input).await.unwrap();
        }

        let page = svc.list_products(Some(2), Some(2)).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 1);
    }
}
