use crate::{
    db::{DbPool, UnitOfWork},
    entities::order::{self, Entity as OrderEntity, Model as OrderModel},
    entities::order_item::{self, Entity as OrderItemEntity, Model as OrderItemModel},
    entities::OrderStatus,
    errors::ServiceError,
    services::payments::PaymentLink,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

const DEFAULT_PER_PAGE: u64 = 20;
const MAX_PER_PAGE: u64 = 100;

/// A line to persist with a new order. Prices are already authoritative.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_address: String,
    pub city: Option<String>,
    pub products_total: Decimal,
    pub shipping_cost: Decimal,
    pub total_amount: Decimal,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderStats {
    pub orders: u64,
    /// Sum of paid and shipped orders
    pub revenue: Decimal,
}

/// The order ledger: order headers and their item snapshots.
#[derive(Clone)]
pub struct OrderLedger {
    db_pool: Arc<DbPool>,
}

impl OrderLedger {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Inserts the order and all of its items in a single transaction. The
    /// order starts `pending` with no payment reference.
    #[instrument(skip(self, new_order), fields(items = new_order.items.len(), total = %new_order.total_amount))]
    pub async fn create_with_items(
        &self,
        new_order: NewOrder,
    ) -> Result<OrderWithItems, ServiceError> {
        if new_order.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "order must contain at least one item".to_string(),
            ));
        }
        if new_order.items.iter().any(|i| i.quantity <= 0) {
            return Err(ServiceError::ValidationError(
                "item quantity must be greater than zero".to_string(),
            ));
        }

        let uow = UnitOfWork::begin(&self.db_pool, "orders.create_with_items").await?;
        let staged = stage_order(uow.conn(), new_order).await;
        let created = uow.finish(staged).await?;

        info!(order_id = %created.order.id, "Order persisted");
        Ok(created)
    }

    /// Records the provider answer on an existing order.
    #[instrument(skip(self, link), fields(provider = %link.provider))]
    pub async fn attach_payment_reference(
        &self,
        order_id: Uuid,
        link: &PaymentLink,
    ) -> Result<OrderModel, ServiceError> {
        let existing = self.find_order(order_id).await?;
        let mut active: order::ActiveModel = existing.into();
        active.payment_provider = Set(Some(link.provider.clone()));
        active.payment_url = Set(link.url.clone());
        active.payment_qr_code = Set(link.qr_payload.clone());
        active.external_id = Set(Some(link.external_id.clone()));

        let updated = active.update(&*self.db_pool).await?;
        info!(%order_id, external_id = %link.external_id, "Payment reference attached");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn get_with_items(&self, order_id: Uuid) -> Result<OrderWithItems, ServiceError> {
        let order = self.find_order(order_id).await?;
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::ProductName)
            .all(&*self.db_pool)
            .await?;
        Ok(OrderWithItems { order, items })
    }

    /// Newest orders first, each with its items.
    #[instrument(skip(self))]
    pub async fn list(&self, query: OrderListQuery) -> Result<Vec<OrderWithItems>, ServiceError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);

        let mut select = OrderEntity::find().order_by_desc(order::Column::CreatedAt);
        if let Some(status) = query.status {
            select = select.filter(order::Column::Status.eq(status));
        }
        let orders = select
            .paginate(&*self.db_pool, per_page)
            .fetch_page(page - 1)
            .await?;

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let mut items_by_order: HashMap<Uuid, Vec<OrderItemModel>> = HashMap::new();
        if !ids.is_empty() {
            for item in OrderItemEntity::find()
                .filter(order_item::Column::OrderId.is_in(ids))
                .order_by_asc(order_item::Column::ProductName)
                .all(&*self.db_pool)
                .await?
            {
                items_by_order.entry(item.order_id).or_default().push(item);
            }
        }

        Ok(orders
            .into_iter()
            .map(|order| OrderWithItems {
                items: items_by_order.remove(&order.id).unwrap_or_default(),
                order,
            })
            .collect())
    }

    /// Moves an order along pending -> paid | failed, paid -> shipped.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        next: OrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        let existing = self.find_order(order_id).await?;
        let current = existing.status;
        if !current.can_transition_to(next) {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot move order from {} to {}",
                current, next
            )));
        }

        let mut active: order::ActiveModel = existing.into();
        active.status = Set(next);
        let updated = active.update(&*self.db_pool).await?;
        info!(%order_id, from = %current, to = %next, "Order status updated");
        Ok(updated)
    }

    pub async fn stats(&self) -> Result<OrderStats, ServiceError> {
        let orders = OrderEntity::find().count(&*self.db_pool).await?;
        let revenue = OrderEntity::find()
            .filter(order::Column::Status.is_in([OrderStatus::Paid, OrderStatus::Shipped]))
            .all(&*self.db_pool)
            .await?
            .iter()
            .map(|o| o.total_amount)
            .sum::<Decimal>()
            .round_dp(2);
        Ok(OrderStats { orders, revenue })
    }

    async fn find_order(&self, order_id: Uuid) -> Result<OrderModel, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }
}

async fn stage_order<C: ConnectionTrait>(
    conn: &C,
    new_order: NewOrder,
) -> Result<OrderWithItems, ServiceError> {
    let order_id = Uuid::new_v4();
    let header = order::Model {
        id: order_id,
        customer_name: new_order.customer_name,
        customer_email: new_order.customer_email,
        customer_address: new_order.customer_address,
        city: new_order.city,
        products_total: new_order.products_total,
        shipping_cost: new_order.shipping_cost,
        total_amount: new_order.total_amount,
        status: OrderStatus::Pending,
        payment_provider: None,
        payment_url: None,
        payment_qr_code: None,
        external_id: None,
        created_at: Utc::now(),
        updated_at: None,
    };
    header.validate()?;
    let order = order::ActiveModel::from(header)
        .reset_all()
        .insert(conn)
        .await?;

    let mut items = Vec::with_capacity(new_order.items.len());
    for line in new_order.items {
        let item = order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(line.product_id),
            variant_id: Set(line.variant_id),
            product_name: Set(line.product_name),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
        }
        .insert(conn)
        .await?;
        items.push(item);
    }

    Ok(OrderWithItems { order, items })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::establish_in_memory;
    use axum::http::StatusCode;
    use rust_decimal_macros::dec;

    async fn ledger() -> (OrderLedger, Arc<DbPool>) {
        let db = Arc::new(establish_in_memory().await.unwrap());
        (OrderLedger::new(db.clone()), db)
    }

    fn new_order() -> NewOrder {
        NewOrder {
            customer_name: "Maria Silva".into(),
            customer_email: "maria@example.com".into(),
            customer_address: "Rua A, 1".into(),
            city: Some("SAO PAULO".into()),
            products_total: dec!(250),
            shipping_cost: dec!(20),
            total_amount: dec!(270),
            items: vec![
                NewOrderItem {
                    product_id: Uuid::new_v4(),
                    variant_id: None,
                    product_name: "Vestido".into(),
                    quantity: 2,
                    unit_price: dec!(100),
                },
                NewOrderItem {
                    product_id: Uuid::new_v4(),
                    variant_id: Some(Uuid::new_v4()),
                    product_name: "Saia".into(),
                    quantity: 1,
                    unit_price: dec!(50),
                },
            ],
        }
    }

    #[tokio::test]
    async fn creates_pending_order_with_items() {
        let (ledger, _) = ledger().await;
        let created = ledger.create_with_items(new_order()).await.unwrap();

        assert_eq!(created.order.status, OrderStatus::Pending);
        assert!(!created.order.has_payment_reference());
        assert_eq!(created.items.len(), 2);

        let loaded = ledger.get_with_items(created.order.id).await.unwrap();
        assert_eq!(loaded.order.total_amount, dec!(270));
        let line_sum: Decimal = loaded.items.iter().map(|i| i.line_total()).sum();
        assert_eq!(line_sum, loaded.order.products_total);
    }

    #[tokio::test]
    async fn failed_item_insert_leaves_no_order() {
        let (ledger, db) = ledger().await;
        db.execute_unprepared("DROP TABLE order_items").await.unwrap();

        assert!(ledger.create_with_items(new_order()).await.is_err());
        assert_eq!(OrderEntity::find().count(&*db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn invalid_customer_email_is_rejected() {
        let (ledger, db) = ledger().await;
        let mut order = new_order();
        order.customer_email = "not-an-email".into();

        let err = ledger.create_with_items(order).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(OrderEntity::find().count(&*db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn attaches_payment_reference() {
        let (ledger, _) = ledger().await;
        let created = ledger.create_with_items(new_order()).await.unwrap();
        let link = PaymentLink {
            provider: "MOCK".into(),
            url: Some("http://shop.test/checkout/success?mock=true".into()),
            qr_payload: None,
            external_id: "mock_1".into(),
        };

        let updated = ledger
            .attach_payment_reference(created.order.id, &link)
            .await
            .unwrap();
        assert!(updated.has_payment_reference());
        assert_eq!(updated.external_id.as_deref(), Some("mock_1"));
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn status_follows_lifecycle_and_feeds_revenue() {
        let (ledger, _) = ledger().await;
        let first = ledger.create_with_items(new_order()).await.unwrap().order;
        ledger.create_with_items(new_order()).await.unwrap();

        let err = ledger
            .update_status(first.id, OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        ledger.update_status(first.id, OrderStatus::Paid).await.unwrap();
        let shipped = ledger
            .update_status(first.id, OrderStatus::Shipped)
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);

        let stats = ledger.stats().await.unwrap();
        assert_eq!(stats.orders, 2);
        assert_eq!(stats.revenue, dec!(270));
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let (ledger, _) = ledger().await;
        let paid = ledger.create_with_items(new_order()).await.unwrap().order;
        ledger.create_with_items(new_order()).await.unwrap();
        ledger.update_status(paid.id, OrderStatus::Paid).await.unwrap();

        let all = ledger
            .list(OrderListQuery {
                page: None,
                per_page: None,
                status: None,
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|o| o.items.len() == 2));

        let only_paid = ledger
            .list(OrderListQuery {
                page: None,
                per_page: None,
                status: Some(OrderStatus::Paid),
            })
            .await
            .unwrap();
        assert_eq!(only_paid.len(), 1);
        assert_eq!(only_paid[0].order.id, paid.id);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let (ledger, _) = ledger().await;
        let err = ledger.get_with_items(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
