use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sellable SKU of a product, addressed by its attribute combination
/// (e.g. color x size).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_variants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    #[sea_orm(unique)]
    pub sku: String,
    /// Price override; `None` or zero falls back to the product base price.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub price: Option<Decimal>,
    pub stock: i32,
    #[sea_orm(column_type = "Json")]
    pub attributes: Json, // BTreeMap<String, String> serialized
    pub created_at: DateTime<Utc>,
}

impl Model {
    /// Own price when set and positive, else `base_price`.
    pub fn effective_price(&self, base_price: Decimal) -> Decimal {
        match self.price {
            Some(price) if price > Decimal::ZERO => price,
            _ => base_price,
        }
    }

    pub fn attribute_map(&self) -> BTreeMap<String, String> {
        serde_json::from_value(self.attributes.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::super::product::Entity",
        from = "Column::ProductId",
        to = "super::super::product::Column::Id",
        on_delete = "Cascade"
    )]
    Product,
}

impl Related<super::super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
