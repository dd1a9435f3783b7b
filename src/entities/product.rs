use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Product entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display title
    #[validate(length(
        min = 1,
        max = 255,
        message = "Product title must be between 1 and 255 characters"
    ))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description cannot exceed 5000 characters"))]
    pub description: Option<String>,

    /// Price used by variants without their own override
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub base_price: Decimal,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::commerce::product_variant::Entity")]
    Variants,
    #[sea_orm(has_many = "super::commerce::product_image::Entity")]
    Images,
}

impl Related<super::commerce::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variants.def()
    }
}

impl Related<super::commerce::product_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl Related<super::commerce::category::Entity> for Entity {
    fn to() -> RelationDef {
        super::commerce::product_category::Relation::Category.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::commerce::product_category::Relation::Product.def().rev())
    }
}

impl Related<super::commerce::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::commerce::product_tag::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::commerce::product_tag::Relation::Product.def().rev())
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();
        self.updated_at = Set(now);
        if insert && self.created_at.is_not_set() {
            self.created_at = Set(now);
        }
        Ok(self)
    }
}
