use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog product. `quantity` is the authoritative stock figure: it is
/// decremented when an order is confirmed and restored when a confirmed
/// order is cancelled.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub short_description: String,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))", nullable)]
    pub old_price: Option<Decimal>,
    pub quantity: i32,
    pub category_id: Uuid,
    #[sea_orm(nullable)]
    pub image: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(has_many = "super::product_image::Entity")]
    Images,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::product_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the product can be ordered.
    pub fn available(&self) -> bool {
        self.is_active && self.quantity > 0
    }

    pub fn has_discount(&self) -> bool {
        self.old_price.map_or(false, |old| old > self.price)
    }

    /// Discount in whole percent, 0 when there is none.
    pub fn discount_percent(&self) -> i32 {
        match self.old_price {
            Some(old) if old > self.price && !old.is_zero() => {
                ((Decimal::ONE - self.price / old) * Decimal::from(100))
                    .round()
                    .to_i32()
                    .unwrap_or(0)
            }
            _ => 0,
        }
    }
}
