use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Customer account. Email is the login identity; phone is a secondary
/// unique identifier.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(unique)]
    pub phone: String,
    pub first_name: String,
    pub last_name: String,
    pub patronymic: String,
    #[sea_orm(column_type = "Text")]
    pub address: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
    #[sea_orm(has_many = "super::cart::Entity")]
    Carts,
    #[sea_orm(has_many = "super::chat_message::Entity")]
    ChatMessages,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Carts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// "Фамилия Имя [Отчество]", as shown in order notifications.
    pub fn full_name(&self) -> String {
        if self.patronymic.is_empty() {
            format!("{} {}", self.last_name, self.first_name)
        } else {
            format!("{} {} {}", self.last_name, self.first_name, self.patronymic)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn customer(patronymic: &str) -> Model {
        Model {
            id: Uuid::new_v4(),
            email: "ivanov@example.com".into(),
            phone: "+79990001122".into(),
            first_name: "Иван".into(),
            last_name: "Иванов".into(),
            patronymic: patronymic.into(),
            address: String::new(),
            password_hash: String::new(),
            is_staff: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn full_name_includes_patronymic_when_present() {
        assert_eq!(customer("").full_name(), "Иванов Иван");
        assert_eq!(customer("Иванович").full_name(), "Иванов Иван Иванович");
    }
}
