//! SeaORM Entity for platform users, keyed by wallet address

use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, Set};
use serde::{Deserialize, Serialize};

use super::checks::{check_address, current, violation};
use super::sea_orm_active_enums::UserRole;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Lowercase 0x address, 42 chars
    #[sea_orm(unique)]
    pub wallet_address: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: UserRole,
    pub company: Option<String>,
    pub profile_image: Option<String>,
    pub is_active: bool,
    pub last_login: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::projects::Entity")]
    Projects,
}

impl Related<super::projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Projects.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        check_address("wallet_address", &self.wallet_address)?;

        if let Some(Some(username)) = current(&self.username) {
            let len = username.chars().count();
            if !(2..=50).contains(&len) {
                return Err(violation("username must be between 2 and 50 characters"));
            }
        }

        let now = Utc::now().fixed_offset();
        if insert && current(&self.created_at).is_none() {
            self.created_at = Set(now);
        }
        self.updated_at = Set(now);

        Ok(self)
    }
}
