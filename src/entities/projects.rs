//! SeaORM Entity for carbon offset projects
//!
//! `credits_issued <= total_credits` is enforced on every save, so no code
//! path can over-issue a project.

use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};

use super::checks::{check_address, check_non_negative, current, violation};
use super::sea_orm_active_enums::{Methodology, ProjectStatus, ProjectType, VerificationBody};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Stable external identifier, e.g. "PROJ-1767225600000-3F9A0C1B"
    #[sea_orm(unique)]
    pub project_id: String,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub location: String,
    pub project_type: ProjectType,
    pub methodology: Methodology,
    pub verification_body: VerificationBody,
    pub total_credits: i64,
    pub credits_issued: i64,
    /// Tonnes of CO2 avoided or removed
    #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
    pub co2_reduction: Decimal,
    /// Hectares under protection
    #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
    pub area_protected: Decimal,
    pub status: ProjectStatus,
    pub vintage_year: i32,
    pub image_url: Option<String>,
    pub verification_date: Option<DateTimeWithTimeZone>,
    pub verifier_address: Option<String>,
    pub owner_address: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Issued share of the total supply, in percent.
    pub fn progress(&self) -> f64 {
        if self.total_credits <= 0 {
            return 0.0;
        }
        self.credits_issued as f64 / self.total_credits as f64 * 100.0
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OwnerAddress",
        to = "super::users::Column::WalletAddress"
    )]
    Owner,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

/// Row as currently stored, for updates that carry only one of the credit counts.
async fn stored_row<C>(db: &C, id: &ActiveValue<i32>) -> Result<Model, DbErr>
where
    C: ConnectionTrait,
{
    let id = *current(id).ok_or_else(|| violation("partial credit update requires the row id"))?;
    Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("project {}", id)))
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        check_address("owner_address", &self.owner_address)?;
        check_non_negative("co2_reduction", &self.co2_reduction)?;
        check_non_negative("area_protected", &self.area_protected)?;

        let total = current(&self.total_credits).copied();
        let issued = current(&self.credits_issued).copied();
        if total.is_some_and(|t| t < 0) || issued.is_some_and(|i| i < 0) {
            return Err(violation("credit counts must not be negative"));
        }
        let counts = match (total, issued) {
            (Some(total), Some(issued)) => Some((total, issued)),
            (None, None) => None,
            _ if insert => None,
            (total, issued) => {
                let stored = stored_row(db, &self.id).await?;
                Some((
                    total.unwrap_or(stored.total_credits),
                    issued.unwrap_or(stored.credits_issued),
                ))
            }
        };
        if let Some((total, issued)) = counts {
            if issued > total {
                return Err(violation(format!(
                    "credits_issued ({}) cannot exceed total_credits ({})",
                    issued, total
                )));
            }
        }

        if current(&self.status) == Some(&ProjectStatus::Verified)
            && !matches!(current(&self.verification_date), Some(Some(_)))
        {
            return Err(violation("verified projects require a verification date"));
        }

        let now = Utc::now().fixed_offset();
        if insert && current(&self.created_at).is_none() {
            self.created_at = Set(now);
        }
        self.updated_at = Set(now);

        Ok(self)
    }
}
