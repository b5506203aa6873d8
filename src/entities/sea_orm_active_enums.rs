//! Closed value sets persisted as strings.
//!
//! These are parsed once at the API boundary (serde) and carried as typed
//! values from then on; the database only ever sees the canonical spelling.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[sea_orm(string_value = "trader")]
    Trader,
    #[sea_orm(string_value = "project_owner")]
    ProjectOwner,
    #[sea_orm(string_value = "verifier")]
    Verifier,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl UserRole {
    pub fn can_verify_projects(self) -> bool {
        matches!(self, UserRole::Verifier | UserRole::Admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    #[sea_orm(string_value = "reforestation")]
    Reforestation,
    #[sea_orm(string_value = "renewable_energy")]
    RenewableEnergy,
    #[sea_orm(string_value = "mangrove_restoration")]
    MangroveRestoration,
    #[sea_orm(string_value = "carbon_capture")]
    CarbonCapture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum Methodology {
    #[sea_orm(string_value = "REDD+")]
    #[serde(rename = "REDD+")]
    ReddPlus,
    #[sea_orm(string_value = "VM0033")]
    #[serde(rename = "VM0033")]
    Vm0033,
    #[sea_orm(string_value = "ACM0002")]
    #[serde(rename = "ACM0002")]
    Acm0002,
    #[sea_orm(string_value = "GS4GG")]
    #[serde(rename = "GS4GG")]
    Gs4gg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum VerificationBody {
    #[sea_orm(string_value = "Verra")]
    Verra,
    #[sea_orm(string_value = "Gold Standard")]
    #[serde(rename = "Gold Standard")]
    GoldStandard,
    #[sea_orm(string_value = "UNFCCC")]
    #[serde(rename = "UNFCCC")]
    Unfccc,
    #[sea_orm(string_value = "CDM")]
    #[serde(rename = "CDM")]
    Cdm,
}

/// Project lifecycle: `pending -> active | verified | rejected`, `active -> verified | inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "verified")]
    Verified,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl ProjectStatus {
    pub fn can_transition_to(self, next: ProjectStatus) -> bool {
        use ProjectStatus::*;
        matches!(
            (self, next),
            (Pending, Active)
                | (Pending, Verified)
                | (Pending, Rejected)
                | (Active, Verified)
                | (Active, Inactive)
                | (Inactive, Active)
        )
    }

    /// Credits may only be issued against projects that are live.
    pub fn allows_issuance(self) -> bool {
        matches!(self, ProjectStatus::Active | ProjectStatus::Verified)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    #[sea_orm(string_value = "purchase")]
    Purchase,
    #[sea_orm(string_value = "transfer")]
    Transfer,
    #[sea_orm(string_value = "issuance")]
    Issuance,
    #[sea_orm(string_value = "retirement")]
    Retirement,
}

/// `pending -> completed | failed | cancelled`; the last three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl TransactionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        self == TransactionStatus::Pending && next != TransactionStatus::Pending
    }
}
