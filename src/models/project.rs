use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::projects;
use crate::entities::sea_orm_active_enums::{
    Methodology, ProjectStatus, ProjectType, VerificationBody,
};

/// Query parameters for GET /projects
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub project_type: Option<ProjectType>,
    pub status: Option<ProjectStatus>,
    pub vintage_year: Option<i32>,
    pub search: Option<String>,
}

impl ProjectQuery {
    pub const DEFAULT_LIMIT: u64 = 10;
    pub const MAX_LIMIT: u64 = 100;

    /// Returns validated `(page, limit)`.
    pub fn page_params(&self) -> Result<(u64, u64), String> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(Self::DEFAULT_LIMIT);

        if page < 1 {
            return Err("page must be at least 1".to_string());
        }
        if !(1..=Self::MAX_LIMIT).contains(&limit) {
            return Err(format!("limit must be between 1 and {}", Self::MAX_LIMIT));
        }
        Ok((page, limit))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        Self {
            page,
            limit,
            total,
            pages: total.div_ceil(limit.max(1)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectView>,
    pub pagination: Pagination,
}

/// Project as exposed by the API, with derived progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub project_id: String,
    pub name: String,
    pub description: Option<String>,
    pub location: String,
    pub project_type: ProjectType,
    pub methodology: Methodology,
    pub verification_body: VerificationBody,
    pub total_credits: i64,
    pub credits_issued: i64,
    pub co2_reduction: Decimal,
    pub area_protected: Decimal,
    pub status: ProjectStatus,
    pub vintage_year: i32,
    pub image_url: Option<String>,
    pub verification_date: Option<DateTime<Utc>>,
    pub verifier_address: Option<String>,
    pub owner_address: String,
    /// Percent of total credits issued
    pub progress: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<projects::Model> for ProjectView {
    fn from(project: projects::Model) -> Self {
        let progress = project.progress();
        Self {
            project_id: project.project_id,
            name: project.name,
            description: project.description,
            location: project.location,
            project_type: project.project_type,
            methodology: project.methodology,
            verification_body: project.verification_body,
            total_credits: project.total_credits,
            credits_issued: project.credits_issued,
            co2_reduction: project.co2_reduction,
            area_protected: project.area_protected,
            status: project.status,
            vintage_year: project.vintage_year,
            image_url: project.image_url,
            verification_date: project.verification_date.map(|d| d.with_timezone(&Utc)),
            verifier_address: project.verifier_address,
            owner_address: project.owner_address,
            progress,
            created_at: project.created_at.with_timezone(&Utc),
            updated_at: project.updated_at.with_timezone(&Utc),
        }
    }
}

/// Request body for POST /projects
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    pub location: String,
    pub project_type: ProjectType,
    pub methodology: Methodology,
    pub verification_body: VerificationBody,
    pub total_credits: i64,
    pub co2_reduction: Decimal,
    pub area_protected: Decimal,
    pub vintage_year: i32,
    pub image_url: Option<String>,
}

fn check_name(name: &str, errors: &mut Vec<String>) {
    let len = name.trim().chars().count();
    if !(2..=200).contains(&len) {
        errors.push("name must be between 2 and 200 characters".to_string());
    }
}

fn check_vintage_year(year: i32, now: DateTime<Utc>, errors: &mut Vec<String>) {
    let max = now.year() + 5;
    if !(2000..=max).contains(&year) {
        errors.push(format!("vintageYear must be between 2000 and {}", max));
    }
}

impl CreateProjectRequest {
    /// Collects every field problem rather than stopping at the first.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        check_name(&self.name, &mut errors);
        if self.location.trim().is_empty() {
            errors.push("location is required".to_string());
        }
        if self.total_credits < 1 {
            errors.push("totalCredits must be at least 1".to_string());
        }
        check_vintage_year(self.vintage_year, now, &mut errors);
        if self.co2_reduction.is_sign_negative() && !self.co2_reduction.is_zero() {
            errors.push("co2Reduction must not be negative".to_string());
        }
        if self.area_protected.is_sign_negative() && !self.area_protected.is_zero() {
            errors.push("areaProtected must not be negative".to_string());
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Request body for PUT /projects/:projectId; absent fields are left as is.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub methodology: Option<Methodology>,
    pub verification_body: Option<VerificationBody>,
    pub total_credits: Option<i64>,
    pub co2_reduction: Option<Decimal>,
    pub area_protected: Option<Decimal>,
    pub vintage_year: Option<i32>,
    pub image_url: Option<String>,
}

impl UpdateProjectRequest {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Some(name) = &self.name {
            check_name(name, &mut errors);
        }
        if self.location.as_deref().is_some_and(|l| l.trim().is_empty()) {
            errors.push("location must not be empty".to_string());
        }
        if self.total_credits.is_some_and(|t| t < 1) {
            errors.push("totalCredits must be at least 1".to_string());
        }
        if let Some(year) = self.vintage_year {
            check_vintage_year(year, now, &mut errors);
        }
        for (field, value) in [
            ("co2Reduction", self.co2_reduction),
            ("areaProtected", self.area_protected),
        ] {
            if value.is_some_and(|v| v.is_sign_negative() && !v.is_zero()) {
                errors.push(format!("{} must not be negative", field));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteProjectResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueCreditsRequest {
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTypeStats {
    pub project_type: ProjectType,
    pub count: u64,
    pub total_credits: i64,
    pub credits_issued: i64,
    pub co2_reduction: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatsResponse {
    pub by_type: Vec<ProjectTypeStats>,
    pub total_projects: u64,
    pub total_credits: i64,
    pub credits_issued: i64,
    pub total_co2_reduction: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn valid_request() -> CreateProjectRequest {
        CreateProjectRequest {
            name: "Amazon Rainforest Conservation".to_string(),
            description: None,
            location: "Brazil".to_string(),
            project_type: ProjectType::Reforestation,
            methodology: Methodology::ReddPlus,
            verification_body: VerificationBody::Verra,
            total_credits: 10_000,
            co2_reduction: dec!(5000),
            area_protected: dec!(1200.5),
            vintage_year: 2024,
            image_url: None,
        }
    }

    #[test]
    fn test_page_params() {
        assert_eq!(ProjectQuery::default().page_params().unwrap(), (1, 10));

        let query = ProjectQuery { page: Some(0), ..Default::default() };
        assert!(query.page_params().is_err());

        let query = ProjectQuery { limit: Some(101), ..Default::default() };
        assert!(query.page_params().is_err());
    }

    #[test]
    fn test_pagination_pages_round_up() {
        assert_eq!(Pagination::new(1, 10, 21).pages, 3);
        assert_eq!(Pagination::new(1, 10, 0).pages, 0);
    }

    #[test]
    fn test_create_validation() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert!(valid_request().validate(now).is_ok());

        let mut bad = valid_request();
        bad.name = "X".to_string();
        bad.total_credits = 0;
        bad.vintage_year = 2032;
        bad.co2_reduction = dec!(-1);
        let errors = bad.validate(now).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_query_parses_enum_filters() {
        let query: ProjectQuery =
            serde_json::from_str(r#"{"projectType":"carbon_capture","status":"verified"}"#)
                .unwrap();
        assert_eq!(query.project_type, Some(ProjectType::CarbonCapture));
        assert_eq!(query.status, Some(ProjectStatus::Verified));
    }
}
