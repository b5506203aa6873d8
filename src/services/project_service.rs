//! Ledger Store operations for projects: CRUD, lifecycle and credit issuance

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
    sea_query::Expr,
};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::entities::projects::{self, Entity as Projects};
use crate::entities::sea_orm_active_enums::{
    ProjectStatus, ProjectType, TransactionStatus, TransactionType, UserRole,
};
use crate::entities::users;
use crate::error::AppError;
use crate::models::address::WalletAddress;
use crate::models::project::{
    CreateProjectRequest, Pagination, ProjectListResponse, ProjectQuery, ProjectStatsResponse,
    ProjectTypeStats, ProjectView, UpdateProjectRequest,
};
use crate::services::transaction_store::{self, NewTransaction};

/// Sender recorded on issuance rows: credits are minted, not transferred.
pub const MINT_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// `PROJ-<unix millis>-<8 uppercase hex>`
pub fn generate_project_id(now: DateTime<Utc>) -> String {
    format!(
        "PROJ-{}-{:08X}",
        now.timestamp_millis(),
        rand::random::<u32>()
    )
}

pub async fn list_projects(
    db: &DatabaseConnection,
    query: &ProjectQuery,
) -> Result<ProjectListResponse, AppError> {
    let (page, limit) = query.page_params().map_err(AppError::InvalidInput)?;

    let mut condition = Condition::all();
    if let Some(project_type) = query.project_type {
        condition = condition.add(projects::Column::ProjectType.eq(project_type));
    }
    if let Some(status) = query.status {
        condition = condition.add(projects::Column::Status.eq(status));
    }
    if let Some(year) = query.vintage_year {
        condition = condition.add(projects::Column::VintageYear.eq(year));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(projects::Column::Name.contains(search))
                .add(projects::Column::Description.contains(search))
                .add(projects::Column::Location.contains(search)),
        );
    }

    let paginator = Projects::find()
        .filter(condition)
        .order_by_desc(projects::Column::CreatedAt)
        .order_by_desc(projects::Column::Id)
        .paginate(db, limit);

    let total = paginator.num_items().await?;
    let projects = paginator.fetch_page(page - 1).await?;

    Ok(ProjectListResponse {
        projects: projects.into_iter().map(ProjectView::from).collect(),
        pagination: Pagination::new(page, limit, total),
    })
}

pub async fn get_project(
    db: &DatabaseConnection,
    project_id: &str,
) -> Result<projects::Model, AppError> {
    Projects::find()
        .filter(projects::Column::ProjectId.eq(project_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Project".to_string()))
}

pub async fn projects_for_owner(
    db: &DatabaseConnection,
    owner: &WalletAddress,
) -> Result<Vec<projects::Model>, AppError> {
    Ok(Projects::find()
        .filter(projects::Column::OwnerAddress.eq(owner.as_str()))
        .order_by_desc(projects::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn create_project(
    db: &DatabaseConnection,
    owner: &WalletAddress,
    request: CreateProjectRequest,
) -> Result<projects::Model, AppError> {
    let now = Utc::now();
    request.validate(now).map_err(AppError::Validation)?;

    let project = projects::ActiveModel {
        project_id: Set(generate_project_id(now)),
        name: Set(request.name.trim().to_string()),
        description: Set(request.description),
        location: Set(request.location.trim().to_string()),
        project_type: Set(request.project_type),
        methodology: Set(request.methodology),
        verification_body: Set(request.verification_body),
        total_credits: Set(request.total_credits),
        credits_issued: Set(0),
        co2_reduction: Set(request.co2_reduction),
        area_protected: Set(request.area_protected),
        status: Set(ProjectStatus::Pending),
        vintage_year: Set(request.vintage_year),
        image_url: Set(request.image_url),
        verification_date: Set(None),
        verifier_address: Set(None),
        owner_address: Set(owner.as_str().to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(project_id = %project.project_id, owner = %owner, "Project created");
    Ok(project)
}

fn ensure_owner_or_admin(actor: &users::Model, project: &projects::Model) -> Result<(), AppError> {
    if actor.role == UserRole::Admin || actor.wallet_address == project.owner_address {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the project owner or an admin can modify this project".to_string(),
        ))
    }
}

fn ensure_verifier(actor: &users::Model) -> Result<(), AppError> {
    if actor.role.can_verify_projects() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only verifiers and admins can review projects".to_string(),
        ))
    }
}

pub async fn update_project(
    db: &DatabaseConnection,
    actor: &users::Model,
    project_id: &str,
    request: UpdateProjectRequest,
) -> Result<projects::Model, AppError> {
    let project = get_project(db, project_id).await?;
    ensure_owner_or_admin(actor, &project)?;
    request.validate(Utc::now()).map_err(AppError::Validation)?;

    if let Some(total) = request.total_credits {
        if total < project.credits_issued {
            return Err(AppError::InvalidInput(format!(
                "totalCredits cannot be below credits already issued ({})",
                project.credits_issued
            )));
        }
    }

    let mut active = project.into_active_model();
    if let Some(name) = request.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = request.description {
        active.description = Set(Some(description));
    }
    if let Some(location) = request.location {
        active.location = Set(location.trim().to_string());
    }
    if let Some(methodology) = request.methodology {
        active.methodology = Set(methodology);
    }
    if let Some(body) = request.verification_body {
        active.verification_body = Set(body);
    }
    if let Some(total) = request.total_credits {
        active.total_credits = Set(total);
    }
    if let Some(co2) = request.co2_reduction {
        active.co2_reduction = Set(co2);
    }
    if let Some(area) = request.area_protected {
        active.area_protected = Set(area);
    }
    if let Some(year) = request.vintage_year {
        active.vintage_year = Set(year);
    }
    if let Some(url) = request.image_url {
        active.image_url = Set(Some(url));
    }

    let updated = active.update(db).await?;
    info!(project_id = %updated.project_id, actor = %actor.wallet_address, "Project updated");
    Ok(updated)
}

pub async fn delete_project(
    db: &DatabaseConnection,
    actor: &users::Model,
    project_id: &str,
) -> Result<(), AppError> {
    let project = get_project(db, project_id).await?;
    ensure_owner_or_admin(actor, &project)?;

    project.delete(db).await?;
    info!(project_id = %project_id, actor = %actor.wallet_address, "Project deleted");
    Ok(())
}

async fn review_project(
    db: &DatabaseConnection,
    actor: &users::Model,
    project_id: &str,
    next: ProjectStatus,
) -> Result<projects::Model, AppError> {
    ensure_verifier(actor)?;
    let project = get_project(db, project_id).await?;

    let allowed = match next {
        ProjectStatus::Rejected => project.status == ProjectStatus::Pending,
        _ => project.status.can_transition_to(next),
    };
    if !allowed {
        warn!(project_id = %project_id, from = ?project.status, to = ?next, "Rejected status change");
        return Err(AppError::InvalidInput(format!(
            "Project cannot move from {:?} to {:?}",
            project.status, next
        )));
    }

    let mut active = project.into_active_model();
    active.status = Set(next);
    if next == ProjectStatus::Verified {
        active.verification_date = Set(Some(Utc::now().fixed_offset()));
        active.verifier_address = Set(Some(actor.wallet_address.clone()));
    }

    let updated = active.update(db).await?;
    info!(
        project_id = %project_id,
        status = ?updated.status,
        reviewer = %actor.wallet_address,
        "Project reviewed"
    );
    Ok(updated)
}

/// Mark a pending or active project verified.
pub async fn verify_project(
    db: &DatabaseConnection,
    actor: &users::Model,
    project_id: &str,
) -> Result<projects::Model, AppError> {
    review_project(db, actor, project_id, ProjectStatus::Verified).await
}

/// Reject a project that is still pending review.
pub async fn reject_project(
    db: &DatabaseConnection,
    actor: &users::Model,
    project_id: &str,
) -> Result<projects::Model, AppError> {
    review_project(db, actor, project_id, ProjectStatus::Rejected).await
}

/// Issue `amount` more credits and record an issuance transaction, atomically.
///
/// # Errors
///
/// `InvalidInput` if `amount` is not positive, the project is not live, or
/// the new total would exceed `total_credits`.
pub async fn issue_credits(
    db: &DatabaseConnection,
    actor: &users::Model,
    project_id: &str,
    amount: i64,
) -> Result<projects::Model, AppError> {
    if amount <= 0 {
        return Err(AppError::InvalidInput("amount must be greater than 0".to_string()));
    }

    let project = get_project(db, project_id).await?;
    ensure_owner_or_admin(actor, &project)?;

    if !project.status.allows_issuance() {
        return Err(AppError::InvalidInput(format!(
            "Credits cannot be issued for a {:?} project",
            project.status
        )));
    }

    let over_issue = || {
        AppError::InvalidInput(format!(
            "Issuing {} would exceed total credits ({} of {} issued)",
            amount, project.credits_issued, project.total_credits
        ))
    };
    if project
        .credits_issued
        .checked_add(amount)
        .is_none_or(|issued| issued > project.total_credits)
    {
        return Err(over_issue());
    }

    let owner = WalletAddress::parse(&project.owner_address)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let mint = WalletAddress::parse(MINT_ADDRESS).map_err(|e| AppError::Internal(e.to_string()))?;

    let txn = db.begin().await?;

    // bound checked against the stored row, not the copy read above
    let result = Projects::update_many()
        .col_expr(
            projects::Column::CreditsIssued,
            Expr::col(projects::Column::CreditsIssued).add(amount),
        )
        .col_expr(projects::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(projects::Column::Id.eq(project.id))
        .filter(
            Expr::col(projects::Column::CreditsIssued)
                .lte(Expr::col(projects::Column::TotalCredits).sub(amount)),
        )
        .exec(&txn)
        .await?;
    if result.rows_affected != 1 {
        warn!(project_id = %project.project_id, amount, "Concurrent issuance exhausted total credits");
        return Err(over_issue());
    }

    let updated = Projects::find_by_id(project.id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Project".to_string()))?;

    transaction_store::insert(
        &txn,
        NewTransaction {
            from_address: mint,
            to_address: owner,
            amount: Decimal::from(amount),
            price: Decimal::ZERO,
            transaction_type: TransactionType::Issuance,
            status: TransactionStatus::Completed,
            mined: None,
            project_id: Some(updated.project_id.clone()),
            listing_id: None,
            metadata: Some(json!({ "issuedBy": actor.wallet_address })),
        },
    )
    .await?;

    txn.commit().await?;

    info!(
        project_id = %updated.project_id,
        amount,
        credits_issued = updated.credits_issued,
        total_credits = updated.total_credits,
        "Credits issued"
    );
    Ok(updated)
}

/// Per-type and overall counts over every project.
pub async fn project_stats(db: &DatabaseConnection) -> Result<ProjectStatsResponse, AppError> {
    let projects = Projects::find().all(db).await?;

    let mut by_type: BTreeMap<ProjectType, ProjectTypeStats> = BTreeMap::new();
    for project in &projects {
        let entry = by_type
            .entry(project.project_type)
            .or_insert_with(|| ProjectTypeStats {
                project_type: project.project_type,
                count: 0,
                total_credits: 0,
                credits_issued: 0,
                co2_reduction: Decimal::ZERO,
            });
        entry.count += 1;
        entry.total_credits += project.total_credits;
        entry.credits_issued += project.credits_issued;
        entry.co2_reduction += project.co2_reduction;
    }

    let by_type: Vec<ProjectTypeStats> = by_type.into_values().collect();

    Ok(ProjectStatsResponse {
        total_projects: projects.len() as u64,
        total_credits: by_type.iter().map(|s| s.total_credits).sum(),
        credits_issued: by_type.iter().map(|s| s.credits_issued).sum(),
        total_co2_reduction: by_type.iter().map(|s| s.co2_reduction).sum::<Decimal>().normalize(),
        by_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_project_id_format() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let id = generate_project_id(now);
        let parts: Vec<&str> = id.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "PROJ");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_mint_address_is_canonical() {
        assert!(WalletAddress::parse(MINT_ADDRESS).is_ok());
    }
}
