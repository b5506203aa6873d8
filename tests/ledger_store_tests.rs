mod common;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, PaginatorTrait, Set};
use sea_orm_migration::MigratorTrait;

use carbon_market_backend::entities::prelude::{AuthChallenges, Projects, Sessions, Transactions};
use carbon_market_backend::entities::{auth_challenges, projects, sessions, transactions};
use carbon_market_backend::entities::sea_orm_active_enums::{
    ProjectStatus, TransactionStatus, TransactionType, UserRole,
};
use carbon_market_backend::error::AppError;
use carbon_market_backend::models::project::{ProjectQuery, UpdateProjectRequest};
use carbon_market_backend::services::chain_gateway::MinedTx;
use carbon_market_backend::services::auth::{self, PurgedAuthRows};
use carbon_market_backend::services::project_service;
use carbon_market_backend::services::transaction_store::{self, NewTransaction};
use carbon_market_backend::services::user_service;

use crate::common::{seed_project, seed_user, setup_test_db, tx_hash, wallet, SeedProject};

fn pending_transfer(n: u64) -> NewTransaction {
    NewTransaction {
        from_address: wallet(1),
        to_address: wallet(2),
        amount: dec!(8),
        price: dec!(0.25),
        transaction_type: TransactionType::Transfer,
        status: TransactionStatus::Pending,
        mined: None,
        project_id: None,
        listing_id: Some(n),
        metadata: None,
    }
}

#[tokio::test]
async fn test_every_migration_applies_on_sqlite() {
    let db = setup_test_db().await.unwrap();
    let applied = migration::Migrator::get_applied_migrations(&db).await.unwrap();
    assert_eq!(applied.len(), migration::Migrator::migrations().len());

    let row = transaction_store::insert(&db, NewTransaction {
        amount: dec!(1.5),
        price: dec!(0.5),
        ..pending_transfer(1)
    })
    .await
    .unwrap();
    assert_eq!(row.total_value, dec!(0.75));
}

#[tokio::test]
async fn test_total_value_recomputed_on_every_save() {
    let db = setup_test_db().await.unwrap();
    let row = transaction_store::insert(&db, pending_transfer(1)).await.unwrap();
    assert_eq!(row.total_value, dec!(2));

    let mut active = row.into_active_model();
    active.price = Set(dec!(0.5));
    active.amount = Set(dec!(3));
    let updated = active.update(&db).await.unwrap();

    assert_eq!(updated.total_value, dec!(1.5));
}

#[tokio::test]
async fn test_partial_update_recomputes_total_value() {
    let db = setup_test_db().await.unwrap();
    let row = transaction_store::insert(&db, pending_transfer(1)).await.unwrap();

    let updated = transactions::ActiveModel {
        id: Set(row.id),
        amount: Set(dec!(100)),
        ..Default::default()
    }
    .update(&db)
    .await
    .unwrap();
    assert_eq!(updated.price, dec!(0.25));
    assert_eq!(updated.total_value, dec!(25));

    let updated = transactions::ActiveModel {
        id: Set(row.id),
        price: Set(dec!(2)),
        ..Default::default()
    }
    .update(&db)
    .await
    .unwrap();
    assert_eq!(updated.amount, dec!(100));
    assert_eq!(updated.total_value, dec!(200));

    let stored = Transactions::find_by_id(row.id).one(&db).await.unwrap().unwrap();
    assert_eq!(stored.total_value, dec!(200));
}

#[tokio::test]
async fn test_total_value_cannot_be_written_directly() {
    let db = setup_test_db().await.unwrap();
    let row = transaction_store::insert(&db, pending_transfer(1)).await.unwrap();

    let err = transactions::ActiveModel {
        id: Set(row.id),
        total_value: Set(dec!(999)),
        ..Default::default()
    }
    .update(&db)
    .await
    .unwrap_err();
    assert!(matches!(
        AppError::from(err),
        AppError::StoreConstraintViolation(_)
    ));
}

#[tokio::test]
async fn test_status_machine_rejects_leaving_terminal_state() {
    let db = setup_test_db().await.unwrap();
    let row = transaction_store::insert(&db, pending_transfer(1)).await.unwrap();

    let mined = MinedTx {
        tx_hash: tx_hash(1),
        block_number: Some(12),
        gas_used: 50_000,
    };
    let completed =
        transaction_store::transition_status(&db, row.id, TransactionStatus::Completed, Some(mined))
            .await
            .unwrap();
    assert_eq!(completed.status, TransactionStatus::Completed);
    assert_eq!(completed.block_number, Some(12));

    let again =
        transaction_store::transition_status(&db, row.id, TransactionStatus::Cancelled, None).await;
    assert!(matches!(again, Err(AppError::StoreConstraintViolation(_))));

    let missing =
        transaction_store::transition_status(&db, 9_999, TransactionStatus::Failed, None).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_duplicate_hash_is_constraint_violation() {
    let db = setup_test_db().await.unwrap();
    let mined = MinedTx {
        tx_hash: tx_hash(5),
        block_number: Some(1),
        gas_used: 1,
    };

    let mut first = pending_transfer(1);
    first.mined = Some(mined.clone());
    transaction_store::insert(&db, first).await.unwrap();

    let mut second = pending_transfer(2);
    second.mined = Some(mined);
    let err = transaction_store::insert(&db, second).await.unwrap_err();

    assert!(matches!(
        AppError::from(err),
        AppError::StoreConstraintViolation(_)
    ));
    assert!(transaction_store::find_by_hash(&db, &tx_hash(5)).await.unwrap().is_some());
}

#[tokio::test]
async fn test_issuance_is_bounded_by_total_credits() {
    let db = setup_test_db().await.unwrap();
    let owner = seed_user(&db, &wallet(1), UserRole::ProjectOwner).await;
    let owner_wallet = wallet(1);
    seed_project(&db, &owner_wallet, SeedProject {
        project_id: "PROJ-1-0000000A",
        status: ProjectStatus::Active,
        total_credits: 100,
        credits_issued: 60,
        ..Default::default()
    })
    .await;

    let updated = project_service::issue_credits(&db, &owner, "PROJ-1-0000000A", 40)
        .await
        .unwrap();
    assert_eq!(updated.credits_issued, 100);

    let over = project_service::issue_credits(&db, &owner, "PROJ-1-0000000A", 1).await;
    assert!(matches!(over, Err(AppError::InvalidInput(_))));

    let zero = project_service::issue_credits(&db, &owner, "PROJ-1-0000000A", 0).await;
    assert!(matches!(zero, Err(AppError::InvalidInput(_))));

    let issuances = Transactions::find().all(&db).await.unwrap();
    assert_eq!(issuances.len(), 1);
    assert_eq!(issuances[0].transaction_type, TransactionType::Issuance);
    assert_eq!(issuances[0].amount, dec!(40));
    assert_eq!(issuances[0].to_address, owner_wallet.as_str());
}

#[tokio::test]
async fn test_entity_rejects_over_issuance_on_direct_update() {
    let db = setup_test_db().await.unwrap();
    seed_user(&db, &wallet(1), UserRole::ProjectOwner).await;
    let project = seed_project(&db, &wallet(1), SeedProject {
        total_credits: 10,
        ..Default::default()
    })
    .await;

    let mut active = project.into_active_model();
    active.credits_issued = Set(11);
    let err = active.update(&db).await.unwrap_err();

    assert!(matches!(
        AppError::from(err),
        AppError::StoreConstraintViolation(_)
    ));
}

#[tokio::test]
async fn test_partial_update_checks_stored_credit_counts() {
    let db = setup_test_db().await.unwrap();
    seed_user(&db, &wallet(1), UserRole::ProjectOwner).await;
    let project = seed_project(&db, &wallet(1), SeedProject {
        total_credits: 10,
        credits_issued: 5,
        ..Default::default()
    })
    .await;

    let err = projects::ActiveModel {
        id: Set(project.id),
        credits_issued: Set(50),
        ..Default::default()
    }
    .update(&db)
    .await
    .unwrap_err();
    assert!(matches!(
        AppError::from(err),
        AppError::StoreConstraintViolation(_)
    ));

    let err = projects::ActiveModel {
        id: Set(project.id),
        total_credits: Set(4),
        ..Default::default()
    }
    .update(&db)
    .await
    .unwrap_err();
    assert!(matches!(
        AppError::from(err),
        AppError::StoreConstraintViolation(_)
    ));

    let updated = projects::ActiveModel {
        id: Set(project.id),
        credits_issued: Set(10),
        ..Default::default()
    }
    .update(&db)
    .await
    .unwrap();
    assert_eq!(updated.credits_issued, 10);
    assert_eq!(updated.total_credits, 10);
}

#[tokio::test]
async fn test_concurrent_issuance_keeps_both_increments() {
    let db = setup_test_db().await.unwrap();
    let owner = seed_user(&db, &wallet(1), UserRole::ProjectOwner).await;
    seed_project(&db, &wallet(1), SeedProject {
        status: ProjectStatus::Active,
        total_credits: 100,
        ..Default::default()
    })
    .await;

    let (first, second) = tokio::join!(
        project_service::issue_credits(&db, &owner, "PROJ-1-00000001", 30),
        project_service::issue_credits(&db, &owner, "PROJ-1-00000001", 30),
    );
    first.unwrap();
    second.unwrap();

    let project = project_service::get_project(&db, "PROJ-1-00000001").await.unwrap();
    assert_eq!(project.credits_issued, 60);

    let issued: Decimal = Transactions::find()
        .all(&db)
        .await
        .unwrap()
        .iter()
        .map(|tx| tx.amount)
        .sum();
    assert_eq!(issued, dec!(60));
}

#[tokio::test]
async fn test_concurrent_issuance_never_exceeds_total() {
    let db = setup_test_db().await.unwrap();
    let owner = seed_user(&db, &wallet(1), UserRole::ProjectOwner).await;
    seed_project(&db, &wallet(1), SeedProject {
        status: ProjectStatus::Active,
        total_credits: 100,
        ..Default::default()
    })
    .await;

    let (first, second) = tokio::join!(
        project_service::issue_credits(&db, &owner, "PROJ-1-00000001", 60),
        project_service::issue_credits(&db, &owner, "PROJ-1-00000001", 60),
    );
    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(AppError::InvalidInput(_)))));

    let project = project_service::get_project(&db, "PROJ-1-00000001").await.unwrap();
    assert_eq!(project.credits_issued, 60);
    assert_eq!(Transactions::find().count(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_total_credits_cannot_drop_below_issued() {
    let db = setup_test_db().await.unwrap();
    let owner = seed_user(&db, &wallet(1), UserRole::ProjectOwner).await;
    seed_project(&db, &wallet(1), SeedProject {
        status: ProjectStatus::Active,
        total_credits: 100,
        credits_issued: 50,
        ..Default::default()
    })
    .await;

    let request = UpdateProjectRequest {
        total_credits: Some(49),
        ..Default::default()
    };
    let result = project_service::update_project(&db, &owner, "PROJ-1-00000001", request).await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));

    let request = UpdateProjectRequest {
        total_credits: Some(50),
        name: Some("Renamed".to_string()),
        ..Default::default()
    };
    let updated = project_service::update_project(&db, &owner, "PROJ-1-00000001", request)
        .await
        .unwrap();
    assert_eq!(updated.total_credits, 50);
    assert_eq!(updated.name, "Renamed");
}

#[tokio::test]
async fn test_review_rules() {
    let db = setup_test_db().await.unwrap();
    let owner = seed_user(&db, &wallet(1), UserRole::ProjectOwner).await;
    let verifier = seed_user(&db, &wallet(2), UserRole::Verifier).await;
    seed_project(&db, &wallet(1), SeedProject::default()).await;

    let forbidden = project_service::verify_project(&db, &owner, "PROJ-1-00000001").await;
    assert!(matches!(forbidden, Err(AppError::Forbidden(_))));

    let verified = project_service::verify_project(&db, &verifier, "PROJ-1-00000001")
        .await
        .unwrap();
    assert_eq!(verified.status, ProjectStatus::Verified);
    assert_eq!(verified.verifier_address.as_deref(), Some(wallet(2).as_str()));
    assert!(verified.verification_date.is_some());

    let reject = project_service::reject_project(&db, &verifier, "PROJ-1-00000001").await;
    assert!(matches!(reject, Err(AppError::InvalidInput(_))));
}

#[tokio::test]
async fn test_list_filters_and_paginates() {
    let db = setup_test_db().await.unwrap();
    seed_user(&db, &wallet(1), UserRole::ProjectOwner).await;
    for (id, status) in [
        ("PROJ-1-00000001", ProjectStatus::Pending),
        ("PROJ-1-00000002", ProjectStatus::Verified),
        ("PROJ-1-00000003", ProjectStatus::Verified),
    ] {
        seed_project(&db, &wallet(1), SeedProject {
            project_id: id,
            status,
            ..Default::default()
        })
        .await;
    }

    let query = ProjectQuery {
        status: Some(ProjectStatus::Verified),
        limit: Some(1),
        ..Default::default()
    };
    let page = project_service::list_projects(&db, &query).await.unwrap();
    assert_eq!(page.projects.len(), 1);
    assert_eq!(page.pagination.total, 2);
    assert_eq!(page.pagination.pages, 2);

    let search = ProjectQuery {
        search: Some("00000003".to_string()),
        ..Default::default()
    };
    let found = project_service::list_projects(&db, &search).await.unwrap();
    assert_eq!(found.pagination.total, 1);

    assert_eq!(Projects::find().count(&db).await.unwrap(), 3);
}

#[tokio::test]
async fn test_first_login_creates_trader_then_refreshes() {
    let db = setup_test_db().await.unwrap();
    let address = wallet(0xabcdef);

    let created = user_service::record_login(&db, &address).await.unwrap();
    assert_eq!(created.role, UserRole::Trader);
    assert_eq!(created.username.as_deref(), Some("user_000000"));
    let first_login = created.last_login.unwrap();

    let again = user_service::record_login(&db, &address).await.unwrap();
    assert_eq!(again.id, created.id);
    assert!(again.last_login.unwrap() >= first_login);
    assert_eq!(user_service::count_users(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_purge_removes_spent_and_expired_auth_rows() {
    let db = setup_test_db().await.unwrap();
    let now = Utc::now();
    let address = wallet(7);

    for (nonce, consumed, expires_in) in [
        ("open", false, Duration::minutes(5)),
        ("used", true, Duration::minutes(5)),
        ("stale", false, Duration::minutes(-1)),
    ] {
        auth_challenges::ActiveModel {
            wallet_address: Set(address.as_str().to_string()),
            nonce: Set(nonce.to_string()),
            consumed: Set(consumed),
            expires_at: Set((now + expires_in).fixed_offset()),
            created_at: Set(now.fixed_offset()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
    }
    for (token, revoked, expires_in) in [
        ("live", false, Duration::hours(1)),
        ("revoked", true, Duration::hours(1)),
        ("expired", false, Duration::hours(-1)),
    ] {
        sessions::ActiveModel {
            token: Set(token.to_string()),
            wallet_address: Set(address.as_str().to_string()),
            revoked: Set(revoked),
            expires_at: Set((now + expires_in).fixed_offset()),
            created_at: Set(now.fixed_offset()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
    }

    let purged = auth::purge_stale(&db, now).await.unwrap();
    assert_eq!(purged, PurgedAuthRows {
        challenges: 2,
        sessions: 2,
    });

    let challenges = AuthChallenges::find().all(&db).await.unwrap();
    assert_eq!(challenges.len(), 1);
    assert_eq!(challenges[0].nonce, "open");
    let sessions = Sessions::find().all(&db).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].token, "live");

    let again = auth::purge_stale(&db, now).await.unwrap();
    assert_eq!(again, PurgedAuthRows::default());
}
