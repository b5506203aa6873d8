use std::env;

use chrono::{Datelike, Utc};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, Database, EntityTrait, QueryFilter, Set};
use sea_orm_migration::MigratorTrait;

use carbon_market_backend::entities::sea_orm_active_enums::{
    Methodology, ProjectStatus, ProjectType, UserRole, VerificationBody,
};
use carbon_market_backend::entities::{prelude::*, projects, users};
use carbon_market_backend::models::address::WalletAddress;
use carbon_market_backend::services::project_service::generate_project_id;

/// Hardhat's first default account, the usual local deployer
const DEMO_ADMIN: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

struct DemoProject {
    name: &'static str,
    location: &'static str,
    project_type: ProjectType,
    methodology: Methodology,
    verification_body: VerificationBody,
    total_credits: i64,
    credits_issued: i64,
    co2_reduction: rust_decimal::Decimal,
    area_protected: rust_decimal::Decimal,
    status: ProjectStatus,
}

fn demo_projects() -> Vec<DemoProject> {
    vec![
        DemoProject {
            name: "Amazon Rainforest Conservation",
            location: "Acre, Brazil",
            project_type: ProjectType::Reforestation,
            methodology: Methodology::ReddPlus,
            verification_body: VerificationBody::Verra,
            total_credits: 100_000,
            credits_issued: 25_000,
            co2_reduction: dec!(50000),
            area_protected: dec!(10000),
            status: ProjectStatus::Verified,
        },
        DemoProject {
            name: "Gujarat Solar Farm",
            location: "Gujarat, India",
            project_type: ProjectType::RenewableEnergy,
            methodology: Methodology::Acm0002,
            verification_body: VerificationBody::GoldStandard,
            total_credits: 75_000,
            credits_issued: 10_000,
            co2_reduction: dec!(37500),
            area_protected: dec!(0),
            status: ProjectStatus::Active,
        },
        DemoProject {
            name: "Sundarbans Mangrove Restoration",
            location: "Khulna, Bangladesh",
            project_type: ProjectType::MangroveRestoration,
            methodology: Methodology::Vm0033,
            verification_body: VerificationBody::Verra,
            total_credits: 40_000,
            credits_issued: 5_000,
            co2_reduction: dec!(20000),
            area_protected: dec!(2500),
            status: ProjectStatus::Verified,
        },
        DemoProject {
            name: "Iceland Direct Air Capture",
            location: "Hellisheidi, Iceland",
            project_type: ProjectType::CarbonCapture,
            methodology: Methodology::Gs4gg,
            verification_body: VerificationBody::Unfccc,
            total_credits: 20_000,
            credits_issued: 0,
            co2_reduction: dec!(4000),
            area_protected: dec!(0),
            status: ProjectStatus::Pending,
        },
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [owner_wallet_address]", args[0]);
        std::process::exit(1);
    }
    let owner = WalletAddress::parse(args.get(1).map(String::as_str).unwrap_or(DEMO_ADMIN))?;

    dotenvy::dotenv().ok();
    let db = Database::connect(env::var("DATABASE_URL")?).await?;
    migration::Migrator::up(&db, None).await?;

    let existing = Users::find()
        .filter(users::Column::WalletAddress.eq(owner.as_str()))
        .one(&db)
        .await?;
    if existing.is_none() {
        users::ActiveModel {
            wallet_address: Set(owner.as_str().to_string()),
            username: Set(Some("demo_admin".to_string())),
            role: Set(UserRole::Admin),
            company: Set(Some("Demo Carbon Registry".to_string())),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        println!("Created admin user {}", owner);
    } else {
        println!("Admin user {} already exists", owner);
    }

    let now = Utc::now();
    let vintage_year = now.year() - 1;
    let mut inserted = 0;

    for demo in demo_projects() {
        let already = Projects::find()
            .filter(projects::Column::Name.eq(demo.name))
            .one(&db)
            .await?;
        if already.is_some() {
            println!("  skip   {} (already present)", demo.name);
            continue;
        }

        let verified = demo.status == ProjectStatus::Verified;
        let project = projects::ActiveModel {
            project_id: Set(generate_project_id(Utc::now())),
            name: Set(demo.name.to_string()),
            description: Set(Some(format!("Demo project in {}", demo.location))),
            location: Set(demo.location.to_string()),
            project_type: Set(demo.project_type),
            methodology: Set(demo.methodology),
            verification_body: Set(demo.verification_body),
            total_credits: Set(demo.total_credits),
            credits_issued: Set(demo.credits_issued),
            co2_reduction: Set(demo.co2_reduction),
            area_protected: Set(demo.area_protected),
            status: Set(demo.status),
            vintage_year: Set(vintage_year),
            image_url: Set(None),
            verification_date: Set(verified.then(|| now.fixed_offset())),
            verifier_address: Set(verified.then(|| owner.as_str().to_string())),
            owner_address: Set(owner.as_str().to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        println!("  insert {} ({:?}) as {}", project.name, project.status, project.project_id);
        inserted += 1;
    }

    println!("Seeded {} projects", inserted);
    Ok(())
}
