pub use sea_orm_migration::prelude::*;

use sea_orm_migration::schema::{decimal, decimal_len};
use sea_orm_migration::sea_orm::DbBackend;

mod m20260301_000001_create_users;
mod m20260301_000002_create_projects;
mod m20260301_000003_create_transactions;
mod m20260301_000004_create_performance_metrics;
mod m20260302_000001_create_auth_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_users::Migration),
            Box::new(m20260301_000002_create_projects::Migration),
            Box::new(m20260301_000003_create_transactions::Migration),
            Box::new(m20260301_000004_create_performance_metrics::Migration),
            Box::new(m20260302_000001_create_auth_tables::Migration),
        ]
    }
}

/// Amount column: NUMERIC(38, 18) on Postgres. SQLite rejects a declared
/// precision above 16, so it gets an unconstrained decimal.
pub(crate) fn amount_column<T>(manager: &SchemaManager, name: T) -> ColumnDef
where
    T: IntoIden,
{
    match manager.get_database_backend() {
        DbBackend::Sqlite => decimal(name),
        _ => decimal_len(name, 38, 18),
    }
}
