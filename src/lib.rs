// src/lib.rs

use sea_orm::DatabaseConnection;
use services::{
    auth::AuthSettings, chain_gateway::ChainGateway, market_query::MarketQueryService,
    reconciliation::ReconciliationFlow,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub gateway: Arc<dyn ChainGateway>,
    pub reconciler: ReconciliationFlow,
    pub market: MarketQueryService,
    pub auth: AuthSettings,
    /// Error bodies carry a `debug` field when set
    pub verbose_errors: bool,
}

impl AppState {
    /// Wire the services around one shared gateway and connection pool.
    pub fn new(db: DatabaseConnection, gateway: Arc<dyn ChainGateway>, auth: AuthSettings) -> Self {
        Self {
            reconciler: ReconciliationFlow::new(gateway.clone(), db.clone()),
            market: MarketQueryService::new(gateway.clone(), db.clone()),
            db,
            gateway,
            auth,
            verbose_errors: false,
        }
    }

    pub fn with_verbose_errors(mut self, verbose: bool) -> Self {
        self.verbose_errors = verbose;
        self
    }
}

pub mod entities {
    pub mod prelude;
    pub mod checks;
    pub mod sea_orm_active_enums;
    pub mod users;
    pub mod projects;
    pub mod transactions;
    pub mod performance_metrics;
    pub mod auth_challenges;
    pub mod sessions;
}

pub mod services {
    pub mod base_units;
    pub mod chain_gateway;
    pub mod contract_gateway;
    pub mod reconciliation;
    pub mod market_query;
    pub mod transaction_store;
    pub mod project_service;
    pub mod user_service;
    pub mod auth;
    pub mod analytics;
}

pub mod handlers {
    pub mod auth;
    pub mod projects;
    pub mod market;
    pub mod analytics;
    pub mod health;
}

pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod routes;
