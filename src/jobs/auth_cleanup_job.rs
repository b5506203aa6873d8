//! Auth Cleanup Job
//!
//! Deletes used or expired sign-in challenges and revoked or expired
//! sessions once per interval.

use chrono::Utc;
use sea_orm::DatabaseConnection;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::services::auth;

pub fn start_auth_cleanup_job(db: DatabaseConnection, period: Duration) {
    tokio::spawn(async move {
        info!(interval_secs = period.as_secs(), "Auth cleanup job started");

        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received, stopping auth cleanup job");
                    break;
                }
                _ = interval.tick() => {
                    match auth::purge_stale(&db, Utc::now()).await {
                        Ok(purged) => {
                            info!(
                                challenges = purged.challenges,
                                sessions = purged.sessions,
                                "Auth cleanup tick completed"
                            );
                        }
                        Err(e) => {
                            error!(error = %e, "Auth cleanup failed");
                        }
                    }
                }
            }
        }

        info!("Auth cleanup job stopped");
    });
}
