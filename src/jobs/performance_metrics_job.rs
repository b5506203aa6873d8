//! Synthetic Performance Metrics Job
//!
//! Records one synthetic metric row per interval so the analytics charts
//! have data. Stops on SIGINT along with the server.

use sea_orm::DatabaseConnection;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::services::analytics;

/// Start the performance metrics job
///
/// The first sample is taken immediately, then once per `period`.
pub fn start_performance_metrics_job(db: DatabaseConnection, period: Duration) {
    tokio::spawn(async move {
        info!(
            interval_secs = period.as_secs(),
            synthetic = true,
            "Performance metrics job started"
        );

        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received, stopping performance metrics job");
                    break;
                }
                _ = interval.tick() => {
                    match analytics::generate_metric(&db).await {
                        Ok(metric) => {
                            info!(metric_id = metric.id, "Performance metrics tick completed");
                        }
                        Err(e) => {
                            // next tick retries
                            error!(error = %e, "Performance metrics generation failed");
                        }
                    }
                }
            }
        }

        info!("Performance metrics job stopped");
    });
}
