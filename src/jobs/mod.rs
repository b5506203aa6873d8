pub mod auth_cleanup_job;
pub mod performance_metrics_job;
