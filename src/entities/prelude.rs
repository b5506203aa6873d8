pub use super::auth_challenges::Entity as AuthChallenges;
pub use super::performance_metrics::Entity as PerformanceMetrics;
pub use super::projects::Entity as Projects;
pub use super::sessions::Entity as Sessions;
pub use super::transactions::Entity as Transactions;
pub use super::users::Entity as Users;
