pub mod address;
pub mod analytics;
pub mod auth;
pub mod market;
pub mod project;
