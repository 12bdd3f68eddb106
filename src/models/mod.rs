//! Diesel row types and their conversions to and from the domain.

#[cfg(feature = "server")]
pub mod auth;
pub mod config;

pub mod api_marketplace;
pub mod documentation;
pub mod form_manager;
pub mod manufacturing;
pub mod procurement;
pub mod quality_management;
pub mod reporting;
pub mod security_features;
pub mod stats;
pub mod testing;
pub mod user_experience;
