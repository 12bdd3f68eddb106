//! Domain types for the ERP modules, free of persistence and HTTP concerns.

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
pub mod types;
pub mod user_experience;
