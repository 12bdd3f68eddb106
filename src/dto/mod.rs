//! Page payloads handed from services to templates and JSON responses.

pub mod api_marketplace;
pub mod documentation;
pub mod form_manager;
pub mod manufacturing;
pub mod procurement;
pub mod quality_management;
pub mod reporting;
pub mod security_features;
pub mod testing;
pub mod user_experience;
