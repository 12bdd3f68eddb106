#[cfg(feature = "server")]
use actix_cors::Cors;
#[cfg(feature = "server")]
use actix_files::Files;
#[cfg(feature = "server")]
use actix_identity::IdentityMiddleware;
#[cfg(feature = "server")]
use actix_session::{SessionMiddleware, storage::CookieSessionStore};
#[cfg(feature = "server")]
use actix_web::cookie::Key;
#[cfg(feature = "server")]
use actix_web::{App, HttpServer, middleware::Compress, middleware::Logger, web};
#[cfg(feature = "server")]
use actix_web_flash_messages::{FlashMessagesFramework, storage::CookieMessageStore};
#[cfg(feature = "server")]
use tera::Tera;

#[cfg(feature = "server")]
use crate::crypto::Encryption;
#[cfg(feature = "server")]
use crate::models::config::ServerConfig;
#[cfg(feature = "server")]
use crate::repository::DieselRepository;
#[cfg(feature = "server")]
use crate::services::testing::SimulatedExecutor;

pub mod db;
pub mod domain;
pub mod models;
pub mod pagination;
pub mod query;
pub mod repository;
pub mod schema;

#[cfg(feature = "server")]
pub mod crypto;
#[cfg(feature = "server")]
pub mod dto;
#[cfg(feature = "server")]
pub mod forms;
#[cfg(feature = "server")]
pub mod middleware;
#[cfg(feature = "server")]
pub mod routes;
#[cfg(feature = "server")]
pub mod services;

/// Grants every permission below.
pub const ADMIN_ROLE: &str = "erp_admin";

pub const API_MARKETPLACE_VIEW: &str = "api_marketplace.view";
pub const API_MARKETPLACE_MANAGE: &str = "api_marketplace.manage";
pub const DOCUMENTATION_VIEW: &str = "documentation.view";
pub const DOCUMENTATION_MANAGE: &str = "documentation.manage";
pub const FORM_MANAGER_VIEW: &str = "form_manager.view";
pub const FORM_MANAGER_MANAGE: &str = "form_manager.manage";
pub const MANUFACTURING_VIEW: &str = "manufacturing.view";
pub const MANUFACTURING_MANAGE: &str = "manufacturing.manage";
pub const PROCUREMENT_VIEW: &str = "procurement.view";
pub const PROCUREMENT_MANAGE: &str = "procurement.manage";
pub const QUALITY_VIEW: &str = "quality_management.view";
pub const QUALITY_MANAGE: &str = "quality_management.manage";
pub const REPORTING_VIEW: &str = "reporting.view";
pub const REPORTING_MANAGE: &str = "reporting.manage";
pub const SECURITY_VIEW: &str = "security.view";
pub const SECURITY_MANAGE: &str = "security.manage";
pub const TESTING_VIEW: &str = "testing.view";
pub const TESTING_MANAGE: &str = "testing.manage";
pub const UX_VIEW: &str = "ux.view";
pub const UX_MANAGE: &str = "ux.manage";

/// Layers `config/default.yaml`, `config/{APP_ENV}.yaml` and `APP_*`
/// environment variables.
#[cfg(feature = "server")]
pub fn load_server_config() -> Result<ServerConfig, config::ConfigError> {
    let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "local".into());

    config::Config::builder()
        .add_source(config::File::with_name("config/default"))
        .add_source(config::File::with_name(&format!("config/{app_env}")).required(false))
        .add_source(config::Environment::with_prefix("APP"))
        .build()?
        .try_deserialize::<ServerConfig>()
}

/// Builds and runs the Actix-Web HTTP server using the provided configuration.
#[cfg(feature = "server")]
pub async fn run(server_config: ServerConfig) -> std::io::Result<()> {
    use crate::routes::{
        api_marketplace, documentation, form_manager, logout, manufacturing, not_assigned,
        procurement, quality_management, reporting, security_features, show_index, testing,
        user_experience,
    };

    // Establish Diesel connection pool for the SQLite database.
    let pool = db::establish_connection_pool(&server_config.database_url).map_err(|e| {
        std::io::Error::other(format!("Failed to establish database connection: {e}"))
    })?;

    let repo = DieselRepository::new(pool);

    let encryption = match &server_config.encryption_master_key {
        Some(encoded) => Encryption::from_base64(encoded)
            .map_err(|e| std::io::Error::other(format!("Invalid encryption master key: {e}")))?,
        None => {
            log::warn!("No encryption master key configured, deriving one from the secret");
            Encryption::from_secret(&server_config.secret)
        }
    };
    let encryption = web::Data::new(encryption);
    let executor = web::Data::new(SimulatedExecutor::new());

    // Keys and stores for identity, sessions, and flash messages.
    let secret_key = Key::from(server_config.secret.as_bytes());

    let message_store = CookieMessageStore::builder(secret_key.clone()).build();
    let message_framework = FlashMessagesFramework::builder(message_store).build();

    let tera = Tera::new(&server_config.templates_dir)
        .map_err(|e| std::io::Error::other(format!("Template parsing error(s): {e}")))?;

    let bind_address = (server_config.address.clone(), server_config.port);
    log::info!("Listening on {}:{}", bind_address.0, bind_address.1);

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(message_framework.clone())
            .wrap(IdentityMiddleware::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                    .cookie_secure(false) // set to true in prod
                    .cookie_domain(Some(format!(".{}", server_config.domain)))
                    .build(),
            )
            .wrap(Compress::default())
            .wrap(Logger::default())
            .service(Files::new("/assets", "./assets"))
            .service(web::scope("/api").service(api_marketplace::api_v1_record_usage))
            .service(
                web::scope("")
                    .wrap(crate::middleware::redirect_unauthorized())
                    .service(show_index)
                    .service(not_assigned)
                    .service(logout)
                    // API marketplace
                    .service(api_marketplace::show_api_dashboard)
                    .service(api_marketplace::show_apis)
                    .service(api_marketplace::publish_api)
                    .service(api_marketplace::show_applications)
                    .service(api_marketplace::register_application)
                    .service(api_marketplace::generate_api_key)
                    .service(api_marketplace::revoke_api_key)
                    // Documentation
                    .service(documentation::show_documentation_dashboard)
                    .service(documentation::show_tutorials)
                    .service(documentation::add_tutorial)
                    .service(documentation::show_tutorial)
                    .service(documentation::save_tutorial)
                    .service(documentation::complete_tutorial)
                    // Form manager
                    .service(form_manager::show_form_dashboard)
                    .service(form_manager::show_forms)
                    .service(form_manager::add_form)
                    .service(form_manager::show_form)
                    .service(form_manager::add_form_field)
                    .service(form_manager::update_form_status)
                    .service(form_manager::delete_form)
                    .service(form_manager::submit_form)
                    .service(form_manager::show_submissions)
                    .service(form_manager::export_submissions)
                    // Manufacturing
                    .service(manufacturing::show_manufacturing_dashboard)
                    .service(manufacturing::show_work_orders)
                    .service(manufacturing::add_work_order)
                    .service(manufacturing::record_production)
                    .service(manufacturing::update_work_order_status)
                    .service(manufacturing::show_boms)
                    .service(manufacturing::add_bom)
                    .service(manufacturing::show_bom)
                    // Procurement
                    .service(procurement::show_procurement_dashboard)
                    .service(procurement::show_purchase_orders)
                    .service(procurement::add_purchase_order)
                    .service(procurement::show_purchase_order)
                    .service(procurement::approve_purchase_order)
                    .service(procurement::cancel_purchase_order)
                    .service(procurement::receive_purchase_order)
                    .service(procurement::show_vendors)
                    .service(procurement::add_vendor)
                    .service(procurement::vendor_performance)
                    // Quality management
                    .service(quality_management::show_quality_dashboard)
                    .service(quality_management::show_quality_checks)
                    .service(quality_management::add_quality_check)
                    .service(quality_management::show_non_conformances)
                    .service(quality_management::close_non_conformance)
                    .service(quality_management::show_audits)
                    .service(quality_management::add_audit)
                    .service(quality_management::complete_audit)
                    .service(quality_management::add_capa)
                    .service(quality_management::update_capa_status)
                    // Reporting
                    .service(reporting::show_reporting_dashboard)
                    .service(reporting::show_reports)
                    .service(reporting::add_report)
                    .service(reporting::show_report)
                    .service(reporting::export_report)
                    .service(reporting::schedule_report)
                    .service(reporting::list_dashboards)
                    .service(reporting::save_dashboard)
                    // Security
                    .service(security_features::show_security_dashboard)
                    .service(security_features::show_audit_logs)
                    .service(security_features::export_audit_logs)
                    .service(security_features::add_encryption_key)
                    .service(security_features::rotate_encryption_key)
                    .service(security_features::revoke_encryption_key)
                    .service(security_features::encrypt)
                    .service(security_features::decrypt)
                    // Testing
                    .service(testing::show_testing_dashboard)
                    .service(testing::show_test_runs)
                    .service(testing::get_test_run)
                    .service(testing::run_test)
                    // User experience
                    .service(user_experience::show_ux_dashboard)
                    .service(user_experience::show_feedback)
                    .service(user_experience::submit_feedback)
                    .service(user_experience::update_feedback_status)
                    .service(user_experience::show_notifications)
                    .service(user_experience::mark_notification_read)
                    .service(user_experience::mark_all_read)
                    .service(user_experience::get_preferences)
                    .service(user_experience::save_preferences),
            )
            .app_data(web::Data::new(tera.clone()))
            .app_data(web::Data::new(repo.clone()))
            .app_data(encryption.clone())
            .app_data(executor.clone())
            .app_data(web::Data::new(server_config.clone()))
    })
    .bind(bind_address)?
    .run()
    .await
}
