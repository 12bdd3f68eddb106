use actix_web::{HttpResponse, Responder, get, post, web};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use serde_json::json;
use tera::Tera;

use crate::forms::DateFilterQuery;
use crate::forms::api_marketplace::{
    ApiFilterQuery, PublishApiForm, RecordUsageRequest, RegisterApplicationForm,
};
use crate::models::auth::AuthenticatedUser;
use crate::models::config::ServerConfig;
use crate::repository::DieselRepository;
use crate::routes::{base_context, json_error, json_result, redirect, render_template};
use crate::services::{ServiceError, api_marketplace as marketplace_service};

#[get("/api-marketplace")]
pub async fn show_api_dashboard(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<DateFilterQuery>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match marketplace_service::load_dashboard(repo.get_ref(), &user, &query) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "api_marketplace",
                &server_config.auth_service_url,
            );
            context.insert("dashboard", &data.dashboard);
            context.insert("range", &data.range);
            render_template(&tera, "api_marketplace/dashboard.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) => {
            FlashMessage::error(message).send();
            redirect("/api-marketplace")
        }
        Err(err) => {
            log::error!("Failed to load API marketplace dashboard: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/api-marketplace/apis")]
pub async fn show_apis(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<ApiFilterQuery>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match marketplace_service::list_apis(repo.get_ref(), &user, query.into_inner()) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "api_marketplace",
                &server_config.auth_service_url,
            );
            context.insert("apis", &data.apis);
            context.insert("categories", &data.categories);
            render_template(&tera, "api_marketplace/apis.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/api-marketplace/apis")
        }
        Err(err) => {
            log::error!("Failed to list APIs: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[post("/api-marketplace/apis/publish")]
pub async fn publish_api(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<PublishApiForm>,
) -> impl Responder {
    match marketplace_service::publish_api(repo.get_ref(), &user, form) {
        Ok(_) => {
            FlashMessage::success("API published.").send();
            redirect("/api-marketplace/apis")
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/api-marketplace/apis")
        }
        Err(err) => {
            log::error!("Failed to publish API: {err}");
            FlashMessage::error("Failed to publish the API.").send();
            redirect("/api-marketplace/apis")
        }
    }
}

#[get("/api-marketplace/applications")]
pub async fn show_applications(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match marketplace_service::list_applications(repo.get_ref(), &user) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "api_marketplace",
                &server_config.auth_service_url,
            );
            context.insert("applications", &data.applications);
            render_template(&tera, "api_marketplace/applications.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(err) => {
            log::error!("Failed to list applications: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[post("/api-marketplace/applications/register")]
pub async fn register_application(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<RegisterApplicationForm>,
) -> impl Responder {
    match marketplace_service::register_application(repo.get_ref(), &user, form) {
        Ok(_) => {
            FlashMessage::success("Application registered.").send();
            redirect("/api-marketplace/applications")
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/api-marketplace/applications")
        }
        Err(err) => {
            log::error!("Failed to register application: {err}");
            FlashMessage::error("Failed to register the application.").send();
            redirect("/api-marketplace/applications")
        }
    }
}

#[post("/api-marketplace/applications/{application_id}/keys")]
pub async fn generate_api_key(
    application_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    json_result(marketplace_service::generate_api_key(
        repo.get_ref(),
        &user,
        application_id.into_inner(),
    ))
}

#[post("/api-marketplace/keys/{key_id}/revoke")]
pub async fn revoke_api_key(
    key_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    json_result(marketplace_service::revoke_api_key(
        repo.get_ref(),
        &user,
        key_id.into_inner(),
    ))
}

/// Usage ingest authenticated by the API key in the body.
#[post("/v1/usage")]
pub async fn api_v1_record_usage(
    repo: web::Data<DieselRepository>,
    web::Json(request): web::Json<RecordUsageRequest>,
) -> impl Responder {
    match marketplace_service::record_usage(repo.get_ref(), request) {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true })),
        Err(ServiceError::Unauthorized) => HttpResponse::Unauthorized()
            .json(json!({ "success": false, "error": "Invalid or revoked API key" })),
        Err(err) => json_error(&err),
    }
}
