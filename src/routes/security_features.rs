use actix_web::{HttpRequest, HttpResponse, Responder, get, post, web};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use tera::Tera;

use crate::crypto::Encryption;
use crate::forms::security_features::{
    AuditLogFilterQuery, DecryptForm, EncryptForm, EncryptionKeyForm,
};
use crate::models::auth::AuthenticatedUser;
use crate::models::config::ServerConfig;
use crate::repository::DieselRepository;
use crate::routes::{base_context, csv_response, json_result, redirect, render_template};
use crate::services::{ServiceError, security_features as security_service};

fn client_ip(req: &HttpRequest) -> Option<String> {
    req.connection_info()
        .realip_remote_addr()
        .map(str::to_string)
}

#[get("/security")]
pub async fn show_security_dashboard(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match security_service::load_dashboard(repo.get_ref(), &user) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "security",
                &server_config.auth_service_url,
            );
            context.insert("dashboard", &data.dashboard);
            context.insert("keys", &data.keys);
            context.insert("can_manage", &data.can_manage);
            render_template(&tera, "security/dashboard.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(err) => {
            log::error!("Failed to load security dashboard: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/security/audit-logs")]
pub async fn show_audit_logs(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<AuditLogFilterQuery>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match security_service::list_audit_logs(repo.get_ref(), &user, query.into_inner()) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "security",
                &server_config.auth_service_url,
            );
            context.insert("logs", &data.logs);
            render_template(&tera, "security/audit_logs.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) => {
            FlashMessage::error(message).send();
            redirect("/security/audit-logs")
        }
        Err(err) => {
            log::error!("Failed to list audit logs: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/security/audit-logs/export")]
pub async fn export_audit_logs(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<AuditLogFilterQuery>,
) -> impl Responder {
    match security_service::export_audit_logs_csv(repo.get_ref(), &user, query.into_inner()) {
        Ok(body) => csv_response("audit-logs.csv", body),
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) => {
            FlashMessage::error(message).send();
            redirect("/security/audit-logs")
        }
        Err(err) => {
            log::error!("Failed to export audit logs: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[post("/security/keys/add")]
pub async fn add_encryption_key(
    req: HttpRequest,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    encryption: web::Data<Encryption>,
    web::Form(form): web::Form<EncryptionKeyForm>,
) -> impl Responder {
    let ip = client_ip(&req);
    match security_service::create_encryption_key(
        repo.get_ref(),
        encryption.get_ref(),
        &user,
        form,
        ip.as_deref(),
    ) {
        Ok(key) => {
            FlashMessage::success(format!("Encryption key \"{}\" created.", key.name)).send();
            redirect("/security")
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Conflict(_)) => {
            FlashMessage::error("A key with this name already exists.").send();
            redirect("/security")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/security")
        }
        Err(err) => {
            log::error!("Failed to create encryption key: {err}");
            FlashMessage::error("Failed to create the encryption key.").send();
            redirect("/security")
        }
    }
}

#[post("/security/keys/{key_id}/rotate")]
pub async fn rotate_encryption_key(
    req: HttpRequest,
    key_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    encryption: web::Data<Encryption>,
) -> impl Responder {
    let ip = client_ip(&req);
    json_result(security_service::rotate_encryption_key(
        repo.get_ref(),
        encryption.get_ref(),
        &user,
        key_id.into_inner(),
        ip.as_deref(),
    ))
}

#[post("/security/keys/{key_id}/revoke")]
pub async fn revoke_encryption_key(
    req: HttpRequest,
    key_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    let ip = client_ip(&req);
    json_result(security_service::revoke_encryption_key(
        repo.get_ref(),
        &user,
        key_id.into_inner(),
        ip.as_deref(),
    ))
}

#[post("/security/keys/{key_id}/encrypt")]
pub async fn encrypt(
    key_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    encryption: web::Data<Encryption>,
    web::Form(form): web::Form<EncryptForm>,
) -> impl Responder {
    json_result(security_service::encrypt(
        repo.get_ref(),
        encryption.get_ref(),
        &user,
        key_id.into_inner(),
        form,
    ))
}

#[post("/security/keys/{key_id}/decrypt")]
pub async fn decrypt(
    key_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    encryption: web::Data<Encryption>,
    web::Form(form): web::Form<DecryptForm>,
) -> impl Responder {
    json_result(security_service::decrypt(
        repo.get_ref(),
        encryption.get_ref(),
        &user,
        key_id.into_inner(),
        form,
    ))
}
