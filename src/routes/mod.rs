//! HTTP handlers and the helpers they share.

use actix_identity::Identity;
use actix_web::http::StatusCode;
use actix_web::http::header;
use actix_web::{HttpResponse, Responder, get, post, web};
use actix_web_flash_messages::{IncomingFlashMessages, Level};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tera::{Context, Tera};

use crate::ADMIN_ROLE;
use crate::models::auth::AuthenticatedUser;
use crate::models::config::ServerConfig;
use crate::services::{ServiceError, ServiceResult};

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

/// True when `roles` grant `permission` directly or through the admin role.
pub fn check_role(permission: &str, roles: &[String]) -> bool {
    roles.iter().any(|r| r == permission || r == ADMIN_ROLE)
}

pub fn ensure_role(user: &AuthenticatedUser, permission: &str) -> ServiceResult<()> {
    if check_role(permission, &user.roles) {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized)
    }
}

pub fn alert_level_to_str(level: &Level) -> &'static str {
    match level {
        Level::Error => "danger",
        Level::Warning => "warning",
        Level::Success => "success",
        _ => "info",
    }
}

/// Context every page template expects.
pub fn base_context(
    flash_messages: &IncomingFlashMessages,
    user: &AuthenticatedUser,
    current_page: &str,
    home_url: &str,
) -> Context {
    let alerts = flash_messages
        .iter()
        .map(|f| (f.content(), alert_level_to_str(&f.level())))
        .collect::<Vec<_>>();
    let mut context = Context::new();
    context.insert("alerts", &alerts);
    context.insert("current_user", user);
    context.insert("current_page", current_page);
    context.insert("home_url", home_url);
    context
}

pub fn render_template(tera: &Tera, template: &str, context: &Context) -> HttpResponse {
    match tera.render(template, context) {
        Ok(body) => HttpResponse::Ok().content_type("text/html").body(body),
        Err(err) => {
            log::error!("Failed to render template '{template}': {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Status code a failed JSON action answers with.
pub fn error_status(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Unauthorized => StatusCode::FORBIDDEN,
        ServiceError::NotFound => StatusCode::NOT_FOUND,
        ServiceError::Form(_) | ServiceError::TypeConstraint(_) => StatusCode::BAD_REQUEST,
        ServiceError::Conflict(_) => StatusCode::CONFLICT,
        ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `{"success": false, "error": ...}` with the matching status code.
pub fn json_error(err: &ServiceError) -> HttpResponse {
    let status = error_status(err);
    let message = match err {
        ServiceError::Internal(detail) => {
            log::error!("Request failed: {detail}");
            "Internal server error".to_string()
        }
        ServiceError::Unauthorized => "Permission denied".to_string(),
        ServiceError::NotFound => "Not found".to_string(),
        other => other.to_string(),
    };
    HttpResponse::build(status).json(json!({ "success": false, "error": message }))
}

/// `{"success": true, "data": ...}`.
pub fn json_success<T: Serialize>(data: &T) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "data": data }))
}

pub fn json_result<T: Serialize>(result: ServiceResult<T>) -> HttpResponse {
    match result {
        Ok(data) => json_success(&data),
        Err(err) => json_error(&err),
    }
}

pub fn csv_response(filename: &str, body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(body)
}

/// `?page=` query parameter used by list pages.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
}

impl PageQuery {
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1)
    }
}

#[get("/")]
pub async fn show_index(
    user: AuthenticatedUser,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    let context = base_context(
        &flash_messages,
        &user,
        "index",
        &server_config.auth_service_url,
    );
    render_template(&tera, "index.html", &context)
}

#[get("/na")]
pub async fn not_assigned(
    user: AuthenticatedUser,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    let context = base_context(
        &flash_messages,
        &user,
        "na",
        &server_config.auth_service_url,
    );
    render_template(&tera, "na.html", &context)
}

#[post("/logout")]
pub async fn logout(user: Identity) -> impl Responder {
    user.logout();
    redirect("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(roles: &[&str]) -> AuthenticatedUser {
        AuthenticatedUser {
            sub: "1".into(),
            email: "u@example.com".into(),
            name: "U".into(),
            company_id: 1,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: 0,
        }
    }

    #[test]
    fn admin_role_grants_every_permission() {
        let roles = vec![ADMIN_ROLE.to_string()];
        assert!(check_role("manufacturing.manage", &roles));
    }

    #[test]
    fn ensure_role_rejects_missing_permission() {
        let user = user_with(&["manufacturing.view"]);
        assert!(ensure_role(&user, "manufacturing.view").is_ok());
        assert!(matches!(
            ensure_role(&user, "manufacturing.manage"),
            Err(ServiceError::Unauthorized)
        ));
    }

    #[test]
    fn service_errors_map_to_status_codes() {
        assert_eq!(error_status(&ServiceError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            error_status(&ServiceError::Conflict("x".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            error_status(&ServiceError::Form("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&ServiceError::Unauthorized),
            StatusCode::FORBIDDEN
        );
    }
}
