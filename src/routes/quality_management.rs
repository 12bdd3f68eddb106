use actix_web::{HttpResponse, Responder, get, post, web};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use tera::Tera;

use crate::domain::quality_management::{
    CapaActionType, CapaStatus, CheckResult, NonConformanceStatus, Severity,
};
use crate::forms::DateFilterQuery;
use crate::forms::quality_management::{
    AuditForm, CapaForm, CapaStatusForm, CompleteAuditForm, NonConformanceFilterQuery,
    QualityCheckFilterQuery, QualityCheckForm,
};
use crate::models::auth::AuthenticatedUser;
use crate::models::config::ServerConfig;
use crate::repository::DieselRepository;
use crate::routes::{base_context, json_result, redirect, render_template};
use crate::services::{ServiceError, quality_management as quality_service};

#[get("/quality")]
pub async fn show_quality_dashboard(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<DateFilterQuery>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match quality_service::load_dashboard(repo.get_ref(), &user, &query) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "quality",
                &server_config.auth_service_url,
            );
            context.insert("dashboard", &data.dashboard);
            context.insert("range", &data.range);
            render_template(&tera, "quality/dashboard.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) => {
            FlashMessage::error(message).send();
            redirect("/quality")
        }
        Err(err) => {
            log::error!("Failed to load quality dashboard: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/quality/checks")]
pub async fn show_quality_checks(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<QualityCheckFilterQuery>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match quality_service::list_quality_checks(repo.get_ref(), &user, query.into_inner()) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "quality",
                &server_config.auth_service_url,
            );
            context.insert("checks", &data.checks);
            context.insert("can_edit", &data.can_edit);
            context.insert("results", CheckResult::ALL);
            context.insert("severities", Severity::ALL);
            render_template(&tera, "quality/checks.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/quality/checks")
        }
        Err(err) => {
            log::error!("Failed to list quality checks: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[post("/quality/checks/add")]
pub async fn add_quality_check(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<QualityCheckForm>,
) -> impl Responder {
    match quality_service::create_quality_check(repo.get_ref(), &user, form) {
        Ok(recorded) => match recorded.non_conformance {
            Some(nc) => FlashMessage::warning(format!(
                "Check failed. Non-conformance #{} opened.",
                nc.id
            ))
            .send(),
            None => FlashMessage::success("Quality check recorded.").send(),
        },
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            return redirect("/na");
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
        }
        Err(err) => {
            log::error!("Failed to record quality check: {err}");
            FlashMessage::error("Failed to record the quality check.").send();
        }
    }
    redirect("/quality/checks")
}

#[get("/quality/non-conformances")]
pub async fn show_non_conformances(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<NonConformanceFilterQuery>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match quality_service::list_non_conformances(repo.get_ref(), &user, query.into_inner()) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "quality",
                &server_config.auth_service_url,
            );
            context.insert("non_conformances", &data.non_conformances);
            context.insert("capas", &data.capas);
            context.insert("can_edit", &data.can_edit);
            context.insert("statuses", NonConformanceStatus::ALL);
            context.insert("severities", Severity::ALL);
            context.insert("action_types", CapaActionType::ALL);
            context.insert("capa_statuses", CapaStatus::ALL);
            render_template(&tera, "quality/non_conformances.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/quality/non-conformances")
        }
        Err(err) => {
            log::error!("Failed to list non-conformances: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[post("/quality/non-conformances/{non_conformance_id}/close")]
pub async fn close_non_conformance(
    non_conformance_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    json_result(quality_service::close_non_conformance(
        repo.get_ref(),
        &user,
        non_conformance_id.into_inner(),
    ))
}

#[get("/quality/audits")]
pub async fn show_audits(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match quality_service::list_audits(repo.get_ref(), &user) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "quality",
                &server_config.auth_service_url,
            );
            context.insert("audits", &data.audits);
            context.insert("can_edit", &data.can_edit);
            render_template(&tera, "quality/audits.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(err) => {
            log::error!("Failed to list audits: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[post("/quality/audits/add")]
pub async fn add_audit(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<AuditForm>,
) -> impl Responder {
    match quality_service::schedule_audit(repo.get_ref(), &user, form) {
        Ok(audit) => {
            FlashMessage::success(format!(
                "Audit scheduled for {}.",
                audit.scheduled_date
            ))
            .send();
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            return redirect("/na");
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
        }
        Err(err) => {
            log::error!("Failed to schedule audit: {err}");
            FlashMessage::error("Failed to schedule the audit.").send();
        }
    }
    redirect("/quality/audits")
}

#[post("/quality/audits/{audit_id}/complete")]
pub async fn complete_audit(
    audit_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<CompleteAuditForm>,
) -> impl Responder {
    json_result(quality_service::complete_audit(
        repo.get_ref(),
        &user,
        audit_id.into_inner(),
        form,
    ))
}

#[post("/quality/capas/add")]
pub async fn add_capa(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<CapaForm>,
) -> impl Responder {
    match quality_service::create_capa(repo.get_ref(), &user, form) {
        Ok(_) => {
            FlashMessage::success("Corrective action created.").send();
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            return redirect("/na");
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
        }
        Err(err) => {
            log::error!("Failed to create CAPA: {err}");
            FlashMessage::error("Failed to create the corrective action.").send();
        }
    }
    redirect("/quality/non-conformances")
}

#[post("/quality/capas/{capa_id}/status")]
pub async fn update_capa_status(
    capa_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<CapaStatusForm>,
) -> impl Responder {
    json_result(quality_service::update_capa_status(
        repo.get_ref(),
        &user,
        capa_id.into_inner(),
        form,
    ))
}
