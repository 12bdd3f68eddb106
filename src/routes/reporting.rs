use actix_web::{HttpResponse, Responder, get, post, web};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use tera::Tera;

use crate::domain::reporting::{Frequency, ReportKind};
use crate::forms::DateFilterQuery;
use crate::forms::reporting::{DashboardForm, ReportFilterQuery, ReportForm, ScheduleForm};
use crate::models::auth::AuthenticatedUser;
use crate::models::config::ServerConfig;
use crate::repository::DieselRepository;
use crate::routes::{base_context, csv_response, json_result, redirect, render_template};
use crate::services::{ServiceError, reporting as reporting_service};

#[get("/reporting")]
pub async fn show_reporting_dashboard(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match reporting_service::load_dashboard(repo.get_ref(), &user) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "reporting",
                &server_config.auth_service_url,
            );
            context.insert("dashboard", &data.dashboard);
            context.insert("schedules", &data.schedules);
            context.insert("dashboards", &data.dashboards);
            render_template(&tera, "reporting/dashboard.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(err) => {
            log::error!("Failed to load reporting dashboard: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/reporting/reports")]
pub async fn show_reports(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<ReportFilterQuery>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match reporting_service::list_reports(repo.get_ref(), &user, query.into_inner()) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "reporting",
                &server_config.auth_service_url,
            );
            context.insert("reports", &data.reports);
            context.insert("can_edit", &data.can_edit);
            context.insert("kinds", ReportKind::ALL);
            context.insert("frequencies", Frequency::ALL);
            render_template(&tera, "reporting/reports.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(err) => {
            log::error!("Failed to list reports: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[post("/reporting/reports/add")]
pub async fn add_report(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<ReportForm>,
) -> impl Responder {
    match reporting_service::create_report(repo.get_ref(), &user, form) {
        Ok(report) => {
            FlashMessage::success(format!("Report \"{}\" created.", report.name)).send();
            redirect(&format!("/reporting/reports/{}", report.id))
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/reporting/reports")
        }
        Err(err) => {
            log::error!("Failed to create report: {err}");
            FlashMessage::error("Failed to create the report.").send();
            redirect("/reporting/reports")
        }
    }
}

#[get("/reporting/reports/{report_id}")]
pub async fn show_report(
    report_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<DateFilterQuery>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match reporting_service::run_report(repo.get_ref(), &user, report_id.into_inner(), &query) {
        Ok(Some(result)) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "reporting",
                &server_config.auth_service_url,
            );
            context.insert("result", &result);
            context.insert("frequencies", Frequency::ALL);
            render_template(&tera, "reporting/report.html", &context)
        }
        Ok(None) => {
            FlashMessage::error("Report not found.").send();
            redirect("/reporting/reports")
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) => {
            FlashMessage::error(message).send();
            redirect("/reporting/reports")
        }
        Err(err) => {
            log::error!("Failed to run report: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/reporting/reports/{report_id}/export")]
pub async fn export_report(
    report_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<DateFilterQuery>,
) -> impl Responder {
    let report_id = report_id.into_inner();
    match reporting_service::export_report_csv(repo.get_ref(), &user, report_id, &query) {
        Ok(body) => csv_response(&format!("report-{report_id}.csv"), body),
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::NotFound) => {
            FlashMessage::error("Report not found.").send();
            redirect("/reporting/reports")
        }
        Err(ServiceError::Form(message)) => {
            FlashMessage::error(message).send();
            redirect(&format!("/reporting/reports/{report_id}"))
        }
        Err(err) => {
            log::error!("Failed to export report: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[post("/reporting/reports/{report_id}/schedule")]
pub async fn schedule_report(
    report_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<ScheduleForm>,
) -> impl Responder {
    let report_id = report_id.into_inner();
    match reporting_service::schedule_report(repo.get_ref(), &user, report_id, form) {
        Ok(schedule) => {
            FlashMessage::success(format!(
                "Report scheduled {}, first run {}.",
                schedule.frequency,
                schedule.next_run.format("%Y-%m-%d %H:%M")
            ))
            .send();
            redirect(&format!("/reporting/reports/{report_id}"))
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::NotFound) => {
            FlashMessage::error("Report not found.").send();
            redirect("/reporting/reports")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect(&format!("/reporting/reports/{report_id}"))
        }
        Err(err) => {
            log::error!("Failed to schedule report: {err}");
            FlashMessage::error("Failed to schedule the report.").send();
            redirect(&format!("/reporting/reports/{report_id}"))
        }
    }
}

#[get("/reporting/dashboards")]
pub async fn list_dashboards(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    json_result(reporting_service::list_dashboards(repo.get_ref(), &user))
}

#[post("/reporting/dashboards")]
pub async fn save_dashboard(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<DashboardForm>,
) -> impl Responder {
    json_result(reporting_service::save_dashboard(repo.get_ref(), &user, form))
}
