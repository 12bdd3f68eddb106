use actix_web::{HttpResponse, Responder, get, post, web};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use tera::Tera;

use crate::domain::testing::{TestRunStatus, TestType};
use crate::forms::testing::{RunTestForm, TestRunFilterQuery};
use crate::models::auth::AuthenticatedUser;
use crate::models::config::ServerConfig;
use crate::repository::DieselRepository;
use crate::routes::{base_context, json_result, redirect, render_template};
use crate::services::testing::SimulatedExecutor;
use crate::services::{ServiceError, testing as testing_service};

#[get("/testing")]
pub async fn show_testing_dashboard(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match testing_service::load_dashboard(repo.get_ref(), &user) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "testing",
                &server_config.auth_service_url,
            );
            context.insert("dashboard", &data.dashboard);
            context.insert("can_run", &data.can_run);
            context.insert("test_types", TestType::ALL);
            render_template(&tera, "testing/dashboard.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(err) => {
            log::error!("Failed to load testing dashboard: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/testing/runs")]
pub async fn show_test_runs(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<TestRunFilterQuery>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match testing_service::list_test_runs(repo.get_ref(), &user, query.into_inner()) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "testing",
                &server_config.auth_service_url,
            );
            context.insert("runs", &data.runs);
            context.insert("can_run", &data.can_run);
            context.insert("test_types", TestType::ALL);
            context.insert("statuses", TestRunStatus::ALL);
            render_template(&tera, "testing/runs.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/testing/runs")
        }
        Err(err) => {
            log::error!("Failed to list test runs: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/testing/runs/{run_id}")]
pub async fn get_test_run(
    run_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    json_result(testing_service::get_test_run(
        repo.get_ref(),
        &user,
        run_id.into_inner(),
    ))
}

#[post("/testing/runs")]
pub async fn run_test(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    executor: web::Data<SimulatedExecutor>,
    web::Form(form): web::Form<RunTestForm>,
) -> impl Responder {
    match testing_service::run_test(repo.get_ref(), executor.get_ref(), &user, form) {
        Ok(run) => {
            FlashMessage::info(format!(
                "Simulated {} run \"{}\" {}: {} passed, {} failed.",
                run.test_type, run.name, run.status, run.passed, run.failed
            ))
            .send();
            redirect("/testing/runs")
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/testing")
        }
        Err(err) => {
            log::error!("Failed to run test: {err}");
            FlashMessage::error("Failed to record the test run.").send();
            redirect("/testing")
        }
    }
}
