use actix_web::{HttpResponse, Responder, get, post, web};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use tera::Tera;

use crate::forms::documentation::{TutorialFilterQuery, TutorialForm};
use crate::models::auth::AuthenticatedUser;
use crate::models::config::ServerConfig;
use crate::repository::DieselRepository;
use crate::routes::{base_context, json_result, redirect, render_template};
use crate::services::{ServiceError, documentation as documentation_service};

#[get("/documentation")]
pub async fn show_documentation_dashboard(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match documentation_service::load_dashboard(repo.get_ref(), &user) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "documentation",
                &server_config.auth_service_url,
            );
            context.insert("dashboard", &data.dashboard);
            render_template(&tera, "documentation/dashboard.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(err) => {
            log::error!("Failed to load documentation dashboard: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/documentation/tutorials")]
pub async fn show_tutorials(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<TutorialFilterQuery>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match documentation_service::list_tutorials(repo.get_ref(), &user, query.into_inner()) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "documentation",
                &server_config.auth_service_url,
            );
            context.insert("tutorials", &data.tutorials);
            context.insert("can_edit", &data.can_edit);
            render_template(&tera, "documentation/tutorials.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/documentation/tutorials")
        }
        Err(err) => {
            log::error!("Failed to list tutorials: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/documentation/tutorials/{tutorial_id}")]
pub async fn show_tutorial(
    tutorial_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match documentation_service::get_tutorial(repo.get_ref(), &user, tutorial_id.into_inner()) {
        Ok(Some(detail)) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "documentation",
                &server_config.auth_service_url,
            );
            context.insert("tutorial", &detail.tutorial);
            context.insert("completed_at", &detail.completed_at);
            render_template(&tera, "documentation/tutorial.html", &context)
        }
        Ok(None) => {
            FlashMessage::error("Tutorial not found.").send();
            redirect("/documentation/tutorials")
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(err) => {
            log::error!("Failed to load tutorial: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[post("/documentation/tutorials/add")]
pub async fn add_tutorial(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<TutorialForm>,
) -> impl Responder {
    match documentation_service::create_tutorial(repo.get_ref(), &user, form) {
        Ok(tutorial) => {
            FlashMessage::success("Tutorial created.").send();
            redirect(&format!("/documentation/tutorials/{}", tutorial.id))
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/documentation/tutorials")
        }
        Err(err) => {
            log::error!("Failed to create tutorial: {err}");
            FlashMessage::error("Failed to create the tutorial.").send();
            redirect("/documentation/tutorials")
        }
    }
}

#[post("/documentation/tutorials/{tutorial_id}/save")]
pub async fn save_tutorial(
    tutorial_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<TutorialForm>,
) -> impl Responder {
    let tutorial_id = tutorial_id.into_inner();
    let back = format!("/documentation/tutorials/{tutorial_id}");
    match documentation_service::update_tutorial(repo.get_ref(), &user, tutorial_id, form) {
        Ok(_) => {
            FlashMessage::success("Tutorial saved.").send();
            redirect(&back)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::NotFound) => {
            FlashMessage::error("Tutorial not found.").send();
            redirect("/documentation/tutorials")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect(&back)
        }
        Err(err) => {
            log::error!("Failed to update tutorial: {err}");
            FlashMessage::error("Failed to save the tutorial.").send();
            redirect(&back)
        }
    }
}

#[post("/documentation/tutorials/{tutorial_id}/complete")]
pub async fn complete_tutorial(
    tutorial_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    json_result(documentation_service::complete_tutorial(
        repo.get_ref(),
        &user,
        tutorial_id.into_inner(),
    ))
}
