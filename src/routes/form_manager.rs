use std::collections::HashMap;

use actix_web::{HttpResponse, Responder, get, post, web};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use tera::Tera;

use crate::domain::form_manager::{FieldType, FormStatus};
use crate::forms::form_manager::{AddFieldForm, CreateFormForm, FormFilterQuery, FormStatusForm};
use crate::models::auth::AuthenticatedUser;
use crate::models::config::ServerConfig;
use crate::repository::DieselRepository;
use crate::routes::{PageQuery, base_context, csv_response, redirect, render_template};
use crate::services::{ServiceError, form_manager as form_service};

#[get("/form-manager")]
pub async fn show_form_dashboard(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match form_service::load_dashboard(repo.get_ref(), &user) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "form_manager",
                &server_config.auth_service_url,
            );
            context.insert("dashboard", &data.dashboard);
            render_template(&tera, "form_manager/dashboard.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(err) => {
            log::error!("Failed to load form dashboard: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/form-manager/forms")]
pub async fn show_forms(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<FormFilterQuery>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match form_service::list_forms(repo.get_ref(), &user, query.into_inner()) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "form_manager",
                &server_config.auth_service_url,
            );
            context.insert("forms", &data.forms);
            context.insert("can_edit", &data.can_edit);
            context.insert("statuses", FormStatus::ALL);
            render_template(&tera, "form_manager/forms.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/form-manager/forms")
        }
        Err(err) => {
            log::error!("Failed to list forms: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/form-manager/forms/{form_id}")]
pub async fn show_form(
    form_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match form_service::get_form(repo.get_ref(), &user, form_id.into_inner()) {
        Ok(Some(detail)) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "form_manager",
                &server_config.auth_service_url,
            );
            context.insert("form", &detail.form);
            context.insert("settings", &detail.settings);
            context.insert("fields", &detail.fields);
            context.insert("field_types", FieldType::ALL);
            context.insert("statuses", FormStatus::ALL);
            render_template(&tera, "form_manager/form.html", &context)
        }
        Ok(None) => {
            FlashMessage::error("Form not found.").send();
            redirect("/form-manager/forms")
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(err) => {
            log::error!("Failed to load form: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[post("/form-manager/forms/add")]
pub async fn add_form(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<CreateFormForm>,
) -> impl Responder {
    match form_service::create_form(repo.get_ref(), &user, form) {
        Ok(detail) => {
            FlashMessage::success("Form created.").send();
            redirect(&format!("/form-manager/forms/{}", detail.form.id))
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/form-manager/forms")
        }
        Err(err) => {
            log::error!("Failed to create form: {err}");
            FlashMessage::error("Failed to create the form.").send();
            redirect("/form-manager/forms")
        }
    }
}

#[post("/form-manager/forms/{form_id}/fields")]
pub async fn add_form_field(
    form_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<AddFieldForm>,
) -> impl Responder {
    let form_id = form_id.into_inner();
    let back = format!("/form-manager/forms/{form_id}");
    match form_service::add_field(repo.get_ref(), &user, form_id, form) {
        Ok(_) => {
            FlashMessage::success("Field added.").send();
            redirect(&back)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::NotFound) => {
            FlashMessage::error("Form not found.").send();
            redirect("/form-manager/forms")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect(&back)
        }
        Err(err) => {
            log::error!("Failed to add form field: {err}");
            FlashMessage::error("Failed to add the field.").send();
            redirect(&back)
        }
    }
}

#[post("/form-manager/forms/{form_id}/status")]
pub async fn update_form_status(
    form_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<FormStatusForm>,
) -> impl Responder {
    let form_id = form_id.into_inner();
    let back = format!("/form-manager/forms/{form_id}");
    match form_service::update_status(repo.get_ref(), &user, form_id, form) {
        Ok(updated) => {
            FlashMessage::success(format!("Form is now {}.", updated.status)).send();
            redirect(&back)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::NotFound) => {
            FlashMessage::error("Form not found.").send();
            redirect("/form-manager/forms")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect(&back)
        }
        Err(err) => {
            log::error!("Failed to update form status: {err}");
            FlashMessage::error("Failed to update the form.").send();
            redirect(&back)
        }
    }
}

#[post("/form-manager/forms/{form_id}/delete")]
pub async fn delete_form(
    form_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match form_service::delete_form(repo.get_ref(), &user, form_id.into_inner()) {
        Ok(()) => {
            FlashMessage::success("Form deleted.").send();
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            return redirect("/na");
        }
        Err(ServiceError::NotFound) => {
            FlashMessage::error("Form not found.").send();
        }
        Err(err) => {
            log::error!("Failed to delete form: {err}");
            FlashMessage::error("Failed to delete the form.").send();
        }
    }
    redirect("/form-manager/forms")
}

#[post("/form-manager/forms/{form_id}/submit")]
pub async fn submit_form(
    form_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(values): web::Form<HashMap<String, String>>,
) -> impl Responder {
    let form_id = form_id.into_inner();
    let back = format!("/form-manager/forms/{form_id}");
    match form_service::submit_form(repo.get_ref(), &user, form_id, values) {
        Ok(_) => {
            FlashMessage::success("Thank you, your response was recorded.").send();
            redirect(&back)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::NotFound) => {
            FlashMessage::error("Form not found.").send();
            redirect("/form-manager/forms")
        }
        Err(ServiceError::Form(message))
        | Err(ServiceError::TypeConstraint(message))
        | Err(ServiceError::Conflict(message)) => {
            FlashMessage::error(message).send();
            redirect(&back)
        }
        Err(err) => {
            log::error!("Failed to submit form: {err}");
            FlashMessage::error("Failed to record your response.").send();
            redirect(&back)
        }
    }
}

#[get("/form-manager/forms/{form_id}/submissions")]
pub async fn show_submissions(
    form_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<PageQuery>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match form_service::list_submissions(repo.get_ref(), &user, form_id.into_inner(), query.page())
    {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "form_manager",
                &server_config.auth_service_url,
            );
            context.insert("form", &data.detail.form);
            context.insert("fields", &data.detail.fields);
            context.insert("submissions", &data.submissions);
            render_template(&tera, "form_manager/submissions.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::NotFound) => {
            FlashMessage::error("Form not found.").send();
            redirect("/form-manager/forms")
        }
        Err(err) => {
            log::error!("Failed to list submissions: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/form-manager/forms/{form_id}/export")]
pub async fn export_submissions(
    form_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    let form_id = form_id.into_inner();
    match form_service::export_submissions_csv(repo.get_ref(), &user, form_id) {
        Ok(body) => csv_response(&format!("form-{form_id}-submissions.csv"), body),
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::NotFound) => {
            FlashMessage::error("Form not found.").send();
            redirect("/form-manager/forms")
        }
        Err(err) => {
            log::error!("Failed to export submissions: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
