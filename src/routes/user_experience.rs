use actix_web::{HttpResponse, Responder, get, post, web};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use tera::Tera;

use crate::domain::user_experience::{FeedbackStatus, Theme};
use crate::forms::user_experience::{
    FeedbackFilterQuery, FeedbackForm, FeedbackStatusForm, NotificationQuery, PreferencesForm,
};
use crate::models::auth::AuthenticatedUser;
use crate::models::config::ServerConfig;
use crate::repository::DieselRepository;
use crate::routes::{base_context, json_result, redirect, render_template};
use crate::services::{ServiceError, user_experience as ux_service};

#[get("/ux")]
pub async fn show_ux_dashboard(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match ux_service::load_dashboard(repo.get_ref(), &user) {
        Ok(data) => {
            let mut context =
                base_context(&flash_messages, &user, "ux", &server_config.auth_service_url);
            context.insert("dashboard", &data.dashboard);
            context.insert("preferences", &data.preferences);
            context.insert("can_manage", &data.can_manage);
            context.insert("themes", Theme::ALL);
            render_template(&tera, "ux/dashboard.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(err) => {
            log::error!("Failed to load UX dashboard: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/ux/feedback")]
pub async fn show_feedback(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<FeedbackFilterQuery>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match ux_service::list_feedback(repo.get_ref(), &user, query.into_inner()) {
        Ok(data) => {
            let mut context =
                base_context(&flash_messages, &user, "ux", &server_config.auth_service_url);
            context.insert("feedback", &data.feedback);
            context.insert("can_manage", &data.can_manage);
            context.insert("statuses", FeedbackStatus::ALL);
            render_template(&tera, "ux/feedback.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/ux/feedback")
        }
        Err(err) => {
            log::error!("Failed to list feedback: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[post("/ux/feedback")]
pub async fn submit_feedback(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<FeedbackForm>,
) -> impl Responder {
    match ux_service::submit_feedback(repo.get_ref(), &user, form) {
        Ok(_) => {
            FlashMessage::success("Thank you for your feedback.").send();
            redirect("/ux")
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/ux")
        }
        Err(err) => {
            log::error!("Failed to submit feedback: {err}");
            FlashMessage::error("Failed to save feedback.").send();
            redirect("/ux")
        }
    }
}

#[post("/ux/feedback/{feedback_id}/status")]
pub async fn update_feedback_status(
    feedback_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<FeedbackStatusForm>,
) -> impl Responder {
    match ux_service::update_feedback_status(
        repo.get_ref(),
        &user,
        feedback_id.into_inner(),
        form,
    ) {
        Ok(feedback) => {
            FlashMessage::success(format!("Feedback marked {}.", feedback.status)).send();
            redirect("/ux/feedback")
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::NotFound) => {
            FlashMessage::error("Feedback not found.").send();
            redirect("/ux/feedback")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/ux/feedback")
        }
        Err(err) => {
            log::error!("Failed to update feedback status: {err}");
            FlashMessage::error("Failed to update feedback.").send();
            redirect("/ux/feedback")
        }
    }
}

#[get("/ux/notifications")]
pub async fn show_notifications(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<NotificationQuery>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    let unread_only = query.unread_only();
    match ux_service::list_notifications(repo.get_ref(), &user, query.into_inner()) {
        Ok(data) => {
            let mut context =
                base_context(&flash_messages, &user, "ux", &server_config.auth_service_url);
            context.insert("notifications", &data.notifications);
            context.insert("unread", &data.unread);
            context.insert("unread_only", &unread_only);
            render_template(&tera, "ux/notifications.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(err) => {
            log::error!("Failed to list notifications: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[post("/ux/notifications/{notification_id}/read")]
pub async fn mark_notification_read(
    notification_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    json_result(ux_service::mark_notification_read(
        repo.get_ref(),
        &user,
        notification_id.into_inner(),
    ))
}

#[post("/ux/notifications/read-all")]
pub async fn mark_all_read(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match ux_service::mark_all_read(repo.get_ref(), &user) {
        Ok(count) => {
            FlashMessage::info(format!("{count} notifications marked read.")).send();
            redirect("/ux/notifications")
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(err) => {
            log::error!("Failed to mark notifications read: {err}");
            FlashMessage::error("Failed to update notifications.").send();
            redirect("/ux/notifications")
        }
    }
}

#[get("/ux/preferences")]
pub async fn get_preferences(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    json_result(ux_service::get_preferences(repo.get_ref(), &user))
}

#[post("/ux/preferences")]
pub async fn save_preferences(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<PreferencesForm>,
) -> impl Responder {
    match ux_service::save_preferences(repo.get_ref(), &user, form) {
        Ok(_) => {
            FlashMessage::success("Preferences saved.").send();
            redirect("/ux")
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/ux")
        }
        Err(err) => {
            log::error!("Failed to save preferences: {err}");
            FlashMessage::error("Failed to save preferences.").send();
            redirect("/ux")
        }
    }
}
