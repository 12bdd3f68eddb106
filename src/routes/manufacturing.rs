use actix_web::{HttpResponse, Responder, get, post, web};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use tera::Tera;

use crate::domain::manufacturing::WorkOrderStatus;
use crate::forms::manufacturing::{
    BomForm, ProductionForm, WorkOrderFilterQuery, WorkOrderForm, WorkOrderStatusForm,
};
use crate::forms::{DateFilterQuery, parse_html_form};
use crate::models::auth::AuthenticatedUser;
use crate::models::config::ServerConfig;
use crate::repository::DieselRepository;
use crate::routes::{base_context, json_result, redirect, render_template};
use crate::services::{ServiceError, manufacturing as manufacturing_service};

#[get("/manufacturing")]
pub async fn show_manufacturing_dashboard(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<DateFilterQuery>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match manufacturing_service::load_dashboard(repo.get_ref(), &user, &query) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "manufacturing",
                &server_config.auth_service_url,
            );
            context.insert("dashboard", &data.dashboard);
            context.insert("range", &data.range);
            render_template(&tera, "manufacturing/dashboard.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) => {
            FlashMessage::error(message).send();
            redirect("/manufacturing")
        }
        Err(err) => {
            log::error!("Failed to load manufacturing dashboard: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/manufacturing/work-orders")]
pub async fn show_work_orders(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<WorkOrderFilterQuery>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match manufacturing_service::list_work_orders(repo.get_ref(), &user, query.into_inner()) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "manufacturing",
                &server_config.auth_service_url,
            );
            context.insert("work_orders", &data.work_orders);
            context.insert("boms", &data.boms);
            context.insert("can_edit", &data.can_edit);
            context.insert("statuses", WorkOrderStatus::ALL);
            render_template(&tera, "manufacturing/work_orders.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/manufacturing/work-orders")
        }
        Err(err) => {
            log::error!("Failed to list work orders: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[post("/manufacturing/work-orders/add")]
pub async fn add_work_order(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<WorkOrderForm>,
) -> impl Responder {
    match manufacturing_service::create_work_order(repo.get_ref(), &user, form) {
        Ok(order) => {
            FlashMessage::success(format!("Work order {} created.", order.order_number)).send();
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            return redirect("/na");
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
        }
        Err(err) => {
            log::error!("Failed to create work order: {err}");
            FlashMessage::error("Failed to create the work order.").send();
        }
    }
    redirect("/manufacturing/work-orders")
}

#[post("/manufacturing/work-orders/{work_order_id}/production")]
pub async fn record_production(
    work_order_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<ProductionForm>,
) -> impl Responder {
    json_result(manufacturing_service::record_production(
        repo.get_ref(),
        &user,
        work_order_id.into_inner(),
        form,
    ))
}

#[post("/manufacturing/work-orders/{work_order_id}/status")]
pub async fn update_work_order_status(
    work_order_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<WorkOrderStatusForm>,
) -> impl Responder {
    json_result(manufacturing_service::update_work_order_status(
        repo.get_ref(),
        &user,
        work_order_id.into_inner(),
        form,
    ))
}

#[get("/manufacturing/boms")]
pub async fn show_boms(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match manufacturing_service::list_boms(repo.get_ref(), &user) {
        Ok(boms) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "manufacturing",
                &server_config.auth_service_url,
            );
            context.insert("boms", &boms);
            render_template(&tera, "manufacturing/boms.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(err) => {
            log::error!("Failed to list bills of materials: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/manufacturing/boms/{bom_id}")]
pub async fn show_bom(
    bom_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match manufacturing_service::get_bom(repo.get_ref(), &user, bom_id.into_inner()) {
        Ok(Some(detail)) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "manufacturing",
                &server_config.auth_service_url,
            );
            context.insert("bom", &detail);
            render_template(&tera, "manufacturing/bom.html", &context)
        }
        Ok(None) => {
            FlashMessage::error("Bill of materials not found.").send();
            redirect("/manufacturing/boms")
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(err) => {
            log::error!("Failed to load bill of materials: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Component rows arrive as repeated `component_name`/`quantity`/`unit_cost` keys.
#[post("/manufacturing/boms/add")]
pub async fn add_bom(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    body: web::Bytes,
) -> impl Responder {
    let result = parse_html_form::<BomForm>(&body)
        .map_err(ServiceError::from)
        .and_then(|form| manufacturing_service::create_bom(repo.get_ref(), &user, form));

    match result {
        Ok(detail) => {
            FlashMessage::success("Bill of materials created.").send();
            redirect(&format!("/manufacturing/boms/{}", detail.bom.id))
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/manufacturing/boms")
        }
        Err(err) => {
            log::error!("Failed to create bill of materials: {err}");
            FlashMessage::error("Failed to create the bill of materials.").send();
            redirect("/manufacturing/boms")
        }
    }
}
