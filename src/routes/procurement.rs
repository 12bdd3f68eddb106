use actix_web::{HttpResponse, Responder, get, post, web};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use tera::Tera;

use crate::domain::procurement::PurchaseOrderStatus;
use crate::forms::procurement::{
    PurchaseOrderFilterQuery, PurchaseOrderForm, VendorForm, VendorSearchQuery,
};
use crate::forms::{DateFilterQuery, parse_html_form};
use crate::models::auth::AuthenticatedUser;
use crate::models::config::ServerConfig;
use crate::repository::DieselRepository;
use crate::routes::{base_context, json_result, redirect, render_template};
use crate::services::{ServiceError, procurement as procurement_service};

#[get("/procurement")]
pub async fn show_procurement_dashboard(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<DateFilterQuery>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match procurement_service::load_dashboard(repo.get_ref(), &user, &query) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "procurement",
                &server_config.auth_service_url,
            );
            context.insert("dashboard", &data.dashboard);
            context.insert("range", &data.range);
            render_template(&tera, "procurement/dashboard.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) => {
            FlashMessage::error(message).send();
            redirect("/procurement")
        }
        Err(err) => {
            log::error!("Failed to load procurement dashboard: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/procurement/purchase-orders")]
pub async fn show_purchase_orders(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<PurchaseOrderFilterQuery>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match procurement_service::list_purchase_orders(repo.get_ref(), &user, query.into_inner()) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "procurement",
                &server_config.auth_service_url,
            );
            context.insert("purchase_orders", &data.purchase_orders);
            context.insert("vendors", &data.vendors);
            context.insert("can_edit", &data.can_edit);
            context.insert("statuses", PurchaseOrderStatus::ALL);
            render_template(&tera, "procurement/purchase_orders.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/procurement/purchase-orders")
        }
        Err(err) => {
            log::error!("Failed to list purchase orders: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/procurement/purchase-orders/{purchase_order_id}")]
pub async fn show_purchase_order(
    purchase_order_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match procurement_service::get_purchase_order(
        repo.get_ref(),
        &user,
        purchase_order_id.into_inner(),
    ) {
        Ok(Some(detail)) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "procurement",
                &server_config.auth_service_url,
            );
            context.insert("purchase_order", &detail);
            render_template(&tera, "procurement/purchase_order.html", &context)
        }
        Ok(None) => {
            FlashMessage::error("Purchase order not found.").send();
            redirect("/procurement/purchase-orders")
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(err) => {
            log::error!("Failed to load purchase order: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Order lines arrive as repeated `description`/`quantity`/`unit_price` keys.
#[post("/procurement/purchase-orders/add")]
pub async fn add_purchase_order(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    body: web::Bytes,
) -> impl Responder {
    let result = parse_html_form::<PurchaseOrderForm>(&body)
        .map_err(ServiceError::from)
        .and_then(|form| procurement_service::create_purchase_order(repo.get_ref(), &user, form));

    match result {
        Ok(detail) => {
            FlashMessage::success(format!(
                "Purchase order {} created.",
                detail.order.po_number
            ))
            .send();
            redirect(&format!("/procurement/purchase-orders/{}", detail.order.id))
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
            redirect("/procurement/purchase-orders")
        }
        Err(err) => {
            log::error!("Failed to create purchase order: {err}");
            FlashMessage::error("Failed to create the purchase order.").send();
            redirect("/procurement/purchase-orders")
        }
    }
}

#[post("/procurement/purchase-orders/{purchase_order_id}/approve")]
pub async fn approve_purchase_order(
    purchase_order_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    json_result(procurement_service::approve_purchase_order(
        repo.get_ref(),
        &user,
        purchase_order_id.into_inner(),
    ))
}

#[post("/procurement/purchase-orders/{purchase_order_id}/cancel")]
pub async fn cancel_purchase_order(
    purchase_order_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    json_result(procurement_service::cancel_purchase_order(
        repo.get_ref(),
        &user,
        purchase_order_id.into_inner(),
    ))
}

#[post("/procurement/purchase-orders/{purchase_order_id}/receive")]
pub async fn receive_purchase_order(
    purchase_order_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    json_result(procurement_service::receive_purchase_order(
        repo.get_ref(),
        &user,
        purchase_order_id.into_inner(),
    ))
}

#[get("/procurement/vendors")]
pub async fn show_vendors(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    query: web::Query<VendorSearchQuery>,
    flash_messages: IncomingFlashMessages,
    server_config: web::Data<ServerConfig>,
    tera: web::Data<Tera>,
) -> impl Responder {
    match procurement_service::list_vendors(repo.get_ref(), &user, query.into_inner()) {
        Ok(data) => {
            let mut context = base_context(
                &flash_messages,
                &user,
                "procurement",
                &server_config.auth_service_url,
            );
            context.insert("vendors", &data.vendors);
            context.insert("search", &data.search);
            context.insert("can_edit", &data.can_edit);
            render_template(&tera, "procurement/vendors.html", &context)
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            redirect("/na")
        }
        Err(err) => {
            log::error!("Failed to list vendors: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[post("/procurement/vendors/add")]
pub async fn add_vendor(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Form(form): web::Form<VendorForm>,
) -> impl Responder {
    match procurement_service::create_vendor(repo.get_ref(), &user, form) {
        Ok(vendor) => {
            FlashMessage::success(format!("Vendor {} added.", vendor.name)).send();
        }
        Err(ServiceError::Unauthorized) => {
            FlashMessage::error("Permission denied.").send();
            return redirect("/na");
        }
        Err(ServiceError::Form(message)) | Err(ServiceError::TypeConstraint(message)) => {
            FlashMessage::error(message).send();
        }
        Err(err) => {
            log::error!("Failed to add vendor: {err}");
            FlashMessage::error("Failed to add the vendor.").send();
        }
    }
    redirect("/procurement/vendors")
}

#[get("/procurement/vendors/{vendor_id}/performance")]
pub async fn vendor_performance(
    vendor_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    json_result(procurement_service::vendor_performance(
        repo.get_ref(),
        &user,
        vendor_id.into_inner(),
    ))
}
