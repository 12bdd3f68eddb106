//! Middleware shared by the HTML scope.

use actix_web::dev::ServiceResponse;
use actix_web::http::{StatusCode, header};
use actix_web::middleware::{ErrorHandlerResponse, ErrorHandlers};
use actix_web::{HttpResponse, web};

use crate::models::config::ServerConfig;

/// Turns `401 Unauthorized` responses into a redirect to the sign-in page.
pub fn redirect_unauthorized<B: 'static>() -> ErrorHandlers<B> {
    ErrorHandlers::new().handler(StatusCode::UNAUTHORIZED, redirect_to_signin)
}

fn redirect_to_signin<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let location = res
        .request()
        .app_data::<web::Data<ServerConfig>>()
        .map(|config| {
            format!(
                "{}/auth/signin",
                config.auth_service_url.trim_end_matches('/')
            )
        })
        .unwrap_or_else(|| "/auth/signin".to_string());

    let (req, _) = res.into_parts();
    let response = HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish();

    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, response).map_into_right_body(),
    ))
}
