use actix_web::http::StatusCode;
use actix_web_flash_messages::Level;
use erp_hub::routes::{alert_level_to_str, check_role, error_status};
use erp_hub::services::ServiceError;
use tera::Tera;

#[test]
fn test_alert_level_to_str_mappings() {
    assert_eq!(alert_level_to_str(&Level::Error), "danger");
    assert_eq!(alert_level_to_str(&Level::Warning), "warning");
    assert_eq!(alert_level_to_str(&Level::Success), "success");
    assert_eq!(alert_level_to_str(&Level::Info), "info");
    assert_eq!(alert_level_to_str(&Level::Debug), "info");
}

#[test]
fn test_admin_role_grants_every_permission() {
    let admin = vec![erp_hub::ADMIN_ROLE.to_string()];
    assert!(check_role(erp_hub::PROCUREMENT_MANAGE, &admin));
    assert!(check_role(erp_hub::SECURITY_VIEW, &admin));

    let viewer = vec![erp_hub::PROCUREMENT_VIEW.to_string()];
    assert!(check_role(erp_hub::PROCUREMENT_VIEW, &viewer));
    assert!(!check_role(erp_hub::PROCUREMENT_MANAGE, &viewer));
    assert!(!check_role(erp_hub::SECURITY_VIEW, &[]));
}

#[test]
fn test_json_error_statuses() {
    assert_eq!(error_status(&ServiceError::Unauthorized), StatusCode::FORBIDDEN);
    assert_eq!(error_status(&ServiceError::NotFound), StatusCode::NOT_FOUND);
    assert_eq!(
        error_status(&ServiceError::Form("bad".into())),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        error_status(&ServiceError::Conflict("taken".into())),
        StatusCode::CONFLICT
    );
}

#[test]
fn test_templates_parse() {
    let tera = Tera::new("templates/**/*").expect("templates should parse");
    for name in [
        "api_marketplace/dashboard.html",
        "documentation/tutorial.html",
        "form_manager/form.html",
        "manufacturing/work_orders.html",
        "procurement/purchase_order.html",
        "quality/non_conformances.html",
        "reporting/report.html",
        "security/dashboard.html",
        "testing/runs.html",
        "ux/notifications.html",
    ] {
        assert!(
            tera.get_template_names().any(|n| n == name),
            "missing template {name}"
        );
    }
}
