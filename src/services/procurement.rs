//! Vendor management and the purchase order lifecycle.

use chrono::Utc;

use crate::domain::procurement::{
    ProcurementDashboard, PurchaseOrder, PurchaseOrderDetail, PurchaseOrderStatus, Vendor,
    VendorPerformance, VendorStatus,
};
use crate::domain::types::{PurchaseOrderId, VendorId};
use crate::dto::procurement::{
    ProcurementDashboardPageData, PurchaseOrderListPageData, VendorListPageData,
};
use crate::forms::DateFilterQuery;
use crate::forms::procurement::{
    PurchaseOrderFilter, PurchaseOrderFilterQuery, PurchaseOrderForm, PurchaseOrderPayload,
    VendorForm, VendorPayload, VendorSearchQuery,
};
use crate::forms::non_blank;
use crate::models::auth::AuthenticatedUser;
use crate::pagination::{DEFAULT_ITEMS_PER_PAGE, Paginated, Pagination};
use crate::query::DateRange;
use crate::repository::{ProcurementReader, ProcurementWriter, PurchaseOrderListQuery};
use crate::routes::{check_role, ensure_role};
use crate::services::{ServiceError, ServiceResult};
use crate::{PROCUREMENT_MANAGE, PROCUREMENT_VIEW};

const TOP_VENDORS: i64 = 5;

pub fn load_dashboard<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: &DateFilterQuery,
) -> ServiceResult<ProcurementDashboardPageData>
where
    R: ProcurementReader + ?Sized,
{
    ensure_role(user, PROCUREMENT_VIEW)?;

    let company_id = user.company_id()?;
    let range = DateRange::try_from(query)?;

    let dashboard = ProcurementDashboard {
        by_status: repo.spend_by_status(company_id, &range).map_err(|err| {
            log::error!("Failed to aggregate purchase orders: {err}");
            err
        })?,
        active_vendors: repo.count_active_vendors(company_id)?,
        on_time_rate: repo.delivery_stats(company_id, &range)?.on_time_rate(),
        top_vendors: repo.top_vendors_by_spend(company_id, &range, TOP_VENDORS)?,
    };

    Ok(ProcurementDashboardPageData { dashboard, range })
}

pub fn list_purchase_orders<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: PurchaseOrderFilterQuery,
) -> ServiceResult<PurchaseOrderListPageData>
where
    R: ProcurementReader + ?Sized,
{
    ensure_role(user, PROCUREMENT_VIEW)?;

    let company_id = user.company_id()?;
    let filter = PurchaseOrderFilter::try_from(query)?;

    let mut list_query = PurchaseOrderListQuery::new(company_id)
        .range(filter.range)
        .paginate(filter.page, DEFAULT_ITEMS_PER_PAGE);
    if let Some(status) = filter.status {
        list_query = list_query.status(status);
    }
    if let Some(vendor_id) = filter.vendor_id {
        list_query = list_query.vendor(vendor_id);
    }
    if let Some(search) = filter.search {
        list_query = list_query.search(search);
    }

    let (total, orders) = repo.list_purchase_orders(list_query).map_err(|err| {
        log::error!("Failed to list purchase orders: {err}");
        err
    })?;

    Ok(PurchaseOrderListPageData {
        purchase_orders: Paginated::new(
            orders,
            Pagination::new(filter.page, DEFAULT_ITEMS_PER_PAGE),
            total,
        ),
        vendors: repo.list_vendors(company_id, None)?,
        can_edit: check_role(PROCUREMENT_MANAGE, &user.roles),
    })
}

pub fn get_purchase_order<R>(
    repo: &R,
    user: &AuthenticatedUser,
    purchase_order_id: i32,
) -> ServiceResult<Option<PurchaseOrderDetail>>
where
    R: ProcurementReader + ?Sized,
{
    ensure_role(user, PROCUREMENT_VIEW)?;

    let detail =
        repo.get_purchase_order(PurchaseOrderId::new(purchase_order_id)?, user.company_id()?)?;
    Ok(detail)
}

pub fn list_vendors<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: VendorSearchQuery,
) -> ServiceResult<VendorListPageData>
where
    R: ProcurementReader + ?Sized,
{
    ensure_role(user, PROCUREMENT_VIEW)?;

    let search = non_blank(query.search);
    let vendors = repo
        .list_vendors(user.company_id()?, search.as_deref())
        .map_err(|err| {
            log::error!("Failed to list vendors: {err}");
            err
        })?;

    Ok(VendorListPageData {
        vendors,
        search,
        can_edit: check_role(PROCUREMENT_MANAGE, &user.roles),
    })
}

pub fn create_vendor<R>(repo: &R, user: &AuthenticatedUser, form: VendorForm) -> ServiceResult<Vendor>
where
    R: ProcurementWriter + ?Sized,
{
    ensure_role(user, PROCUREMENT_MANAGE)?;

    let payload = VendorPayload::try_from(form)?;
    let vendor = repo
        .create_vendor(&payload.into_domain(user.company_id()?))
        .map_err(|err| {
            log::error!("Failed to create vendor: {err}");
            err
        })?;

    Ok(vendor)
}

pub fn create_purchase_order<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: PurchaseOrderForm,
) -> ServiceResult<PurchaseOrderDetail>
where
    R: ProcurementReader + ProcurementWriter + ?Sized,
{
    ensure_role(user, PROCUREMENT_MANAGE)?;

    let payload = PurchaseOrderPayload::try_from(form)?;
    let company_id = user.company_id()?;

    match repo.get_vendor(payload.vendor_id, company_id)? {
        Some(vendor) if vendor.status == VendorStatus::Active => {}
        Some(_) => return Err(ServiceError::Form("vendor is inactive".into())),
        None => return Err(ServiceError::Form("vendor not found".into())),
    }

    let today = Utc::now().date_naive();
    let detail = repo
        .create_purchase_order(&payload.into_domain(company_id, today))
        .map_err(|err| {
            log::error!("Failed to create purchase order: {err}");
            err
        })?;

    log::info!(
        "Created purchase order {} for company {company_id}",
        detail.order.po_number
    );
    Ok(detail)
}

fn transition<R>(
    repo: &R,
    user: &AuthenticatedUser,
    purchase_order_id: i32,
    next: PurchaseOrderStatus,
) -> ServiceResult<PurchaseOrder>
where
    R: ProcurementReader + ProcurementWriter + ?Sized,
{
    ensure_role(user, PROCUREMENT_MANAGE)?;

    let company_id = user.company_id()?;
    let detail = repo
        .get_purchase_order(PurchaseOrderId::new(purchase_order_id)?, company_id)?
        .ok_or(ServiceError::NotFound)?;
    let current = detail.order.status;

    if !current.can_transition_to(next) {
        return Err(ServiceError::Conflict(format!(
            "cannot move a purchase order from {current} to {next}"
        )));
    }

    let received_date =
        (next == PurchaseOrderStatus::Received).then(|| Utc::now().date_naive());
    let updated = repo
        .update_purchase_order_status(detail.order.id, company_id, current, next, received_date)
        .map_err(|err| {
            log::error!("Failed to update purchase order {purchase_order_id}: {err}");
            err
        })?;

    log::info!("Purchase order {} is now {next}", updated.po_number);
    Ok(updated)
}

pub fn approve_purchase_order<R>(
    repo: &R,
    user: &AuthenticatedUser,
    purchase_order_id: i32,
) -> ServiceResult<PurchaseOrder>
where
    R: ProcurementReader + ProcurementWriter + ?Sized,
{
    transition(repo, user, purchase_order_id, PurchaseOrderStatus::Approved)
}

pub fn cancel_purchase_order<R>(
    repo: &R,
    user: &AuthenticatedUser,
    purchase_order_id: i32,
) -> ServiceResult<PurchaseOrder>
where
    R: ProcurementReader + ProcurementWriter + ?Sized,
{
    transition(repo, user, purchase_order_id, PurchaseOrderStatus::Cancelled)
}

pub fn receive_purchase_order<R>(
    repo: &R,
    user: &AuthenticatedUser,
    purchase_order_id: i32,
) -> ServiceResult<PurchaseOrder>
where
    R: ProcurementReader + ProcurementWriter + ?Sized,
{
    transition(repo, user, purchase_order_id, PurchaseOrderStatus::Received)
}

pub fn vendor_performance<R>(
    repo: &R,
    user: &AuthenticatedUser,
    vendor_id: i32,
) -> ServiceResult<Option<VendorPerformance>>
where
    R: ProcurementReader + ?Sized,
{
    ensure_role(user, PROCUREMENT_VIEW)?;

    let company_id = user.company_id()?;
    let vendor_id = VendorId::new(vendor_id)?;
    let Some(vendor) = repo.get_vendor(vendor_id, company_id)? else {
        return Ok(None);
    };

    let stats = repo.vendor_order_stats(vendor_id, company_id)?;
    Ok(Some(VendorPerformance::new(vendor, stats)))
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::domain::procurement::{DeliveryStats, PurchaseOrderItem, VendorOrderStats};
    use crate::domain::types::CompanyId;
    use crate::repository::mock::MockRepository;
    use chrono::NaiveDate;

    fn buyer() -> AuthenticatedUser {
        AuthenticatedUser {
            sub: "4".into(),
            email: "buyer@example.com".into(),
            name: "Buyer".into(),
            company_id: 3,
            roles: vec![PROCUREMENT_VIEW.to_string(), PROCUREMENT_MANAGE.to_string()],
            exp: 0,
        }
    }

    fn timestamp() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 2, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn vendor(status: VendorStatus) -> Vendor {
        Vendor {
            id: VendorId::new(2).unwrap(),
            company_id: CompanyId::new(3).unwrap(),
            name: "Acme".into(),
            email: None,
            phone: None,
            rating: 4,
            status,
            created_at: timestamp(),
        }
    }

    fn detail(status: PurchaseOrderStatus) -> PurchaseOrderDetail {
        PurchaseOrderDetail {
            order: PurchaseOrder {
                id: PurchaseOrderId::new(9).unwrap(),
                company_id: CompanyId::new(3).unwrap(),
                vendor_id: VendorId::new(2).unwrap(),
                po_number: "PO-20250201-9".into(),
                status,
                total_amount: 50.0,
                order_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                expected_date: None,
                received_date: None,
                created_at: timestamp(),
            },
            vendor_name: "Acme".into(),
            items: vec![PurchaseOrderItem {
                id: 1,
                purchase_order_id: PurchaseOrderId::new(9).unwrap(),
                description: "Bolts".into(),
                quantity: 200.0,
                unit_price: 0.25,
            }],
        }
    }

    fn order_form() -> PurchaseOrderForm {
        PurchaseOrderForm {
            vendor_id: 2,
            expected_date: None,
            description: vec!["Bolts".into()],
            quantity: vec!["200".into()],
            unit_price: vec!["0.25".into()],
        }
    }

    #[test]
    fn inactive_vendor_cannot_receive_orders() {
        let mut repo = MockRepository::new();
        repo.expect_get_vendor()
            .returning(|_, _| Ok(Some(vendor(VendorStatus::Inactive))));
        repo.expect_create_purchase_order().times(0);

        let result = create_purchase_order(&repo, &buyer(), order_form());

        assert!(matches!(result, Err(ServiceError::Form(_))));
    }

    #[test]
    fn purchase_order_total_is_passed_to_repository() {
        let mut repo = MockRepository::new();
        repo.expect_get_vendor()
            .returning(|_, _| Ok(Some(vendor(VendorStatus::Active))));
        repo.expect_create_purchase_order()
            .withf(|order| order.total_amount() == 50.0 && order.items.len() == 1)
            .times(1)
            .returning(|_| Ok(detail(PurchaseOrderStatus::Draft)));

        let created = create_purchase_order(&repo, &buyer(), order_form()).unwrap();

        assert_eq!(created.order.status, PurchaseOrderStatus::Draft);
    }

    #[test]
    fn receiving_a_draft_conflicts() {
        let mut repo = MockRepository::new();
        repo.expect_get_purchase_order()
            .returning(|_, _| Ok(Some(detail(PurchaseOrderStatus::Draft))));
        repo.expect_update_purchase_order_status().times(0);

        let result = receive_purchase_order(&repo, &buyer(), 9);

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn receiving_sets_the_received_date() {
        let mut repo = MockRepository::new();
        repo.expect_get_purchase_order()
            .returning(|_, _| Ok(Some(detail(PurchaseOrderStatus::Approved))));
        repo.expect_update_purchase_order_status()
            .withf(|_, _, from, to, date| {
                *from == PurchaseOrderStatus::Approved
                    && *to == PurchaseOrderStatus::Received
                    && date.is_some()
            })
            .times(1)
            .returning(|_, _, _, _, _| {
                let mut order = detail(PurchaseOrderStatus::Received).order;
                order.received_date = Some(Utc::now().date_naive());
                Ok(order)
            });

        let order = receive_purchase_order(&repo, &buyer(), 9).unwrap();

        assert!(order.received_date.is_some());
    }

    #[test]
    fn approving_a_missing_order_is_not_found() {
        let mut repo = MockRepository::new();
        repo.expect_get_purchase_order().returning(|_, _| Ok(None));

        let result = approve_purchase_order(&repo, &buyer(), 9);

        assert!(matches!(result, Err(ServiceError::NotFound)));
    }

    #[test]
    fn vendor_performance_combines_stats() {
        let mut repo = MockRepository::new();
        repo.expect_get_vendor()
            .returning(|_, _| Ok(Some(vendor(VendorStatus::Active))));
        repo.expect_vendor_order_stats().returning(|_, _| {
            Ok(VendorOrderStats {
                orders: 4,
                total_spend: 1200.0,
                delivery: DeliveryStats {
                    received: 2,
                    on_time: 2,
                },
                avg_lead_time_days: Some(3.0),
            })
        });

        let performance = vendor_performance(&repo, &buyer(), 2).unwrap().unwrap();

        assert_eq!(performance.on_time_rate, Some(100.0));
        assert_eq!(performance.orders, 4);
    }

    #[test]
    fn viewer_cannot_create_vendors() {
        let repo = MockRepository::new();
        let mut user = buyer();
        user.roles = vec![PROCUREMENT_VIEW.to_string()];

        let result = create_vendor(
            &repo,
            &user,
            VendorForm {
                name: "Acme".into(),
                email: None,
                phone: None,
                rating: 3,
            },
        );

        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }
}
