//! Work order scheduling, production reporting and bills of materials.

use chrono::Utc;

use crate::domain::manufacturing::{
    BillOfMaterials, BomDetail, ManufacturingDashboard, WorkOrder, WorkOrderStatus,
};
use crate::domain::types::{BomId, WorkOrderId};
use crate::dto::manufacturing::{ManufacturingDashboardPageData, WorkOrderListPageData};
use crate::forms::DateFilterQuery;
use crate::forms::manufacturing::{
    BomForm, BomPayload, ProductionForm, WorkOrderFilter, WorkOrderFilterQuery, WorkOrderForm,
    WorkOrderPayload, WorkOrderStatusForm,
};
use crate::models::auth::AuthenticatedUser;
use crate::pagination::{DEFAULT_ITEMS_PER_PAGE, Paginated, Pagination};
use crate::query::DateRange;
use crate::repository::{ManufacturingReader, ManufacturingWriter, WorkOrderListQuery};
use crate::routes::{check_role, ensure_role};
use crate::services::{ServiceError, ServiceResult};
use crate::{MANUFACTURING_MANAGE, MANUFACTURING_VIEW};

pub fn load_dashboard<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: &DateFilterQuery,
) -> ServiceResult<ManufacturingDashboardPageData>
where
    R: ManufacturingReader + ?Sized,
{
    ensure_role(user, MANUFACTURING_VIEW)?;

    let company_id = user.company_id()?;
    let range = DateRange::try_from(query)?;
    let today = Utc::now().date_naive();

    let dashboard = ManufacturingDashboard {
        by_status: repo.work_order_counts_by_status(company_id, &range)?,
        production: repo.production_summary(company_id, &range).map_err(|err| {
            log::error!("Failed to summarize production: {err}");
            err
        })?,
        overdue: repo.count_overdue_work_orders(company_id, today)?,
    };

    Ok(ManufacturingDashboardPageData { dashboard, range })
}

pub fn list_work_orders<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: WorkOrderFilterQuery,
) -> ServiceResult<WorkOrderListPageData>
where
    R: ManufacturingReader + ?Sized,
{
    ensure_role(user, MANUFACTURING_VIEW)?;

    let company_id = user.company_id()?;
    let filter = WorkOrderFilter::try_from(query)?;

    let mut list_query = WorkOrderListQuery::new(company_id)
        .range(filter.range)
        .paginate(filter.page, DEFAULT_ITEMS_PER_PAGE);
    if let Some(status) = filter.status {
        list_query = list_query.status(status);
    }
    if let Some(search) = filter.search {
        list_query = list_query.search(search);
    }

    let (total, work_orders) = repo.list_work_orders(list_query).map_err(|err| {
        log::error!("Failed to list work orders: {err}");
        err
    })?;

    Ok(WorkOrderListPageData {
        work_orders: Paginated::new(
            work_orders,
            Pagination::new(filter.page, DEFAULT_ITEMS_PER_PAGE),
            total,
        ),
        boms: repo.list_boms(company_id)?,
        can_edit: check_role(MANUFACTURING_MANAGE, &user.roles),
    })
}

pub fn create_work_order<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: WorkOrderForm,
) -> ServiceResult<WorkOrder>
where
    R: ManufacturingReader + ManufacturingWriter + ?Sized,
{
    ensure_role(user, MANUFACTURING_MANAGE)?;

    let payload = WorkOrderPayload::try_from(form)?;
    let company_id = user.company_id()?;

    if let Some(bom_id) = payload.bom_id {
        if repo.get_bom(bom_id, company_id)?.is_none() {
            return Err(ServiceError::Form("bill of materials not found".into()));
        }
    }

    let order = repo
        .create_work_order(&payload.into_domain(company_id))
        .map_err(|err| {
            log::error!("Failed to create work order: {err}");
            err
        })?;

    log::info!("Created work order {} for company {company_id}", order.order_number);
    Ok(order)
}

/// Adds completed and scrapped units to an open work order.
pub fn record_production<R>(
    repo: &R,
    user: &AuthenticatedUser,
    work_order_id: i32,
    form: ProductionForm,
) -> ServiceResult<WorkOrder>
where
    R: ManufacturingWriter + ?Sized,
{
    ensure_role(user, MANUFACTURING_MANAGE)?;

    if form.completed < 0 || form.scrapped < 0 {
        return Err(ServiceError::Form("quantities must not be negative".into()));
    }
    if form.completed == 0 && form.scrapped == 0 {
        return Err(ServiceError::Form(
            "report at least one completed or scrapped unit".into(),
        ));
    }

    let updated = repo.record_work_order_production(
        WorkOrderId::new(work_order_id)?,
        user.company_id()?,
        form.completed,
        form.scrapped,
    )?;
    if updated.status == WorkOrderStatus::Completed {
        log::info!("Work order {} completed", updated.order_number);
    }

    Ok(updated)
}

pub fn update_work_order_status<R>(
    repo: &R,
    user: &AuthenticatedUser,
    work_order_id: i32,
    form: WorkOrderStatusForm,
) -> ServiceResult<WorkOrder>
where
    R: ManufacturingReader + ManufacturingWriter + ?Sized,
{
    ensure_role(user, MANUFACTURING_MANAGE)?;

    let next = WorkOrderStatus::try_from(form)?;
    let company_id = user.company_id()?;
    let order = repo
        .get_work_order(WorkOrderId::new(work_order_id)?, company_id)?
        .ok_or(ServiceError::NotFound)?;

    if !order.status.can_transition_to(next) {
        return Err(ServiceError::Conflict(format!(
            "cannot move a work order from {} to {next}",
            order.status
        )));
    }

    let updated = repo.update_work_order_status(order.id, company_id, order.status, next)?;
    Ok(updated)
}

pub fn create_bom<R>(repo: &R, user: &AuthenticatedUser, form: BomForm) -> ServiceResult<BomDetail>
where
    R: ManufacturingWriter + ?Sized,
{
    ensure_role(user, MANUFACTURING_MANAGE)?;

    let payload = BomPayload::try_from(form)?;
    let detail = repo
        .create_bom(&payload.into_domain(user.company_id()?))
        .map_err(|err| {
            log::error!("Failed to create bill of materials: {err}");
            err
        })?;

    Ok(detail)
}

pub fn get_bom<R>(
    repo: &R,
    user: &AuthenticatedUser,
    bom_id: i32,
) -> ServiceResult<Option<BomDetail>>
where
    R: ManufacturingReader + ?Sized,
{
    ensure_role(user, MANUFACTURING_VIEW)?;

    let detail = repo.get_bom(BomId::new(bom_id)?, user.company_id()?)?;
    Ok(detail)
}

pub fn list_boms<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<Vec<BillOfMaterials>>
where
    R: ManufacturingReader + ?Sized,
{
    ensure_role(user, MANUFACTURING_VIEW)?;

    let boms = repo.list_boms(user.company_id()?)?;
    Ok(boms)
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::domain::manufacturing::ProductionSummary;
    use crate::domain::types::CompanyId;
    use crate::repository::errors::RepositoryError;
    use crate::repository::mock::MockRepository;
    use chrono::NaiveDate;

    fn planner() -> AuthenticatedUser {
        AuthenticatedUser {
            sub: "2".into(),
            email: "planner@example.com".into(),
            name: "Planner".into(),
            company_id: 8,
            roles: vec![MANUFACTURING_VIEW.to_string(), MANUFACTURING_MANAGE.to_string()],
            exp: 0,
        }
    }

    fn order(status: WorkOrderStatus, completed: i32) -> WorkOrder {
        WorkOrder {
            id: WorkOrderId::new(5).unwrap(),
            company_id: CompanyId::new(8).unwrap(),
            order_number: "WO-20250110-5".into(),
            product_name: "Valve".into(),
            bom_id: None,
            quantity: 10,
            completed_quantity: completed,
            scrap_quantity: 0,
            status,
            due_date: None,
            created_at: NaiveDate::from_ymd_opt(2025, 1, 10)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn production_on_cancelled_order_conflicts() {
        let mut repo = MockRepository::new();
        repo.expect_record_work_order_production()
            .times(1)
            .returning(|_, _, _, _| {
                Err(RepositoryError::Conflict(
                    "cannot record production on a cancelled work order".into(),
                ))
            });

        let result = record_production(
            &repo,
            &planner(),
            5,
            ProductionForm {
                completed: 1,
                scrapped: 0,
            },
        );

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn empty_report_is_a_form_error() {
        let repo = MockRepository::new();

        let result = record_production(
            &repo,
            &planner(),
            5,
            ProductionForm {
                completed: 0,
                scrapped: 0,
            },
        );

        assert!(matches!(result, Err(ServiceError::Form(_))));
    }

    #[test]
    fn production_report_passes_deltas_to_the_repository() {
        let mut repo = MockRepository::new();
        repo.expect_get_work_order().times(0);
        repo.expect_record_work_order_production()
            .withf(|id, company_id, completed, scrapped| {
                id.get() == 5 && company_id.get() == 8 && *completed == 3 && *scrapped == 1
            })
            .times(1)
            .returning(|_, _, _, _| Ok(order(WorkOrderStatus::Completed, 10)));

        let updated = record_production(
            &repo,
            &planner(),
            5,
            ProductionForm {
                completed: 3,
                scrapped: 1,
            },
        )
        .unwrap();

        assert_eq!(updated.status, WorkOrderStatus::Completed);
    }

    #[test]
    fn illegal_transition_conflicts() {
        let mut repo = MockRepository::new();
        repo.expect_get_work_order()
            .returning(|_, _| Ok(Some(order(WorkOrderStatus::Planned, 0))));
        repo.expect_update_work_order_status().times(0);

        let result = update_work_order_status(
            &repo,
            &planner(),
            5,
            WorkOrderStatusForm {
                status: "completed".into(),
            },
        );

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn foreign_bom_is_rejected() {
        let mut repo = MockRepository::new();
        repo.expect_get_bom().returning(|_, _| Ok(None));
        repo.expect_create_work_order().times(0);

        let result = create_work_order(
            &repo,
            &planner(),
            WorkOrderForm {
                product_name: "Valve".into(),
                bom_id: Some("99".into()),
                quantity: 3,
                due_date: None,
            },
        );

        assert!(matches!(result, Err(ServiceError::Form(_))));
    }

    #[test]
    fn dashboard_reports_rates() {
        let mut repo = MockRepository::new();
        repo.expect_work_order_counts_by_status()
            .returning(|_, _| Ok(vec![]));
        repo.expect_production_summary()
            .returning(|_, _| Ok(ProductionSummary::from_totals(100, 80, 20)));
        repo.expect_count_overdue_work_orders()
            .returning(|_, _| Ok(2));

        let data = load_dashboard(&repo, &planner(), &DateFilterQuery::default()).unwrap();

        assert_eq!(data.dashboard.production.completion_rate, Some(80.0));
        assert_eq!(data.dashboard.production.scrap_rate, Some(20.0));
        assert_eq!(data.dashboard.overdue, 2);
    }
}
