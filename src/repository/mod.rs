//! Persistence traits and their Diesel implementation.
//!
//! Each ERP module exposes a `*Reader`/`*Writer` trait pair. A single
//! [`DieselRepository`] implements all of them so services can ask for
//! exactly the capabilities they need (`R: ManufacturingReader + ?Sized`)
//! and tests can substitute [`mock::MockRepository`].

use chrono::{NaiveDate, NaiveDateTime};

use crate::db::{DbConnection, DbPool};
use crate::domain::api_marketplace::{
    Api, ApiKey, ApiStatus, Application, NewApi, NewApiKey, NewApiUsage, NewApplication,
    UsageSummary,
};
use crate::domain::documentation::{
    NewTutorial, Tutorial, TutorialDifficulty, TutorialStats, UpdateTutorial,
};
use crate::domain::form_manager::{
    Form, FormDetail, FormField, FormStatus, FormSubmission, NewForm, NewFormField,
    NewFormSubmission,
};
use crate::domain::manufacturing::{
    BillOfMaterials, BomDetail, NewBillOfMaterials, NewWorkOrder, ProductionSummary, WorkOrder,
    WorkOrderStatus,
};
use crate::domain::procurement::{
    DeliveryStats, NewPurchaseOrder, NewVendor, PurchaseOrder, PurchaseOrderDetail,
    PurchaseOrderStatus, SpendByStatus, Vendor, VendorOrderStats,
};
use crate::domain::quality_management::{
    Capa, CapaStatus, CheckResult, NewCapa, NewQualityAudit, NewQualityCheck, NonConformance,
    NonConformanceStatus, QualityAudit, QualityCheck, QualitySummary, RecordedCheck, Severity,
};
use crate::domain::reporting::{
    Dashboard, NewReport, NewReportSchedule, Report, ReportKind, ReportSchedule,
    SaveDashboard,
};
use crate::domain::security_features::{
    AuditLog, EncryptionKey, NewAuditLog, NewEncryptionKey,
};
use crate::domain::stats::{LabelCount, LabelValue};
use crate::domain::testing::{NewTestRun, TestRun, TestRunStatus, TestType, TestTypeStats};
use crate::domain::types::{
    ApiId, ApiKeyId, ApplicationId, AuditId, BomId, CapaId, CompanyId, EncryptionKeyId,
    FeedbackId, FormId, NonConformanceId, NotificationId, PurchaseOrderId, QualityCheckId,
    ReportId, ScheduleId, TestRunId, TutorialId, UserId, VendorId, WorkOrderId,
};
use crate::domain::user_experience::{
    Feedback, FeedbackStatus, FeedbackSummary, NewFeedback, NewNotification, Notification,
    UserPreferences,
};
use crate::pagination::Pagination;
use crate::query::DateRange;
use crate::repository::errors::RepositoryResult;

pub mod api_marketplace;
pub mod documentation;
pub mod errors;
pub mod form_manager;
pub mod manufacturing;
#[cfg(feature = "test-mocks")]
pub mod mock;
pub mod procurement;
pub mod quality_management;
pub mod reporting;
pub mod security_features;
pub mod testing;
pub mod user_experience;

/// Diesel-backed repository shared by every module.
#[derive(Clone)]
pub struct DieselRepository {
    pool: DbPool,
}

impl DieselRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> RepositoryResult<DbConnection> {
        Ok(self.pool.get()?)
    }
}

// ---------------------------------------------------------------------------
// API marketplace
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ApiListQuery {
    pub company_id: CompanyId,
    pub status: Option<ApiStatus>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub pagination: Pagination,
}

impl ApiListQuery {
    pub fn new(company_id: CompanyId) -> Self {
        Self {
            company_id,
            status: None,
            category: None,
            search: None,
            pagination: Pagination::default(),
        }
    }

    pub fn status(mut self, status: ApiStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Pagination::new(page, per_page);
        self
    }
}

pub trait ApiMarketplaceReader {
    fn list_apis(&self, query: ApiListQuery) -> RepositoryResult<(usize, Vec<Api>)>;
    fn get_api(&self, id: ApiId, company_id: CompanyId) -> RepositoryResult<Option<Api>>;
    fn get_application(
        &self,
        id: ApplicationId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<Application>>;
    fn list_applications(
        &self,
        company_id: CompanyId,
        developer_id: Option<UserId>,
    ) -> RepositoryResult<Vec<Application>>;
    fn list_api_keys(
        &self,
        application_id: ApplicationId,
        company_id: CompanyId,
    ) -> RepositoryResult<Vec<ApiKey>>;
    fn get_api_key(&self, id: ApiKeyId, company_id: CompanyId) -> RepositoryResult<Option<ApiKey>>;
    fn find_api_key_by_hash(&self, key_hash: &str) -> RepositoryResult<Option<ApiKey>>;
    fn api_counts_by_status(&self, company_id: CompanyId) -> RepositoryResult<Vec<LabelCount>>;
    fn api_counts_by_category(&self, company_id: CompanyId) -> RepositoryResult<Vec<LabelCount>>;
    fn usage_summary(
        &self,
        company_id: CompanyId,
        range: &DateRange,
    ) -> RepositoryResult<UsageSummary>;
    fn top_apis_by_calls(
        &self,
        company_id: CompanyId,
        range: &DateRange,
        limit: i64,
    ) -> RepositoryResult<Vec<LabelCount>>;
}

pub trait ApiMarketplaceWriter {
    fn create_api(&self, api: &NewApi) -> RepositoryResult<Api>;
    fn create_application(&self, application: &NewApplication) -> RepositoryResult<Application>;
    fn create_api_key(&self, key: &NewApiKey) -> RepositoryResult<ApiKey>;
    /// Revokes an active key. A revoked one yields `Conflict`.
    fn revoke_api_key(
        &self,
        id: ApiKeyId,
        company_id: CompanyId,
        revoked_at: NaiveDateTime,
    ) -> RepositoryResult<ApiKey>;
    fn record_api_usage(&self, usage: &NewApiUsage) -> RepositoryResult<()>;
}

// ---------------------------------------------------------------------------
// Documentation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TutorialListQuery {
    pub company_id: CompanyId,
    pub category: Option<String>,
    pub difficulty: Option<TutorialDifficulty>,
    pub search: Option<String>,
    /// Hide drafts from readers who cannot edit tutorials.
    pub published_only: bool,
    pub pagination: Pagination,
}

impl TutorialListQuery {
    pub fn new(company_id: CompanyId) -> Self {
        Self {
            company_id,
            category: None,
            difficulty: None,
            search: None,
            published_only: false,
            pagination: Pagination::default(),
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn difficulty(mut self, difficulty: TutorialDifficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn published_only(mut self) -> Self {
        self.published_only = true;
        self
    }

    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Pagination::new(page, per_page);
        self
    }
}

pub trait DocumentationReader {
    fn list_tutorials(&self, query: TutorialListQuery) -> RepositoryResult<(usize, Vec<Tutorial>)>;
    fn get_tutorial(
        &self,
        id: TutorialId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<Tutorial>>;
    fn tutorial_completion(
        &self,
        id: TutorialId,
        user_id: UserId,
    ) -> RepositoryResult<Option<NaiveDateTime>>;
    fn tutorial_counts_by_category(&self, company_id: CompanyId)
    -> RepositoryResult<Vec<LabelCount>>;
    fn tutorial_stats(&self, company_id: CompanyId) -> RepositoryResult<TutorialStats>;
    fn most_viewed_tutorials(
        &self,
        company_id: CompanyId,
        limit: i64,
    ) -> RepositoryResult<Vec<Tutorial>>;
}

pub trait DocumentationWriter {
    fn create_tutorial(&self, tutorial: &NewTutorial) -> RepositoryResult<Tutorial>;
    fn update_tutorial(
        &self,
        id: TutorialId,
        company_id: CompanyId,
        update: &UpdateTutorial,
    ) -> RepositoryResult<Tutorial>;
    fn increment_tutorial_views(&self, id: TutorialId, company_id: CompanyId)
    -> RepositoryResult<()>;
    /// Records completion once and returns the stored timestamp.
    fn complete_tutorial(
        &self,
        id: TutorialId,
        user_id: UserId,
        company_id: CompanyId,
        completed_at: NaiveDateTime,
    ) -> RepositoryResult<NaiveDateTime>;
}

// ---------------------------------------------------------------------------
// Form manager
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FormListQuery {
    pub company_id: CompanyId,
    pub status: Option<FormStatus>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub pagination: Pagination,
}

impl FormListQuery {
    pub fn new(company_id: CompanyId) -> Self {
        Self {
            company_id,
            status: None,
            category: None,
            search: None,
            pagination: Pagination::default(),
        }
    }

    pub fn status(mut self, status: FormStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Pagination::new(page, per_page);
        self
    }
}

pub trait FormManagerReader {
    fn list_forms(&self, query: FormListQuery) -> RepositoryResult<(usize, Vec<Form>)>;
    fn get_form(&self, id: FormId, company_id: CompanyId) -> RepositoryResult<Option<Form>>;
    /// Form with settings and fields ordered by position.
    fn get_form_detail(
        &self,
        id: FormId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<FormDetail>>;
    fn has_submitted(&self, form_id: FormId, user_id: UserId) -> RepositoryResult<bool>;
    fn list_submissions(
        &self,
        form_id: FormId,
        company_id: CompanyId,
        pagination: Pagination,
    ) -> RepositoryResult<(usize, Vec<FormSubmission>)>;
    fn all_submissions(
        &self,
        form_id: FormId,
        company_id: CompanyId,
    ) -> RepositoryResult<Vec<FormSubmission>>;
    fn form_counts_by_status(&self, company_id: CompanyId) -> RepositoryResult<Vec<LabelCount>>;
    fn count_submissions_since(
        &self,
        company_id: CompanyId,
        since: NaiveDateTime,
    ) -> RepositoryResult<i64>;
    fn top_forms_by_submissions(
        &self,
        company_id: CompanyId,
        limit: i64,
    ) -> RepositoryResult<Vec<LabelCount>>;
}

pub trait FormManagerWriter {
    /// Inserts the form, its settings and the template's fields atomically.
    fn create_form(&self, form: &NewForm) -> RepositoryResult<FormDetail>;
    /// Appends the field after the current last position.
    fn add_form_field(&self, field: &NewFormField) -> RepositoryResult<FormField>;
    fn update_form_status(
        &self,
        id: FormId,
        company_id: CompanyId,
        status: FormStatus,
        updated_at: NaiveDateTime,
    ) -> RepositoryResult<Form>;
    /// Removes the form together with its submissions, fields and settings.
    fn delete_form(&self, id: FormId, company_id: CompanyId) -> RepositoryResult<()>;
    fn create_submission(
        &self,
        submission: &NewFormSubmission,
    ) -> RepositoryResult<FormSubmission>;
}

// ---------------------------------------------------------------------------
// Manufacturing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WorkOrderListQuery {
    pub company_id: CompanyId,
    pub status: Option<WorkOrderStatus>,
    /// Filters `created_at`.
    pub range: DateRange,
    pub search: Option<String>,
    pub pagination: Pagination,
}

impl WorkOrderListQuery {
    pub fn new(company_id: CompanyId) -> Self {
        Self {
            company_id,
            status: None,
            range: DateRange::default(),
            search: None,
            pagination: Pagination::default(),
        }
    }

    pub fn status(mut self, status: WorkOrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn range(mut self, range: DateRange) -> Self {
        self.range = range;
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Pagination::new(page, per_page);
        self
    }
}

pub trait ManufacturingReader {
    fn list_work_orders(
        &self,
        query: WorkOrderListQuery,
    ) -> RepositoryResult<(usize, Vec<WorkOrder>)>;
    fn get_work_order(
        &self,
        id: WorkOrderId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<WorkOrder>>;
    fn work_order_counts_by_status(
        &self,
        company_id: CompanyId,
        range: &DateRange,
    ) -> RepositoryResult<Vec<LabelCount>>;
    fn production_summary(
        &self,
        company_id: CompanyId,
        range: &DateRange,
    ) -> RepositoryResult<ProductionSummary>;
    /// Open orders whose due date is before `today`.
    fn count_overdue_work_orders(
        &self,
        company_id: CompanyId,
        today: NaiveDate,
    ) -> RepositoryResult<i64>;
    fn list_boms(&self, company_id: CompanyId) -> RepositoryResult<Vec<BillOfMaterials>>;
    fn get_bom(&self, id: BomId, company_id: CompanyId) -> RepositoryResult<Option<BomDetail>>;
}

pub trait ManufacturingWriter {
    /// Inserts the order and assigns its `WO-<date>-<id>` number.
    fn create_work_order(&self, order: &NewWorkOrder) -> RepositoryResult<WorkOrder>;
    /// Adds the reported units to the stored totals in one immediate
    /// transaction. A closed or on-hold order yields `Conflict`.
    fn record_work_order_production(
        &self,
        id: WorkOrderId,
        company_id: CompanyId,
        completed: i32,
        scrapped: i32,
    ) -> RepositoryResult<WorkOrder>;
    /// Moves the order only while it still has status `from`.
    fn update_work_order_status(
        &self,
        id: WorkOrderId,
        company_id: CompanyId,
        from: WorkOrderStatus,
        to: WorkOrderStatus,
    ) -> RepositoryResult<WorkOrder>;
    /// Inserts the BOM header and its items atomically.
    fn create_bom(&self, bom: &NewBillOfMaterials) -> RepositoryResult<BomDetail>;
}

// ---------------------------------------------------------------------------
// Procurement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PurchaseOrderListQuery {
    pub company_id: CompanyId,
    pub status: Option<PurchaseOrderStatus>,
    pub vendor_id: Option<VendorId>,
    /// Filters `order_date`.
    pub range: DateRange,
    pub search: Option<String>,
    pub pagination: Pagination,
}

impl PurchaseOrderListQuery {
    pub fn new(company_id: CompanyId) -> Self {
        Self {
            company_id,
            status: None,
            vendor_id: None,
            range: DateRange::default(),
            search: None,
            pagination: Pagination::default(),
        }
    }

    pub fn status(mut self, status: PurchaseOrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn vendor(mut self, vendor_id: VendorId) -> Self {
        self.vendor_id = Some(vendor_id);
        self
    }

    pub fn range(mut self, range: DateRange) -> Self {
        self.range = range;
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Pagination::new(page, per_page);
        self
    }
}

pub trait ProcurementReader {
    fn list_purchase_orders(
        &self,
        query: PurchaseOrderListQuery,
    ) -> RepositoryResult<(usize, Vec<PurchaseOrder>)>;
    fn get_purchase_order(
        &self,
        id: PurchaseOrderId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<PurchaseOrderDetail>>;
    fn list_vendors(
        &self,
        company_id: CompanyId,
        search: Option<&str>,
    ) -> RepositoryResult<Vec<Vendor>>;
    fn get_vendor(&self, id: VendorId, company_id: CompanyId)
    -> RepositoryResult<Option<Vendor>>;
    fn spend_by_status(
        &self,
        company_id: CompanyId,
        range: &DateRange,
    ) -> RepositoryResult<Vec<SpendByStatus>>;
    fn count_active_vendors(&self, company_id: CompanyId) -> RepositoryResult<i64>;
    fn delivery_stats(
        &self,
        company_id: CompanyId,
        range: &DateRange,
    ) -> RepositoryResult<DeliveryStats>;
    /// Vendors ranked by the value of their non-cancelled orders.
    fn top_vendors_by_spend(
        &self,
        company_id: CompanyId,
        range: &DateRange,
        limit: i64,
    ) -> RepositoryResult<Vec<LabelValue>>;
    fn vendor_order_stats(
        &self,
        vendor_id: VendorId,
        company_id: CompanyId,
    ) -> RepositoryResult<VendorOrderStats>;
}

pub trait ProcurementWriter {
    fn create_vendor(&self, vendor: &NewVendor) -> RepositoryResult<Vendor>;
    /// Inserts the order with its lines and assigns its `PO-<date>-<id>` number.
    fn create_purchase_order(
        &self,
        order: &NewPurchaseOrder,
    ) -> RepositoryResult<PurchaseOrderDetail>;
    /// Moves the order only while it still has status `from`.
    fn update_purchase_order_status(
        &self,
        id: PurchaseOrderId,
        company_id: CompanyId,
        from: PurchaseOrderStatus,
        to: PurchaseOrderStatus,
        received_date: Option<NaiveDate>,
    ) -> RepositoryResult<PurchaseOrder>;
}

// ---------------------------------------------------------------------------
// Quality management
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct QualityCheckListQuery {
    pub company_id: CompanyId,
    pub result: Option<CheckResult>,
    pub check_type: Option<String>,
    /// Filters `checked_at`.
    pub range: DateRange,
    pub pagination: Pagination,
}

impl QualityCheckListQuery {
    pub fn new(company_id: CompanyId) -> Self {
        Self {
            company_id,
            result: None,
            check_type: None,
            range: DateRange::default(),
            pagination: Pagination::default(),
        }
    }

    pub fn result(mut self, result: CheckResult) -> Self {
        self.result = Some(result);
        self
    }

    pub fn check_type(mut self, check_type: impl Into<String>) -> Self {
        self.check_type = Some(check_type.into());
        self
    }

    pub fn range(mut self, range: DateRange) -> Self {
        self.range = range;
        self
    }

    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Pagination::new(page, per_page);
        self
    }
}

#[derive(Debug, Clone)]
pub struct NonConformanceListQuery {
    pub company_id: CompanyId,
    pub status: Option<NonConformanceStatus>,
    pub severity: Option<Severity>,
    pub pagination: Pagination,
}

impl NonConformanceListQuery {
    pub fn new(company_id: CompanyId) -> Self {
        Self {
            company_id,
            status: None,
            severity: None,
            pagination: Pagination::default(),
        }
    }

    pub fn status(mut self, status: NonConformanceStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Pagination::new(page, per_page);
        self
    }
}

pub trait QualityManagementReader {
    fn list_quality_checks(
        &self,
        query: QualityCheckListQuery,
    ) -> RepositoryResult<(usize, Vec<QualityCheck>)>;
    fn quality_summary(
        &self,
        company_id: CompanyId,
        range: &DateRange,
    ) -> RepositoryResult<QualitySummary>;
    fn open_non_conformances_by_severity(
        &self,
        company_id: CompanyId,
    ) -> RepositoryResult<Vec<LabelCount>>;
    fn list_non_conformances(
        &self,
        query: NonConformanceListQuery,
    ) -> RepositoryResult<(usize, Vec<NonConformance>)>;
    fn get_non_conformance(
        &self,
        id: NonConformanceId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<NonConformance>>;
    fn list_audits(&self, company_id: CompanyId) -> RepositoryResult<Vec<QualityAudit>>;
    /// Scheduled audits on or after `today`, soonest first.
    fn upcoming_audits(
        &self,
        company_id: CompanyId,
        today: NaiveDate,
        limit: i64,
    ) -> RepositoryResult<Vec<QualityAudit>>;
    fn get_audit(&self, id: AuditId, company_id: CompanyId)
    -> RepositoryResult<Option<QualityAudit>>;
    fn list_capas(&self, company_id: CompanyId) -> RepositoryResult<Vec<Capa>>;
    fn get_capa(&self, id: CapaId, company_id: CompanyId) -> RepositoryResult<Option<Capa>>;
    fn count_overdue_capas(&self, company_id: CompanyId, today: NaiveDate)
    -> RepositoryResult<i64>;
}

pub trait QualityManagementWriter {
    /// Inserts the check and, for a failure, its non-conformance atomically.
    fn create_quality_check(&self, check: &NewQualityCheck) -> RepositoryResult<RecordedCheck>;
    /// Closes an open non-conformance. A closed one yields `Conflict`.
    fn close_non_conformance(
        &self,
        id: NonConformanceId,
        company_id: CompanyId,
        closed_at: NaiveDateTime,
    ) -> RepositoryResult<NonConformance>;
    fn create_audit(&self, audit: &NewQualityAudit) -> RepositoryResult<QualityAudit>;
    /// Completes a scheduled audit. A completed one yields `Conflict`.
    fn complete_audit(
        &self,
        id: AuditId,
        company_id: CompanyId,
        findings: Option<&str>,
        completed_at: NaiveDateTime,
    ) -> RepositoryResult<QualityAudit>;
    fn create_capa(&self, capa: &NewCapa) -> RepositoryResult<Capa>;
    /// Moves the CAPA only while it still has status `from`.
    fn update_capa_status(
        &self,
        id: CapaId,
        company_id: CompanyId,
        from: CapaStatus,
        to: CapaStatus,
    ) -> RepositoryResult<Capa>;
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ReportListQuery {
    pub company_id: CompanyId,
    pub category: Option<String>,
    pub search: Option<String>,
    pub pagination: Pagination,
}

impl ReportListQuery {
    pub fn new(company_id: CompanyId) -> Self {
        Self {
            company_id,
            category: None,
            search: None,
            pagination: Pagination::default(),
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Pagination::new(page, per_page);
        self
    }
}

pub trait ReportingReader {
    fn list_reports(&self, query: ReportListQuery) -> RepositoryResult<(usize, Vec<Report>)>;
    fn get_report(&self, id: ReportId, company_id: CompanyId)
    -> RepositoryResult<Option<Report>>;
    /// Runs the fixed aggregate behind `kind` for one company.
    fn run_report_query(
        &self,
        kind: ReportKind,
        company_id: CompanyId,
        range: &DateRange,
    ) -> RepositoryResult<Vec<LabelValue>>;
    fn report_counts_by_category(&self, company_id: CompanyId)
    -> RepositoryResult<Vec<LabelCount>>;
    fn list_schedules(&self, company_id: CompanyId) -> RepositoryResult<Vec<ReportSchedule>>;
    fn count_active_schedules(&self, company_id: CompanyId) -> RepositoryResult<i64>;
    fn count_due_schedules(
        &self,
        company_id: CompanyId,
        now: NaiveDateTime,
    ) -> RepositoryResult<i64>;
    /// Active schedules of every company whose `next_run` is not after `now`.
    fn due_schedules(&self, now: NaiveDateTime) -> RepositoryResult<Vec<ReportSchedule>>;
    fn list_dashboards(
        &self,
        company_id: CompanyId,
        user_id: UserId,
    ) -> RepositoryResult<Vec<Dashboard>>;
}

pub trait ReportingWriter {
    fn create_report(&self, report: &NewReport) -> RepositoryResult<Report>;
    fn create_schedule(&self, schedule: &NewReportSchedule) -> RepositoryResult<ReportSchedule>;
    fn mark_schedule_run(
        &self,
        id: ScheduleId,
        last_run: NaiveDateTime,
        next_run: NaiveDateTime,
    ) -> RepositoryResult<ReportSchedule>;
    /// Inserts or replaces the layout keyed by company, user and name.
    fn save_dashboard(
        &self,
        dashboard: &SaveDashboard,
        updated_at: NaiveDateTime,
    ) -> RepositoryResult<Dashboard>;
}

// ---------------------------------------------------------------------------
// Security features
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AuditLogListQuery {
    pub company_id: CompanyId,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub user_id: Option<UserId>,
    pub range: DateRange,
    pub pagination: Pagination,
}

impl AuditLogListQuery {
    pub fn new(company_id: CompanyId) -> Self {
        Self {
            company_id,
            action: None,
            entity_type: None,
            user_id: None,
            range: DateRange::default(),
            pagination: Pagination::default(),
        }
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn range(mut self, range: DateRange) -> Self {
        self.range = range;
        self
    }

    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Pagination::new(page, per_page);
        self
    }
}

pub trait SecurityFeaturesReader {
    fn list_audit_logs(
        &self,
        query: AuditLogListQuery,
    ) -> RepositoryResult<(usize, Vec<AuditLog>)>;
    /// Every matching entry, newest first, ignoring pagination.
    fn all_audit_logs(&self, query: AuditLogListQuery) -> RepositoryResult<Vec<AuditLog>>;
    fn audit_events_by_action(
        &self,
        company_id: CompanyId,
        since: NaiveDateTime,
    ) -> RepositoryResult<Vec<LabelCount>>;
    /// Users with the most audit entries since `since`, labelled by user id.
    fn most_active_users(
        &self,
        company_id: CompanyId,
        since: NaiveDateTime,
        limit: i64,
    ) -> RepositoryResult<Vec<LabelCount>>;
    fn list_encryption_keys(&self, company_id: CompanyId) -> RepositoryResult<Vec<EncryptionKey>>;
    fn get_encryption_key(
        &self,
        id: EncryptionKeyId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<EncryptionKey>>;
    fn count_active_keys(&self, company_id: CompanyId) -> RepositoryResult<i64>;
    /// Active keys whose last rotation (or creation) is at or before `cutoff`.
    fn count_keys_due_for_rotation(
        &self,
        company_id: CompanyId,
        cutoff: NaiveDateTime,
    ) -> RepositoryResult<i64>;
}

pub trait SecurityFeaturesWriter {
    fn record_audit_log(&self, entry: &NewAuditLog) -> RepositoryResult<AuditLog>;
    /// Fails with `ConstraintViolation` when the name is taken in the company.
    fn create_encryption_key(&self, key: &NewEncryptionKey) -> RepositoryResult<EncryptionKey>;
    /// Stores new material, bumps the version and stamps `rotated_at`.
    fn rotate_encryption_key(
        &self,
        id: EncryptionKeyId,
        company_id: CompanyId,
        wrapped_key: &str,
        rotated_at: NaiveDateTime,
    ) -> RepositoryResult<EncryptionKey>;
    fn revoke_encryption_key(
        &self,
        id: EncryptionKeyId,
        company_id: CompanyId,
    ) -> RepositoryResult<EncryptionKey>;
}

// ---------------------------------------------------------------------------
// Testing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TestRunListQuery {
    pub company_id: CompanyId,
    pub test_type: Option<TestType>,
    pub status: Option<TestRunStatus>,
    pub pagination: Pagination,
}

impl TestRunListQuery {
    pub fn new(company_id: CompanyId) -> Self {
        Self {
            company_id,
            test_type: None,
            status: None,
            pagination: Pagination::default(),
        }
    }

    pub fn test_type(mut self, test_type: TestType) -> Self {
        self.test_type = Some(test_type);
        self
    }

    pub fn status(mut self, status: TestRunStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Pagination::new(page, per_page);
        self
    }
}

pub trait TestingReader {
    fn list_test_runs(&self, query: TestRunListQuery) -> RepositoryResult<(usize, Vec<TestRun>)>;
    fn get_test_run(&self, id: TestRunId, company_id: CompanyId)
    -> RepositoryResult<Option<TestRun>>;
    fn test_type_stats(&self, company_id: CompanyId) -> RepositoryResult<Vec<TestTypeStats>>;
    fn recent_test_runs(&self, company_id: CompanyId, limit: i64)
    -> RepositoryResult<Vec<TestRun>>;
}

pub trait TestingWriter {
    fn create_test_run(&self, run: &NewTestRun) -> RepositoryResult<TestRun>;
}

// ---------------------------------------------------------------------------
// User experience
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FeedbackListQuery {
    pub company_id: CompanyId,
    pub category: Option<String>,
    pub status: Option<FeedbackStatus>,
    pub pagination: Pagination,
}

impl FeedbackListQuery {
    pub fn new(company_id: CompanyId) -> Self {
        Self {
            company_id,
            category: None,
            status: None,
            pagination: Pagination::default(),
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn status(mut self, status: FeedbackStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Pagination::new(page, per_page);
        self
    }
}

#[derive(Debug, Clone)]
pub struct NotificationListQuery {
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub unread_only: bool,
    pub pagination: Pagination,
}

impl NotificationListQuery {
    pub fn new(company_id: CompanyId, user_id: UserId) -> Self {
        Self {
            company_id,
            user_id,
            unread_only: false,
            pagination: Pagination::default(),
        }
    }

    pub fn unread_only(mut self, unread_only: bool) -> Self {
        self.unread_only = unread_only;
        self
    }

    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Pagination::new(page, per_page);
        self
    }
}

pub trait UserExperienceReader {
    fn list_feedback(&self, query: FeedbackListQuery) -> RepositoryResult<(usize, Vec<Feedback>)>;
    fn get_feedback(&self, id: FeedbackId, company_id: CompanyId)
    -> RepositoryResult<Option<Feedback>>;
    fn feedback_summary(&self, company_id: CompanyId) -> RepositoryResult<FeedbackSummary>;
    fn feedback_counts_by_category(&self, company_id: CompanyId)
    -> RepositoryResult<Vec<LabelCount>>;
    fn feedback_counts_by_status(&self, company_id: CompanyId)
    -> RepositoryResult<Vec<LabelCount>>;
    fn list_notifications(
        &self,
        query: NotificationListQuery,
    ) -> RepositoryResult<(usize, Vec<Notification>)>;
    fn count_unread_notifications(
        &self,
        company_id: CompanyId,
        user_id: UserId,
    ) -> RepositoryResult<i64>;
    fn get_preferences(
        &self,
        company_id: CompanyId,
        user_id: UserId,
    ) -> RepositoryResult<Option<UserPreferences>>;
}

pub trait UserExperienceWriter {
    fn create_feedback(&self, feedback: &NewFeedback) -> RepositoryResult<Feedback>;
    fn update_feedback_status(
        &self,
        id: FeedbackId,
        company_id: CompanyId,
        status: FeedbackStatus,
    ) -> RepositoryResult<Feedback>;
    fn create_notification(&self, notification: &NewNotification)
    -> RepositoryResult<Notification>;
    /// Marks one of the user's own notifications. `None` when it is not theirs.
    fn mark_notification_read(
        &self,
        id: NotificationId,
        company_id: CompanyId,
        user_id: UserId,
        read_at: NaiveDateTime,
    ) -> RepositoryResult<Option<Notification>>;
    /// Returns the number of notifications updated.
    fn mark_all_notifications_read(
        &self,
        company_id: CompanyId,
        user_id: UserId,
        read_at: NaiveDateTime,
    ) -> RepositoryResult<usize>;
    /// Inserts or replaces the row keyed by company and user.
    fn save_preferences(
        &self,
        preferences: &UserPreferences,
        updated_at: NaiveDateTime,
    ) -> RepositoryResult<UserPreferences>;
}
