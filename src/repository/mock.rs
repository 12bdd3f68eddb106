//! Mock repository implementations for isolating services in tests.

use chrono::{NaiveDate, NaiveDateTime};
use mockall::mock;

use crate::domain::api_marketplace::{
    Api, ApiKey, Application, NewApi, NewApiKey, NewApiUsage, NewApplication, UsageSummary,
};
use crate::domain::documentation::{NewTutorial, Tutorial, TutorialStats, UpdateTutorial};
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
    Capa, CapaStatus, NewCapa, NewQualityAudit, NewQualityCheck, NonConformance, QualityAudit,
    QualityCheck, QualitySummary, RecordedCheck,
};
use crate::domain::reporting::{
    Dashboard, NewReport, NewReportSchedule, Report, ReportKind, ReportSchedule, SaveDashboard,
};
use crate::domain::security_features::{AuditLog, EncryptionKey, NewAuditLog, NewEncryptionKey};
use crate::domain::stats::{LabelCount, LabelValue};
use crate::domain::testing::{NewTestRun, TestRun, TestTypeStats};
use crate::domain::types::{
    ApiId, ApiKeyId, ApplicationId, AuditId, BomId, CapaId, CompanyId, EncryptionKeyId, FeedbackId,
    FormId, NonConformanceId, NotificationId, PurchaseOrderId, ReportId, ScheduleId, TestRunId,
    TutorialId, UserId, VendorId, WorkOrderId,
};
use crate::domain::user_experience::{
    Feedback, FeedbackStatus, FeedbackSummary, NewFeedback, NewNotification, Notification,
    UserPreferences,
};
use crate::pagination::Pagination;
use crate::query::DateRange;
use crate::repository::errors::RepositoryResult;
use crate::repository::{
    ApiListQuery, ApiMarketplaceReader, ApiMarketplaceWriter, AuditLogListQuery,
    DocumentationReader, DocumentationWriter, FeedbackListQuery, FormListQuery, FormManagerReader,
    FormManagerWriter, ManufacturingReader, ManufacturingWriter, NonConformanceListQuery,
    NotificationListQuery, ProcurementReader, ProcurementWriter, PurchaseOrderListQuery,
    QualityCheckListQuery, QualityManagementReader, QualityManagementWriter, ReportListQuery,
    ReportingReader, ReportingWriter, SecurityFeaturesReader, SecurityFeaturesWriter,
    TestRunListQuery, TestingReader, TestingWriter, TutorialListQuery, UserExperienceReader,
    UserExperienceWriter, WorkOrderListQuery,
};

mock! {
    pub Repository {}

    impl ApiMarketplaceReader for Repository {
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

    impl ApiMarketplaceWriter for Repository {
        fn create_api(&self, api: &NewApi) -> RepositoryResult<Api>;
        fn create_application(&self, application: &NewApplication) -> RepositoryResult<Application>;
        fn create_api_key(&self, key: &NewApiKey) -> RepositoryResult<ApiKey>;
        fn revoke_api_key(
            &self,
            id: ApiKeyId,
            company_id: CompanyId,
            revoked_at: NaiveDateTime,
        ) -> RepositoryResult<ApiKey>;
        fn record_api_usage(&self, usage: &NewApiUsage) -> RepositoryResult<()>;
    }

    impl DocumentationReader for Repository {
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

    impl DocumentationWriter for Repository {
        fn create_tutorial(&self, tutorial: &NewTutorial) -> RepositoryResult<Tutorial>;
        fn update_tutorial(
            &self,
            id: TutorialId,
            company_id: CompanyId,
            update: &UpdateTutorial,
        ) -> RepositoryResult<Tutorial>;
        fn increment_tutorial_views(&self, id: TutorialId, company_id: CompanyId)
        -> RepositoryResult<()>;
        fn complete_tutorial(
            &self,
            id: TutorialId,
            user_id: UserId,
            company_id: CompanyId,
            completed_at: NaiveDateTime,
        ) -> RepositoryResult<NaiveDateTime>;
    }

    impl FormManagerReader for Repository {
        fn list_forms(&self, query: FormListQuery) -> RepositoryResult<(usize, Vec<Form>)>;
        fn get_form(&self, id: FormId, company_id: CompanyId) -> RepositoryResult<Option<Form>>;
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

    impl FormManagerWriter for Repository {
        fn create_form(&self, form: &NewForm) -> RepositoryResult<FormDetail>;
        fn add_form_field(&self, field: &NewFormField) -> RepositoryResult<FormField>;
        fn update_form_status(
            &self,
            id: FormId,
            company_id: CompanyId,
            status: FormStatus,
            updated_at: NaiveDateTime,
        ) -> RepositoryResult<Form>;
        fn delete_form(&self, id: FormId, company_id: CompanyId) -> RepositoryResult<()>;
        fn create_submission(
            &self,
            submission: &NewFormSubmission,
        ) -> RepositoryResult<FormSubmission>;
    }

    impl ManufacturingReader for Repository {
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
        fn count_overdue_work_orders(
            &self,
            company_id: CompanyId,
            today: NaiveDate,
        ) -> RepositoryResult<i64>;
        fn list_boms(&self, company_id: CompanyId) -> RepositoryResult<Vec<BillOfMaterials>>;
        fn get_bom(&self, id: BomId, company_id: CompanyId) -> RepositoryResult<Option<BomDetail>>;
    }

    impl ManufacturingWriter for Repository {
        fn create_work_order(&self, order: &NewWorkOrder) -> RepositoryResult<WorkOrder>;
        fn record_work_order_production(
            &self,
            id: WorkOrderId,
            company_id: CompanyId,
            completed: i32,
            scrapped: i32,
        ) -> RepositoryResult<WorkOrder>;
        fn update_work_order_status(
            &self,
            id: WorkOrderId,
            company_id: CompanyId,
            from: WorkOrderStatus,
            to: WorkOrderStatus,
        ) -> RepositoryResult<WorkOrder>;
        fn create_bom(&self, bom: &NewBillOfMaterials) -> RepositoryResult<BomDetail>;
    }

    impl ProcurementReader for Repository {
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

    impl ProcurementWriter for Repository {
        fn create_vendor(&self, vendor: &NewVendor) -> RepositoryResult<Vendor>;
        fn create_purchase_order(
            &self,
            order: &NewPurchaseOrder,
        ) -> RepositoryResult<PurchaseOrderDetail>;
        fn update_purchase_order_status(
            &self,
            id: PurchaseOrderId,
            company_id: CompanyId,
            from: PurchaseOrderStatus,
            to: PurchaseOrderStatus,
            received_date: Option<NaiveDate>,
        ) -> RepositoryResult<PurchaseOrder>;
    }

    impl QualityManagementReader for Repository {
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

    impl QualityManagementWriter for Repository {
        fn create_quality_check(&self, check: &NewQualityCheck) -> RepositoryResult<RecordedCheck>;
        fn close_non_conformance(
            &self,
            id: NonConformanceId,
            company_id: CompanyId,
            closed_at: NaiveDateTime,
        ) -> RepositoryResult<NonConformance>;
        fn create_audit(&self, audit: &NewQualityAudit) -> RepositoryResult<QualityAudit>;
        fn complete_audit(
            &self,
            id: AuditId,
            company_id: CompanyId,
            findings: Option<&str>,
            completed_at: NaiveDateTime,
        ) -> RepositoryResult<QualityAudit>;
        fn create_capa(&self, capa: &NewCapa) -> RepositoryResult<Capa>;
        fn update_capa_status(
            &self,
            id: CapaId,
            company_id: CompanyId,
            from: CapaStatus,
            to: CapaStatus,
        ) -> RepositoryResult<Capa>;
    }

    impl ReportingReader for Repository {
        fn list_reports(&self, query: ReportListQuery) -> RepositoryResult<(usize, Vec<Report>)>;
        fn get_report(&self, id: ReportId, company_id: CompanyId)
        -> RepositoryResult<Option<Report>>;
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
        fn due_schedules(&self, now: NaiveDateTime) -> RepositoryResult<Vec<ReportSchedule>>;
        fn list_dashboards(
            &self,
            company_id: CompanyId,
            user_id: UserId,
        ) -> RepositoryResult<Vec<Dashboard>>;
    }

    impl ReportingWriter for Repository {
        fn create_report(&self, report: &NewReport) -> RepositoryResult<Report>;
        fn create_schedule(&self, schedule: &NewReportSchedule) -> RepositoryResult<ReportSchedule>;
        fn mark_schedule_run(
            &self,
            id: ScheduleId,
            last_run: NaiveDateTime,
            next_run: NaiveDateTime,
        ) -> RepositoryResult<ReportSchedule>;
        fn save_dashboard(
            &self,
            dashboard: &SaveDashboard,
            updated_at: NaiveDateTime,
        ) -> RepositoryResult<Dashboard>;
    }

    impl SecurityFeaturesReader for Repository {
        fn list_audit_logs(
            &self,
            query: AuditLogListQuery,
        ) -> RepositoryResult<(usize, Vec<AuditLog>)>;
        fn all_audit_logs(&self, query: AuditLogListQuery) -> RepositoryResult<Vec<AuditLog>>;
        fn audit_events_by_action(
            &self,
            company_id: CompanyId,
            since: NaiveDateTime,
        ) -> RepositoryResult<Vec<LabelCount>>;
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
        fn count_keys_due_for_rotation(
            &self,
            company_id: CompanyId,
            cutoff: NaiveDateTime,
        ) -> RepositoryResult<i64>;
    }

    impl SecurityFeaturesWriter for Repository {
        fn record_audit_log(&self, entry: &NewAuditLog) -> RepositoryResult<AuditLog>;
        fn create_encryption_key(&self, key: &NewEncryptionKey) -> RepositoryResult<EncryptionKey>;
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

    impl TestingReader for Repository {
        fn list_test_runs(&self, query: TestRunListQuery) -> RepositoryResult<(usize, Vec<TestRun>)>;
        fn get_test_run(&self, id: TestRunId, company_id: CompanyId)
        -> RepositoryResult<Option<TestRun>>;
        fn test_type_stats(&self, company_id: CompanyId) -> RepositoryResult<Vec<TestTypeStats>>;
        fn recent_test_runs(&self, company_id: CompanyId, limit: i64)
        -> RepositoryResult<Vec<TestRun>>;
    }

    impl TestingWriter for Repository {
        fn create_test_run(&self, run: &NewTestRun) -> RepositoryResult<TestRun>;
    }

    impl UserExperienceReader for Repository {
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

    impl UserExperienceWriter for Repository {
        fn create_feedback(&self, feedback: &NewFeedback) -> RepositoryResult<Feedback>;
        fn update_feedback_status(
            &self,
            id: FeedbackId,
            company_id: CompanyId,
            status: FeedbackStatus,
        ) -> RepositoryResult<Feedback>;
        fn create_notification(&self, notification: &NewNotification)
        -> RepositoryResult<Notification>;
        fn mark_notification_read(
            &self,
            id: NotificationId,
            company_id: CompanyId,
            user_id: UserId,
            read_at: NaiveDateTime,
        ) -> RepositoryResult<Option<Notification>>;
        fn mark_all_notifications_read(
            &self,
            company_id: CompanyId,
            user_id: UserId,
            read_at: NaiveDateTime,
        ) -> RepositoryResult<usize>;
        fn save_preferences(
            &self,
            preferences: &UserPreferences,
            updated_at: NaiveDateTime,
        ) -> RepositoryResult<UserPreferences>;
    }
}
