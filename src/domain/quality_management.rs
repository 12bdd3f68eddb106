//! Inspections, non-conformances, audits and corrective actions.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::stats::LabelCount;
use crate::domain::types::{
    AuditId, CapaId, CompanyId, Label, NonConformanceId, QualityCheckId, SanitizedText, Title,
    UserId, WorkOrderId, percentage, string_enum,
};

string_enum!(CheckResult {
    Pass => "pass",
    Fail => "fail",
    Conditional => "conditional",
});

string_enum!(Severity {
    Minor => "minor",
    Major => "major",
    Critical => "critical",
});

string_enum!(NonConformanceStatus {
    Open => "open",
    Closed => "closed",
});

string_enum!(AuditStatus {
    Scheduled => "scheduled",
    Completed => "completed",
});

string_enum!(CapaActionType {
    Corrective => "corrective",
    Preventive => "preventive",
});

string_enum!(CapaStatus {
    Open => "open",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl CapaStatus {
    pub fn is_closed(self) -> bool {
        matches!(self, CapaStatus::Completed | CapaStatus::Cancelled)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use CapaStatus::*;
        matches!(
            (self, next),
            (Open, InProgress) | (InProgress, Completed) | (Open | InProgress, Cancelled)
        )
    }
}

/// Defects must lie within `0..=sample_size` and the sample must not be empty.
pub fn validate_sample(sample_size: i32, defects_found: i32) -> Result<(), String> {
    if sample_size <= 0 {
        return Err("sample size must be positive".into());
    }
    if defects_found < 0 || defects_found > sample_size {
        return Err(format!(
            "defects found must be between 0 and the sample size ({sample_size})"
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityCheck {
    pub id: QualityCheckId,
    pub company_id: CompanyId,
    pub work_order_id: Option<WorkOrderId>,
    pub check_type: String,
    pub inspector_id: UserId,
    pub result: CheckResult,
    pub sample_size: i32,
    pub defects_found: i32,
    pub notes: Option<String>,
    pub checked_at: NaiveDateTime,
}

/// Non-conformance raised together with a failed check.
#[derive(Debug, Clone)]
pub struct Finding {
    pub severity: Severity,
    pub description: SanitizedText,
}

#[derive(Debug, Clone)]
pub struct NewQualityCheck {
    pub company_id: CompanyId,
    pub work_order_id: Option<WorkOrderId>,
    pub check_type: Label,
    pub inspector_id: UserId,
    pub result: CheckResult,
    pub sample_size: i32,
    pub defects_found: i32,
    pub notes: Option<SanitizedText>,
    /// Present exactly when `result` is `fail`.
    pub finding: Option<Finding>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedCheck {
    pub check: QualityCheck,
    pub non_conformance: Option<NonConformance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonConformance {
    pub id: NonConformanceId,
    pub company_id: CompanyId,
    pub quality_check_id: Option<QualityCheckId>,
    pub severity: Severity,
    pub description: String,
    pub status: NonConformanceStatus,
    pub created_at: NaiveDateTime,
    pub closed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAudit {
    pub id: AuditId,
    pub company_id: CompanyId,
    pub title: String,
    pub audit_type: String,
    pub auditor: String,
    pub scheduled_date: NaiveDate,
    pub status: AuditStatus,
    pub findings: Option<String>,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct NewQualityAudit {
    pub company_id: CompanyId,
    pub title: Title,
    pub audit_type: Label,
    pub auditor: Title,
    pub scheduled_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capa {
    pub id: CapaId,
    pub company_id: CompanyId,
    pub non_conformance_id: NonConformanceId,
    pub action_type: CapaActionType,
    pub description: String,
    pub owner: String,
    pub due_date: NaiveDate,
    pub status: CapaStatus,
    pub created_at: NaiveDateTime,
}

impl Capa {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.status.is_closed() && self.due_date < today
    }
}

#[derive(Debug, Clone)]
pub struct NewCapa {
    pub company_id: CompanyId,
    pub non_conformance_id: NonConformanceId,
    pub action_type: CapaActionType,
    pub description: SanitizedText,
    pub owner: Title,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct QualitySummary {
    pub total_checks: i64,
    pub passed: i64,
    pub failed: i64,
    pub pass_rate: Option<f64>,
    pub defect_rate: Option<f64>,
}

impl QualitySummary {
    pub fn from_totals(total: i64, passed: i64, failed: i64, samples: i64, defects: i64) -> Self {
        Self {
            total_checks: total,
            passed,
            failed,
            pass_rate: percentage(passed as f64, total as f64),
            defect_rate: percentage(defects as f64, samples as f64),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityDashboard {
    pub summary: QualitySummary,
    pub open_by_severity: Vec<LabelCount>,
    pub upcoming_audits: Vec<QualityAudit>,
    pub overdue_capas: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_bounds() {
        assert!(validate_sample(10, 0).is_ok());
        assert!(validate_sample(10, 10).is_ok());
        assert!(validate_sample(0, 0).is_err());
        assert!(validate_sample(10, 11).is_err());
        assert!(validate_sample(10, -1).is_err());
    }

    #[test]
    fn capa_workflow() {
        use CapaStatus::*;
        assert!(Open.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Open.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Cancelled));
        assert!(!Open.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Open));
    }

    #[test]
    fn summary_rates() {
        let summary = QualitySummary::from_totals(8, 6, 2, 400, 10);
        assert_eq!(summary.pass_rate, Some(75.0));
        assert_eq!(summary.defect_rate, Some(2.5));
        assert_eq!(QualitySummary::from_totals(0, 0, 0, 0, 0).pass_rate, None);
    }

    #[test]
    fn closed_capas_are_never_overdue() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let mut capa = Capa {
            id: CapaId::new(1).unwrap(),
            company_id: CompanyId::new(1).unwrap(),
            non_conformance_id: NonConformanceId::new(1).unwrap(),
            action_type: CapaActionType::Corrective,
            description: "Replace gasket supplier".into(),
            owner: "QA".into(),
            due_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            status: CapaStatus::InProgress,
            created_at: today.and_hms_opt(0, 0, 0).unwrap(),
        };
        assert!(capa.is_overdue(today));
        capa.status = CapaStatus::Completed;
        assert!(!capa.is_overdue(today));
    }
}
