//! Leave application workflow.
//!
//! ```text
//! Pending ──approve──▶ Approved_by_Department ──acknowledge──▶ Approved
//!    │                          │                                 │
//!    ├──reject──▶ Rejected      │                                 │
//!    └──────────cancel──────────┴──────────cancel─────────────────┴──▶ Cancelled
//! ```
//!
//! `rules` and `days` hold the pure checks; `store` runs them inside a
//! database transaction together with the writes they guard.

pub mod days;
pub mod rules;
pub mod store;

pub use rules::{LeaveAction, WorkflowError};

use crate::model::leave_application::LeaveType;
use crate::model::leave_day::LeaveDay;
use chrono::NaiveDate;

/// A validated new application, ready to insert.
#[derive(Debug, Clone)]
pub struct LeaveDraft {
    pub employee_id: u64,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub days: Vec<LeaveDay>,
}

/// Changes to a pending application; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct LeaveEdit {
    pub leave_type: Option<LeaveType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
    pub is_paid: Option<bool>,
    pub leave_days: Option<Vec<LeaveDay>>,
}

pub fn validate_reason(reason: &str) -> Result<String, WorkflowError> {
    let reason = reason.trim();
    if reason.is_empty() {
        Err(WorkflowError::EmptyReason)
    } else {
        Ok(reason.to_string())
    }
}

pub fn prepare_draft(
    employee_id: u64,
    leave_type: LeaveType,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: &str,
    is_paid: Option<bool>,
    leave_days: Option<&[LeaveDay]>,
) -> Result<LeaveDraft, WorkflowError> {
    let reason = validate_reason(reason)?;
    let days = days::build_leave_days(start_date, end_date, leave_days, is_paid.unwrap_or(true))?;

    Ok(LeaveDraft {
        employee_id,
        leave_type,
        start_date,
        end_date,
        reason,
        days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn draft_defaults_to_fully_paid() {
        let draft = prepare_draft(7, LeaveType::Vacation, date(2), date(6), " beach ", None, None)
            .unwrap();
        assert_eq!(draft.reason, "beach");
        assert_eq!(draft.days.len(), 5);
        assert!(draft.days.iter().all(|d| d.is_paid));
    }

    #[test]
    fn draft_requires_reason_and_ordered_dates() {
        assert_eq!(
            prepare_draft(7, LeaveType::Sick, date(2), date(3), "  ", None, None).unwrap_err(),
            WorkflowError::EmptyReason
        );
        assert_eq!(
            prepare_draft(7, LeaveType::Sick, date(3), date(2), "flu", None, None).unwrap_err(),
            WorkflowError::InvalidDateRange
        );
    }

    #[test]
    fn draft_keeps_partial_payment() {
        let explicit = [
            LeaveDay { date: date(9), is_paid: true },
            LeaveDay { date: date(10), is_paid: false },
        ];
        let draft = prepare_draft(
            7,
            LeaveType::Personal,
            date(9),
            date(10),
            "errands",
            Some(true),
            Some(&explicit),
        )
        .unwrap();
        let summary = days::summarize(&draft.days);
        assert_eq!((summary.total, summary.paid, summary.unpaid), (2, 1, 1));
    }
}
