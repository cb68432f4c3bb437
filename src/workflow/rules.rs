use crate::model::leave_application::LeaveStatus;
use derive_more::Display;

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[display(fmt = "start_date cannot be after end_date")]
    InvalidDateRange,
    #[display(fmt = "Leave spans {} days; at most {} are allowed", _0, _1)]
    RangeTooLong(i64, i64),
    #[display(fmt = "reason is required")]
    EmptyReason,
    #[display(fmt = "Invalid leave days: {}", _0)]
    DaysMismatch(String),
    #[display(fmt = "leave_days is required to change the dates of a partially paid leave")]
    BreakdownRequired,
    #[display(
        fmt = "Insufficient leave balance for {}. Available: {} days, Requested: {} days",
        year,
        available,
        requested
    )]
    InsufficientBalance {
        year: i32,
        available: i32,
        requested: i32,
    },
    #[display(fmt = "Cannot move leave application from {} to {}", from, to)]
    InvalidTransition { from: LeaveStatus, to: LeaveStatus },
    #[display(fmt = "comments are required when rejecting a leave application")]
    MissingComment,
    #[display(fmt = "Leave application can no longer be changed in status {}", _0)]
    Locked(LeaveStatus),
    #[display(fmt = "Leave application was modified concurrently, reload and retry")]
    Stale,
}

impl std::error::Error for WorkflowError {}

impl WorkflowError {
    /// Errors caused by the application's current state rather than the input.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            WorkflowError::InvalidTransition { .. } | WorkflowError::Locked(_) | WorkflowError::Stale
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
pub enum LeaveAction {
    #[display(fmt = "approve")]
    ApproveByDepartment,
    #[display(fmt = "acknowledge")]
    AcknowledgeByHr,
    #[display(fmt = "reject")]
    Reject,
    #[display(fmt = "cancel")]
    Cancel,
}

impl LeaveAction {
    pub fn target(self) -> LeaveStatus {
        match self {
            LeaveAction::ApproveByDepartment => LeaveStatus::ApprovedByDepartment,
            LeaveAction::AcknowledgeByHr => LeaveStatus::Approved,
            LeaveAction::Reject => LeaveStatus::Rejected,
            LeaveAction::Cancel => LeaveStatus::Cancelled,
        }
    }

    /// Statuses the action may start from.
    pub fn sources(self) -> &'static [LeaveStatus] {
        match self {
            LeaveAction::ApproveByDepartment => &[LeaveStatus::Pending],
            LeaveAction::AcknowledgeByHr => &[LeaveStatus::ApprovedByDepartment],
            LeaveAction::Reject => &[LeaveStatus::Pending],
            LeaveAction::Cancel => &[
                LeaveStatus::Pending,
                LeaveStatus::ApprovedByDepartment,
                LeaveStatus::Approved,
            ],
        }
    }
}

pub fn transition(from: LeaveStatus, action: LeaveAction) -> Result<LeaveStatus, WorkflowError> {
    if action.sources().contains(&from) {
        Ok(action.target())
    } else {
        Err(WorkflowError::InvalidTransition {
            from,
            to: action.target(),
        })
    }
}

/// Sign of the change to `used_paid_leave` caused by a transition:
/// +1 when the paid days are deducted, -1 when they are credited back.
pub fn balance_effect(from: LeaveStatus, action: LeaveAction) -> i32 {
    match (from, action) {
        (LeaveStatus::ApprovedByDepartment, LeaveAction::AcknowledgeByHr) => 1,
        (LeaveStatus::Approved, LeaveAction::Cancel) => -1,
        _ => 0,
    }
}

/// Only pending applications may be edited by their owner.
pub fn ensure_editable(status: LeaveStatus) -> Result<(), WorkflowError> {
    match status {
        LeaveStatus::Pending => Ok(()),
        other => Err(WorkflowError::Locked(other)),
    }
}

/// Applications that went through (or are going through) approval keep
/// their record; cancel them instead.
pub fn ensure_deletable(status: LeaveStatus) -> Result<(), WorkflowError> {
    match status {
        LeaveStatus::ApprovedByDepartment | LeaveStatus::Approved => {
            Err(WorkflowError::Locked(status))
        }
        _ => Ok(()),
    }
}

pub fn normalize_comment(comments: Option<String>) -> Option<String> {
    comments
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

pub fn require_comment(comments: Option<String>) -> Result<String, WorkflowError> {
    normalize_comment(comments).ok_or(WorkflowError::MissingComment)
}
