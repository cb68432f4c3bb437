use super::leave_day::LeaveDay;
use super::parse_column;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlRow;
use sqlx::{FromRow, Row};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter, ToSchema,
)]
pub enum LeaveType {
    Vacation,
    Sick,
    Emergency,
    Paternity,
    Maternity,
    Bereavement,
    Personal,
}

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter, ToSchema,
)]
pub enum LeaveStatus {
    Pending,
    #[serde(rename = "Approved_by_Department")]
    #[strum(serialize = "Approved_by_Department")]
    ApprovedByDepartment,
    Approved,
    Rejected,
    Cancelled,
}

/// First-stage sign-off. A rejection is recorded in the same slot.
/// `approved_by` is cleared when the signer's employee record is deleted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DepartmentHeadApproval {
    #[schema(example = 4)]
    pub approved_by: Option<u64>,
    #[schema(value_type = String, format = "date-time")]
    pub approved_at: DateTime<Utc>,
    #[schema(example = "Approved. Enjoy your vacation!")]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HrAcknowledgment {
    #[schema(example = 2)]
    pub acknowledged_by: Option<u64>,
    #[schema(value_type = String, format = "date-time")]
    pub acknowledged_at: DateTime<Utc>,
    #[schema(example = "Leave acknowledged and processed.")]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1,
    "employee_name": "Juan Dela Cruz",
    "department_id": 1,
    "leave_type": "Vacation",
    "start_date": "2026-02-16",
    "end_date": "2026-02-20",
    "total_days": 5,
    "paid_days": 3,
    "unpaid_days": 2,
    "reason": "Family vacation to Boracay",
    "status": "Approved_by_Department",
    "applied_at": "2026-02-01T08:00:00Z",
    "department_head_approval": {
        "approved_by": 4,
        "approved_at": "2026-02-02T10:30:00Z",
        "comments": "Approved. Enjoy your vacation!"
    },
    "hr_acknowledgment": null,
    "version": 1,
    "leave_days": []
}))]
pub struct LeaveApplication {
    pub id: u64,
    pub employee_id: u64,
    pub employee_name: String,
    pub department_id: u64,
    pub leave_type: LeaveType,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub total_days: i32,
    pub paid_days: i32,
    pub unpaid_days: i32,
    pub reason: String,
    pub status: LeaveStatus,
    #[schema(value_type = String, format = "date-time")]
    pub applied_at: DateTime<Utc>,
    pub department_head_approval: Option<DepartmentHeadApproval>,
    pub hr_acknowledgment: Option<HrAcknowledgment>,
    pub version: u32,
    /// Filled for single-application reads; empty in lists
    pub leave_days: Vec<LeaveDay>,
}

/// Column list matching the `FromRow` impl below. Aliased as `la`, joined
/// with the employee as `e`.
pub const LEAVE_SELECT: &str = r#"
    SELECT
        la.id, la.employee_id,
        CONCAT(e.first_name, ' ', e.last_name) AS employee_name,
        e.department_id,
        la.leave_type, la.start_date, la.end_date,
        la.total_days, la.paid_days, la.unpaid_days,
        la.reason, la.status, la.applied_at,
        la.department_head_approved_by, la.department_head_approved_at, la.department_head_comments,
        la.hr_acknowledged_by, la.hr_acknowledged_at, la.hr_comments,
        la.version
    FROM leave_applications la
    JOIN employees e ON e.id = la.employee_id
"#;

impl<'r> FromRow<'r, MySqlRow> for LeaveApplication {
    fn from_row(row: &'r MySqlRow) -> Result<Self, sqlx::Error> {
        let approved_by: Option<u64> = row.try_get("department_head_approved_by")?;
        let approved_at: Option<DateTime<Utc>> = row.try_get("department_head_approved_at")?;
        let department_head_approval = match approved_at {
            Some(approved_at) => Some(DepartmentHeadApproval {
                approved_by,
                approved_at,
                comments: row.try_get("department_head_comments")?,
            }),
            None => None,
        };

        let acknowledged_by: Option<u64> = row.try_get("hr_acknowledged_by")?;
        let acknowledged_at: Option<DateTime<Utc>> = row.try_get("hr_acknowledged_at")?;
        let hr_acknowledgment = match acknowledged_at {
            Some(acknowledged_at) => Some(HrAcknowledgment {
                acknowledged_by,
                acknowledged_at,
                comments: row.try_get("hr_comments")?,
            }),
            None => None,
        };

        Ok(Self {
            id: row.try_get("id")?,
            employee_id: row.try_get("employee_id")?,
            employee_name: row.try_get("employee_name")?,
            department_id: row.try_get("department_id")?,
            leave_type: parse_column(row, "leave_type")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            total_days: row.try_get("total_days")?,
            paid_days: row.try_get("paid_days")?,
            unpaid_days: row.try_get("unpaid_days")?,
            reason: row.try_get("reason")?,
            status: parse_column(row, "status")?,
            applied_at: row.try_get("applied_at")?,
            department_head_approval,
            hr_acknowledgment,
            version: row.try_get("version")?,
            leave_days: Vec::new(),
        })
    }
}
