use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "employee_id": 1,
    "year": 2026,
    "total_paid_leave": 5,
    "used_paid_leave": 2,
    "available_paid_leave": 3
}))]
pub struct LeaveBalance {
    pub employee_id: u64,
    pub year: i32,
    pub total_paid_leave: i32,
    pub used_paid_leave: i32,
    #[sqlx(skip)]
    pub available_paid_leave: i32,
}

impl LeaveBalance {
    /// Balance for a year that has no row yet.
    pub fn fresh(employee_id: u64, year: i32, total_paid_leave: i32) -> Self {
        Self {
            employee_id,
            year,
            total_paid_leave,
            used_paid_leave: 0,
            available_paid_leave: total_paid_leave,
        }
    }

    pub fn available(&self) -> i32 {
        (self.total_paid_leave - self.used_paid_leave).max(0)
    }

    pub fn with_available(mut self) -> Self {
        self.available_paid_leave = self.available();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_is_total_minus_used() {
        let balance = LeaveBalance {
            employee_id: 1,
            year: 2026,
            total_paid_leave: 5,
            used_paid_leave: 2,
            available_paid_leave: 0,
        }
        .with_available();
        assert_eq!(balance.available_paid_leave, 3);
    }

    #[test]
    fn overdrawn_balance_reports_zero() {
        let balance = LeaveBalance {
            employee_id: 1,
            year: 2026,
            total_paid_leave: 5,
            used_paid_leave: 7,
            available_paid_leave: 0,
        };
        assert_eq!(balance.available(), 0);
    }
}
