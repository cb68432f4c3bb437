use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    HrManager = 1,
    HrSupervisor = 2,
    HrCompany = 3,
    DepartmentHead = 4,
    Employee = 5,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::HrManager),
            2 => Some(Role::HrSupervisor),
            3 => Some(Role::HrCompany),
            4 => Some(Role::DepartmentHead),
            5 => Some(Role::Employee),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Role::HrManager => "HR Manager",
            Role::HrSupervisor => "HR Supervisor",
            Role::HrCompany => "HR Company Level",
            Role::DepartmentHead => "Department Head",
            Role::Employee => "Employee",
        }
    }

    pub fn is_hr(self) -> bool {
        matches!(self, Role::HrManager | Role::HrSupervisor | Role::HrCompany)
    }

    pub fn can_manage_company(self) -> bool {
        self == Role::HrManager
    }

    pub fn can_manage_departments(self) -> bool {
        matches!(self, Role::HrManager | Role::HrSupervisor)
    }

    pub fn can_manage_job_titles(self) -> bool {
        self.is_hr()
    }

    pub fn can_view_employees(self) -> bool {
        self.is_hr() || self == Role::DepartmentHead
    }

    pub fn can_edit_employee(self) -> bool {
        self.is_hr()
    }

    pub fn can_delete_employee(self) -> bool {
        matches!(self, Role::HrManager | Role::HrSupervisor)
    }

    /// First-stage sign-off. Department heads are further limited to their
    /// own department; the HR manager may act on any application.
    pub fn can_approve_department_leave(self) -> bool {
        matches!(self, Role::DepartmentHead | Role::HrManager)
    }

    pub fn can_acknowledge_leave(self) -> bool {
        self.is_hr()
    }

    pub fn can_view_all_leaves(self) -> bool {
        self.is_hr()
    }

    pub fn can_manage_users(self) -> bool {
        self == Role::HrManager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn ids_round_trip() {
        for role in Role::iter() {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(6), None);
    }

    #[test]
    fn names_match_wire_format() {
        assert_eq!(Role::DepartmentHead.to_string(), "DEPARTMENT_HEAD");
        assert_eq!(Role::from_str("HR_COMPANY").unwrap(), Role::HrCompany);
        assert_eq!(
            serde_json::to_value(Role::HrManager).unwrap(),
            serde_json::json!("HR_MANAGER")
        );
    }

    #[test]
    fn only_hr_acknowledges() {
        let acknowledgers: Vec<Role> = Role::iter().filter(|r| r.can_acknowledge_leave()).collect();
        assert_eq!(
            acknowledgers,
            vec![Role::HrManager, Role::HrSupervisor, Role::HrCompany]
        );
    }

    #[test]
    fn department_approval_roles() {
        assert!(Role::DepartmentHead.can_approve_department_leave());
        assert!(Role::HrManager.can_approve_department_leave());
        assert!(!Role::HrCompany.can_approve_department_leave());
        assert!(!Role::Employee.can_approve_department_leave());
    }

    #[test]
    fn management_permissions() {
        assert!(Role::HrManager.can_manage_company());
        assert!(!Role::HrSupervisor.can_manage_company());
        assert!(Role::HrSupervisor.can_manage_departments());
        assert!(!Role::HrCompany.can_manage_departments());
        assert!(Role::HrCompany.can_manage_job_titles());
        assert!(Role::DepartmentHead.can_view_employees());
        assert!(!Role::DepartmentHead.can_edit_employee());
        assert!(!Role::HrCompany.can_delete_employee());
        assert!(!Role::Employee.can_view_employees());
    }
}
