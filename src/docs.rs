use crate::api::company::CreateCompany;
use crate::api::department::CreateDepartment;
use crate::api::employee::CreateEmployee;
use crate::api::job_title::CreateJobTitle;
use crate::api::leave::{CreateLeave, Decision, LeaveFilter, SetAllotment, UpdateLeave};
use crate::api::response::Pagination;
use crate::api::user::{CreateUser, UpdateUser};
use crate::auth::handlers::{LoginResponse, TokenPair};
use crate::model::company::Company;
use crate::model::department::Department;
use crate::model::employee::{CivilStatus, Employee, EmploymentStatus, Gender};
use crate::model::job_title::JobTitle;
use crate::model::leave_application::{
    DepartmentHeadApproval, HrAcknowledgment, LeaveApplication, LeaveStatus, LeaveType,
};
use crate::model::leave_balance::LeaveBalance;
use crate::model::leave_day::LeaveDay;
use crate::model::role::Role;
use crate::model::user::UserProfile;
use crate::models::{LoginReqDto, RegisterReq};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRMS API",
        version = "1.0.0",
        description = r#"
## Human Resource Management System

Companies, departments, job titles and employee records, plus a two-step
leave workflow with yearly paid-leave balances.

### Leave workflow
`Pending` → `Approved_by_Department` (department head) → `Approved` (HR).
Pending applications may be rejected with a comment; anything not yet
rejected may be cancelled. Paid days are deducted from the balance of the
year they fall in when HR acknowledges, and credited back on cancellation.

### Security
Every `/api` endpoint needs a **JWT Bearer** access token from `/auth/login`.
Roles: `HR_MANAGER`, `HR_SUPERVISOR`, `HR_COMPANY`, `DEPARTMENT_HEAD`, `EMPLOYEE`.

### Response format
`{"success": true, "data": ...}` or `{"success": false, "error": "..."}`.
List endpoints return `{items, page, per_page, total}` in `data`.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::user::list_users,
        crate::api::user::create_user_account,
        crate::api::user::update_user,

        crate::api::company::list_companies,
        crate::api::company::create_company,
        crate::api::company::get_company,
        crate::api::company::update_company,
        crate::api::company::delete_company,

        crate::api::department::list_departments,
        crate::api::department::create_department,
        crate::api::department::get_department,
        crate::api::department::update_department,
        crate::api::department::delete_department,

        crate::api::job_title::list_job_titles,
        crate::api::job_title::create_job_title,
        crate::api::job_title::get_job_title,
        crate::api::job_title::update_job_title,
        crate::api::job_title::delete_job_title,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::leave::list_leaves,
        crate::api::leave::create_leave,
        crate::api::leave::get_leave,
        crate::api::leave::update_leave,
        crate::api::leave::delete_leave,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,
        crate::api::leave::acknowledge_leave,
        crate::api::leave::cancel_leave,
        crate::api::leave::get_balance,
        crate::api::leave::set_balance
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            LoginResponse,
            TokenPair,
            UserProfile,
            Role,
            CreateUser,
            UpdateUser,
            Pagination,
            Company,
            CreateCompany,
            Department,
            CreateDepartment,
            JobTitle,
            CreateJobTitle,
            Employee,
            CreateEmployee,
            Gender,
            CivilStatus,
            EmploymentStatus,
            LeaveApplication,
            LeaveType,
            LeaveStatus,
            LeaveDay,
            DepartmentHeadApproval,
            HrAcknowledgment,
            LeaveBalance,
            LeaveFilter,
            CreateLeave,
            UpdateLeave,
            Decision,
            SetAllotment
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Registration, login and token refresh"),
        (name = "User", description = "User account management"),
        (name = "Company", description = "Company management APIs"),
        (name = "Department", description = "Department management APIs"),
        (name = "Job Title", description = "Job title management APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Leave", description = "Leave applications, approvals and balances"),
    )
)]
pub struct ApiDoc;
