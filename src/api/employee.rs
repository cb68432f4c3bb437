use crate::{
    api::response::{Page, Pagination, created, message, ok},
    auth::auth::AuthUser,
    error::ApiError,
    model::employee::{CivilStatus, Employee, EmploymentStatus, Gender},
    utils::db_utils::{ColumnKind, UpdatableColumn, apply_update, column},
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use sqlx::MySqlPool;
use std::str::FromStr;
use strum::VariantNames;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

const EMPLOYEE_SELECT: &str = r#"
    SELECT id, employee_number, first_name, last_name, middle_name, birth_date, gender,
           civil_status, email, phone_number, address, sss_number, philhealth_number,
           pagibig_number, tin, company_id, department_id, job_title_id, date_hired,
           employment_status, avatar, created_at, updated_at
    FROM employees
"#;

const EMPLOYEE_COLUMNS: &[UpdatableColumn] = &[
    column("employee_number", ColumnKind::Text),
    column("first_name", ColumnKind::Text),
    column("last_name", ColumnKind::Text),
    column("middle_name", ColumnKind::OptionalText),
    column("birth_date", ColumnKind::Date),
    column("gender", ColumnKind::OneOf(Gender::VARIANTS)),
    column("civil_status", ColumnKind::OneOf(CivilStatus::VARIANTS)),
    column("email", ColumnKind::Text),
    column("phone_number", ColumnKind::Text),
    column("address", ColumnKind::Text),
    column("sss_number", ColumnKind::OptionalText),
    column("philhealth_number", ColumnKind::OptionalText),
    column("pagibig_number", ColumnKind::OptionalText),
    column("tin", ColumnKind::OptionalText),
    column("company_id", ColumnKind::Id),
    column("department_id", ColumnKind::Id),
    column("job_title_id", ColumnKind::Id),
    column("date_hired", ColumnKind::Date),
    column("employment_status", ColumnKind::OneOf(EmploymentStatus::VARIANTS)),
    column("avatar", ColumnKind::OptionalText),
];

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP001")]
    pub employee_number: String,
    #[schema(example = "Juan")]
    pub first_name: String,
    #[schema(example = "Dela Cruz")]
    pub last_name: String,
    #[schema(example = "Santos")]
    pub middle_name: Option<String>,
    #[schema(example = "1990-05-15", format = "date", value_type = String)]
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub civil_status: CivilStatus,
    #[schema(example = "juan.delacruz@company.com", format = "email")]
    pub email: String,
    #[schema(example = "+63 917 123 4567")]
    pub phone_number: String,
    #[schema(example = "123 Rizal Street, Makati, Metro Manila 1200, Philippines")]
    pub address: String,
    pub sss_number: Option<String>,
    pub philhealth_number: Option<String>,
    pub pagibig_number: Option<String>,
    pub tin: Option<String>,
    #[schema(example = 1)]
    pub company_id: u64,
    #[schema(example = 1)]
    pub department_id: u64,
    #[schema(example = 1)]
    pub job_title_id: u64,
    #[schema(example = "2023-01-15", format = "date", value_type = String)]
    pub date_hired: NaiveDate,
    pub employment_status: EmploymentStatus,
    pub avatar: Option<String>,
}

impl CreateEmployee {
    fn validate(&self) -> Result<(), ApiError> {
        let required = [
            ("employee_number", &self.employee_number),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
            ("phone_number", &self.phone_number),
            ("address", &self.address),
        ];
        if let Some((name, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ApiError::bad_request(format!("{name} is required")));
        }
        if !self.email.contains('@') {
            return Err(ApiError::bad_request("email is not valid"));
        }
        if self.date_hired < self.birth_date {
            return Err(ApiError::bad_request("date_hired cannot be before birth_date"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub company_id: Option<u64>,
    pub department_id: Option<u64>,
    pub job_title_id: Option<u64>,
    /// Employment status, e.g. `Regular`
    pub status: Option<String>,
    /// Matches name, email or employee number
    pub search: Option<String>,
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Str(String),
}

pub async fn fetch_employee(pool: &MySqlPool, id: u64) -> Result<Employee, ApiError> {
    sqlx::query_as::<_, Employee>(&format!("{EMPLOYEE_SELECT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Employee not found"))
}

/// The department must belong to the company and the job title to the department.
async fn check_placement(
    pool: &MySqlPool,
    company_id: u64,
    department_id: u64,
    job_title_id: u64,
) -> Result<(), ApiError> {
    let department_company =
        sqlx::query_scalar::<_, u64>("SELECT company_id FROM departments WHERE id = ?")
            .bind(department_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ApiError::bad_request(format!("Department {department_id} does not exist")))?;
    if department_company != company_id {
        return Err(ApiError::bad_request(format!(
            "Department {department_id} does not belong to company {company_id}"
        )));
    }

    let title_department =
        sqlx::query_scalar::<_, u64>("SELECT department_id FROM job_titles WHERE id = ?")
            .bind(job_title_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ApiError::bad_request(format!("Job title {job_title_id} does not exist")))?;
    if title_department != department_id {
        return Err(ApiError::bad_request(format!(
            "Job title {job_title_id} does not belong to department {department_id}"
        )));
    }
    Ok(())
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Missing field or inconsistent placement"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Employee number or email already used")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> Result<HttpResponse, ApiError> {
    auth.require(auth.role.can_edit_employee(), "HR only")?;
    payload.validate()?;
    check_placement(
        pool.get_ref(),
        payload.company_id,
        payload.department_id,
        payload.job_title_id,
    )
    .await?;

    let result = sqlx::query(
        r#"
        INSERT INTO employees
            (employee_number, first_name, last_name, middle_name, birth_date, gender,
             civil_status, email, phone_number, address, sss_number, philhealth_number,
             pagibig_number, tin, company_id, department_id, job_title_id, date_hired,
             employment_status, avatar)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_number.trim())
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(&payload.middle_name)
    .bind(payload.birth_date)
    .bind(payload.gender.as_ref())
    .bind(payload.civil_status.as_ref())
    .bind(payload.email.trim().to_lowercase())
    .bind(payload.phone_number.trim())
    .bind(payload.address.trim())
    .bind(&payload.sss_number)
    .bind(&payload.philhealth_number)
    .bind(&payload.pagibig_number)
    .bind(&payload.tin)
    .bind(payload.company_id)
    .bind(payload.department_id)
    .bind(payload.job_title_id)
    .bind(payload.date_hired)
    .bind(payload.employment_status.as_ref())
    .bind(&payload.avatar)
    .execute(pool.get_ref())
    .await
    .map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => ApiError::conflict("Employee number or email already in use"),
        other => other,
    })?;

    let id = result.last_insert_id();
    let employee = fetch_employee(pool.get_ref(), id).await?;
    info!(employee_id = id, name = %employee.full_name(), by = auth.user_id, "Employee created");

    Ok(created(employee))
}

/// List Employees
#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = [Employee]),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require(auth.role.can_view_employees(), "Not allowed to view employees")?;

    let (page, per_page, offset) = Pagination::resolve(query.page, query.per_page);

    // ---------- build WHERE clause dynamically ----------
    let mut conditions: Vec<&str> = Vec::new();
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(company_id) = query.company_id {
        conditions.push("company_id = ?");
        args.push(FilterValue::U64(company_id));
    }

    if let Some(department_id) = query.department_id {
        conditions.push("department_id = ?");
        args.push(FilterValue::U64(department_id));
    }

    if let Some(job_title_id) = query.job_title_id {
        conditions.push("job_title_id = ?");
        args.push(FilterValue::U64(job_title_id));
    }

    if let Some(status) = query.status.as_deref() {
        let status = EmploymentStatus::from_str(status)
            .map_err(|_| ApiError::bad_request(format!("Unknown employment status: {status}")))?;
        conditions.push("employment_status = ?");
        args.push(FilterValue::Str(status.as_ref().to_string()));
    }

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push(
            "(first_name LIKE ? OR last_name LIKE ? OR email LIKE ? OR employee_number LIKE ?)",
        );
        let like = format!("%{search}%");
        for _ in 0..4 {
            args.push(FilterValue::Str(like.clone()));
        }
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM employees{where_clause}");
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(s.as_str()),
        };
    }
    let total = count_q.fetch_one(pool.get_ref()).await?;

    // ---------- data query ----------
    let data_sql = format!("{EMPLOYEE_SELECT}{where_clause} ORDER BY last_name, first_name LIMIT ? OFFSET ?");
    debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");

    let mut data_q = sqlx::query_as::<_, Employee>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }
    let items = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(ok(Page {
        items,
        page,
        per_page,
        total,
    }))
}

/// Get Employee by ID. Employees may read their own record.
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = path.into_inner();
    auth.require(
        auth.role.can_view_employees() || auth.employee_id == Some(employee_id),
        "Not allowed to view this employee",
    )?;

    Ok(ok(fetch_employee(pool.get_ref(), employee_id).await?))
}

/// Update Employee; only the fields present in the body change
#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Unknown or invalid field"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    auth.require(auth.role.can_edit_employee(), "HR only")?;
    let employee_id = path.into_inner();

    let moves = ["company_id", "department_id", "job_title_id"]
        .iter()
        .any(|key| body.get(key).is_some());
    if moves {
        let current = fetch_employee(pool.get_ref(), employee_id).await?;
        let id_or = |key: &str, current: u64| body.get(key).and_then(Value::as_u64).unwrap_or(current);
        check_placement(
            pool.get_ref(),
            id_or("company_id", current.company_id),
            id_or("department_id", current.department_id),
            id_or("job_title_id", current.job_title_id),
        )
        .await?;
    }

    apply_update(pool.get_ref(), "employees", employee_id, &body, EMPLOYEE_COLUMNS, "Employee not found")
        .await
        .map_err(|e| match e {
            ApiError::Conflict(_) => ApiError::conflict("Employee number or email already in use"),
            other => other,
        })?;
    info!(employee_id, by = auth.user_id, "Employee updated");

    Ok(ok(fetch_employee(pool.get_ref(), employee_id).await?))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/employees/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require(auth.role.can_delete_employee(), "HR manager or supervisor only")?;
    let employee_id = path.into_inner();

    let result = sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(employee_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Employee not found"));
    }

    info!(employee_id, by = auth.user_id, "Employee deleted");
    Ok(message("Successfully deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{bearer, peer};
    use crate::model::role::Role;
    use actix_web::{http::StatusCode, test};

    fn payload() -> CreateEmployee {
        serde_json::from_value(serde_json::json!({
            "employee_number": "EMP001",
            "first_name": "Juan",
            "last_name": "Dela Cruz",
            "birth_date": "1990-05-15",
            "gender": "Male",
            "civil_status": "Married",
            "email": "juan.delacruz@company.com",
            "phone_number": "+63 917 123 4567",
            "address": "Makati",
            "company_id": 1,
            "department_id": 1,
            "job_title_id": 1,
            "date_hired": "2023-01-15",
            "employment_status": "Regular"
        }))
        .unwrap()
    }

    #[core::prelude::v1::test]
    fn create_payload_validation() {
        assert!(payload().validate().is_ok());

        let mut blank = payload();
        blank.address = " ".to_string();
        assert_eq!(
            blank.validate().unwrap_err(),
            ApiError::bad_request("address is required")
        );

        let mut hired_early = payload();
        hired_early.date_hired = NaiveDate::from_ymd_opt(1989, 1, 1).unwrap();
        assert!(hired_early.validate().is_err());
    }

    #[core::prelude::v1::test]
    fn unknown_enum_values_fail_deserialization() {
        assert!(serde_json::from_value::<Gender>(serde_json::json!("Unknown")).is_err());
        assert!(serde_json::from_value::<EmploymentStatus>(serde_json::json!("regular")).is_err());
    }

    #[actix_web::test]
    async fn plain_employees_cannot_list_employees() {
        let app = crate::test_app!();
        let req = test::TestRequest::get()
            .uri("/api/employees")
            .peer_addr(peer())
            .insert_header(bearer(Role::Employee, Some(7)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn employees_cannot_read_other_records() {
        let app = crate::test_app!();
        let req = test::TestRequest::get()
            .uri("/api/employees/8")
            .peer_addr(peer())
            .insert_header(bearer(Role::Employee, Some(7)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn unknown_status_filter_is_a_bad_request() {
        let app = crate::test_app!();
        let req = test::TestRequest::get()
            .uri("/api/employees?status=OnVacation")
            .peer_addr(peer())
            .insert_header(bearer(Role::HrSupervisor, Some(2)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn hr_company_cannot_delete_employees() {
        let app = crate::test_app!();
        let req = test::TestRequest::delete()
            .uri("/api/employees/8")
            .peer_addr(peer())
            .insert_header(bearer(Role::HrCompany, Some(2)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn update_rejects_bad_enum_value() {
        let app = crate::test_app!();
        let req = test::TestRequest::put()
            .uri("/api/employees/8")
            .peer_addr(peer())
            .insert_header(bearer(Role::HrManager, Some(1)))
            .set_json(serde_json::json!({"civil_status": "Complicated"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
