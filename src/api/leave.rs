use crate::{
    api::response::{Page, Pagination, created, message, ok},
    auth::auth::AuthUser,
    config::Config,
    error::ApiError,
    model::{
        leave_application::{LEAVE_SELECT, LeaveApplication, LeaveStatus, LeaveType},
        leave_balance::LeaveBalance,
        leave_day::LeaveDay,
        role::Role,
    },
    workflow::{self, LeaveEdit, store},
};
use actix_web::{HttpResponse, web};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    /// Defaults to the caller's own employee record; HR may file for others
    #[schema(example = 1)]
    pub employee_id: Option<u64>,
    pub leave_type: LeaveType,
    #[schema(example = "2026-02-16", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-02-20", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family vacation to Boracay")]
    pub reason: String,
    /// Applies to every day when `leave_days` is absent (default `true`)
    #[schema(example = true)]
    pub is_paid: Option<bool>,
    /// Per-day breakdown; must cover every date of the range exactly once
    pub leave_days: Option<Vec<LeaveDay>>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateLeave {
    pub leave_type: Option<LeaveType>,
    #[schema(example = "2026-02-16", format = "date", value_type = String)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-02-18", format = "date", value_type = String)]
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
    pub is_paid: Option<bool>,
    pub leave_days: Option<Vec<LeaveDay>>,
}

impl From<UpdateLeave> for LeaveEdit {
    fn from(body: UpdateLeave) -> Self {
        LeaveEdit {
            leave_type: body.leave_type,
            start_date: body.start_date,
            end_date: body.end_date,
            reason: body.reason,
            is_paid: body.is_paid,
            leave_days: body.leave_days,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct Decision {
    #[schema(example = "Approved. Enjoy your vacation!")]
    pub comments: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 1)]
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    /// Filter by the employee's department
    pub department_id: Option<u64>,
    #[schema(example = "Pending")]
    /// Filter by leave status
    pub status: Option<String>,
    /// Leaves ending on or after this date
    pub start_date: Option<NaiveDate>,
    /// Leaves starting on or before this date
    pub end_date: Option<NaiveDate>,
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    /// Pagination per page number
    pub per_page: Option<u32>,
}

#[derive(Deserialize, IntoParams)]
pub struct BalanceQuery {
    /// Calendar year, defaults to the current one
    pub year: Option<i32>,
}

#[derive(Deserialize, ToSchema)]
pub struct SetAllotment {
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 10)]
    pub total_paid_leave: i32,
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Str(String),
    Date(NaiveDate),
}

async fn heads_department(pool: &MySqlPool, department_id: u64, employee_id: u64) -> Result<bool, ApiError> {
    Ok(sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM departments WHERE id = ? AND head_id = ?)",
    )
    .bind(department_id)
    .bind(employee_id)
    .fetch_one(pool)
    .await?)
}

/// HR sees everything, department heads their departments, everyone their own.
async fn ensure_can_view(pool: &MySqlPool, auth: &AuthUser, leave: &LeaveApplication) -> Result<(), ApiError> {
    if auth.role.can_view_all_leaves() || auth.employee_id == Some(leave.employee_id) {
        return Ok(());
    }
    if let (Role::DepartmentHead, Some(own)) = (auth.role, auth.employee_id) {
        if heads_department(pool, leave.department_id, own).await? {
            return Ok(());
        }
    }
    Err(ApiError::forbidden("Not allowed to view this leave application"))
}

/// List leave applications
#[utoipa::path(
    get,
    path = "/api/leaves",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = [LeaveApplication]),
        (status = 400, description = "Unknown status"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list_leaves(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> Result<HttpResponse, ApiError> {
    let (page, per_page, offset) = Pagination::resolve(query.page, query.per_page);

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if !auth.role.can_view_all_leaves() {
        let own = auth.employee()?;
        if auth.role == Role::DepartmentHead {
            where_sql.push_str(
                " AND (e.department_id IN (SELECT id FROM departments WHERE head_id = ?) OR la.employee_id = ?)",
            );
            args.push(FilterValue::U64(own));
            args.push(FilterValue::U64(own));
        } else {
            where_sql.push_str(" AND la.employee_id = ?");
            args.push(FilterValue::U64(own));
        }
    }

    if let Some(employee_id) = query.employee_id {
        where_sql.push_str(" AND la.employee_id = ?");
        args.push(FilterValue::U64(employee_id));
    }

    if let Some(department_id) = query.department_id {
        where_sql.push_str(" AND e.department_id = ?");
        args.push(FilterValue::U64(department_id));
    }

    if let Some(status) = query.status.as_deref() {
        let status = LeaveStatus::from_str(status)
            .map_err(|_| ApiError::bad_request(format!("Unknown leave status: {status}")))?;
        where_sql.push_str(" AND la.status = ?");
        args.push(FilterValue::Str(status.to_string()));
    }

    if let Some(start_date) = query.start_date {
        where_sql.push_str(" AND la.end_date >= ?");
        args.push(FilterValue::Date(start_date));
    }

    if let Some(end_date) = query.end_date {
        where_sql.push_str(" AND la.start_date <= ?");
        args.push(FilterValue::Date(end_date));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!(
        "SELECT COUNT(*) FROM leave_applications la JOIN employees e ON e.id = la.employee_id{where_sql}"
    );
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(s.as_str()),
            FilterValue::Date(d) => count_q.bind(*d),
        };
    }
    let total = count_q.fetch_one(pool.get_ref()).await?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!("{LEAVE_SELECT}{where_sql} ORDER BY la.applied_at DESC, la.id DESC LIMIT ? OFFSET ?");
    debug!(page, per_page, offset, "Fetching leave applications");

    let mut data_q = sqlx::query_as::<_, LeaveApplication>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
            FilterValue::Date(d) => data_q.bind(d),
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

/// Apply for leave
#[utoipa::path(
    post,
    path = "/api/leaves",
    request_body = CreateLeave,
    responses(
        (status = 201, description = "Leave application created as Pending", body = LeaveApplication),
        (status = 400, description = "Invalid dates, reason, day breakdown or insufficient balance"),
        (status = 403, description = "No employee profile, or filing for someone else without HR role"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    body: web::Json<CreateLeave>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();

    let employee_id = match body.employee_id {
        Some(id) if auth.employee_id != Some(id) => {
            auth.require_hr()?;
            id
        }
        Some(id) => id,
        None => auth.employee()?,
    };

    let draft = workflow::prepare_draft(
        employee_id,
        body.leave_type,
        body.start_date,
        body.end_date,
        &body.reason,
        body.is_paid,
        body.leave_days.as_deref(),
    )?;

    let leave = store::create_leave_application(pool.get_ref(), draft, config.default_paid_leave).await?;
    Ok(created(leave))
}

/// Get a leave application with its leave days
#[utoipa::path(
    get,
    path = "/api/leaves/{leave_id}",
    params(("leave_id" = u64, Path, description = "Leave application ID")),
    responses(
        (status = 200, description = "Leave application found", body = LeaveApplication),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave application not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let leave = store::get_leave_application(pool.get_ref(), path.into_inner())
        .await?
        .ok_or_else(|| ApiError::not_found("Leave application not found"))?;

    ensure_can_view(pool.get_ref(), &auth, &leave).await?;
    Ok(ok(leave))
}

/// Edit a pending leave application
#[utoipa::path(
    put,
    path = "/api/leaves/{leave_id}",
    params(("leave_id" = u64, Path, description = "Leave application ID")),
    request_body = UpdateLeave,
    responses(
        (status = 200, description = "Leave application updated", body = LeaveApplication),
        (status = 400, description = "Invalid change or insufficient balance"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave application not found"),
        (status = 409, description = "No longer pending, or modified concurrently")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn update_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    body: web::Json<UpdateLeave>,
) -> Result<HttpResponse, ApiError> {
    let leave = store::update_leave_application(
        pool.get_ref(),
        path.into_inner(),
        &auth,
        body.into_inner().into(),
        config.default_paid_leave,
    )
    .await?;
    Ok(ok(leave))
}

/// Delete a leave application that has not been approved
#[utoipa::path(
    delete,
    path = "/api/leaves/{leave_id}",
    params(("leave_id" = u64, Path, description = "Leave application ID")),
    responses(
        (status = 200, description = "Leave application deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave application not found"),
        (status = 409, description = "Approved applications must be cancelled instead")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn delete_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    store::delete_leave_application(pool.get_ref(), path.into_inner(), &auth).await?;
    Ok(message("Leave application deleted"))
}

/* =========================
Department approval
========================= */
/// Swagger doc for approve_leave endpoint
#[utoipa::path(
    post,
    path = "/api/leaves/{leave_id}/approve",
    params(("leave_id" = u64, Path, description = "Leave application ID")),
    request_body(content = Decision, description = "Optional comment"),
    responses(
        (status = 200, description = "Now Approved_by_Department", body = LeaveApplication),
        (status = 403, description = "Not the head of the employee's department"),
        (status = 404, description = "Leave application not found"),
        (status = 409, description = "Leave application is not pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    body: Option<web::Json<Decision>>,
) -> Result<HttpResponse, ApiError> {
    auth.require(auth.role.can_approve_department_leave(), "Department head only")?;

    let comments = body.and_then(|b| b.into_inner().comments);
    let leave = store::approve_leave_by_department_head(
        pool.get_ref(),
        path.into_inner(),
        &auth,
        comments,
        config.default_paid_leave,
    )
    .await?;
    Ok(ok(leave))
}

/* =========================
Reject leave
========================= */
/// Swagger doc for reject_leave endpoint
#[utoipa::path(
    post,
    path = "/api/leaves/{leave_id}/reject",
    params(("leave_id" = u64, Path, description = "Leave application ID")),
    request_body(content = Decision, description = "Reason for the rejection (required)"),
    responses(
        (status = 200, description = "Leave application rejected", body = LeaveApplication),
        (status = 400, description = "Comments are required"),
        (status = 403, description = "Not the head of the employee's department"),
        (status = 409, description = "Leave application is not pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    body: Option<web::Json<Decision>>,
) -> Result<HttpResponse, ApiError> {
    auth.require(auth.role.can_approve_department_leave(), "Department head only")?;

    let comments = body.and_then(|b| b.into_inner().comments);
    let leave = store::reject_leave_application(
        pool.get_ref(),
        path.into_inner(),
        &auth,
        comments,
        config.default_paid_leave,
    )
    .await?;
    Ok(ok(leave))
}

/* =========================
HR acknowledgment
========================= */
/// Swagger doc for acknowledge_leave endpoint
#[utoipa::path(
    post,
    path = "/api/leaves/{leave_id}/acknowledge",
    params(("leave_id" = u64, Path, description = "Leave application ID")),
    request_body(content = Decision, description = "Optional comment"),
    responses(
        (status = 200, description = "Approved; paid days deducted from the balance", body = LeaveApplication),
        (status = 403, description = "HR only"),
        (status = 409, description = "Leave application is not Approved_by_Department")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn acknowledge_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    body: Option<web::Json<Decision>>,
) -> Result<HttpResponse, ApiError> {
    auth.require(auth.role.can_acknowledge_leave(), "HR only")?;

    let comments = body.and_then(|b| b.into_inner().comments);
    let leave = store::acknowledge_leave_by_hr(
        pool.get_ref(),
        path.into_inner(),
        &auth,
        comments,
        config.default_paid_leave,
    )
    .await?;
    Ok(ok(leave))
}

/// Cancel a leave application; approved ones get their paid days back
#[utoipa::path(
    post,
    path = "/api/leaves/{leave_id}/cancel",
    params(("leave_id" = u64, Path, description = "Leave application ID")),
    responses(
        (status = 200, description = "Leave application cancelled", body = LeaveApplication),
        (status = 403, description = "Only the applicant or HR"),
        (status = 409, description = "Already rejected or cancelled")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let leave = store::cancel_leave_application(
        pool.get_ref(),
        path.into_inner(),
        &auth,
        config.default_paid_leave,
    )
    .await?;
    Ok(ok(leave))
}

/// Paid-leave balance of an employee for one year
#[utoipa::path(
    get,
    path = "/api/leaves/balance/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee ID"), BalanceQuery),
    responses(
        (status = 200, description = "Balance; years without a row report the default allotment", body = LeaveBalance),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_balance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    query: web::Query<BalanceQuery>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = path.into_inner();
    auth.require(
        auth.role.can_view_employees() || auth.employee_id == Some(employee_id),
        "Not allowed to view this balance",
    )?;

    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let balance =
        store::get_leave_balance(pool.get_ref(), employee_id, year, config.default_paid_leave).await?;
    Ok(ok(balance))
}

/// Set the yearly paid-leave allotment of an employee
#[utoipa::path(
    put,
    path = "/api/leaves/balance/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    request_body = SetAllotment,
    responses(
        (status = 200, description = "Updated balance", body = LeaveBalance),
        (status = 400, description = "Negative allotment"),
        (status = 403, description = "HR only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn set_balance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    body: web::Json<SetAllotment>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr()?;

    let balance = store::set_leave_allotment(
        pool.get_ref(),
        path.into_inner(),
        body.year,
        body.total_paid_leave,
        config.default_paid_leave,
    )
    .await?;
    Ok(ok(balance))
}
