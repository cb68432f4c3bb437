use crate::{
    api::response::{Page, Pagination, created, message, ok},
    auth::auth::AuthUser,
    error::ApiError,
    model::job_title::JobTitle,
    utils::db_utils::{ColumnKind, UpdatableColumn, apply_update, column, ensure_reference},
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::Value;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

const JOB_TITLE_SELECT: &str =
    "SELECT id, title, description, department_id, created_at, updated_at FROM job_titles";

const JOB_TITLE_COLUMNS: &[UpdatableColumn] = &[
    column("title", ColumnKind::Text),
    column("description", ColumnKind::OptionalText),
    column("department_id", ColumnKind::Id),
];

#[derive(Deserialize, ToSchema)]
pub struct CreateJobTitle {
    #[schema(example = "Software Engineer")]
    pub title: String,
    #[schema(example = "Develops and maintains software applications")]
    pub description: Option<String>,
    #[schema(example = 1)]
    pub department_id: u64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct JobTitleQuery {
    /// Only job titles of this department
    pub department_id: Option<u64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

async fn fetch_job_title(pool: &MySqlPool, id: u64) -> Result<JobTitle, ApiError> {
    sqlx::query_as::<_, JobTitle>(&format!("{JOB_TITLE_SELECT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Job title not found"))
}

/// List job titles
#[utoipa::path(
    get,
    path = "/api/job-titles",
    params(JobTitleQuery),
    responses(
        (status = 200, description = "Paginated job title list", body = [JobTitle]),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Job Title",
    security(("bearer_auth" = []))
)]
pub async fn list_job_titles(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<JobTitleQuery>,
) -> Result<HttpResponse, ApiError> {
    let (page, per_page, offset) = Pagination::resolve(query.page, query.per_page);
    let where_sql = if query.department_id.is_some() {
        " WHERE department_id = ?"
    } else {
        ""
    };

    let count_sql = format!("SELECT COUNT(*) FROM job_titles{where_sql}");
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(department_id) = query.department_id {
        count_q = count_q.bind(department_id);
    }
    let total = count_q.fetch_one(pool.get_ref()).await?;

    let data_sql = format!("{JOB_TITLE_SELECT}{where_sql} ORDER BY title LIMIT ? OFFSET ?");
    let mut data_q = sqlx::query_as::<_, JobTitle>(&data_sql);
    if let Some(department_id) = query.department_id {
        data_q = data_q.bind(department_id);
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

/// Create a job title
#[utoipa::path(
    post,
    path = "/api/job-titles",
    request_body = CreateJobTitle,
    responses(
        (status = 201, description = "Job title created", body = JobTitle),
        (status = 400, description = "Missing title or unknown department"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Job Title",
    security(("bearer_auth" = []))
)]
pub async fn create_job_title(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<CreateJobTitle>,
) -> Result<HttpResponse, ApiError> {
    auth.require(auth.role.can_manage_job_titles(), "HR only")?;

    let title = body.title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("Job title is required"));
    }
    ensure_reference(pool.get_ref(), "departments", body.department_id, "Department").await?;

    let result =
        sqlx::query("INSERT INTO job_titles (title, description, department_id) VALUES (?, ?, ?)")
            .bind(title)
            .bind(&body.description)
            .bind(body.department_id)
            .execute(pool.get_ref())
            .await?;

    let id = result.last_insert_id();
    info!(job_title_id = id, department_id = body.department_id, "Job title created");

    Ok(created(fetch_job_title(pool.get_ref(), id).await?))
}

/// Get a job title
#[utoipa::path(
    get,
    path = "/api/job-titles/{id}",
    params(("id" = u64, Path, description = "Job title ID")),
    responses(
        (status = 200, description = "Job title found", body = JobTitle),
        (status = 404, description = "Job title not found")
    ),
    tag = "Job Title",
    security(("bearer_auth" = []))
)]
pub async fn get_job_title(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    Ok(ok(fetch_job_title(pool.get_ref(), path.into_inner()).await?))
}

/// Update a job title
#[utoipa::path(
    put,
    path = "/api/job-titles/{id}",
    params(("id" = u64, Path, description = "Job title ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Job title updated", body = JobTitle),
        (status = 400, description = "Unknown or invalid field"),
        (status = 404, description = "Job title not found")
    ),
    tag = "Job Title",
    security(("bearer_auth" = []))
)]
pub async fn update_job_title(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    auth.require(auth.role.can_manage_job_titles(), "HR only")?;
    let id = path.into_inner();

    if let Some(department_id) = body.get("department_id").and_then(Value::as_u64) {
        ensure_reference(pool.get_ref(), "departments", department_id, "Department").await?;
    }

    apply_update(pool.get_ref(), "job_titles", id, &body, JOB_TITLE_COLUMNS, "Job title not found")
        .await?;
    info!(job_title_id = id, by = auth.user_id, "Job title updated");

    Ok(ok(fetch_job_title(pool.get_ref(), id).await?))
}

/// Delete a job title. Refused while employees hold it.
#[utoipa::path(
    delete,
    path = "/api/job-titles/{id}",
    params(("id" = u64, Path, description = "Job title ID")),
    responses(
        (status = 200, description = "Job title deleted"),
        (status = 404, description = "Job title not found"),
        (status = 409, description = "Job title still in use")
    ),
    tag = "Job Title",
    security(("bearer_auth" = []))
)]
pub async fn delete_job_title(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require(auth.role.can_manage_job_titles(), "HR only")?;
    let id = path.into_inner();

    let result = sqlx::query("DELETE FROM job_titles WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => ApiError::conflict("Job title is still assigned to employees"),
            other => other,
        })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Job title not found"));
    }

    info!(job_title_id = id, by = auth.user_id, "Job title deleted");
    Ok(message("Job title deleted"))
}
