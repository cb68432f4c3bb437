use crate::{
    api::response::{Page, Pagination, created, message, ok},
    auth::auth::AuthUser,
    error::ApiError,
    model::department::Department,
    utils::db_utils::{ColumnKind, UpdatableColumn, apply_update, column, ensure_reference},
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::Value;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

const DEPARTMENT_SELECT: &str =
    "SELECT id, name, description, company_id, head_id, created_at, updated_at FROM departments";

const DEPARTMENT_COLUMNS: &[UpdatableColumn] = &[
    column("name", ColumnKind::Text),
    column("description", ColumnKind::OptionalText),
    column("head_id", ColumnKind::OptionalId),
];

#[derive(Deserialize, ToSchema)]
pub struct CreateDepartment {
    #[schema(example = "Engineering")]
    pub name: String,
    #[schema(example = "Software development and technical operations")]
    pub description: Option<String>,
    #[schema(example = 1)]
    pub company_id: u64,
    /// Employee heading the department
    #[schema(example = 4)]
    pub head_id: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DepartmentQuery {
    /// Only departments of this company
    pub company_id: Option<u64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub async fn fetch_department(pool: &MySqlPool, id: u64) -> Result<Department, ApiError> {
    sqlx::query_as::<_, Department>(&format!("{DEPARTMENT_SELECT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Department not found"))
}

/// List departments
#[utoipa::path(
    get,
    path = "/api/departments",
    params(DepartmentQuery),
    responses(
        (status = 200, description = "Paginated department list", body = [Department]),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn list_departments(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<DepartmentQuery>,
) -> Result<HttpResponse, ApiError> {
    let (page, per_page, offset) = Pagination::resolve(query.page, query.per_page);
    let where_sql = if query.company_id.is_some() {
        " WHERE company_id = ?"
    } else {
        ""
    };

    let count_sql = format!("SELECT COUNT(*) FROM departments{where_sql}");
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(company_id) = query.company_id {
        count_q = count_q.bind(company_id);
    }
    let total = count_q.fetch_one(pool.get_ref()).await?;

    let data_sql = format!("{DEPARTMENT_SELECT}{where_sql} ORDER BY name LIMIT ? OFFSET ?");
    let mut data_q = sqlx::query_as::<_, Department>(&data_sql);
    if let Some(company_id) = query.company_id {
        data_q = data_q.bind(company_id);
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

/// Create a department
#[utoipa::path(
    post,
    path = "/api/departments",
    request_body = CreateDepartment,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 400, description = "Missing name or unknown company/head"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn create_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<CreateDepartment>,
) -> Result<HttpResponse, ApiError> {
    auth.require(auth.role.can_manage_departments(), "HR manager or supervisor only")?;

    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Department name is required"));
    }
    ensure_reference(pool.get_ref(), "companies", body.company_id, "Company").await?;
    if let Some(head_id) = body.head_id {
        ensure_reference(pool.get_ref(), "employees", head_id, "Employee").await?;
    }

    let result = sqlx::query(
        "INSERT INTO departments (name, description, company_id, head_id) VALUES (?, ?, ?, ?)",
    )
    .bind(name)
    .bind(&body.description)
    .bind(body.company_id)
    .bind(body.head_id)
    .execute(pool.get_ref())
    .await?;

    let id = result.last_insert_id();
    info!(department_id = id, company_id = body.company_id, "Department created");

    Ok(created(fetch_department(pool.get_ref(), id).await?))
}

/// Get a department
#[utoipa::path(
    get,
    path = "/api/departments/{id}",
    params(("id" = u64, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department found", body = Department),
        (status = 404, description = "Department not found")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn get_department(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    Ok(ok(fetch_department(pool.get_ref(), path.into_inner()).await?))
}

/// Update a department; `head_id: null` removes the head
#[utoipa::path(
    put,
    path = "/api/departments/{id}",
    params(("id" = u64, Path, description = "Department ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 400, description = "Unknown or invalid field"),
        (status = 404, description = "Department not found")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn update_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    auth.require(auth.role.can_manage_departments(), "HR manager or supervisor only")?;
    let id = path.into_inner();

    if let Some(head_id) = body.get("head_id").and_then(Value::as_u64) {
        ensure_reference(pool.get_ref(), "employees", head_id, "Employee").await?;
    }

    apply_update(pool.get_ref(), "departments", id, &body, DEPARTMENT_COLUMNS, "Department not found")
        .await?;
    info!(department_id = id, by = auth.user_id, "Department updated");

    Ok(ok(fetch_department(pool.get_ref(), id).await?))
}

/// Delete a department. Refused while employees still belong to it.
#[utoipa::path(
    delete,
    path = "/api/departments/{id}",
    params(("id" = u64, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department deleted"),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Department still has employees")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn delete_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require(auth.role.can_manage_departments(), "HR manager or supervisor only")?;
    let id = path.into_inner();

    let result = sqlx::query("DELETE FROM departments WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => ApiError::conflict("Department still has employees"),
            other => other,
        })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Department not found"));
    }

    info!(department_id = id, by = auth.user_id, "Department deleted");
    Ok(message("Department deleted"))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{bearer, peer};
    use crate::model::role::Role;
    use actix_web::{http::StatusCode, test};

    #[actix_web::test]
    async fn hr_company_cannot_manage_departments() {
        let app = crate::test_app!();
        let req = test::TestRequest::post()
            .uri("/api/departments")
            .peer_addr(peer())
            .insert_header(bearer(Role::HrCompany, Some(2)))
            .set_json(serde_json::json!({"name": "Finance", "company_id": 1}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::delete()
            .uri("/api/departments/1")
            .peer_addr(peer())
            .insert_header(bearer(Role::HrCompany, Some(2)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn department_update_refuses_company_move() {
        let app = crate::test_app!();
        let req = test::TestRequest::put()
            .uri("/api/departments/1")
            .peer_addr(peer())
            .insert_header(bearer(Role::HrSupervisor, Some(2)))
            .set_json(serde_json::json!({"company_id": 2}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
