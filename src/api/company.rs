use crate::{
    api::response::{Page, Pagination, created, message, ok},
    auth::auth::AuthUser,
    error::ApiError,
    model::company::Company,
    utils::db_utils::{ColumnKind, UpdatableColumn, apply_update, column},
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::Value;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

const COMPANY_SELECT: &str = "SELECT id, name, description, address, contact_email, contact_phone, \
                              created_at, updated_at FROM companies";

const COMPANY_COLUMNS: &[UpdatableColumn] = &[
    column("name", ColumnKind::Text),
    column("description", ColumnKind::OptionalText),
    column("address", ColumnKind::OptionalText),
    column("contact_email", ColumnKind::OptionalText),
    column("contact_phone", ColumnKind::OptionalText),
];

#[derive(Deserialize, ToSchema)]
pub struct CreateCompany {
    #[schema(example = "TechCorp Philippines")]
    pub name: String,
    #[schema(example = "Leading technology company in the Philippines")]
    pub description: Option<String>,
    #[schema(example = "BGC, Taguig City, Metro Manila, Philippines")]
    pub address: Option<String>,
    #[schema(example = "info@techcorp.ph")]
    pub contact_email: Option<String>,
    #[schema(example = "+63 2 8123 4567")]
    pub contact_phone: Option<String>,
}

pub async fn fetch_company(pool: &MySqlPool, id: u64) -> Result<Company, ApiError> {
    sqlx::query_as::<_, Company>(&format!("{COMPANY_SELECT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Company not found"))
}

/// List companies
#[utoipa::path(
    get,
    path = "/api/companies",
    params(Pagination),
    responses(
        (status = 200, description = "Paginated company list", body = [Company]),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Company",
    security(("bearer_auth" = []))
)]
pub async fn list_companies(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<Pagination>,
) -> Result<HttpResponse, ApiError> {
    let (page, per_page, offset) = Pagination::resolve(query.page, query.per_page);

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM companies")
        .fetch_one(pool.get_ref())
        .await?;

    let items = sqlx::query_as::<_, Company>(&format!("{COMPANY_SELECT} ORDER BY name LIMIT ? OFFSET ?"))
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

/// Create a company
#[utoipa::path(
    post,
    path = "/api/companies",
    request_body = CreateCompany,
    responses(
        (status = 201, description = "Company created", body = Company),
        (status = 400, description = "Company name is required"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Company",
    security(("bearer_auth" = []))
)]
pub async fn create_company(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<CreateCompany>,
) -> Result<HttpResponse, ApiError> {
    auth.require(auth.role.can_manage_company(), "HR manager only")?;

    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Company name is required"));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO companies (name, description, address, contact_email, contact_phone)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(&body.description)
    .bind(&body.address)
    .bind(&body.contact_email)
    .bind(&body.contact_phone)
    .execute(pool.get_ref())
    .await?;

    let id = result.last_insert_id();
    info!(company_id = id, by = auth.user_id, "Company created");

    Ok(created(fetch_company(pool.get_ref(), id).await?))
}

/// Get a company
#[utoipa::path(
    get,
    path = "/api/companies/{id}",
    params(("id" = u64, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Company found", body = Company),
        (status = 404, description = "Company not found")
    ),
    tag = "Company",
    security(("bearer_auth" = []))
)]
pub async fn get_company(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    Ok(ok(fetch_company(pool.get_ref(), path.into_inner()).await?))
}

/// Update a company; only the fields present in the body change
#[utoipa::path(
    put,
    path = "/api/companies/{id}",
    params(("id" = u64, Path, description = "Company ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Company updated", body = Company),
        (status = 400, description = "Unknown or invalid field"),
        (status = 404, description = "Company not found")
    ),
    tag = "Company",
    security(("bearer_auth" = []))
)]
pub async fn update_company(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    auth.require(auth.role.can_manage_company(), "HR manager only")?;
    let id = path.into_inner();

    apply_update(pool.get_ref(), "companies", id, &body, COMPANY_COLUMNS, "Company not found").await?;
    info!(company_id = id, by = auth.user_id, "Company updated");

    Ok(ok(fetch_company(pool.get_ref(), id).await?))
}

/// Delete a company together with its departments, job titles and employees
#[utoipa::path(
    delete,
    path = "/api/companies/{id}",
    params(("id" = u64, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Company deleted"),
        (status = 404, description = "Company not found")
    ),
    tag = "Company",
    security(("bearer_auth" = []))
)]
pub async fn delete_company(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require(auth.role.can_manage_company(), "HR manager only")?;
    let id = path.into_inner();

    let result = sqlx::query("DELETE FROM companies WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Company not found"));
    }

    info!(company_id = id, by = auth.user_id, "Company deleted");
    Ok(message("Company deleted"))
}
