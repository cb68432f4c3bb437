use crate::{
    api::response::{Page, Pagination, created, ok},
    auth::{
        auth::AuthUser,
        handlers::{NewUser, create_user, find_user},
    },
    error::ApiError,
    model::{
        role::Role,
        user::{User, UserProfile},
    },
    utils::db_utils::{
        ColumnKind, UpdatableColumn, apply_update, column, ensure_reference,
    },
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value, json};
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

const USER_COLUMNS: &[UpdatableColumn] = &[
    column("role_id", ColumnKind::Id),
    column("company_id", ColumnKind::OptionalId),
    column("employee_id", ColumnKind::OptionalId),
];

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "ana.reyes@company.com")]
    pub email: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
    #[schema(example = "Ana")]
    pub first_name: String,
    #[schema(example = "Reyes")]
    pub last_name: String,
    pub role: Role,
    #[schema(example = 1)]
    pub company_id: Option<u64>,
    /// Employee record the account acts for
    #[schema(example = 4)]
    pub employee_id: Option<u64>,
}

/// Role and links of an existing account. Absent fields stay unchanged,
/// an explicit `null` clears the link.
#[derive(Deserialize, ToSchema)]
pub struct UpdateUser {
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<u64>, example = 1)]
    pub company_id: Option<Option<u64>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<u64>, example = 4)]
    pub employee_id: Option<Option<u64>>,
}

// present-but-null becomes Some(None); absence is handled by `default`
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn link(id: Option<u64>) -> Value {
    id.map_or(Value::Null, |id| json!(id))
}

impl UpdateUser {
    fn into_payload(self) -> Value {
        let mut fields = Map::new();
        if let Some(role) = self.role {
            fields.insert("role_id".to_string(), json!(role.id()));
        }
        if let Some(company_id) = self.company_id {
            fields.insert("company_id".to_string(), link(company_id));
        }
        if let Some(employee_id) = self.employee_id {
            fields.insert("employee_id".to_string(), link(employee_id));
        }
        Value::Object(fields)
    }
}

fn profiles(users: Vec<User>) -> Vec<UserProfile> {
    users.iter().filter_map(User::profile).collect()
}

async fn fetch_profile(pool: &MySqlPool, id: u64) -> Result<UserProfile, ApiError> {
    find_user(pool, id)
        .await?
        .as_ref()
        .and_then(User::profile)
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// List user accounts
#[utoipa::path(
    get,
    path = "/api/users",
    params(Pagination),
    responses(
        (status = 200, description = "Paginated user list", body = [UserProfile]),
        (status = 403, description = "Forbidden")
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<Pagination>,
) -> Result<HttpResponse, ApiError> {
    auth.require(auth.role.can_manage_users(), "HR manager only")?;
    let (page, per_page, offset) = Pagination::resolve(query.page, query.per_page);

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool.get_ref())
        .await?;

    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password_hash, first_name, last_name, role_id,
               company_id, employee_id, avatar, last_login_at
        FROM users
        ORDER BY email
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(ok(Page {
        items: profiles(users),
        page,
        per_page,
        total,
    }))
}

/// Create a user account with any role
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserProfile),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email already registered")
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn create_user_account(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<CreateUser>,
) -> Result<HttpResponse, ApiError> {
    auth.require(auth.role.can_manage_users(), "HR manager only")?;
    let body = body.into_inner();

    if let Some(company_id) = body.company_id {
        ensure_reference(pool.get_ref(), "companies", company_id, "Company").await?;
    }
    if let Some(employee_id) = body.employee_id {
        ensure_reference(pool.get_ref(), "employees", employee_id, "Employee").await?;
    }

    let id = create_user(
        pool.get_ref(),
        NewUser {
            email: body.email,
            password: body.password,
            first_name: body.first_name,
            last_name: body.last_name,
            role: body.role,
            company_id: body.company_id,
            employee_id: body.employee_id,
        },
    )
    .await?;

    Ok(created(fetch_profile(pool.get_ref(), id).await?))
}

/// Change role or employee link of a user. Takes effect at the next token refresh.
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = u64, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = UserProfile),
        (status = 400, description = "Nothing to update or unknown reference"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateUser>,
) -> Result<HttpResponse, ApiError> {
    auth.require(auth.role.can_manage_users(), "HR manager only")?;
    let id = path.into_inner();
    let body = body.into_inner();

    if id == auth.user_id && body.role.is_some_and(|r| r != auth.role) {
        return Err(ApiError::bad_request("You cannot change your own role"));
    }
    if let Some(Some(company_id)) = body.company_id {
        ensure_reference(pool.get_ref(), "companies", company_id, "Company").await?;
    }
    if let Some(Some(employee_id)) = body.employee_id {
        ensure_reference(pool.get_ref(), "employees", employee_id, "Employee").await?;
    }

    apply_update(pool.get_ref(), "users", id, &body.into_payload(), USER_COLUMNS, "User not found")
        .await?;
    info!(user_id = id, by = auth.user_id, "User updated");

    Ok(ok(fetch_profile(pool.get_ref(), id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{bearer, peer};
    use actix_web::{http::StatusCode, test};

    #[core::prelude::v1::test]
    fn update_payload_holds_only_given_fields() {
        let payload = UpdateUser {
            role: Some(Role::DepartmentHead),
            company_id: None,
            employee_id: Some(Some(4)),
        }
        .into_payload();
        assert_eq!(payload, json!({"role_id": 4, "employee_id": 4}));
    }

    #[core::prelude::v1::test]
    fn null_link_clears_it_and_absent_link_is_left_alone() {
        let body: UpdateUser = serde_json::from_value(json!({"employee_id": null})).unwrap();
        assert_eq!(body.employee_id, Some(None));
        assert_eq!(body.company_id, None);
        assert_eq!(body.into_payload(), json!({"employee_id": null}));
    }

    #[actix_web::test]
    async fn only_hr_manager_manages_users() {
        let app = crate::test_app!();
        let req = test::TestRequest::get()
            .uri("/api/users")
            .peer_addr(peer())
            .insert_header(bearer(Role::HrSupervisor, Some(2)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn empty_update_is_a_bad_request() {
        let app = crate::test_app!();
        let req = test::TestRequest::put()
            .uri("/api/users/5")
            .peer_addr(peer())
            .insert_header(bearer(Role::HrManager, Some(1)))
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn hr_manager_cannot_demote_themselves() {
        let app = crate::test_app!();
        // test tokens carry user_id 100
        let req = test::TestRequest::put()
            .uri("/api/users/100")
            .peer_addr(peer())
            .insert_header(bearer(Role::HrManager, Some(1)))
            .set_json(json!({"role": "EMPLOYEE"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
