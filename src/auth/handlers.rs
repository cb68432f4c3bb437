use crate::{
    api::response::{created, ok},
    auth::{
        auth::AuthUser,
        jwt::{TokenSubject, generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::ApiError,
    model::{
        role::Role,
        user::{User, UserProfile},
    },
    models::{Claims, LoginReqDto, RegisterReq, TokenType},
    utils::{email_cache, email_filter},
};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;

pub const MIN_PASSWORD_LEN: usize = 8;

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, role_id, \
                            company_id, employee_id, avatar, last_login_at";

/// A user account about to be created.
#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub company_id: Option<u64>,
    pub employee_id: Option<u64>,
}

impl NewUser {
    fn validate(&self) -> Result<(), ApiError> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ApiError::bad_request("A valid email is required"));
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            return Err(ApiError::bad_request(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(ApiError::bad_request("first_name and last_name are required"));
        }
        Ok(())
    }
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

#[derive(Serialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(email: &str, pool: &MySqlPool) -> Result<bool, ApiError> {
    let email = email_filter::normalize(email);

    // Cuckoo filter: a miss means the email was never registered
    if !email_filter::might_exist(&email) {
        return Ok(true);
    }

    // Moka cache: recently seen emails
    if email_cache::is_taken(&email).await {
        return Ok(false);
    }

    // Database is authoritative
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)",
    )
    .bind(&email)
    .fetch_one(pool)
    .await?;

    if exists {
        email_cache::mark_taken(&email).await;
    }
    Ok(!exists)
}

/// Inserts a user and records its email in the availability filter and cache.
pub async fn create_user(pool: &MySqlPool, new_user: NewUser) -> Result<u64, ApiError> {
    new_user.validate()?;
    let email = email_filter::normalize(&new_user.email);

    if !is_email_available(&email, pool).await? {
        return Err(ApiError::conflict("Email already registered"));
    }

    let hashed = hash_password(&new_user.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ApiError::Internal
    })?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (email, password_hash, first_name, last_name, role_id, company_id, employee_id)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&email)
    .bind(&hashed)
    .bind(new_user.first_name.trim())
    .bind(new_user.last_name.trim())
    .bind(new_user.role.id())
    .bind(new_user.company_id)
    .bind(new_user.employee_id)
    .execute(pool)
    .await
    .map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => ApiError::conflict("Email already registered"),
        other => other,
    })?;

    email_filter::insert(&email);
    email_cache::mark_taken(&email).await;

    let user_id = result.last_insert_id();
    info!(user_id, role = %new_user.role, "User created");
    Ok(user_id)
}

pub async fn find_user_by_email(pool: &MySqlPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
        .bind(email_filter::normalize(email))
        .fetch_optional(pool)
        .await
}

pub async fn find_user(pool: &MySqlPool, user_id: u64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

fn profile_of(user: &User) -> Result<UserProfile, ApiError> {
    user.profile().ok_or_else(|| {
        error!(user_id = user.id, role_id = user.role_id, "User has an unknown role");
        ApiError::Internal
    })
}

fn subject_of(user: &User) -> TokenSubject {
    TokenSubject {
        user_id: user.id,
        email: user.email.clone(),
        role: user.role_id,
        employee_id: user.employee_id,
    }
}

async fn store_refresh_token(
    conn: impl sqlx::MySqlExecutor<'_>,
    user_id: u64,
    claims: &Claims,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(user_id)
    .bind(&claims.jti)
    .bind(claims.exp as i64)
    .execute(conn)
    .await?;
    Ok(())
}

fn issue_pair(subject: &TokenSubject, config: &Config) -> Result<(String, String, Claims), ApiError> {
    let access_token = generate_access_token(subject, &config.jwt_secret, config.access_token_ttl)
        .map_err(|e| {
            error!(error = %e, "Failed to sign access token");
            ApiError::Internal
        })?;
    let (refresh_token, claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl).map_err(
            |e| {
                error!(error = %e, "Failed to sign refresh token");
                ApiError::Internal
            },
        )?;
    Ok((access_token, refresh_token, claims))
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Register a self-service account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Account created", body = UserProfile),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth"
)]
pub async fn register(
    body: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();

    // self-registered accounts start unlinked; HR links them to an employee record
    let user_id = create_user(
        pool.get_ref(),
        NewUser {
            email: body.email,
            password: body.password,
            first_name: body.first_name,
            last_name: body.last_name,
            role: Role::Employee,
            company_id: None,
            employee_id: None,
        },
    )
    .await?;

    let user = find_user(pool.get_ref(), user_id)
        .await?
        .ok_or(ApiError::Internal)?;
    Ok(created(profile_of(&user)?))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair and profile", body = LoginResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, body),
    fields(email = %body.email)
)]
pub async fn login(
    body: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let user = match find_user_by_email(pool.get_ref(), &body.email).await? {
        Some(user) => user,
        None => {
            info!("Invalid credentials: user not found");
            return Err(invalid());
        }
    };

    if let Err(e) = verify_password(&body.password, &user.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(invalid());
    }
    debug!(user_id = user.id, "Password verified");

    let profile = profile_of(&user)?;
    let (access_token, refresh_token, refresh_claims) = issue_pair(&subject_of(&user), &config)?;

    debug!(user_id = user.id, jti = %refresh_claims.jti, "Storing refresh token");
    store_refresh_token(pool.get_ref(), user.id, &refresh_claims).await?;

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(user.id)
        .execute(pool.get_ref())
        .await
    {
        // not fatal for the login itself
        warn!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = user.id, "Login successful");

    Ok(ok(LoginResponse {
        access_token,
        refresh_token,
        user: profile,
    }))
}

/// Rotates a refresh token: the presented one is revoked and a new pair issued.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Invalid refresh token")
    ),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let unauthorized = || ApiError::Unauthorized("Invalid refresh token".to_string());

    let token = bearer_token(&req).ok_or_else(unauthorized)?;
    let claims = verify_token(token, &config.jwt_secret).map_err(|_| unauthorized())?;
    if claims.token_type != TokenType::Refresh {
        return Err(unauthorized());
    }

    let mut tx = pool.begin().await?;

    let record = sqlx::query_as::<_, (u64, u64)>(
        r#"
        SELECT id, user_id
        FROM refresh_tokens
        WHERE jti = ? AND revoked = FALSE AND expires_at > NOW()
        FOR UPDATE
        "#,
    )
    .bind(&claims.jti)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((record_id, user_id)) = record else {
        warn!(jti = %claims.jti, "Refresh token unknown, expired or already used");
        return Err(unauthorized());
    };

    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(record_id)
        .execute(&mut *tx)
        .await?;

    // role or employee link may have changed since the token was issued
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(unauthorized)?;

    let (access_token, refresh_token, new_claims) = issue_pair(&subject_of(&user), &config)?;
    store_refresh_token(&mut *tx, user.id, &new_claims).await?;
    tx.commit().await?;

    debug!(user_id, "Refresh token rotated");

    Ok(ok(TokenPair {
        access_token,
        refresh_token,
    }))
}

/// Revokes the presented refresh token. Always answers 204.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Refresh token revoked")),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> HttpResponse {
    let Some(claims) = bearer_token(&req)
        .and_then(|token| verify_token(token, &config.jwt_secret).ok())
        .filter(|claims| claims.token_type == TokenType::Refresh)
    else {
        return HttpResponse::NoContent().finish();
    };

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
    }

    HttpResponse::NoContent().finish()
}

/// Profile of the authenticated user
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn me(auth: AuthUser, pool: web::Data<MySqlPool>) -> Result<HttpResponse, ApiError> {
    let user = find_user(pool.get_ref(), auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;
    Ok(ok(profile_of(&user)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test};

    fn new_user(email: &str, password: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password: password.to_string(),
            first_name: "Juan".to_string(),
            last_name: "Dela Cruz".to_string(),
            role: Role::Employee,
            company_id: None,
            employee_id: None,
        }
    }

    #[core::prelude::v1::test]
    fn new_user_validation() {
        assert!(new_user("juan@company.com", "long-enough").validate().is_ok());
        assert!(new_user("not-an-email", "long-enough").validate().is_err());
        assert!(new_user("juan@company.com", "short").validate().is_err());

        let mut nameless = new_user("juan@company.com", "long-enough");
        nameless.first_name = "  ".to_string();
        assert!(nameless.validate().is_err());
    }

    macro_rules! lazy_app {
        () => {{
            let pool = MySqlPool::connect_lazy(&Config::for_tests().database_url).unwrap();
            test::init_service(
                App::new()
                    .app_data(web::Data::new(pool))
                    .app_data(web::Data::new(Config::for_tests()))
                    .route("/auth/login", web::post().to(login))
                    .route("/auth/register", web::post().to(register))
                    .route("/auth/refresh", web::post().to(refresh_token))
                    .route("/auth/logout", web::post().to(logout))
                    .route("/me", web::get().to(me)),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn login_requires_email_and_password() {
        let app = lazy_app!();
        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(serde_json::json!({"email": "", "password": ""}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn register_rejects_weak_password_before_touching_db() {
        let app = lazy_app!();
        let req = test::TestRequest::post()
            .uri("/auth/register")
            .set_json(serde_json::json!({
                "email": "juan@company.com",
                "password": "123",
                "first_name": "Juan",
                "last_name": "Dela Cruz"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn refresh_requires_a_refresh_token() {
        let app = lazy_app!();

        let req = test::TestRequest::post().uri("/auth/refresh").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let subject = TokenSubject {
            user_id: 1,
            email: "maria@company.com".to_string(),
            role: Role::HrManager.id(),
            employee_id: Some(1),
        };
        let access = generate_access_token(&subject, "test-secret", 60).unwrap();
        let req = test::TestRequest::post()
            .uri("/auth/refresh")
            .insert_header(("Authorization", format!("Bearer {access}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn logout_without_token_is_no_content() {
        let app = lazy_app!();
        let req = test::TestRequest::post().uri("/auth/logout").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn me_requires_authentication() {
        let app = lazy_app!();
        let req = test::TestRequest::get().uri("/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
