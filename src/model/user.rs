use super::role::Role;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Row of the `users` table, password hash included.
#[derive(Debug, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role_id: u8,
    pub company_id: Option<u64>,
    pub employee_id: Option<u64>,
    pub avatar: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// What the API exposes about a user.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserProfile {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "maria.santos@company.com")]
    pub email: String,
    #[schema(example = "Maria")]
    pub first_name: String,
    #[schema(example = "Santos")]
    pub last_name: String,
    pub role: Role,
    #[schema(example = "HR Manager")]
    pub role_name: String,
    pub company_id: Option<u64>,
    pub employee_id: Option<u64>,
    pub avatar: Option<String>,
}

impl User {
    pub fn role(&self) -> Option<Role> {
        Role::from_id(self.role_id)
    }

    pub fn profile(&self) -> Option<UserProfile> {
        let role = self.role()?;
        Some(UserProfile {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role,
            role_name: role.display_name().to_string(),
            company_id: self.company_id,
            employee_id: self.employee_id,
            avatar: self.avatar.clone(),
        })
    }
}
