use super::handlers::{NewUser, create_user};
use crate::config::Config;
use crate::model::role::Role;
use anyhow::{Result, anyhow};
use sqlx::MySqlPool;
use tracing::{info, warn};

/// Creates the first HR manager from `ADMIN_EMAIL` / `ADMIN_PASSWORD` when
/// the database has none. Without credentials configured nothing happens.
pub async fn ensure_hr_manager(pool: &MySqlPool, config: &Config) -> Result<()> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role_id = ?")
        .bind(Role::HrManager.id())
        .fetch_one(pool)
        .await?;

    if existing > 0 {
        info!(existing, "HR manager already present, skipping bootstrap");
        return Ok(());
    }

    warn!(email = %email, "No HR manager found, creating one from configuration");

    create_user(
        pool,
        NewUser {
            email: email.clone(),
            password: password.clone(),
            first_name: "HR".to_string(),
            last_name: "Manager".to_string(),
            role: Role::HrManager,
            company_id: None,
            employee_id: None,
        },
    )
    .await
    .map_err(|e| anyhow!("Failed to bootstrap HR manager: {e}"))?;

    Ok(())
}
