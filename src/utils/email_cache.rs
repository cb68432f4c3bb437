use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

use super::email_filter::normalize;

/// Emails known to be registered. Only taken emails are stored.
static TAKEN_EMAILS: Lazy<Cache<String, ()>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(200_000)
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

pub async fn mark_taken(email: &str) {
    TAKEN_EMAILS.insert(normalize(email), ()).await;
}

pub async fn is_taken(email: &str) -> bool {
    TAKEN_EMAILS.contains_key(&normalize(email))
}

/// Caches the emails of users active in the last `days` days.
pub async fn warmup_email_cache(pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT email
        FROM users
        WHERE last_login_at >= NOW() - INTERVAL ? DAY
        ORDER BY last_login_at DESC
        "#,
    )
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (email,) = row?;
        batch.push(email);
        total += 1;

        if batch.len() >= batch_size {
            futures::future::join_all(batch.drain(..).map(|e| async move { mark_taken(&e).await }))
                .await;
        }
    }

    futures::future::join_all(batch.drain(..).map(|e| async move { mark_taken(&e).await })).await;

    log::info!(
        "Email cache warmup complete: {} recent users (last {} days)",
        total,
        days
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn taken_emails_are_case_insensitive() {
        mark_taken("Carmen.Valdez@Company.com").await;
        assert!(is_taken("carmen.valdez@company.com").await);
        assert!(!is_taken("someone.else@company.com").await);
    }
}
