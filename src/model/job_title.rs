use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct JobTitle {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Software Engineer")]
    pub title: String,
    #[schema(example = "Develops and maintains software applications", nullable = true)]
    pub description: Option<String>,
    #[schema(example = 1)]
    pub department_id: u64,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}
