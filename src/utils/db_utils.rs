use crate::error::ApiError;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use sqlx::MySqlPool;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    Date(NaiveDate),
    Null,
}

/// How a JSON field is turned into a column value.
#[derive(Debug, Clone, Copy)]
pub enum ColumnKind {
    /// NOT NULL text; empty strings are refused
    Text,
    OptionalText,
    Id,
    OptionalId,
    Date,
    /// NOT NULL text restricted to a fixed set of values
    OneOf(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct UpdatableColumn {
    pub name: &'static str,
    pub kind: ColumnKind,
}

pub const fn column(name: &'static str, kind: ColumnKind) -> UpdatableColumn {
    UpdatableColumn { name, kind }
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

fn convert(col: &UpdatableColumn, value: &Value) -> Result<SqlValue, ApiError> {
    let invalid = || ApiError::bad_request(format!("Invalid value for {}", col.name));

    match (col.kind, value) {
        (ColumnKind::OptionalText | ColumnKind::OptionalId, Value::Null) => Ok(SqlValue::Null),
        (ColumnKind::Text, Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                Err(ApiError::bad_request(format!("{} cannot be empty", col.name)))
            } else {
                Ok(SqlValue::String(s.to_string()))
            }
        }
        (ColumnKind::OptionalText, Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                Ok(SqlValue::Null)
            } else {
                Ok(SqlValue::String(s.to_string()))
            }
        }
        (ColumnKind::Id | ColumnKind::OptionalId, Value::Number(n)) => {
            n.as_u64().map(SqlValue::U64).ok_or_else(invalid)
        }
        (ColumnKind::Date, Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(SqlValue::Date)
            .map_err(|_| ApiError::bad_request(format!("{} must be a YYYY-MM-DD date", col.name))),
        (ColumnKind::OneOf(allowed), Value::String(s)) => {
            if allowed.contains(&s.as_str()) {
                Ok(SqlValue::String(s.clone()))
            } else {
                Err(ApiError::bad_request(format!(
                    "{} must be one of: {}",
                    col.name,
                    allowed.join(", ")
                )))
            }
        }
        _ => Err(invalid()),
    }
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
/// Only keys listed in `columns` are accepted; anything else is a 400, so
/// request bodies never reach the SQL text.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    columns: &[UpdatableColumn],
    id_value: u64,
) -> Result<SqlUpdate, ApiError> {
    let obj: &Map<String, Value> = payload
        .as_object()
        .ok_or_else(|| ApiError::bad_request("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ApiError::bad_request("No fields provided for update"));
    }

    let mut set_clause = Vec::with_capacity(obj.len());
    let mut values = Vec::with_capacity(obj.len() + 1);

    for (key, value) in obj {
        let col = columns
            .iter()
            .find(|c| c.name == key)
            .ok_or_else(|| ApiError::bad_request(format!("Field {key} cannot be updated")))?;
        set_clause.push(format!("{} = ?", col.name));
        values.push(convert(col, value)?);
    }

    let sql = format!("UPDATE {} SET {} WHERE id = ?", table, set_clause.join(", "));

    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

/// Whether a row with `id` exists in `table`. MySQL reports zero affected
/// rows for an UPDATE that changes nothing, so "not found" is decided here.
pub async fn row_exists(pool: &MySqlPool, table: &str, id: u64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(&format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?)"))
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Validates `payload` against `columns` and updates row `id` of `table`.
pub async fn apply_update(
    pool: &MySqlPool,
    table: &str,
    id: u64,
    payload: &Value,
    columns: &[UpdatableColumn],
    not_found: &str,
) -> Result<(), ApiError> {
    let update = build_update_sql(table, payload, columns, id)?;

    if !row_exists(pool, table, id).await? {
        return Err(ApiError::not_found(not_found));
    }

    execute_update(pool, update).await?;
    Ok(())
}

/// 400 when a referenced row is missing, instead of a foreign-key failure.
pub async fn ensure_reference(
    pool: &MySqlPool,
    table: &str,
    id: u64,
    what: &str,
) -> Result<(), ApiError> {
    if row_exists(pool, table, id).await? {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!("{what} {id} does not exist")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLUMNS: &[UpdatableColumn] = &[
        column("name", ColumnKind::Text),
        column("description", ColumnKind::OptionalText),
        column("head_id", ColumnKind::OptionalId),
        column("date_hired", ColumnKind::Date),
        column("gender", ColumnKind::OneOf(&["Male", "Female", "Other"])),
    ];

    #[test]
    fn builds_set_clause_in_payload_order() {
        let update = build_update_sql(
            "departments",
            &json!({"name": " Engineering ", "head_id": 4}),
            COLUMNS,
            9,
        )
        .unwrap();
        assert_eq!(update.sql, "UPDATE departments SET name = ?, head_id = ? WHERE id = ?");
        assert_eq!(
            update.values,
            vec![
                SqlValue::String("Engineering".to_string()),
                SqlValue::U64(4),
                SqlValue::U64(9)
            ]
        );
    }

    #[test]
    fn unknown_columns_are_refused() {
        let err = build_update_sql(
            "departments",
            &json!({"name = 'x'; DROP TABLE users; --": 1}),
            COLUMNS,
            1,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn values_are_checked_against_column_kind() {
        assert!(build_update_sql("t", &json!({"name": ""}), COLUMNS, 1).is_err());
        assert!(build_update_sql("t", &json!({"name": null}), COLUMNS, 1).is_err());
        assert!(build_update_sql("t", &json!({"date_hired": "15/01/2023"}), COLUMNS, 1).is_err());
        assert!(build_update_sql("t", &json!({"gender": "male"}), COLUMNS, 1).is_err());
        assert!(build_update_sql("t", &json!({"head_id": -1}), COLUMNS, 1).is_err());

        let update = build_update_sql(
            "t",
            &json!({"description": "", "head_id": null, "date_hired": "2023-01-15"}),
            COLUMNS,
            1,
        )
        .unwrap();
        assert_eq!(update.values[0], SqlValue::Null);
        assert_eq!(update.values[1], SqlValue::Null);
        assert_eq!(
            update.values[2],
            SqlValue::Date(NaiveDate::from_ymd_opt(2023, 1, 15).unwrap())
        );
    }

    #[test]
    fn empty_or_non_object_payload_is_refused() {
        assert!(build_update_sql("t", &json!({}), COLUMNS, 1).is_err());
        assert!(build_update_sql("t", &json!([1, 2]), COLUMNS, 1).is_err());
    }
}
