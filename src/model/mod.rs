pub mod company;
pub mod department;
pub mod employee;
pub mod job_title;
pub mod leave_application;
pub mod leave_balance;
pub mod leave_day;
pub mod role;
pub mod user;

use sqlx::Row;
use sqlx::mysql::MySqlRow;
use std::str::FromStr;

/// Reads a string column and parses it into one of the model enums.
pub(crate) fn parse_column<T>(row: &MySqlRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}
