use super::parse_column;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlRow;
use sqlx::{FromRow, Row};
use strum::{AsRefStr, Display, EnumString, EnumVariantNames};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumVariantNames, ToSchema)]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumVariantNames, ToSchema)]
pub enum CivilStatus {
    Single,
    Married,
    Divorced,
    Widowed,
    Separated,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumVariantNames, ToSchema)]
pub enum EmploymentStatus {
    Probationary,
    Regular,
    Contractual,
    ProjectBased,
    Resigned,
    Terminated,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_number": "EMP001",
        "first_name": "Juan",
        "last_name": "Dela Cruz",
        "middle_name": "Santos",
        "birth_date": "1990-05-15",
        "gender": "Male",
        "civil_status": "Married",
        "email": "juan.delacruz@company.com",
        "phone_number": "+63 917 123 4567",
        "address": "123 Rizal Street, Makati, Metro Manila 1200, Philippines",
        "sss_number": "12-3456789-0",
        "philhealth_number": "PH123456789",
        "pagibig_number": "PG123456789",
        "tin": "123-456-789-000",
        "company_id": 1,
        "department_id": 1,
        "job_title_id": 1,
        "date_hired": "2023-01-15",
        "employment_status": "Regular",
        "avatar": null,
        "created_at": "2023-01-15T08:00:00Z",
        "updated_at": "2024-01-15T08:00:00Z"
    })
)]
pub struct Employee {
    pub id: u64,
    pub employee_number: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    #[schema(value_type = String, format = "date")]
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub civil_status: CivilStatus,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    pub sss_number: Option<String>,
    pub philhealth_number: Option<String>,
    pub pagibig_number: Option<String>,
    pub tin: Option<String>,
    pub company_id: u64,
    pub department_id: u64,
    pub job_title_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date_hired: NaiveDate,
    pub employment_status: EmploymentStatus,
    pub avatar: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl<'r> FromRow<'r, MySqlRow> for Employee {
    fn from_row(row: &'r MySqlRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            employee_number: row.try_get("employee_number")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            middle_name: row.try_get("middle_name")?,
            birth_date: row.try_get("birth_date")?,
            gender: parse_column(row, "gender")?,
            civil_status: parse_column(row, "civil_status")?,
            email: row.try_get("email")?,
            phone_number: row.try_get("phone_number")?,
            address: row.try_get("address")?,
            sss_number: row.try_get("sss_number")?,
            philhealth_number: row.try_get("philhealth_number")?,
            pagibig_number: row.try_get("pagibig_number")?,
            tin: row.try_get("tin")?,
            company_id: row.try_get("company_id")?,
            department_id: row.try_get("department_id")?,
            job_title_id: row.try_get("job_title_id")?,
            date_hired: row.try_get("date_hired")?,
            employment_status: parse_column(row, "employment_status")?,
            avatar: row.try_get("avatar")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
