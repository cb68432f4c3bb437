use super::days::{check_balance, paid_days_by_year, reshape_leave_days, summarize};
use super::rules::{self, LeaveAction, WorkflowError};
use super::{LeaveDraft, LeaveEdit};
use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::leave_application::{LEAVE_SELECT, LeaveApplication, LeaveStatus};
use crate::model::leave_balance::LeaveBalance;
use crate::model::leave_day::LeaveDay;
use crate::model::role::Role;
use chrono::Utc;
use sqlx::{MySql, MySqlConnection, MySqlPool, QueryBuilder};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// Loads one application with its leave days. `lock` takes a row lock for
/// the rest of the surrounding transaction.
pub async fn fetch_application(
    conn: &mut MySqlConnection,
    id: u64,
    lock: bool,
) -> Result<Option<LeaveApplication>, sqlx::Error> {
    let sql = format!(
        "{LEAVE_SELECT} WHERE la.id = ?{}",
        if lock { " FOR UPDATE" } else { "" }
    );

    let Some(mut leave) = sqlx::query_as::<_, LeaveApplication>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    leave.leave_days = load_days(conn, id).await?;
    Ok(Some(leave))
}

pub async fn get_leave_application(
    pool: &MySqlPool,
    id: u64,
) -> Result<Option<LeaveApplication>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    fetch_application(&mut conn, id, false).await
}

async fn load_days(conn: &mut MySqlConnection, leave_id: u64) -> Result<Vec<LeaveDay>, sqlx::Error> {
    sqlx::query_as::<_, LeaveDay>(
        "SELECT date, is_paid FROM leave_days WHERE leave_application_id = ? ORDER BY date",
    )
    .bind(leave_id)
    .fetch_all(conn)
    .await
}

async fn replace_days(
    conn: &mut MySqlConnection,
    leave_id: u64,
    days: &[LeaveDay],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM leave_days WHERE leave_application_id = ?")
        .bind(leave_id)
        .execute(&mut *conn)
        .await?;

    if days.is_empty() {
        return Ok(());
    }

    let mut insert: QueryBuilder<MySql> =
        QueryBuilder::new("INSERT INTO leave_days (leave_application_id, date, is_paid) ");
    insert.push_values(days, |mut row, day| {
        row.push_bind(leave_id).push_bind(day.date).push_bind(day.is_paid);
    });
    insert.build().execute(conn).await?;
    Ok(())
}

async fn ensure_employee_exists(conn: &mut MySqlConnection, employee_id: u64) -> Result<(), ApiError> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM employees WHERE id = ?)")
        .bind(employee_id)
        .fetch_one(conn)
        .await?;
    if exists {
        Ok(())
    } else {
        Err(ApiError::not_found("Employee not found"))
    }
}

/// Paid days that count against a balance besides `used_paid_leave`.
#[derive(Debug, Clone, Copy)]
enum Reserved {
    /// Paid days of the employee's open applications, except `except`
    OpenApplications { except: Option<u64> },
    /// Nothing beyond what is already deducted
    Nothing,
}

/// Paid days in `year` held by `Pending` and `Approved_by_Department`
/// applications of the employee.
async fn held_paid_days(
    conn: &mut MySqlConnection,
    employee_id: u64,
    year: i32,
    except: Option<u64>,
) -> Result<i32, sqlx::Error> {
    let held = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM leave_days ld
        JOIN leave_applications la ON la.id = ld.leave_application_id
        WHERE la.employee_id = ?
          AND la.status IN (?, ?)
          AND la.id <> ?
          AND ld.is_paid = TRUE
          AND YEAR(ld.date) = ?
        "#,
    )
    .bind(employee_id)
    .bind(LeaveStatus::Pending.as_ref())
    .bind(LeaveStatus::ApprovedByDepartment.as_ref())
    .bind(except.unwrap_or(0))
    .bind(year)
    .fetch_one(conn)
    .await?;
    Ok(held as i32)
}

/// Available paid leave per requested year, locking existing balance rows.
async fn available_by_year(
    conn: &mut MySqlConnection,
    employee_id: u64,
    years: impl Iterator<Item = i32>,
    default_paid_leave: i32,
    reserved: Reserved,
) -> Result<BTreeMap<i32, i32>, sqlx::Error> {
    let mut available = BTreeMap::new();
    for year in years {
        let balance = sqlx::query_as::<_, LeaveBalance>(
            r#"
            SELECT employee_id, year, total_paid_leave, used_paid_leave
            FROM leave_balances
            WHERE employee_id = ? AND year = ?
            FOR UPDATE
            "#,
        )
        .bind(employee_id)
        .bind(year)
        .fetch_optional(&mut *conn)
        .await?
        .unwrap_or_else(|| LeaveBalance::fresh(employee_id, year, default_paid_leave));

        let held = match reserved {
            Reserved::OpenApplications { except } => {
                held_paid_days(&mut *conn, employee_id, year, except).await?
            }
            Reserved::Nothing => 0,
        };
        available.insert(year, (balance.available() - held).max(0));
    }
    Ok(available)
}

async fn ensure_balance_covers(
    conn: &mut MySqlConnection,
    employee_id: u64,
    days: &[LeaveDay],
    default_paid_leave: i32,
    reserved: Reserved,
) -> Result<(), ApiError> {
    let requested = paid_days_by_year(days);
    let available = available_by_year(
        conn,
        employee_id,
        requested.keys().copied(),
        default_paid_leave,
        reserved,
    )
    .await?;
    check_balance(&requested, |year| {
        available.get(&year).copied().unwrap_or(default_paid_leave)
    })?;
    Ok(())
}

/// Adds `delta` paid days to `used_paid_leave` for one year, creating the
/// balance row with the default allotment when missing. A negative delta
/// credits days back.
pub async fn update_leave_balance(
    conn: &mut MySqlConnection,
    employee_id: u64,
    year: i32,
    delta: i32,
    default_paid_leave: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO leave_balances (employee_id, year, total_paid_leave, used_paid_leave)
        VALUES (?, ?, ?, GREATEST(?, 0))
        ON DUPLICATE KEY UPDATE used_paid_leave = GREATEST(used_paid_leave + ?, 0)
        "#,
    )
    .bind(employee_id)
    .bind(year)
    .bind(default_paid_leave)
    .bind(delta)
    .bind(delta)
    .execute(conn)
    .await?;

    debug!(employee_id, year, delta, "Leave balance updated");
    Ok(())
}

/// Balance for one year; a year without a row reports the default allotment.
pub async fn get_leave_balance(
    pool: &MySqlPool,
    employee_id: u64,
    year: i32,
    default_paid_leave: i32,
) -> Result<LeaveBalance, ApiError> {
    ensure_employee_exists(&mut *pool.acquire().await?, employee_id).await?;

    let balance = sqlx::query_as::<_, LeaveBalance>(
        r#"
        SELECT employee_id, year, total_paid_leave, used_paid_leave
        FROM leave_balances
        WHERE employee_id = ? AND year = ?
        "#,
    )
    .bind(employee_id)
    .bind(year)
    .fetch_optional(pool)
    .await?
    .unwrap_or_else(|| LeaveBalance::fresh(employee_id, year, default_paid_leave));

    Ok(balance.with_available())
}

/// Sets the yearly paid-leave allotment, keeping the used counter.
pub async fn set_leave_allotment(
    pool: &MySqlPool,
    employee_id: u64,
    year: i32,
    total_paid_leave: i32,
    default_paid_leave: i32,
) -> Result<LeaveBalance, ApiError> {
    if total_paid_leave < 0 {
        return Err(ApiError::bad_request("total_paid_leave cannot be negative"));
    }
    ensure_employee_exists(&mut *pool.acquire().await?, employee_id).await?;

    sqlx::query(
        r#"
        INSERT INTO leave_balances (employee_id, year, total_paid_leave, used_paid_leave)
        VALUES (?, ?, ?, 0)
        ON DUPLICATE KEY UPDATE total_paid_leave = ?
        "#,
    )
    .bind(employee_id)
    .bind(year)
    .bind(total_paid_leave)
    .bind(total_paid_leave)
    .execute(pool)
    .await?;

    info!(employee_id, year, total_paid_leave, "Leave allotment set");
    get_leave_balance(pool, employee_id, year, default_paid_leave).await
}

#[instrument(skip(pool, draft), fields(employee_id = draft.employee_id))]
pub async fn create_leave_application(
    pool: &MySqlPool,
    draft: LeaveDraft,
    default_paid_leave: i32,
) -> Result<LeaveApplication, ApiError> {
    let mut tx = pool.begin().await?;

    ensure_employee_exists(&mut tx, draft.employee_id).await?;

    ensure_balance_covers(
        &mut tx,
        draft.employee_id,
        &draft.days,
        default_paid_leave,
        Reserved::OpenApplications { except: None },
    )
    .await?;

    let summary = summarize(&draft.days);
    let result = sqlx::query(
        r#"
        INSERT INTO leave_applications
            (employee_id, leave_type, start_date, end_date,
             total_days, paid_days, unpaid_days, reason, status, applied_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(draft.employee_id)
    .bind(draft.leave_type.as_ref())
    .bind(draft.start_date)
    .bind(draft.end_date)
    .bind(summary.total)
    .bind(summary.paid)
    .bind(summary.unpaid)
    .bind(&draft.reason)
    .bind(LeaveStatus::Pending.as_ref())
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    let leave_id = result.last_insert_id();
    replace_days(&mut tx, leave_id, &draft.days).await?;
    tx.commit().await?;

    info!(leave_id, paid = summary.paid, unpaid = summary.unpaid, "Leave application created");

    get_leave_application(pool, leave_id)
        .await?
        .ok_or(ApiError::Internal)
}

#[instrument(skip(pool, actor, edit))]
pub async fn update_leave_application(
    pool: &MySqlPool,
    id: u64,
    actor: &AuthUser,
    edit: LeaveEdit,
    default_paid_leave: i32,
) -> Result<LeaveApplication, ApiError> {
    let mut tx = pool.begin().await?;

    let leave = fetch_application(&mut tx, id, true)
        .await?
        .ok_or_else(|| ApiError::not_found("Leave application not found"))?;
    ensure_owner_or_hr(actor, &leave)?;
    rules::ensure_editable(leave.status)?;

    let start_date = edit.start_date.unwrap_or(leave.start_date);
    let end_date = edit.end_date.unwrap_or(leave.end_date);
    let reason = match edit.reason {
        Some(reason) => super::validate_reason(&reason)?,
        None => leave.reason.clone(),
    };
    let leave_type = edit.leave_type.unwrap_or(leave.leave_type);

    let reshape = edit.start_date.is_some()
        || edit.end_date.is_some()
        || edit.is_paid.is_some()
        || edit.leave_days.is_some();
    let days = if reshape {
        reshape_leave_days(
            &leave.leave_days,
            start_date,
            end_date,
            edit.leave_days.as_deref(),
            edit.is_paid,
        )?
    } else {
        leave.leave_days.clone()
    };

    ensure_balance_covers(
        &mut tx,
        leave.employee_id,
        &days,
        default_paid_leave,
        Reserved::OpenApplications { except: Some(id) },
    )
    .await?;

    let summary = summarize(&days);
    let result = sqlx::query(
        r#"
        UPDATE leave_applications
        SET leave_type = ?, start_date = ?, end_date = ?,
            total_days = ?, paid_days = ?, unpaid_days = ?,
            reason = ?, version = version + 1
        WHERE id = ? AND status = ? AND version = ?
        "#,
    )
    .bind(leave_type.as_ref())
    .bind(start_date)
    .bind(end_date)
    .bind(summary.total)
    .bind(summary.paid)
    .bind(summary.unpaid)
    .bind(&reason)
    .bind(id)
    .bind(leave.status.as_ref())
    .bind(leave.version)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(WorkflowError::Stale.into());
    }

    if reshape {
        replace_days(&mut tx, id, &days).await?;
    }
    tx.commit().await?;

    info!(leave_id = id, "Leave application updated");

    get_leave_application(pool, id).await?.ok_or(ApiError::Internal)
}

#[instrument(skip(pool, actor))]
pub async fn delete_leave_application(
    pool: &MySqlPool,
    id: u64,
    actor: &AuthUser,
) -> Result<(), ApiError> {
    let mut tx = pool.begin().await?;

    let leave = fetch_application(&mut tx, id, true)
        .await?
        .ok_or_else(|| ApiError::not_found("Leave application not found"))?;
    ensure_owner_or_hr(actor, &leave)?;
    rules::ensure_deletable(leave.status)?;

    sqlx::query("DELETE FROM leave_days WHERE leave_application_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM leave_applications WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(leave_id = id, "Leave application deleted");
    Ok(())
}

/// `Pending -> Approved_by_Department`.
pub async fn approve_leave_by_department_head(
    pool: &MySqlPool,
    id: u64,
    actor: &AuthUser,
    comments: Option<String>,
    default_paid_leave: i32,
) -> Result<LeaveApplication, ApiError> {
    let comments = rules::normalize_comment(comments);
    apply_transition(pool, id, actor, LeaveAction::ApproveByDepartment, comments, default_paid_leave)
        .await
}

/// `Approved_by_Department -> Approved`, deducting the paid days.
pub async fn acknowledge_leave_by_hr(
    pool: &MySqlPool,
    id: u64,
    actor: &AuthUser,
    comments: Option<String>,
    default_paid_leave: i32,
) -> Result<LeaveApplication, ApiError> {
    let comments = rules::normalize_comment(comments);
    apply_transition(pool, id, actor, LeaveAction::AcknowledgeByHr, comments, default_paid_leave)
        .await
}

/// `Pending -> Rejected`. The rejecter is kept in the department-head slot.
pub async fn reject_leave_application(
    pool: &MySqlPool,
    id: u64,
    actor: &AuthUser,
    comments: Option<String>,
    default_paid_leave: i32,
) -> Result<LeaveApplication, ApiError> {
    let comments = rules::require_comment(comments)?;
    apply_transition(pool, id, actor, LeaveAction::Reject, Some(comments), default_paid_leave).await
}

/// Cancels a pending or approved application; approved ones get their paid
/// days credited back.
pub async fn cancel_leave_application(
    pool: &MySqlPool,
    id: u64,
    actor: &AuthUser,
    default_paid_leave: i32,
) -> Result<LeaveApplication, ApiError> {
    apply_transition(pool, id, actor, LeaveAction::Cancel, None, default_paid_leave).await
}

#[instrument(skip(pool, actor, comments), fields(user_id = actor.user_id))]
async fn apply_transition(
    pool: &MySqlPool,
    id: u64,
    actor: &AuthUser,
    action: LeaveAction,
    comments: Option<String>,
    default_paid_leave: i32,
) -> Result<LeaveApplication, ApiError> {
    let mut tx = pool.begin().await?;

    let leave = fetch_application(&mut tx, id, true)
        .await?
        .ok_or_else(|| ApiError::not_found("Leave application not found"))?;

    authorize(&mut tx, actor, action, &leave).await?;

    // Rule check before any write: a refused transition leaves the
    // application and the balance untouched.
    let next = rules::transition(leave.status, action)?;
    let effect = rules::balance_effect(leave.status, action);
    if effect > 0 {
        // a deduction never exceeds what is left of the allotment
        ensure_balance_covers(
            &mut tx,
            leave.employee_id,
            &leave.leave_days,
            default_paid_leave,
            Reserved::Nothing,
        )
        .await?;
    }
    let now = Utc::now();

    let mut update: QueryBuilder<MySql> = QueryBuilder::new("UPDATE leave_applications SET status = ");
    update.push_bind(next.as_ref());
    match action {
        LeaveAction::ApproveByDepartment | LeaveAction::Reject => {
            update
                .push(", department_head_approved_by = ")
                .push_bind(actor.employee_id)
                .push(", department_head_approved_at = ")
                .push_bind(now)
                .push(", department_head_comments = ")
                .push_bind(comments);
        }
        LeaveAction::AcknowledgeByHr => {
            update
                .push(", hr_acknowledged_by = ")
                .push_bind(actor.employee_id)
                .push(", hr_acknowledged_at = ")
                .push_bind(now)
                .push(", hr_comments = ")
                .push_bind(comments);
        }
        LeaveAction::Cancel => {}
    }
    update
        .push(", version = version + 1 WHERE id = ")
        .push_bind(id)
        .push(" AND status = ")
        .push_bind(leave.status.as_ref())
        .push(" AND version = ")
        .push_bind(leave.version);

    let result = update.build().execute(&mut *tx).await?;
    if result.rows_affected() == 0 {
        return Err(WorkflowError::Stale.into());
    }

    if effect != 0 {
        for (year, paid) in paid_days_by_year(&leave.leave_days) {
            update_leave_balance(&mut tx, leave.employee_id, year, effect * paid, default_paid_leave)
                .await?;
        }
    }

    tx.commit().await?;

    info!(
        leave_id = id,
        from = %leave.status,
        to = %next,
        paid_days = leave.paid_days,
        balance_effect = effect,
        "Leave application {}",
        action
    );

    get_leave_application(pool, id).await?.ok_or(ApiError::Internal)
}

async fn authorize(
    conn: &mut MySqlConnection,
    actor: &AuthUser,
    action: LeaveAction,
    leave: &LeaveApplication,
) -> Result<(), ApiError> {
    match action {
        LeaveAction::ApproveByDepartment | LeaveAction::Reject => {
            if !actor.role.can_approve_department_leave() {
                return Err(ApiError::forbidden("Department head only"));
            }
            ensure_not_own(actor, leave)?;
            if actor.role == Role::DepartmentHead {
                ensure_heads_department(conn, actor, leave.department_id).await?;
            }
        }
        LeaveAction::AcknowledgeByHr => {
            if !actor.role.can_acknowledge_leave() {
                return Err(ApiError::forbidden("HR only"));
            }
            ensure_not_own(actor, leave)?;
        }
        LeaveAction::Cancel => ensure_owner_or_hr(actor, leave)?,
    }
    Ok(())
}

fn ensure_not_own(actor: &AuthUser, leave: &LeaveApplication) -> Result<(), ApiError> {
    match actor.employee_id {
        None => Err(ApiError::forbidden("No employee profile")),
        Some(own) if own == leave.employee_id => {
            Err(ApiError::forbidden("You cannot sign off your own leave application"))
        }
        Some(_) => Ok(()),
    }
}

fn ensure_owner_or_hr(actor: &AuthUser, leave: &LeaveApplication) -> Result<(), ApiError> {
    if actor.role.is_hr() || actor.employee_id == Some(leave.employee_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Only the applicant or HR can change this leave application"))
    }
}

async fn ensure_heads_department(
    conn: &mut MySqlConnection,
    actor: &AuthUser,
    department_id: u64,
) -> Result<(), ApiError> {
    let head_id = sqlx::query_scalar::<_, Option<u64>>("SELECT head_id FROM departments WHERE id = ?")
        .bind(department_id)
        .fetch_optional(conn)
        .await?
        .flatten();

    if head_id.is_some() && head_id == actor.employee_id {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "Only the head of the employee's department can do this",
        ))
    }
}

/// Database-backed checks of the workflow. They need a MySQL server:
/// `DATABASE_URL=mysql://... cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::leave_application::LeaveType;
    use crate::workflow::prepare_draft;
    use chrono::NaiveDate;

    const DEFAULT_PAID_LEAVE: i32 = 5;
    const YEAR: i32 = 2026;

    struct Staff {
        hr: u64,
        head: u64,
        employee: u64,
    }

    async fn insert_employee(
        pool: &MySqlPool,
        number: &str,
        company_id: u64,
        department_id: u64,
        job_title_id: u64,
    ) -> u64 {
        sqlx::query(
            r#"
            INSERT INTO employees
                (employee_number, first_name, last_name, birth_date, gender, civil_status,
                 email, phone_number, address, company_id, department_id, job_title_id,
                 date_hired, employment_status)
            VALUES (?, 'Test', ?, '1990-05-15', 'Female', 'Single', ?, '+63 917 000 0000',
                    'Makati', ?, ?, ?, '2023-01-15', 'Regular')
            "#,
        )
        .bind(number)
        .bind(number)
        .bind(format!("{}@company.com", number.to_lowercase()))
        .bind(company_id)
        .bind(department_id)
        .bind(job_title_id)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_id()
    }

    async fn seed(pool: &MySqlPool) -> Staff {
        let company = sqlx::query("INSERT INTO companies (name) VALUES ('TechCorp')")
            .execute(pool)
            .await
            .unwrap()
            .last_insert_id();
        let department = sqlx::query("INSERT INTO departments (name, company_id) VALUES ('Engineering', ?)")
            .bind(company)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_id();
        let job_title = sqlx::query("INSERT INTO job_titles (title, department_id) VALUES ('Engineer', ?)")
            .bind(department)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_id();

        let staff = Staff {
            hr: insert_employee(pool, "EMP001", company, department, job_title).await,
            head: insert_employee(pool, "EMP002", company, department, job_title).await,
            employee: insert_employee(pool, "EMP003", company, department, job_title).await,
        };
        sqlx::query("UPDATE departments SET head_id = ? WHERE id = ?")
            .bind(staff.head)
            .bind(department)
            .execute(pool)
            .await
            .unwrap();
        staff
    }

    fn actor(role: Role, employee_id: u64) -> AuthUser {
        AuthUser {
            user_id: employee_id,
            email: format!("user{employee_id}@company.com"),
            role,
            employee_id: Some(employee_id),
        }
    }

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(YEAR, month, day).unwrap()
    }

    /// June 1-3 with the 2nd unpaid.
    async fn file_mixed_leave(pool: &MySqlPool, employee_id: u64) -> LeaveApplication {
        let days = [
            LeaveDay { date: date(6, 1), is_paid: true },
            LeaveDay { date: date(6, 2), is_paid: false },
            LeaveDay { date: date(6, 3), is_paid: true },
        ];
        let draft = prepare_draft(
            employee_id,
            LeaveType::Vacation,
            date(6, 1),
            date(6, 3),
            "Family trip",
            None,
            Some(&days),
        )
        .unwrap();
        create_leave_application(pool, draft, DEFAULT_PAID_LEAVE).await.unwrap()
    }

    async fn file_paid_leave(
        pool: &MySqlPool,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<LeaveApplication, ApiError> {
        let draft =
            prepare_draft(employee_id, LeaveType::Personal, start, end, "Errands", None, None).unwrap();
        create_leave_application(pool, draft, DEFAULT_PAID_LEAVE).await
    }

    async fn used(pool: &MySqlPool, employee_id: u64) -> i32 {
        get_leave_balance(pool, employee_id, YEAR, DEFAULT_PAID_LEAVE)
            .await
            .unwrap()
            .used_paid_leave
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a MySQL server in DATABASE_URL"]
    async fn acknowledgment_deducts_exactly_the_paid_days(pool: MySqlPool) {
        let staff = seed(&pool).await;
        let head = actor(Role::DepartmentHead, staff.head);
        let hr = actor(Role::HrCompany, staff.hr);

        let leave = file_mixed_leave(&pool, staff.employee).await;
        assert_eq!((leave.total_days, leave.paid_days, leave.unpaid_days), (3, 2, 1));
        assert_eq!(leave.status, LeaveStatus::Pending);

        let leave = approve_leave_by_department_head(&pool, leave.id, &head, None, DEFAULT_PAID_LEAVE)
            .await
            .unwrap();
        assert_eq!(leave.status, LeaveStatus::ApprovedByDepartment);
        assert_eq!(used(&pool, staff.employee).await, 0);

        let leave = acknowledge_leave_by_hr(
            &pool,
            leave.id,
            &hr,
            Some("Processed".to_string()),
            DEFAULT_PAID_LEAVE,
        )
        .await
        .unwrap();
        assert_eq!(leave.status, LeaveStatus::Approved);

        let balance = get_leave_balance(&pool, staff.employee, YEAR, DEFAULT_PAID_LEAVE)
            .await
            .unwrap();
        assert_eq!(balance.used_paid_leave, 2);
        assert_eq!(balance.available_paid_leave, 3);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a MySQL server in DATABASE_URL"]
    async fn acknowledging_a_pending_leave_changes_nothing(pool: MySqlPool) {
        let staff = seed(&pool).await;
        let hr = actor(Role::HrManager, staff.hr);

        let leave = file_mixed_leave(&pool, staff.employee).await;
        let err = acknowledge_leave_by_hr(&pool, leave.id, &hr, None, DEFAULT_PAID_LEAVE)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let rows = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leave_balances")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 0);

        let leave = get_leave_application(&pool, leave.id).await.unwrap().unwrap();
        assert_eq!(leave.status, LeaveStatus::Pending);
        assert_eq!(leave.version, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a MySQL server in DATABASE_URL"]
    async fn second_acknowledgment_is_refused_and_deducts_once(pool: MySqlPool) {
        let staff = seed(&pool).await;
        let head = actor(Role::DepartmentHead, staff.head);
        let hr = actor(Role::HrSupervisor, staff.hr);

        let leave = file_mixed_leave(&pool, staff.employee).await;
        approve_leave_by_department_head(&pool, leave.id, &head, None, DEFAULT_PAID_LEAVE)
            .await
            .unwrap();
        acknowledge_leave_by_hr(&pool, leave.id, &hr, None, DEFAULT_PAID_LEAVE)
            .await
            .unwrap();

        let err = acknowledge_leave_by_hr(&pool, leave.id, &hr, None, DEFAULT_PAID_LEAVE)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(used(&pool, staff.employee).await, 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a MySQL server in DATABASE_URL"]
    async fn cancelling_an_approved_leave_credits_the_days_back(pool: MySqlPool) {
        let staff = seed(&pool).await;
        let head = actor(Role::DepartmentHead, staff.head);
        let hr = actor(Role::HrCompany, staff.hr);
        let owner = actor(Role::Employee, staff.employee);

        let leave = file_mixed_leave(&pool, staff.employee).await;
        approve_leave_by_department_head(&pool, leave.id, &head, None, DEFAULT_PAID_LEAVE)
            .await
            .unwrap();
        acknowledge_leave_by_hr(&pool, leave.id, &hr, None, DEFAULT_PAID_LEAVE)
            .await
            .unwrap();
        assert_eq!(used(&pool, staff.employee).await, 2);

        let leave = cancel_leave_application(&pool, leave.id, &owner, DEFAULT_PAID_LEAVE)
            .await
            .unwrap();
        assert_eq!(leave.status, LeaveStatus::Cancelled);
        assert_eq!(used(&pool, staff.employee).await, 0);

        let err = cancel_leave_application(&pool, leave.id, &owner, DEFAULT_PAID_LEAVE)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(used(&pool, staff.employee).await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a MySQL server in DATABASE_URL"]
    async fn open_applications_hold_their_paid_days(pool: MySqlPool) {
        let staff = seed(&pool).await;
        sqlx::query(
            "INSERT INTO leave_balances (employee_id, year, total_paid_leave, used_paid_leave) VALUES (?, ?, 5, 2)",
        )
        .bind(staff.employee)
        .bind(YEAR)
        .execute(&pool)
        .await
        .unwrap();

        let first = file_paid_leave(&pool, staff.employee, date(7, 1), date(7, 2)).await.unwrap();

        let err = file_paid_leave(&pool, staff.employee, date(8, 3), date(8, 4)).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::BadRequest(
                "Insufficient leave balance for 2026. Available: 1 days, Requested: 2 days".to_string()
            )
        );

        // the application's own days do not count against its edit
        let owner = actor(Role::Employee, staff.employee);
        let edit = LeaveEdit {
            end_date: Some(date(7, 3)),
            ..LeaveEdit::default()
        };
        let first = update_leave_application(&pool, first.id, &owner, edit, DEFAULT_PAID_LEAVE)
            .await
            .unwrap();
        assert_eq!(first.paid_days, 3);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a MySQL server in DATABASE_URL"]
    async fn acknowledgment_respects_a_lowered_allotment(pool: MySqlPool) {
        let staff = seed(&pool).await;
        let head = actor(Role::DepartmentHead, staff.head);
        let hr = actor(Role::HrManager, staff.hr);

        let leave = file_paid_leave(&pool, staff.employee, date(9, 7), date(9, 9)).await.unwrap();
        approve_leave_by_department_head(&pool, leave.id, &head, None, DEFAULT_PAID_LEAVE)
            .await
            .unwrap();
        set_leave_allotment(&pool, staff.employee, YEAR, 2, DEFAULT_PAID_LEAVE)
            .await
            .unwrap();

        let err = acknowledge_leave_by_hr(&pool, leave.id, &hr, None, DEFAULT_PAID_LEAVE)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(used(&pool, staff.employee).await, 0);

        let leave = get_leave_application(&pool, leave.id).await.unwrap().unwrap();
        assert_eq!(leave.status, LeaveStatus::ApprovedByDepartment);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a MySQL server in DATABASE_URL"]
    async fn extending_an_unpaid_leave_keeps_it_unpaid(pool: MySqlPool) {
        let staff = seed(&pool).await;
        let owner = actor(Role::Employee, staff.employee);

        let draft = prepare_draft(
            staff.employee,
            LeaveType::Personal,
            date(10, 5),
            date(10, 14),
            "Study leave",
            Some(false),
            None,
        )
        .unwrap();
        let leave = create_leave_application(&pool, draft, DEFAULT_PAID_LEAVE).await.unwrap();

        let edit = LeaveEdit {
            end_date: Some(date(10, 15)),
            ..LeaveEdit::default()
        };
        let leave = update_leave_application(&pool, leave.id, &owner, edit, DEFAULT_PAID_LEAVE)
            .await
            .unwrap();
        assert_eq!((leave.total_days, leave.paid_days, leave.unpaid_days), (11, 0, 11));
        assert_eq!(leave.leave_days.len(), 11);
        assert_eq!(leave.version, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a MySQL server in DATABASE_URL"]
    async fn deleting_a_signer_keeps_the_sign_off(pool: MySqlPool) {
        let staff = seed(&pool).await;
        let head = actor(Role::DepartmentHead, staff.head);

        let leave = file_mixed_leave(&pool, staff.employee).await;
        approve_leave_by_department_head(
            &pool,
            leave.id,
            &head,
            Some("Enjoy".to_string()),
            DEFAULT_PAID_LEAVE,
        )
        .await
        .unwrap();

        sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(staff.head)
            .execute(&pool)
            .await
            .unwrap();

        let leave = get_leave_application(&pool, leave.id).await.unwrap().unwrap();
        let approval = leave.department_head_approval.unwrap();
        assert_eq!(approval.approved_by, None);
        assert_eq!(approval.comments.as_deref(), Some("Enjoy"));
    }
}
