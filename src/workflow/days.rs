use super::rules::WorkflowError;
use crate::model::leave_day::LeaveDay;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// Longest span a single application may cover.
pub const MAX_LEAVE_DAYS: i64 = 366;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySummary {
    pub total: i32,
    pub paid: i32,
    pub unpaid: i32,
}

/// Calendar days in `[start, end]`, both ends included.
pub fn total_days(start: NaiveDate, end: NaiveDate) -> Result<i32, WorkflowError> {
    if start > end {
        return Err(WorkflowError::InvalidDateRange);
    }
    let days = (end - start).num_days() + 1;
    if days > MAX_LEAVE_DAYS {
        return Err(WorkflowError::RangeTooLong(days, MAX_LEAVE_DAYS));
    }
    Ok(days as i32)
}

/// Builds the per-day breakdown of `[start, end]`.
///
/// With an explicit list, every date of the range must appear exactly once
/// and nothing outside it. Without one, `all_paid` applies to every day.
pub fn build_leave_days(
    start: NaiveDate,
    end: NaiveDate,
    explicit: Option<&[LeaveDay]>,
    all_paid: bool,
) -> Result<Vec<LeaveDay>, WorkflowError> {
    let total = total_days(start, end)?;

    let Some(explicit) = explicit else {
        return Ok(start
            .iter_days()
            .take(total as usize)
            .map(|date| LeaveDay {
                date,
                is_paid: all_paid,
            })
            .collect());
    };

    let mut days = explicit.to_vec();
    days.sort_by_key(|d| d.date);

    if let Some(outside) = days.iter().find(|d| d.date < start || d.date > end) {
        return Err(WorkflowError::DaysMismatch(format!(
            "{} is outside {} .. {}",
            outside.date, start, end
        )));
    }
    if let Some(pair) = days.windows(2).find(|w| w[0].date == w[1].date) {
        return Err(WorkflowError::DaysMismatch(format!(
            "{} is listed more than once",
            pair[0].date
        )));
    }
    if days.len() != total as usize {
        return Err(WorkflowError::DaysMismatch(format!(
            "expected {} days, got {}",
            total,
            days.len()
        )));
    }

    Ok(days)
}

/// Breakdown of an edited application. An explicit list or an `is_paid`
/// flag replaces the old breakdown. Otherwise dates that stay in the range
/// keep their flag and added dates take the old flag when it was uniform.
pub fn reshape_leave_days(
    current: &[LeaveDay],
    start: NaiveDate,
    end: NaiveDate,
    explicit: Option<&[LeaveDay]>,
    is_paid: Option<bool>,
) -> Result<Vec<LeaveDay>, WorkflowError> {
    if explicit.is_some() || is_paid.is_some() {
        return build_leave_days(start, end, explicit, is_paid.unwrap_or(true));
    }

    let total = total_days(start, end)?;
    let kept: BTreeMap<NaiveDate, bool> = current.iter().map(|d| (d.date, d.is_paid)).collect();
    let uniform = match current.split_first() {
        None => Some(true),
        Some((first, rest)) => rest
            .iter()
            .all(|d| d.is_paid == first.is_paid)
            .then_some(first.is_paid),
    };

    start
        .iter_days()
        .take(total as usize)
        .map(|date| {
            kept.get(&date)
                .copied()
                .or(uniform)
                .map(|is_paid| LeaveDay { date, is_paid })
                .ok_or(WorkflowError::BreakdownRequired)
        })
        .collect()
}

pub fn summarize(days: &[LeaveDay]) -> DaySummary {
    let paid = days.iter().filter(|d| d.is_paid).count() as i32;
    DaySummary {
        total: days.len() as i32,
        paid,
        unpaid: days.len() as i32 - paid,
    }
}

/// Paid days per calendar year; a span over new year touches two balances.
pub fn paid_days_by_year(days: &[LeaveDay]) -> BTreeMap<i32, i32> {
    let mut by_year = BTreeMap::new();
    for day in days.iter().filter(|d| d.is_paid) {
        *by_year.entry(day.date.year()).or_insert(0) += 1;
    }
    by_year
}

/// Fails on the first year whose available balance is below the request.
pub fn check_balance(
    requested: &BTreeMap<i32, i32>,
    available: impl Fn(i32) -> i32,
) -> Result<(), WorkflowError> {
    for (&year, &requested) in requested {
        let available = available(year);
        if requested > available {
            return Err(WorkflowError::InsufficientBalance {
                year,
                available,
                requested,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn day(y: i32, m: u32, d: u32, is_paid: bool) -> LeaveDay {
        LeaveDay {
            date: date(y, m, d),
            is_paid,
        }
    }

    #[test]
    fn total_days_is_inclusive() {
        assert_eq!(total_days(date(2026, 3, 2), date(2026, 3, 2)).unwrap(), 1);
        assert_eq!(total_days(date(2026, 2, 15), date(2026, 2, 19)).unwrap(), 5);
        // leap year February
        assert_eq!(total_days(date(2024, 2, 28), date(2024, 3, 1)).unwrap(), 3);
    }

    #[test]
    fn reversed_range_is_rejected() {
        assert_eq!(
            total_days(date(2026, 3, 5), date(2026, 3, 4)),
            Err(WorkflowError::InvalidDateRange)
        );
    }

    #[test]
    fn overly_long_range_is_rejected() {
        let err = total_days(date(2026, 1, 1), date(2027, 6, 1)).unwrap_err();
        assert!(matches!(err, WorkflowError::RangeTooLong(_, MAX_LEAVE_DAYS)));
    }

    #[test]
    fn default_breakdown_covers_range() {
        let days = build_leave_days(date(2026, 3, 30), date(2026, 4, 2), None, false).unwrap();
        assert_eq!(
            days.iter().map(|d| d.date).collect::<Vec<_>>(),
            vec![date(2026, 3, 30), date(2026, 3, 31), date(2026, 4, 1), date(2026, 4, 2)]
        );
        assert!(days.iter().all(|d| !d.is_paid));
    }

    #[test]
    fn explicit_breakdown_is_sorted_and_checked() {
        let explicit = vec![
            day(2026, 3, 4, false),
            day(2026, 3, 2, true),
            day(2026, 3, 3, true),
        ];
        let days =
            build_leave_days(date(2026, 3, 2), date(2026, 3, 4), Some(&explicit), true).unwrap();
        assert_eq!(days[0].date, date(2026, 3, 2));
        assert_eq!(
            summarize(&days),
            DaySummary {
                total: 3,
                paid: 2,
                unpaid: 1
            }
        );
    }

    #[test]
    fn explicit_breakdown_rejects_gaps_duplicates_and_strays() {
        let range = (date(2026, 3, 2), date(2026, 3, 4));

        let gap = vec![day(2026, 3, 2, true), day(2026, 3, 4, true)];
        assert!(matches!(
            build_leave_days(range.0, range.1, Some(&gap), true),
            Err(WorkflowError::DaysMismatch(_))
        ));

        let duplicate = vec![
            day(2026, 3, 2, true),
            day(2026, 3, 2, false),
            day(2026, 3, 3, true),
            day(2026, 3, 4, true),
        ];
        assert!(matches!(
            build_leave_days(range.0, range.1, Some(&duplicate), true),
            Err(WorkflowError::DaysMismatch(_))
        ));

        let stray = vec![
            day(2026, 3, 2, true),
            day(2026, 3, 3, true),
            day(2026, 3, 5, true),
        ];
        assert!(matches!(
            build_leave_days(range.0, range.1, Some(&stray), true),
            Err(WorkflowError::DaysMismatch(_))
        ));
    }

    #[test]
    fn extending_unpaid_leave_keeps_it_unpaid() {
        let current = build_leave_days(date(2026, 3, 2), date(2026, 3, 11), None, false).unwrap();
        let days = reshape_leave_days(&current, date(2026, 3, 2), date(2026, 3, 12), None, None).unwrap();
        assert_eq!(summarize(&days), DaySummary { total: 11, paid: 0, unpaid: 11 });
    }

    #[test]
    fn moving_dates_keeps_flags_of_remaining_days() {
        let current = vec![
            day(2026, 3, 2, true),
            day(2026, 3, 3, false),
            day(2026, 3, 4, true),
        ];
        let days = reshape_leave_days(&current, date(2026, 3, 3), date(2026, 3, 4), None, None).unwrap();
        assert_eq!(days, vec![day(2026, 3, 3, false), day(2026, 3, 4, true)]);
    }

    #[test]
    fn extending_mixed_leave_needs_explicit_days() {
        let current = vec![day(2026, 3, 2, true), day(2026, 3, 3, false)];
        assert_eq!(
            reshape_leave_days(&current, date(2026, 3, 2), date(2026, 3, 4), None, None),
            Err(WorkflowError::BreakdownRequired)
        );

        let explicit = vec![
            day(2026, 3, 2, true),
            day(2026, 3, 3, false),
            day(2026, 3, 4, false),
        ];
        let days =
            reshape_leave_days(&current, date(2026, 3, 2), date(2026, 3, 4), Some(&explicit), None)
                .unwrap();
        assert_eq!(summarize(&days).unpaid, 2);
    }

    #[test]
    fn is_paid_flag_overrides_old_breakdown() {
        let current = vec![day(2026, 3, 2, false), day(2026, 3, 3, true)];
        let days = reshape_leave_days(&current, date(2026, 3, 2), date(2026, 3, 3), None, Some(true))
            .unwrap();
        assert!(days.iter().all(|d| d.is_paid));
    }

    #[test]
    fn paid_days_split_across_years() {
        let days = build_leave_days(date(2025, 12, 30), date(2026, 1, 2), None, true).unwrap();
        let by_year = paid_days_by_year(&days);
        assert_eq!(by_year.get(&2025), Some(&2));
        assert_eq!(by_year.get(&2026), Some(&2));
    }

    #[test]
    fn unpaid_days_do_not_count_against_balance() {
        let days = vec![day(2026, 5, 4, true), day(2026, 5, 5, false)];
        assert_eq!(paid_days_by_year(&days).get(&2026), Some(&1));
    }

    #[test]
    fn balance_check_with_five_total_two_used() {
        let available = |_year: i32| 5 - 2;

        let three = build_leave_days(date(2026, 6, 1), date(2026, 6, 3), None, true).unwrap();
        assert!(check_balance(&paid_days_by_year(&three), available).is_ok());

        let four = build_leave_days(date(2026, 6, 1), date(2026, 6, 4), None, true).unwrap();
        assert_eq!(
            check_balance(&paid_days_by_year(&four), available),
            Err(WorkflowError::InsufficientBalance {
                year: 2026,
                available: 3,
                requested: 4
            })
        );
    }

    #[test]
    fn balance_check_ignores_unpaid_spans() {
        let days = build_leave_days(date(2026, 6, 1), date(2026, 6, 10), None, false).unwrap();
        assert!(check_balance(&paid_days_by_year(&days), |_| 0).is_ok());
    }
}
