use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::error::{Result, RosterError};

/// Weekday number used by availability tables: Monday = 2 .. Friday = 6.
/// Weekends have no number and are never scheduled.
pub fn weekday_number(date: NaiveDate) -> Option<u8> {
    match date.weekday() {
        Weekday::Sat | Weekday::Sun => None,
        weekday => Some(weekday.num_days_from_monday() as u8 + 2),
    }
}

/// Label shown next to the date in rendered schedules, e.g. "Thứ 2"
pub fn weekday_label(date: NaiveDate) -> String {
    match weekday_number(date) {
        Some(n) => format!("Thứ {}", n),
        None if date.weekday() == Weekday::Sat => "Thứ 7".to_string(),
        None => "Chủ nhật".to_string(),
    }
}

/// Every Monday-Friday date in the inclusive range, ascending
pub fn weekdays_in(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|date| *date <= end)
        .filter(|date| weekday_number(*date).is_some())
        .collect()
}

/// Date range for the coming work week as seen from `today`.
///
/// On a weekend the range is next Monday through Friday. On a weekday it
/// starts tomorrow and ends on the coming Friday; from a Friday that is the
/// Friday of the following week.
pub fn next_work_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = i64::from(today.weekday().num_days_from_monday());
    if weekday >= 5 {
        let start = today + Duration::days(7 - weekday);
        return (start, start + Duration::days(4));
    }

    let start = today + Duration::days(1);
    let mut days_until_friday = 4 - weekday;
    if days_until_friday <= 0 {
        days_until_friday += 7;
    }
    (start, today + Duration::days(days_until_friday))
}

/// Parses a `YYYY-MM-DD` date
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| RosterError::InvalidDate(text.to_string()))
}

/// Resolves the range to schedule: both ends given explicitly, or neither,
/// in which case the next work week after `today` is used
pub fn resolve_range(
    start: Option<&str>,
    end: Option<&str>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate)> {
    let (start, end) = match (start, end) {
        (Some(start), Some(end)) => (parse_date(start)?, parse_date(end)?),
        (None, None) => return Ok(next_work_week(today)),
        _ => return Err(RosterError::IncompleteRange),
    };
    if start > end {
        return Err(RosterError::InvalidRange { start, end });
    }
    Ok((start, end))
}
