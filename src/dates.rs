//! Relative date resolution for calendar ranges.
//!
//! The calendar command accepts a small vocabulary instead of forcing full
//! timestamps: `today`, `tomorrow`, `+Nd`/`+Nm`/`+Ny` offsets, a bare
//! `YYYY-MM-DD` date, or any RFC 3339 timestamp. Offsets for `--end` are
//! resolved against the already-resolved start, so `--start today --end +7d`
//! means one week from midnight today.

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::AppError;

/// Resolve a date expression against a base instant.
///
/// `today` and `tomorrow` zero the time of day; `+N` offsets preserve the
/// base's time of day (month and year offsets clamp the day to the target
/// month's length). A bare calendar date means midnight UTC.
pub fn resolve_date(input: &str, base: DateTime<Utc>) -> Result<DateTime<Utc>, AppError> {
    let input = input.trim();

    match input {
        "today" => return Ok(start_of_day(base)),
        "tomorrow" => return Ok(start_of_day(base + Duration::days(1))),
        _ => {}
    }

    if let Some(offset) = input.strip_prefix('+') {
        return resolve_offset(offset, base).ok_or_else(|| AppError::InvalidDate(input.into()));
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    }

    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::InvalidDate(input.into()))
}

fn start_of_day(dt: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&dt.date_naive().and_time(NaiveTime::MIN))
}

fn resolve_offset(offset: &str, base: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if offset.len() < 2 || !offset.is_ascii() {
        return None;
    }

    let (count, unit) = offset.split_at(offset.len() - 1);
    let n: u32 = count.parse().ok()?;

    match unit {
        "d" => base.checked_add_signed(Duration::days(i64::from(n))),
        "m" => base.checked_add_months(Months::new(n)),
        "y" => base.checked_add_months(Months::new(n.checked_mul(12)?)),
        _ => None,
    }
}
