//! Calendar bucketing for the dashboard reports.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use domains::{DateRange, DomainError, DomainResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthBucket {
    /// `YYYY-MM`
    pub month: String,
    pub new_count: u64,
    pub closed_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopGroup {
    pub group_id: Uuid,
    pub name: String,
    pub count: u64,
}

fn month_start(year: i32, month: u32) -> DomainResult<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| DomainError::Validation(format!("invalid month {year}-{month:02}")))
}

fn month_range(year: i32, month: u32) -> DomainResult<(String, DateRange)> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    Ok((
        format!("{year:04}-{month:02}"),
        DateRange {
            start: month_start(year, month)?,
            end: month_start(next_year, next_month)?,
        },
    ))
}

/// The twelve months of `year`, January first.
pub fn months_of_year(year: i32) -> DomainResult<Vec<(String, DateRange)>> {
    if !(1970..=9999).contains(&year) {
        return Err(DomainError::Validation(format!("year {year} out of range")));
    }
    (1..=12).map(|month| month_range(year, month)).collect()
}

/// The last `count` calendar months up to and including the month of
/// `now`, oldest first.
pub fn trailing_months(now: DateTime<Utc>, count: u32) -> DomainResult<Vec<(String, DateRange)>> {
    let current = now.year() * 12 + now.month0() as i32;
    (0..count as i32)
        .rev()
        .map(|back| {
            let index = current - back;
            month_range(index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
        })
        .collect()
}
