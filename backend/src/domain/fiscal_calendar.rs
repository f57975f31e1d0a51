//! Fiscal calendar for the chain.
//!
//! Fiscal weeks run Monday through Sunday. A fiscal month or year begins on
//! whichever Monday falls closest to the 1st of its calendar month or year,
//! and ends the Sunday before the next fiscal period starts. Everything here
//! is a pure function of a reference date; the `*_on` forms take that date
//! explicitly and the plain forms read the local clock.

use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};
use shared::DateRange;

/// The 1st of a month. Month is always 1-12 here and the year comes from a
/// real date, so the fallback is unreachable.
fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

/// The Monday closest to the given 1st-of-period date.
///
/// Tie-break: a Monday stands; Sunday rolls forward one day; Tue-Thu roll
/// back to the preceding Monday; Fri-Sat roll forward to the next Monday.
fn closest_monday(first: NaiveDate) -> NaiveDate {
    match first.weekday() {
        Weekday::Mon => first,
        Weekday::Sun => first + Duration::days(1),
        Weekday::Tue => first - Duration::days(1),
        Weekday::Wed => first - Duration::days(2),
        Weekday::Thu => first - Duration::days(3),
        Weekday::Fri => first + Duration::days(3),
        Weekday::Sat => first + Duration::days(2),
    }
}

/// Today per the local clock.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// The Monday starting the fiscal year for a calendar year.
pub fn fiscal_year_start(year: i32) -> NaiveDate {
    closest_monday(first_of_month(year, 1))
}

/// The Sunday closing the fiscal year: the day before the next one starts.
pub fn fiscal_year_end(year: i32) -> NaiveDate {
    fiscal_year_start(year + 1) - Duration::days(1)
}

/// The fiscal year containing the reference date. Dates just outside the
/// naive calendar-year window belong to the neighboring fiscal year.
pub fn current_fiscal_year_on(reference: NaiveDate) -> DateRange {
    let year = reference.year();
    let start = fiscal_year_start(year);
    let end = fiscal_year_end(year);
    if reference < start {
        DateRange::new(fiscal_year_start(year - 1), fiscal_year_end(year - 1))
    } else if reference > end {
        DateRange::new(fiscal_year_start(year + 1), fiscal_year_end(year + 1))
    } else {
        DateRange::new(start, end)
    }
}

pub fn current_fiscal_year() -> DateRange {
    current_fiscal_year_on(today())
}

/// Monday-Sunday week containing the reference date.
pub fn current_week_on(reference: NaiveDate) -> DateRange {
    let monday = reference - Duration::days(reference.weekday().num_days_from_monday() as i64);
    DateRange::new(monday, monday + Duration::days(6))
}

pub fn current_week() -> DateRange {
    current_week_on(today())
}

/// The Monday-Sunday week immediately before the one containing the
/// reference date.
pub fn last_week_on(reference: NaiveDate) -> DateRange {
    let this_week = current_week_on(reference);
    DateRange::new(
        this_week.start - Duration::days(7),
        this_week.end - Duration::days(7),
    )
}

pub fn last_week() -> DateRange {
    last_week_on(today())
}

/// Days elapsed into the current week, today included (1 on a Monday,
/// 7 on a Sunday).
pub fn days_into_week_on(reference: NaiveDate) -> i64 {
    (reference - current_week_on(reference).start).num_days() + 1
}

/// The Monday starting the fiscal month for a calendar (year, month).
pub fn fiscal_month_start(year: i32, month: u32) -> NaiveDate {
    closest_monday(first_of_month(year, month))
}

fn next_calendar_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn previous_calendar_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// The fiscal month containing the reference date's calendar month:
/// Monday closest to the 1st, through the Sunday before the next fiscal
/// month starts.
pub fn current_fiscal_month_on(reference: NaiveDate) -> DateRange {
    let start = fiscal_month_start(reference.year(), reference.month());
    let (next_year, next_month) = next_calendar_month(reference.year(), reference.month());
    let end = fiscal_month_start(next_year, next_month) - Duration::days(1);
    DateRange::new(start, end)
}

pub fn current_fiscal_month() -> DateRange {
    current_fiscal_month_on(today())
}

/// The fiscal month before the one containing the reference date.
pub fn previous_fiscal_month_on(reference: NaiveDate) -> DateRange {
    let (prev_year, prev_month) = previous_calendar_month(reference.year(), reference.month());
    let start = fiscal_month_start(prev_year, prev_month);
    let end = current_fiscal_month_on(reference).start - Duration::days(1);
    DateRange::new(start, end)
}

pub fn previous_fiscal_month() -> DateRange {
    previous_fiscal_month_on(today())
}

/// Fiscal month start through yesterday. Today is excluded because same-day
/// data is still accumulating upstream.
pub fn fiscal_month_to_date_on(reference: NaiveDate) -> DateRange {
    DateRange::new(
        current_fiscal_month_on(reference).start,
        reference - Duration::days(1),
    )
}

pub fn fiscal_month_to_date() -> DateRange {
    fiscal_month_to_date_on(today())
}

/// Last year's equivalent of the fiscal month-to-date window: same
/// Monday-snapping rule applied to last year's calendar month, covering the
/// same number of days as the current window. Day counts match even when the
/// weekday alignment drifts between years.
pub fn last_year_fiscal_month_to_date_on(reference: NaiveDate) -> DateRange {
    let current_mtd = fiscal_month_to_date_on(reference);
    let day_count = current_mtd.day_count();
    let start = fiscal_month_start(reference.year() - 1, reference.month());
    DateRange::new(start, start + Duration::days(day_count - 1))
}

pub fn last_year_fiscal_month_to_date() -> DateRange {
    last_year_fiscal_month_to_date_on(today())
}

/// A range is a complete fiscal week iff it spans exactly Monday through the
/// following Sunday.
pub fn is_complete_week(range: &DateRange) -> bool {
    range.span_days() == 6
        && range.start.weekday() == Weekday::Mon
        && range.end.weekday() == Weekday::Sun
}

/// Short month name for chart bucket labels (1-12).
pub fn month_abbrev(month: u32) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        12 => "Dec",
        _ => "",
    }
}
