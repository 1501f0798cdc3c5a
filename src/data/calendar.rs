//! Calendar bucketing used by the challenges: fiscal years, quarter buckets
//! relative to a start month, ISO weeks and trailing period windows.

use chrono::{Datelike, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Full (`"January"`) or abbreviated (`"Jan"`) English month name.
pub fn month_name(month: u32, long: bool) -> &'static str {
    let name = MONTH_NAMES[((month.clamp(1, 12)) - 1) as usize];
    if long {
        name
    } else {
        &name[..3]
    }
}

/// Fiscal year of `date` when the fiscal year starts in `start_month`.
///
/// Months before the start month belong to the fiscal year that began in the
/// previous calendar year.
pub fn fiscal_year(date: NaiveDate, start_month: u32) -> i32 {
    if date.month() >= start_month {
        date.year()
    } else {
        date.year() - 1
    }
}

/// Map `date` onto a reference calendar so that every fiscal year starting in
/// `start_month` overlays on the same x-range.
///
/// The reference years are chosen so that February always lands in the leap
/// year 1940, which keeps February 29th representable.
pub fn fiscal_aligned_date(date: NaiveDate, start_month: u32) -> NaiveDate {
    let wrapped_year = if start_month <= 2 { 1941 } else { 1940 };
    let year = if date.month() < start_month {
        wrapped_year
    } else {
        wrapped_year - 1
    };
    // Feb 29 only ever lands on 1940, so this never falls back in practice.
    NaiveDate::from_ymd_opt(year, date.month(), date.day())
        .unwrap_or_else(|| last_day_of_month(year, date.month()))
}

/// Bucket of a month when the first two quarters are counted from a start month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuarterBucket {
    Q1,
    Q2,
    /// Months outside the first two quarters keep their calendar month.
    Month(u32),
}

impl QuarterBucket {
    /// Months `start..start+2` (wrapping) are Q1, the next three Q2.
    pub fn of(month: u32, start_month: u32) -> Self {
        let offset = (month as i32 - start_month as i32).rem_euclid(12);
        match offset {
            0..=2 => QuarterBucket::Q1,
            3..=5 => QuarterBucket::Q2,
            _ => QuarterBucket::Month(month),
        }
    }

    pub fn label(&self, long: bool) -> String {
        match self {
            QuarterBucket::Q1 => "Q1".to_string(),
            QuarterBucket::Q2 => "Q2".to_string(),
            QuarterBucket::Month(m) => month_name(*m, long).to_string(),
        }
    }

    /// Presentation order: Q1 sorts at the start month, Q2 right after it,
    /// the remaining months at their own number.
    pub fn sort_key(&self, start_month: u32) -> u32 {
        match self {
            QuarterBucket::Q1 => start_month,
            QuarterBucket::Q2 => start_month + 1,
            QuarterBucket::Month(m) => *m,
        }
    }
}

/// ISO week number of `date` within `year`.
///
/// Days whose ISO week belongs to a neighbouring year (for 2017 this is the
/// origin day 2017-01-01, a Sunday closing week 52 of 2016) return `None`.
pub fn week_of_year(date: NaiveDate, year: i32) -> Option<u32> {
    let iso = date.iso_week();
    (iso.year() == year && date.year() == year).then(|| iso.week())
}

/// Calendar quarter label such as `"2015 - Q3"`.
pub fn quarter_label(date: NaiveDate) -> String {
    format!("{} - Q{}", date.year(), (date.month() - 1) / 3 + 1)
}

/// Ordinal of the quarter (`year * 4 + quarter index`), handy for offsets.
pub fn quarter_ordinal(date: NaiveDate) -> i32 {
    date.year() * 4 + (date.month() as i32 - 1) / 3
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN);
    first
        .checked_add_months(Months::new(1))
        .and_then(|d| d.pred_opt())
        .unwrap_or(first)
}

/// Shift by whole calendar months, clamping to the end of shorter months.
pub fn shift_months(date: NaiveDate, months: i32) -> NaiveDate {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

/// Same day one calendar year earlier; February 29th clamps to the 28th.
pub fn previous_year(date: NaiveDate) -> NaiveDate {
    shift_months(date, -12)
}

/// Length unit of a trailing comparison window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodType {
    Day,
    Week,
    Month,
}

impl PeriodType {
    pub const ALL: [PeriodType; 3] = [PeriodType::Day, PeriodType::Week, PeriodType::Month];

    pub fn label(&self) -> &'static str {
        match self {
            PeriodType::Day => "Day",
            PeriodType::Week => "Week",
            PeriodType::Month => "Month",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        PeriodType::ALL.into_iter().find(|p| p.label() == s)
    }
}

/// Inclusive window covering the last `count` complete periods ending on or
/// before `end`.
///
/// Weeks run Sunday to Saturday and months end on their last day, so a window
/// ending mid-period stops at the previous period boundary.
pub fn trailing_window(end: NaiveDate, period: PeriodType, count: u32) -> (NaiveDate, NaiveDate) {
    let count = count.max(1);
    match period {
        PeriodType::Day => {
            let start = end - chrono::Days::new(u64::from(count - 1));
            (start, end)
        }
        PeriodType::Week => {
            let back = (end.weekday().num_days_from_sunday() + 1) % 7;
            let last = end - chrono::Days::new(u64::from(back));
            debug_assert_eq!(last.weekday(), Weekday::Sat);
            let start = last - chrono::Days::new(u64::from(7 * (count - 1) + 6));
            (start, last)
        }
        PeriodType::Month => {
            let month_end = last_day_of_month(end.year(), end.month());
            let last = if end == month_end {
                end
            } else {
                month_start(end).pred_opt().unwrap_or(end)
            };
            let start = month_start(shift_months(month_start(last), -(count as i32 - 1)));
            (start, last)
        }
    }
}
