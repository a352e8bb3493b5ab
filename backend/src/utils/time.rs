use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::models::report::{PeriodFilter, TimeWindow};

/// Returns the current time in the configured timezone.
pub fn now_in_timezone(tz: &Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(tz)
}

/// Start of `date` in `tz`, as UTC. Skips forward an hour when midnight falls
/// into a DST gap.
pub fn local_midnight(tz: &Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Window covering `[start, end)` calendar days in `tz`.
pub fn day_range_window(tz: &Tz, start: NaiveDate, end: NaiveDate) -> Option<TimeWindow> {
    Some(TimeWindow {
        from: local_midnight(tz, start)?,
        to: local_midnight(tz, end)?,
    })
}

/// Midnight-to-midnight window of a single calendar date.
pub fn date_window(tz: &Tz, date: NaiveDate) -> Option<TimeWindow> {
    day_range_window(tz, date, date.succ_opt()?)
}

/// Window of the bucket containing `now`:
/// - daily: today
/// - weekly: ISO week, Monday to next Monday
/// - monthly: first of month to first of next month
/// - yearly: Jan 1 to next Jan 1
pub fn period_window(filter: PeriodFilter, now: DateTime<Tz>) -> Option<TimeWindow> {
    let tz = now.timezone();
    let today = now.date_naive();
    let (start, end) = match filter {
        PeriodFilter::Daily => (today, today.succ_opt()?),
        PeriodFilter::Weekly => {
            let monday =
                today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
            (monday, monday + Duration::days(7))
        }
        PeriodFilter::Monthly => {
            let first = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)?;
            (first, first.checked_add_months(Months::new(1))?)
        }
        PeriodFilter::Yearly => (
            NaiveDate::from_ymd_opt(today.year(), 1, 1)?,
            NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?,
        ),
    };
    day_range_window(&tz, start, end)
}
