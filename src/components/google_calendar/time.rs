use crate::error::{sync_error, AppResult};
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Date in the format used by all-day entries
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// RFC 3339 timestamp of a wall-clock time in `tz`
pub fn local_rfc3339(date: NaiveDate, time: NaiveTime, tz: Tz) -> AppResult<String> {
    let local = match tz.from_local_datetime(&date.and_time(time)) {
        LocalResult::Single(dt) => dt,
        // Repeated hour at the end of daylight saving time
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            return Err(sync_error(&format!(
                "{} {} does not exist in {}",
                date, time, tz
            )));
        }
    };
    Ok(local.to_rfc3339())
}

/// Date and time of day of a timed entry boundary, seen from `tz`
pub fn parse_entry_datetime(value: &str, tz: Tz) -> Option<(NaiveDate, NaiveTime)> {
    let dt = DateTime::parse_from_rfc3339(value).ok()?.with_timezone(&tz);
    Some((dt.date_naive(), dt.time()))
}

pub fn parse_entry_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Exclusive end date Google expects for an all-day entry ending on `last_day`
pub fn exclusive_end(last_day: NaiveDate) -> NaiveDate {
    last_day + Duration::days(1)
}

/// Inclusive last day of an all-day entry from Google's exclusive end date
pub fn inclusive_end(exclusive: NaiveDate) -> NaiveDate {
    exclusive - Duration::days(1)
}
