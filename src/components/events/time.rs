use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// "Jun 1", "June 1, 2024", "Sat, Jun 1st"; the weekday is ignored
    static ref DATE_RE: Regex = Regex::new(
        r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2})(?:st|nd|rd|th)?\b(?:,?\s+(\d{4})\b)?"
    )
    .expect("date pattern compiles");
    /// "2:00 PM", "10:30am", "6:00 p.m."
    static ref TIME_RE: Regex = Regex::new(r"(?i)\b(\d{1,2}):(\d{2})\s*([ap])\.?\s?m\.?")
        .expect("time pattern compiles");
}

/// Undated listings this far in the past are assumed to be next year's
const YEAR_ROLLOVER_DAYS: i64 = 180;

/// A date with an optional time of day, as read from page text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatePoint {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
}

/// Month number from an English month name or abbreviation
fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).flat_map(char::to_lowercase).collect();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Year for a date printed without one, relative to the day of the scrape
pub fn infer_year(month: u32, day: u32, reference: NaiveDate) -> Option<NaiveDate> {
    let candidate = NaiveDate::from_ymd_opt(reference.year(), month, day)?;
    if candidate < reference - Duration::days(YEAR_ROLLOVER_DAYS) {
        NaiveDate::from_ymd_opt(reference.year() + 1, month, day).or(Some(candidate))
    } else {
        Some(candidate)
    }
}

/// Parse "2:00 PM" style text into a 24-hour time
pub fn parse_clock(text: &str) -> Option<NaiveTime> {
    let caps = TIME_RE.captures(text)?;
    let hour = caps[1].parse::<u32>().ok()?;
    let minute = caps[2].parse::<u32>().ok()?;
    if hour == 0 || hour > 12 {
        return None;
    }
    let is_pm = caps[3].eq_ignore_ascii_case("p");
    let hour = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Every date in the text, each paired with the first time that follows it
/// before the next date.
///
/// Dates without a year take the year of the previous date in the same text
/// (rolling forward when they would go backwards), or are inferred from
/// `reference` when they come first.
pub fn parse_points(text: &str, reference: NaiveDate) -> Vec<DatePoint> {
    let matches: Vec<_> = DATE_RE.captures_iter(text).collect();
    let mut points: Vec<DatePoint> = Vec::with_capacity(matches.len());

    for (i, caps) in matches.iter().enumerate() {
        let Some(whole) = caps.get(0) else { continue };
        let Some(month) = month_number(&caps[1]) else { continue };
        let Ok(day) = caps[2].parse::<u32>() else { continue };

        let date = match caps.get(3).and_then(|y| y.as_str().parse::<i32>().ok()) {
            Some(year) => NaiveDate::from_ymd_opt(year, month, day),
            None => match points.last() {
                Some(prev) => NaiveDate::from_ymd_opt(prev.date.year(), month, day).and_then(|d| {
                    if d < prev.date {
                        NaiveDate::from_ymd_opt(prev.date.year() + 1, month, day)
                    } else {
                        Some(d)
                    }
                }),
                None => infer_year(month, day, reference),
            },
        };
        let Some(date) = date else { continue };

        let segment_end = matches
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());
        let time = parse_clock(&text[whole.end()..segment_end]);

        points.push(DatePoint { date, time });
    }

    points
}

/// First date/time in the text
pub fn parse_datetime_text(text: &str, reference: NaiveDate) -> Option<DatePoint> {
    parse_points(text, reference).into_iter().next()
}

/// Start and optional end of a listing date line such as
/// "Sat, Jun 1, at 10:00 AM - Sun, Jun 2, at 8:00 PM"
pub fn parse_range_text(text: &str, reference: NaiveDate) -> Option<(DatePoint, Option<DatePoint>)> {
    let mut points = parse_points(text, reference).into_iter();
    let start = points.next()?;
    Some((start, points.next()))
}

/// 23:59, the end of the final day of an event without an explicit end time
pub fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap_or_default()
}
