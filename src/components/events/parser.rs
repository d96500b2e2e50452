use super::bonus::extract_bonus;
use super::models::{collapse_whitespace, Event, EventType, RawEvent};
use super::time::{end_of_day, parse_datetime_text, parse_range_text, DatePoint};
use crate::error::ParseError;
use chrono::{Duration, NaiveDate, NaiveTime, Timelike};
use tracing::{debug, warn};

/// Description used when the detail page has none
pub const DEFAULT_DESCRIPTION: &str = "Pokémon GO event";

/// Shorter titles are navigation noise, not events
const MIN_TITLE_LEN: usize = 3;

/// Title keywords checked in order; the first hit decides the type
const TITLE_KEYWORDS: &[(&str, EventType)] = &[
    ("raid", EventType::Raid),
    ("community day", EventType::CommunityDay),
    ("spotlight", EventType::Spotlight),
    ("battle", EventType::Battle),
    ("league", EventType::Battle),
    ("hatch", EventType::HatchDay),
    ("mega", EventType::Mega),
    ("ticket", EventType::Ticket),
    ("shadow", EventType::Shadow),
];

/// Start and end of an event after defaults have been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Timing {
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
}

/// Decide the event type from the title, falling back to the listing's hint
pub fn classify_type(title: &str, type_hint: Option<&str>) -> EventType {
    let lower = title.to_lowercase();
    if let Some((_, event_type)) = TITLE_KEYWORDS.iter().find(|(kw, _)| lower.contains(kw)) {
        return *event_type;
    }

    let Some(hint) = type_hint else {
        return EventType::General;
    };
    let hint_lower = hint.to_lowercase();
    if hint_lower.contains("raid") {
        return EventType::Raid;
    }
    if hint_lower.contains("battle") {
        return EventType::Battle;
    }

    // Either a label such as "Community Day" or class names such as "community-day"
    EventType::from_name(hint)
        .or_else(|| hint.split_whitespace().find_map(EventType::from_name))
        .unwrap_or_default()
}

/// Default end of a single-day event with only a start time: one hour later
fn default_end_time(start: NaiveTime) -> NaiveTime {
    let (end, wrapped) = start.overflowing_add_signed(Duration::hours(1));
    if wrapped != 0 {
        end_of_day()
    } else {
        end
    }
}

/// Events spanning (nearly) whole days are written as all-day entries
fn spans_whole_days(multi_day: bool, start: NaiveTime, end: NaiveTime) -> bool {
    if multi_day {
        start.hour() < 2 && end.hour() > 21
    } else {
        start.hour() < 10 && end.hour() > 18 && end - start > Duration::hours(7)
    }
}

/// Pick the best start/end pair: the detail page when it has both, else the
/// listing's date line, else whatever start the detail page had.
fn resolve_points(raw: &RawEvent, reference: NaiveDate) -> Option<(DatePoint, Option<DatePoint>)> {
    let detail = raw.detail.as_ref();
    let detail_start = detail
        .and_then(|d| d.start_text.as_deref())
        .and_then(|text| parse_datetime_text(text, reference));
    let detail_end = detail
        .and_then(|d| d.end_text.as_deref())
        .and_then(|text| parse_datetime_text(text, reference));

    if let (Some(start), Some(end)) = (detail_start, detail_end) {
        return Some((start, Some(end)));
    }

    raw.date_text
        .as_deref()
        .and_then(|text| parse_range_text(text, reference))
        .or_else(|| detail_start.map(|start| (start, None)))
}

fn resolve_timing(start: DatePoint, end: Option<DatePoint>) -> Timing {
    // An end before the start is noise; keep the start alone
    let end = end.filter(|e| e.date >= start.date);
    let end_date = end.map(|e| e.date).filter(|d| *d > start.date);
    let multi_day = end_date.is_some();

    let Some(start_time) = start.time else {
        return Timing {
            start_date: start.date,
            end_date,
            start_time: None,
            end_time: None,
        };
    };

    let end_time = match end.and_then(|e| e.time) {
        Some(explicit) if multi_day || explicit > start_time => explicit,
        _ if multi_day => end_of_day(),
        _ => default_end_time(start_time),
    };

    if spans_whole_days(multi_day, start_time, end_time) {
        debug!("Treating {} as an all-day event", start.date);
        return Timing {
            start_date: start.date,
            end_date,
            start_time: None,
            end_time: None,
        };
    }

    Timing {
        start_date: start.date,
        end_date,
        start_time: Some(start_time),
        end_time: Some(end_time),
    }
}

/// Turn one scraped record into an event.
///
/// `reference` is the day of the scrape, used to place dates printed without
/// a year.
pub fn parse(raw: &RawEvent, reference: NaiveDate) -> Result<Event, ParseError> {
    let title = raw
        .title
        .as_deref()
        .map(collapse_whitespace)
        .filter(|t| t.chars().count() >= MIN_TITLE_LEN)
        .ok_or(ParseError::MissingTitle)?;

    let source_url = raw
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ParseError::MissingUrl(title.clone()))?
        .to_string();

    let (start, end) =
        resolve_points(raw, reference).ok_or_else(|| ParseError::MissingDate(title.clone()))?;
    let timing = resolve_timing(start, end);

    let event_type = classify_type(&title, raw.type_hint.as_deref());

    let bonus_text = match (&event_type, &raw.detail) {
        (EventType::Spotlight, Some(detail)) => extract_bonus(&detail.paragraphs),
        _ => None,
    };

    let raw_description = raw
        .detail
        .as_ref()
        .and_then(|d| d.description.as_deref())
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_DESCRIPTION)
        .to_string();

    Ok(Event {
        title,
        event_type,
        start_date: timing.start_date,
        end_date: timing.end_date,
        start_time: timing.start_time,
        end_time: timing.end_time,
        bonus_text,
        source_url,
        raw_description,
        image_url: raw.image_url.clone(),
    })
}

/// Parse every record, dropping and logging the ones that cannot be used
pub fn parse_all(raws: &[RawEvent], reference: NaiveDate) -> Vec<Event> {
    let mut events = Vec::with_capacity(raws.len());
    for raw in raws {
        match parse(raw, reference) {
            Ok(event) => {
                debug!("Parsed event: {} ({})", event.title, event.event_type);
                events.push(event);
            }
            Err(e) => warn!("Dropping scraped record: {}", e),
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::events::models::DetailPage;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn raw(title: &str, date_text: &str) -> RawEvent {
        RawEvent {
            title: Some(title.to_string()),
            url: Some("https://leekduck.com/events/test-event/".to_string()),
            date_text: Some(date_text.to_string()),
            ..Default::default()
        }
    }

    const REFERENCE: (i32, u32, u32) = (2024, 5, 20);

    fn reference() -> NaiveDate {
        date(REFERENCE.0, REFERENCE.1, REFERENCE.2)
    }

    #[test]
    fn test_title_is_whitespace_normalized() {
        let event = parse(&raw(" Community Day:  Bulbasaur ", "Sat, Jun 1, at 2:00 PM"), reference())
            .unwrap();
        assert_eq!(event.title, "Community Day: Bulbasaur");
        assert_eq!(event.event_type, EventType::CommunityDay);
    }

    #[test]
    fn test_listing_only_single_day() {
        let event = parse(&raw("Raid Hour", "Wed, Jun 5, at 6:00 PM"), reference()).unwrap();
        assert_eq!(event.start_date, date(2024, 6, 5));
        assert_eq!(event.end_date, None);
        assert_eq!(event.start_time, Some(time(18, 0)));
        // No end on the card: one hour later
        assert_eq!(event.end_time, Some(time(19, 0)));
        assert_eq!(event.raw_description, DEFAULT_DESCRIPTION);
    }

    #[test]
    fn test_multi_day_from_detail_page() {
        let mut record = raw("Bug Out Event", "Sat, Jun 1, at 10:00 AM");
        record.detail = Some(DetailPage {
            start_text: Some("Saturday, June 1, 2024, at 10:00 AM Local Time".to_string()),
            end_text: Some("Sunday, June 2, 2024, at 8:00 PM Local Time".to_string()),
            description: Some("Bugs everywhere.".to_string()),
            paragraphs: vec![],
        });

        let event = parse(&record, reference()).unwrap();
        assert_eq!(event.start_date, date(2024, 6, 1));
        assert_eq!(event.end_date, Some(date(2024, 6, 2)));
        assert!(event.is_multi_day());
        assert_eq!(event.start_time, Some(time(10, 0)));
        assert_eq!(event.end_time, Some(time(20, 0)));
        assert_eq!(event.raw_description, "Bugs everywhere.");
    }

    #[test]
    fn test_multi_day_without_end_time_runs_to_end_of_day() {
        let event = parse(
            &raw("Go Battle Week", "Mon, Jun 3, at 9:00 AM - Fri, Jun 7"),
            reference(),
        )
        .unwrap();
        assert_eq!(event.end_date, Some(date(2024, 6, 7)));
        assert_eq!(event.end_time, Some(end_of_day()));
        assert_eq!(event.event_type, EventType::Battle);
    }

    #[test]
    fn test_all_day_collapse() {
        // Multi-day from midnight to late evening
        let event = parse(
            &raw("Shadow Week", "Mon, Jun 3, at 12:00 AM - Sun, Jun 9, at 11:59 PM"),
            reference(),
        )
        .unwrap();
        assert!(event.is_all_day());
        assert_eq!(event.end_date, Some(date(2024, 6, 9)));

        // Single day, 9:00 to 20:00
        let event = parse(
            &raw("Hatch Day", "Sat, Jun 8, at 9:00 AM - Sat, Jun 8, at 8:00 PM"),
            reference(),
        )
        .unwrap();
        assert!(event.is_all_day());
        assert_eq!(event.end_date, None);

        // Regular three-hour event keeps its times
        let event = parse(&raw("Community Day: Bulbasaur", "Sun, Jun 9, at 2:00 PM - Sun, Jun 9, at 5:00 PM"), reference())
            .unwrap();
        assert!(!event.is_all_day());
        assert_eq!(event.end_time, Some(time(17, 0)));
    }

    #[test]
    fn test_missing_fields() {
        let mut record = raw("Raid Hour", "Wed, Jun 5, at 6:00 PM");
        record.title = Some("  ".to_string());
        assert_eq!(parse(&record, reference()), Err(ParseError::MissingTitle));

        let mut record = raw("Raid Hour", "Wed, Jun 5, at 6:00 PM");
        record.url = None;
        assert_eq!(
            parse(&record, reference()),
            Err(ParseError::MissingUrl("Raid Hour".to_string()))
        );

        let record = raw("Raid Hour", "Date to be announced");
        assert_eq!(
            parse(&record, reference()),
            Err(ParseError::MissingDate("Raid Hour".to_string()))
        );
    }

    #[test]
    fn test_parse_all_keeps_good_records() {
        let records = vec![
            raw("Raid Hour", "Wed, Jun 5, at 6:00 PM"),
            raw("??", "Wed, Jun 5, at 6:00 PM"),
            raw("Spotlight Hour: Pikachu", "TBA"),
            raw("Max Monday", "Mon, Jun 10, at 6:00 PM"),
        ];
        let events = parse_all(&records, reference());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "Raid Hour");
        assert_eq!(events[1].title, "Max Monday");
    }

    #[test]
    fn test_spotlight_bonus() {
        let mut record = raw("Spotlight Hour: Pikachu", "Tue, Jun 4, at 6:00 PM");
        record.detail = Some(DetailPage {
            paragraphs: vec!["The special bonus is **2× Catch Candy**.".to_string()],
            ..Default::default()
        });
        let event = parse(&record, reference()).unwrap();
        assert_eq!(event.event_type, EventType::Spotlight);
        assert_eq!(event.bonus_text.as_deref(), Some("2× Catch Candy"));

        // No recognizable bonus leaves it empty instead of failing
        record.detail = Some(DetailPage {
            paragraphs: vec!["Featuring Pikachu.".to_string()],
            ..Default::default()
        });
        let event = parse(&record, reference()).unwrap();
        assert_eq!(event.bonus_text, None);

        // Bonus text on non-spotlight events is ignored
        let mut record = raw("Raid Hour", "Wed, Jun 5, at 6:00 PM");
        record.detail = Some(DetailPage {
            paragraphs: vec!["The special bonus is 2× Catch Candy.".to_string()],
            ..Default::default()
        });
        assert_eq!(parse(&record, reference()).unwrap().bonus_text, None);
    }

    #[test]
    fn test_classify_type() {
        assert_eq!(classify_type("Mega Raid Day", None), EventType::Raid);
        assert_eq!(classify_type("GO Battle League: Season 19", None), EventType::Battle);
        assert_eq!(classify_type("Shadow Raid Day", None), EventType::Raid);
        assert_eq!(classify_type("Super Mega Event", None), EventType::Mega);
        assert_eq!(classify_type("Pokémon GO Fest", None), EventType::General);

        // Listing hints only apply when the title says nothing
        assert_eq!(classify_type("Max Monday", Some("event-item raid-battles")), EventType::Raid);
        assert_eq!(classify_type("Max Monday", Some("event-item-wrapper community-day")), EventType::CommunityDay);
        assert_eq!(classify_type("Max Monday", Some("Hatch Day")), EventType::HatchDay);
        assert_eq!(classify_type("Max Monday", Some("event-item")), EventType::General);
    }
}
