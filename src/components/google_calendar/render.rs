use super::models::{EventDateTime, NewEntry, ReminderOverride, Reminders};
use super::time::{exclusive_end, format_date, local_rfc3339};
use crate::components::events::Event;
use crate::config::Config;
use crate::error::AppResult;

/// Description line carrying the event's identity across runs
pub const SOURCE_PREFIX: &str = "Source:";
pub const IMAGE_PREFIX: &str = "Image:";
pub const TYPE_PREFIX: &str = "Event Type:";
pub const BONUS_PREFIX: &str = "Bonus:";

/// Entry description: the page text followed by the metadata block the
/// matcher reads back
pub fn render_description(event: &Event) -> String {
    let mut lines = vec![
        event.raw_description.trim().to_string(),
        String::new(),
        format!("{} {}", SOURCE_PREFIX, event.source_url),
    ];
    if let Some(image) = &event.image_url {
        lines.push(format!("{} {}", IMAGE_PREFIX, image));
    }
    lines.push(String::new());
    lines.push(format!("{} {}", TYPE_PREFIX, event.event_type));
    if let Some(bonus) = &event.bonus_text {
        lines.push(format!("{} {}", BONUS_PREFIX, bonus));
    }
    lines.join("\n")
}

fn render_reminders(minutes: &[i64]) -> Reminders {
    Reminders {
        use_default: minutes.is_empty(),
        overrides: minutes
            .iter()
            .map(|&minutes| ReminderOverride {
                method: "popup".to_string(),
                minutes,
            })
            .collect(),
    }
}

/// Request body for an event
pub fn render_entry(event: &Event, config: &Config) -> AppResult<NewEntry> {
    let tz = config.tz()?;

    let (start, end) = match (event.start_time, event.end_time) {
        (Some(start_time), Some(end_time)) => (
            EventDateTime {
                date_time: Some(local_rfc3339(event.start_date, start_time, tz)?),
                time_zone: Some(config.timezone.clone()),
                ..Default::default()
            },
            EventDateTime {
                date_time: Some(local_rfc3339(event.last_date(), end_time, tz)?),
                time_zone: Some(config.timezone.clone()),
                ..Default::default()
            },
        ),
        _ => (
            EventDateTime {
                date: Some(format_date(event.start_date)),
                ..Default::default()
            },
            EventDateTime {
                date: Some(format_date(exclusive_end(event.last_date()))),
                ..Default::default()
            },
        ),
    };

    Ok(NewEntry {
        summary: event.display_title(),
        description: render_description(event),
        start,
        end,
        reminders: render_reminders(&config.reminder_minutes),
        color_id: config.color_for(event.event_type.as_str()).map(|c| c.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::events::EventType;
    use chrono::{NaiveDate, NaiveTime};

    fn spotlight() -> Event {
        Event {
            title: "Spotlight Hour: Pikachu".to_string(),
            event_type: EventType::Spotlight,
            start_date: NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(),
            end_date: None,
            start_time: NaiveTime::from_hms_opt(18, 0, 0),
            end_time: NaiveTime::from_hms_opt(19, 0, 0),
            bonus_text: Some("2× Catch Candy".to_string()),
            source_url: "https://leekduck.com/events/spotlight-hour-pikachu/".to_string(),
            raw_description: "Pikachu in the spotlight.".to_string(),
            image_url: Some("https://cdn.leekduck.com/pikachu.png".to_string()),
        }
    }

    #[test]
    fn test_render_timed_entry() {
        let entry = render_entry(&spotlight(), &Config::default()).unwrap();

        assert_eq!(entry.summary, "Spotlight Hour: Pikachu (2× Catch Candy)");
        assert_eq!(
            entry.description,
            "Pikachu in the spotlight.\n\n\
             Source: https://leekduck.com/events/spotlight-hour-pikachu/\n\
             Image: https://cdn.leekduck.com/pikachu.png\n\n\
             Event Type: Spotlight\n\
             Bonus: 2× Catch Candy"
        );
        assert_eq!(entry.start.date_time.as_deref(), Some("2024-06-04T18:00:00-04:00"));
        assert_eq!(entry.end.date_time.as_deref(), Some("2024-06-04T19:00:00-04:00"));
        assert_eq!(entry.start.time_zone.as_deref(), Some("America/New_York"));
        assert_eq!(entry.color_id.as_deref(), Some("9"));
        assert!(!entry.reminders.use_default);
        assert_eq!(entry.reminders.overrides.len(), 2);
        assert_eq!(entry.reminders.overrides[0].minutes, 60);
    }

    #[test]
    fn test_render_all_day_entry() {
        let mut event = spotlight();
        event.event_type = EventType::Shadow;
        event.bonus_text = None;
        event.image_url = None;
        event.start_time = None;
        event.end_time = None;
        event.end_date = NaiveDate::from_ymd_opt(2024, 6, 9);

        let config = Config {
            reminder_minutes: vec![],
            ..Default::default()
        };
        let entry = render_entry(&event, &config).unwrap();

        assert_eq!(entry.summary, "Spotlight Hour: Pikachu");
        assert_eq!(entry.start.date.as_deref(), Some("2024-06-04"));
        // Exclusive end date
        assert_eq!(entry.end.date.as_deref(), Some("2024-06-10"));
        assert_eq!(entry.start.date_time, None);
        assert!(entry.reminders.use_default);
        assert!(!entry.description.contains(IMAGE_PREFIX));
        assert!(!entry.description.contains(BONUS_PREFIX));
    }
}
