use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Categories the site's events are sorted into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EventType {
    Raid,
    CommunityDay,
    Spotlight,
    Battle,
    HatchDay,
    Mega,
    Ticket,
    Shadow,
    #[default]
    General,
}

impl EventType {
    pub const ALL: [EventType; 9] = [
        EventType::Raid,
        EventType::CommunityDay,
        EventType::Spotlight,
        EventType::Battle,
        EventType::HatchDay,
        EventType::Mega,
        EventType::Ticket,
        EventType::Shadow,
        EventType::General,
    ];

    /// Display name, also the value written to calendar descriptions
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Raid => "Raid",
            EventType::CommunityDay => "Community Day",
            EventType::Spotlight => "Spotlight",
            EventType::Battle => "Battle",
            EventType::HatchDay => "Hatch Day",
            EventType::Mega => "Mega",
            EventType::Ticket => "Ticket",
            EventType::Shadow => "Shadow",
            EventType::General => "General",
        }
    }

    /// Case-insensitive, whitespace-tolerant lookup by display name
    pub fn from_name(name: &str) -> Option<Self> {
        let folded = fold_tag(name);
        Self::ALL
            .into_iter()
            .find(|t| fold_tag(t.as_str()) == folded)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = std::convert::Infallible;

    /// Unknown names map to `General`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s).unwrap_or_default())
    }
}

/// Lowercase and drop separators so "community-day" and "Community Day" agree
pub fn fold_tag(tag: &str) -> String {
    tag.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Trim and squeeze internal whitespace runs to single spaces
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A normalized event ready for matching and syncing
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub title: String,
    pub event_type: EventType,
    pub start_date: NaiveDate,
    /// Last day of a multi-day event; `None` for single-day events
    pub end_date: Option<NaiveDate>,
    /// Both times are `None` for all-day events
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub bonus_text: Option<String>,
    /// Detail page URL, the identity of the event across runs
    pub source_url: String,
    pub raw_description: String,
    pub image_url: Option<String>,
}

impl Event {
    /// Whether the event spans more than one calendar day
    pub fn is_multi_day(&self) -> bool {
        self.end_date.is_some_and(|end| end > self.start_date)
    }

    /// Whether the event has no time of day
    pub fn is_all_day(&self) -> bool {
        self.start_time.is_none()
    }

    /// Final day of the event
    pub fn last_date(&self) -> NaiveDate {
        self.end_date.unwrap_or(self.start_date)
    }

    /// Title as shown in the calendar, with the spotlight bonus appended
    pub fn display_title(&self) -> String {
        match (&self.event_type, &self.bonus_text) {
            (EventType::Spotlight, Some(bonus)) => format!("{} ({})", self.title, bonus),
            _ => self.title.clone(),
        }
    }
}

/// Fields pulled from a listing card before any interpretation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEvent {
    pub title: Option<String>,
    pub url: Option<String>,
    /// Date line of the listing card, e.g. "Sat, Jun 1, at 2:00 PM"
    pub date_text: Option<String>,
    /// CSS classes or category label near the card
    pub type_hint: Option<String>,
    pub image_url: Option<String>,
    pub detail: Option<DetailPage>,
}

/// Fields pulled from an event's own page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailPage {
    pub start_text: Option<String>,
    pub end_text: Option<String>,
    pub description: Option<String>,
    pub paragraphs: Vec<String>,
}
