//! Decides whether a scraped event is new, already in the calendar, or an
//! update to an existing entry.

use crate::components::events::models::fold_tag;
use crate::components::events::{collapse_whitespace, Event};
use crate::components::google_calendar::models::CalendarEntry;
use crate::components::google_calendar::render::{BONUS_PREFIX, SOURCE_PREFIX, TYPE_PREFIX};
use crate::components::google_calendar::time::{
    inclusive_end, parse_entry_date, parse_entry_datetime,
};
use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use tracing::debug;

lazy_static! {
    static ref IDENTITY_RE: Regex =
        Regex::new(r"(?m)^\s*Source:\s*(\S+)").expect("identity pattern compiles");
}

/// Shown in diffs for a value that is not set
pub const ABSENT: &str = "(none)";

/// Compared fields, in diff order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    EventType,
    StartDate,
    EndDate,
    StartTime,
    EndTime,
    Bonus,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::EventType => "event type",
            Field::StartDate => "start date",
            Field::EndDate => "end date",
            Field::StartTime => "start time",
            Field::EndTime => "end time",
            Field::Bonus => "bonus",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One differing field between the calendar entry and the scraped event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: Field,
    pub old: Option<String>,
    pub new: Option<String>,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.field,
            self.old.as_deref().unwrap_or(ABSENT),
            self.new.as_deref().unwrap_or(ABSENT)
        )
    }
}

/// Outcome of matching one event against the calendar
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Create,
    Unchanged,
    UpdateCandidate {
        entry: CalendarEntry,
        diff: Vec<FieldChange>,
    },
}

impl Decision {
    /// Short tag used in listings
    pub fn tag(&self) -> &'static str {
        match self {
            Decision::Create => "NEW",
            Decision::Unchanged => "SAME",
            Decision::UpdateCandidate { .. } => "UPDATE",
        }
    }
}

/// Comparable field values of either side, already normalized
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub title: Option<String>,
    pub event_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub bonus: Option<String>,
}

fn normalize_text(text: &str) -> Option<String> {
    let collapsed = collapse_whitespace(text);
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

fn date_value(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn time_value(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Values of `Prefix value` lines in the metadata block after the last
/// identity line
fn metadata_value<'a>(description: &'a str, prefix: &str) -> Option<&'a str> {
    let block_start = IDENTITY_RE
        .find_iter(description)
        .last()
        .map(|m| m.start())
        .unwrap_or(0);
    description[block_start..]
        .lines()
        .filter_map(|line| line.trim().strip_prefix(prefix))
        .last()
        .map(str::trim)
}

/// Boundary of an entry: date plus time for timed entries
fn entry_boundary(
    date_time: Option<&str>,
    date: Option<&str>,
    tz: Tz,
) -> Option<(NaiveDate, Option<NaiveTime>)> {
    if let Some(value) = date_time {
        return parse_entry_datetime(value, tz).map(|(d, t)| (d, Some(t)));
    }
    date.and_then(parse_entry_date).map(|d| (d, None))
}

impl Snapshot {
    pub fn of_event(event: &Event) -> Self {
        Self {
            title: normalize_text(&event.title),
            event_type: normalize_text(event.event_type.as_str()),
            start_date: Some(date_value(event.start_date)),
            end_date: event
                .end_date
                .filter(|end| *end > event.start_date)
                .map(date_value),
            start_time: event.start_time.map(time_value),
            end_time: event.end_time.map(time_value),
            bonus: event.bonus_text.as_deref().and_then(normalize_text),
        }
    }

    /// Project an entry back into event fields, undoing what rendering adds
    pub fn of_entry(entry: &CalendarEntry, tz: Tz) -> Self {
        let description = entry.description.as_deref().unwrap_or_default();
        let bonus = metadata_value(description, BONUS_PREFIX).and_then(normalize_text);
        let event_type = metadata_value(description, TYPE_PREFIX).and_then(normalize_text);

        let suffix = bonus.as_ref().map(|bonus| format!(" ({})", bonus));
        let title = entry
            .summary
            .as_deref()
            .and_then(normalize_text)
            .map(|summary| {
                let stripped = suffix
                    .as_deref()
                    .and_then(|suffix| summary.strip_suffix(suffix))
                    .and_then(normalize_text);
                stripped.unwrap_or(summary)
            });

        let start = entry_boundary(entry.start_date_time.as_deref(), entry.start_date.as_deref(), tz);
        let end = entry_boundary(entry.end_date_time.as_deref(), entry.end_date.as_deref(), tz)
            .map(|(date, time)| match time {
                Some(_) => (date, time),
                // All-day end dates are exclusive
                None => (inclusive_end(date), None),
            });

        let start_date = start.map(|(date, _)| date);
        let end_date = end
            .map(|(date, _)| date)
            .filter(|date| start_date.is_some_and(|start| *date > start));

        Self {
            title,
            event_type,
            start_date: start_date.map(date_value),
            end_date: end_date.map(date_value),
            start_time: start.and_then(|(_, time)| time).map(time_value),
            end_time: end.and_then(|(_, time)| time).map(time_value),
            bonus,
        }
    }

    fn values(&self) -> [(Field, &Option<String>); 7] {
        [
            (Field::Title, &self.title),
            (Field::EventType, &self.event_type),
            (Field::StartDate, &self.start_date),
            (Field::EndDate, &self.end_date),
            (Field::StartTime, &self.start_time),
            (Field::EndTime, &self.end_time),
            (Field::Bonus, &self.bonus),
        ]
    }
}

fn same_value(field: Field, old: &Option<String>, new: &Option<String>) -> bool {
    match (field, old, new) {
        (Field::EventType, Some(old), Some(new)) => fold_tag(old) == fold_tag(new),
        _ => old == new,
    }
}

/// Changes needed to turn `old` into `new`, in field order
pub fn diff(old: &Snapshot, new: &Snapshot) -> Vec<FieldChange> {
    old.values()
        .into_iter()
        .zip(new.values())
        .filter(|((field, old), (_, new))| !same_value(*field, old, new))
        .map(|((field, old), (_, new))| FieldChange {
            field,
            old: old.clone(),
            new: new.clone(),
        })
        .collect()
}

/// Source URL embedded in an entry description; the last such line counts
pub fn identity_token(description: &str) -> Option<&str> {
    IDENTITY_RE
        .captures_iter(description)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// First entry carrying the given source URL
pub fn find_entry<'a>(source_url: &str, entries: &'a [CalendarEntry]) -> Option<&'a CalendarEntry> {
    entries.iter().find(|entry| {
        entry
            .description
            .as_deref()
            .and_then(identity_token)
            .is_some_and(|token| token == source_url)
    })
}

/// Classify one event against the existing entries
pub fn classify(event: &Event, entries: &[CalendarEntry], tz: Tz) -> Decision {
    let Some(entry) = find_entry(&event.source_url, entries) else {
        debug!("No entry for {}", event.source_url);
        return Decision::Create;
    };

    let changes = diff(&Snapshot::of_entry(entry, tz), &Snapshot::of_event(event));
    if changes.is_empty() {
        Decision::Unchanged
    } else {
        debug!(
            "Entry {} differs from {} in {} field(s)",
            entry.id,
            event.source_url,
            changes.len()
        );
        Decision::UpdateCandidate {
            entry: entry.clone(),
            diff: changes,
        }
    }
}
