//! Terminal listing of the plan and the user's choice of what to sync

use crate::components::events::{Event, EventType};
use crate::components::matcher::{Decision, FieldChange};
use crate::components::sync::PlannedSync;
use crate::config::UiConfig;
use crate::error::{other_error, AppResult};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, MultiSelect};
use tracing::debug;

const ELLIPSIS: &str = "...";

/// Cut `text` to at most `width` characters
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let keep = width.saturating_sub(ELLIPSIS.len());
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str(ELLIPSIS);
    cut
}

fn time_range(event: &Event) -> String {
    match (event.start_time, event.end_time) {
        (Some(start), Some(end)) => format!("{}-{}", start.format("%H:%M"), end.format("%H:%M")),
        _ => "all day".to_string(),
    }
}

fn date_range(event: &Event) -> String {
    match event.end_date.filter(|end| *end > event.start_date) {
        Some(end) => format!("{} - {}", event.start_date.format("%b %d"), end.format("%b %d")),
        None => event.start_date.format("%b %d").to_string(),
    }
}

/// One-line summary of a planned item
pub fn render_line(item: &PlannedSync, width: usize) -> String {
    let event = &item.event;
    let mut line = format!(
        "[{:<6}] {} {} | {} | {}",
        item.decision.tag(),
        date_range(event),
        time_range(event),
        event.event_type,
        event.title
    );
    if let Some(bonus) = &event.bonus_text {
        line.push_str(&format!(" ({})", bonus));
    }
    truncate(&line, width)
}

/// One line per changed field
pub fn render_diff(diff: &[FieldChange]) -> Vec<String> {
    diff.iter().map(|change| change.to_string()).collect()
}

/// Keep items whose type is one of `only_types`; an empty filter keeps all
pub fn filter_types(items: Vec<PlannedSync>, only_types: &[String]) -> Vec<PlannedSync> {
    if only_types.is_empty() {
        return items;
    }
    let wanted: Vec<EventType> = only_types
        .iter()
        .filter_map(|name| EventType::from_name(name))
        .collect();
    items
        .into_iter()
        .filter(|item| wanted.contains(&item.event.event_type))
        .collect()
}

/// Order by start date, then start time; all-day events lead their day
pub fn sort_chronologically(items: &mut [PlannedSync]) {
    items.sort_by_key(|item| (item.event.start_date, item.event.start_time));
}

/// Print the whole plan grouped under date headings, with diffs under
/// update candidates
pub fn print_plan(items: &[PlannedSync], width: usize) {
    let mut current_day = None;
    for item in items {
        if current_day != Some(item.event.start_date) {
            current_day = Some(item.event.start_date);
            println!("{}", item.event.start_date.format("%A, %B %d"));
        }
        println!("{}", render_line(item, width));
        if let Decision::UpdateCandidate { diff, .. } = &item.decision {
            for line in render_diff(diff) {
                println!("           {}", truncate(&line, width.saturating_sub(11)));
            }
        }
    }
}

/// Every item that would call the API
pub fn accept_all(items: Vec<PlannedSync>) -> Vec<PlannedSync> {
    items.into_iter().filter(PlannedSync::is_actionable).collect()
}

/// Let the user pick items, then confirm each update individually
pub fn prompt_selection(items: Vec<PlannedSync>, ui: &UiConfig) -> AppResult<Vec<PlannedSync>> {
    let actionable = accept_all(items);
    if actionable.is_empty() {
        println!("Nothing to sync: every event is already in the calendar.");
        return Ok(actionable);
    }

    let theme = ColorfulTheme::default();
    let labels: Vec<String> = actionable
        .iter()
        .map(|item| render_line(item, ui.width))
        .collect();
    let defaults = vec![true; labels.len()];

    let chosen = MultiSelect::with_theme(&theme)
        .with_prompt("Select events to sync (space to toggle, enter to confirm)")
        .items(&labels)
        .defaults(&defaults)
        .max_length(ui.height)
        .interact()
        .map_err(|e| other_error(&format!("Selection prompt failed: {}", e)))?;

    let mut selected = Vec::with_capacity(chosen.len());
    for (index, item) in actionable.into_iter().enumerate() {
        if !chosen.contains(&index) {
            continue;
        }
        if let Decision::UpdateCandidate { diff, .. } = &item.decision {
            println!("{}", item.event.title);
            for line in render_diff(diff) {
                println!("  {}", line);
            }
            let confirmed = Confirm::with_theme(&theme)
                .with_prompt("Apply this update?")
                .default(true)
                .interact()
                .map_err(|e| other_error(&format!("Confirmation prompt failed: {}", e)))?;
            if !confirmed {
                debug!("Update of '{}' declined", item.event.title);
                continue;
            }
        }
        selected.push(item);
    }

    Ok(selected)
}
