//! Pairs scraped events with their decisions and writes the chosen ones

use crate::components::events::Event;
use crate::components::google_calendar::{render_entry, CalendarApi, CalendarEntry};
use crate::components::matcher::{classify, Decision};
use crate::config::Config;
use crate::error::{AppResult, Error};
use chrono_tz::Tz;
use std::fmt;
use std::future::Future;
use tracing::{debug, error, info, warn};

/// An event together with what syncing it would do
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSync {
    pub event: Event,
    pub decision: Decision,
}

impl PlannedSync {
    /// Whether syncing this item calls the calendar API
    pub fn is_actionable(&self) -> bool {
        !matches!(self.decision, Decision::Unchanged)
    }
}

/// Classify every event against the existing entries
pub fn plan(events: Vec<Event>, entries: &[CalendarEntry], tz: Tz) -> Vec<PlannedSync> {
    events
        .into_iter()
        .map(|event| {
            let decision = classify(&event, entries, tz);
            PlannedSync { event, decision }
        })
        .collect()
}

/// Outcome of a commit
#[derive(Debug, Default)]
pub struct SyncReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: usize,
    /// Title and error message of every rejected item
    pub failed: Vec<(String, String)>,
    /// Authentication error that stopped the commit early
    pub aborted: Option<Error>,
}

impl SyncReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Number of selected items the commit got through
    fn processed(&self) -> usize {
        self.created.len() + self.updated.len() + self.unchanged + self.failed.len()
    }

    /// Append the outcome of a later commit
    pub fn merge(&mut self, other: SyncReport) {
        self.created.extend(other.created);
        self.updated.extend(other.updated);
        self.unchanged += other.unchanged;
        self.failed.extend(other.failed);
        self.aborted = other.aborted;
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Created {}, updated {}, unchanged {}, failed {}",
            self.created.len(),
            self.updated.len(),
            self.unchanged,
            self.failed.len()
        )?;
        for title in &self.created {
            writeln!(f, "  + {}", title)?;
        }
        for title in &self.updated {
            writeln!(f, "  ~ {}", title)?;
        }
        for (title, reason) in &self.failed {
            writeln!(f, "  ! {}: {}", title, reason)?;
        }
        if let Some(e) = &self.aborted {
            writeln!(f, "Stopped early: {}", e)?;
        }
        Ok(())
    }
}

/// Write the selected items one at a time.
///
/// A rejected item is recorded and the rest continue. An authentication
/// failure stops the commit; the error is kept in `aborted` next to what was
/// already written.
pub async fn commit(api: &dyn CalendarApi, selected: &[PlannedSync], config: &Config) -> SyncReport {
    let mut report = SyncReport::default();

    for item in selected {
        let title = item.event.title.clone();

        let result = match &item.decision {
            Decision::Unchanged => {
                report.unchanged += 1;
                continue;
            }
            Decision::Create => match render_entry(&item.event, config) {
                Ok(entry) => api.insert_entry(&entry).await,
                Err(e) => Err(e),
            },
            Decision::UpdateCandidate { entry: existing, .. } => {
                match render_entry(&item.event, config) {
                    Ok(entry) => api.update_entry(&existing.id, &entry).await,
                    Err(e) => Err(e),
                }
            }
        };

        match result {
            Ok(entry) => {
                if matches!(item.decision, Decision::Create) {
                    info!("Created '{}' ({})", title, entry.id);
                    report.created.push(title);
                } else {
                    info!("Updated '{}' ({})", title, entry.id);
                    report.updated.push(title);
                }
            }
            Err(e) if e.is_auth() => {
                error!("Stopping sync at '{}': {}", title, e);
                report.aborted = Some(e);
                break;
            }
            Err(e) => {
                error!("Failed to sync '{}': {}", title, e);
                report.failed.push((title, e.to_string()));
            }
        }
    }

    report
}

/// Commit, and on an authentication failure run `reauthorize` once and
/// continue with the items not yet written.
///
/// The remaining items are classified again against a fresh listing, so
/// nothing is created twice. A second authentication failure is left in
/// the report's `aborted`.
pub async fn commit_with_reauth<F, Fut>(
    api: &dyn CalendarApi,
    selected: Vec<PlannedSync>,
    config: &Config,
    tz: Tz,
    reauthorize: F,
) -> SyncReport
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = AppResult<()>>,
{
    let mut report = commit(api, &selected, config).await;
    let cause = match report.aborted.take() {
        Some(e) => e,
        None => return report,
    };

    warn!("{}; authorizing again", cause);
    let entries = match reauthorize().await {
        Ok(()) => api.list_entries().await,
        Err(e) => Err(e),
    };
    let entries = match entries {
        Ok(entries) => entries,
        Err(e) => {
            report.aborted = Some(e);
            return report;
        }
    };

    let done = report.processed();
    let remaining: Vec<Event> = selected.into_iter().skip(done).map(|item| item.event).collect();
    debug!("Retrying {} item(s) after authorization", remaining.len());
    let replanned = plan(remaining, &entries, tz);
    report.merge(commit(api, &replanned, config).await);
    report
}
