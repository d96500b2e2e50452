use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Simplified calendar entry representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CalendarEntry {
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Last-modified marker
    pub updated: Option<String>,
    pub start_date_time: Option<String>,
    pub start_date: Option<String>,
    pub end_date_time: Option<String>,
    pub end_date: Option<String>,
}

fn string_field(item: &Value, key: &str) -> Option<String> {
    item.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn boundary_field(item: &Value, boundary: &str, key: &str) -> Option<String> {
    item.get(boundary)
        .and_then(|b| b.as_object())
        .and_then(|b| b.get(key))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

impl CalendarEntry {
    /// Build from one element of the `items` array of an events response
    pub fn from_api(item: &Value) -> Self {
        Self {
            id: string_field(item, "id").unwrap_or_default(),
            summary: string_field(item, "summary"),
            description: string_field(item, "description"),
            updated: string_field(item, "updated"),
            start_date_time: boundary_field(item, "start", "dateTime"),
            start_date: boundary_field(item, "start", "date"),
            end_date_time: boundary_field(item, "end", "dateTime"),
            end_date: boundary_field(item, "end", "date"),
        }
    }
}

/// Start or end of an entry; either `date` or `date_time` is set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderOverride {
    pub method: String,
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    pub use_default: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<ReminderOverride>,
}

/// Request body for creating or patching an entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    pub summary: String,
    pub description: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub reminders: Reminders,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
}

/// Keys of a start/end object; only one of `date` and `dateTime` is in use
const BOUNDARY_KEYS: [&str; 3] = ["date", "dateTime", "timeZone"];

impl NewEntry {
    /// Body for a PATCH request.
    ///
    /// Google merges nested objects on PATCH, so the boundary keys not in
    /// use are sent as `null` to drop the stored ones when an entry turns
    /// from timed into all-day or back.
    pub fn patch_body(&self) -> Result<Value, serde_json::Error> {
        let mut body = serde_json::to_value(self)?;
        for boundary in ["start", "end"] {
            if let Some(fields) = body.get_mut(boundary).and_then(Value::as_object_mut) {
                for key in BOUNDARY_KEYS {
                    fields.entry(key).or_insert(Value::Null);
                }
            }
        }
        Ok(body)
    }
}
