use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single calendar event
///
/// The date is parsed before an `Event` is constructed, so every stored
/// event carries a valid calendar date. Titles are not unique; deletion
/// matches them case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_start_time")]
    pub start_time: String,
    #[serde(default = "default_end_time")]
    pub end_time: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Event {
    /// Create an event with the default time window and timezone
    pub fn new(title: &str, date: NaiveDate, description: &str) -> Self {
        Self {
            title: title.to_string(),
            date,
            description: description.to_string(),
            start_time: default_start_time(),
            end_time: default_end_time(),
            timezone: default_timezone(),
        }
    }
}

pub fn default_start_time() -> String {
    String::from("09:00")
}

pub fn default_end_time() -> String {
    String::from("10:00")
}

pub fn default_timezone() -> String {
    String::from("UTC")
}
