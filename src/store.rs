use crate::error::{CalResult, Error};
use crate::models::Event;
use crate::utils::time::parse_date;

/// In-memory event collection, living for the lifetime of the process
///
/// Events have no identifier beyond their title and date. The collection
/// preserves insertion order; listings sort by date with insertion order as
/// the tie-break.
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event, rejecting anything that is not a valid YYYY-MM-DD date
    pub fn add(&mut self, title: &str, date: &str, description: &str) -> CalResult<String> {
        let date = parse_date(date).ok_or(Error::InvalidDate)?;
        self.events.push(Event::new(title, date, description));
        Ok(format!(
            "Event '{}' added for {}.",
            title,
            date.format("%Y-%m-%d")
        ))
    }

    /// All events in chronological order, one line each
    pub fn list(&self) -> String {
        if self.events.is_empty() {
            return String::from("No events scheduled.");
        }

        let mut result = String::from("Calendar Events:\n");
        for event in self.sorted() {
            let desc = if event.description.is_empty() {
                String::new()
            } else {
                format!(" - {}", event.description)
            };
            result.push_str(&format!(
                "- {}: {}{}\n",
                event.date.format("%Y-%m-%d"),
                event.title,
                desc
            ));
        }
        result
    }

    /// Events falling on the given date only
    pub fn list_by_date(&self, date: &str) -> CalResult<String> {
        let date = parse_date(date).ok_or(Error::InvalidDate)?;
        let matching: Vec<&Event> = self.events.iter().filter(|e| e.date == date).collect();

        if matching.is_empty() {
            return Ok(format!("No events found for {}.", date.format("%Y-%m-%d")));
        }

        let mut result = format!("Events for {}:\n", date.format("%Y-%m-%d"));
        for event in matching {
            let desc = if event.description.is_empty() {
                String::new()
            } else {
                format!(" - {}", event.description)
            };
            result.push_str(&format!(
                "- {}: {}{}\n",
                event.date.format("%Y-%m-%d"),
                event.title,
                desc
            ));
        }
        Ok(result)
    }

    /// Delete every event whose title matches, ignoring case
    pub fn delete(&mut self, title: &str) -> String {
        let needle = title.to_lowercase();
        let initial_length = self.events.len();
        self.events.retain(|e| e.title.to_lowercase() != needle);

        if self.events.len() < initial_length {
            format!("Event '{}' deleted.", title)
        } else {
            format!("No event found with title '{}'.", title)
        }
    }

    /// Concise chronological summary of all events
    pub fn summarize(&self) -> String {
        if self.events.is_empty() {
            return String::from("No events scheduled.");
        }

        let mut summary = String::from("Upcoming Events Summary:\n");
        for event in self.sorted() {
            summary.push_str(&format!(
                "- {}: {}",
                event.date.format("%Y-%m-%d"),
                event.title
            ));
            if !event.description.is_empty() {
                summary.push_str(&format!(" ({})", event.description));
            }
            summary.push('\n');
        }
        summary
    }

    /// Number of stored events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    // Chronological view; Vec::sort_by_key is stable, so events sharing a
    // date keep their insertion order.
    fn sorted(&self) -> Vec<&Event> {
        let mut events: Vec<&Event> = self.events.iter().collect();
        events.sort_by_key(|e| e.date);
        events
    }
}
