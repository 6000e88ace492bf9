//! Local fallback: serialize an event to an RFC 5545 .ics file

use crate::config::Config;
use crate::error::{CalResult, Error};
use crate::models::Event;
use crate::utils::time::parse_time;
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Writes calendar-interchange files for events
pub struct IcsExporter {
    config: Arc<RwLock<Config>>,
}

impl IcsExporter {
    pub fn new(config: Arc<RwLock<Config>>) -> Self {
        Self { config }
    }

    /// Serialize the event to a new .ics file and return its path
    ///
    /// The filename and the VEVENT UID both carry a timestamp-derived token,
    /// so repeated exports of the same title and date never collide.
    pub async fn export(&self, event: &Event) -> CalResult<PathBuf> {
        let output_dir = self.config.read().await.ics_output_dir.clone();

        let start = parse_time(&event.start_time).ok_or(Error::InvalidTime)?;
        let end = parse_time(&event.end_time).ok_or(Error::InvalidTime)?;

        fs::create_dir_all(&output_dir)?;

        let now = Utc::now();
        let date = event.date.format("%Y-%m-%d").to_string();
        let safe_title = sanitize_title(&event.title);

        // Timestamp-derived uniqueness token, bumped until the filename is
        // free so repeated exports of the same title and date never collide
        let mut token = now.timestamp_micros();
        let path = loop {
            let candidate = output_dir.join(format!("{}_{}_{}.ics", date, safe_title, token));
            if !candidate.exists() {
                break candidate;
            }
            token += 1;
        };

        let uid = format!("{}-{}-{}@calagent", date, event.title.replace(' ', "-"), token);

        let mut lines = vec![
            "BEGIN:VCALENDAR".to_string(),
            "PRODID:-//calagent//EN".to_string(),
            "VERSION:2.0".to_string(),
            format!("X-WR-TIMEZONE:{}", event.timezone),
            "BEGIN:VEVENT".to_string(),
            format!("UID:{}", uid),
            format!("DTSTAMP:{}", now.format("%Y%m%dT%H%M%SZ")),
            format!(
                "DTSTART:{}T{}",
                event.date.format("%Y%m%d"),
                start.format("%H%M%S")
            ),
            format!(
                "DTEND:{}T{}",
                event.date.format("%Y%m%d"),
                end.format("%H%M%S")
            ),
            format!("SUMMARY:{}", escape_text(&event.title)),
        ];
        if !event.description.is_empty() {
            lines.push(format!("DESCRIPTION:{}", escape_text(&event.description)));
        }
        lines.push("END:VEVENT".to_string());
        lines.push("END:VCALENDAR".to_string());

        fs::write(&path, lines.join("\r\n") + "\r\n")?;

        info!("ICS file created at {}", path.display());
        Ok(path)
    }
}

/// Replace filename-hostile characters, keeping spaces, hyphens and
/// underscores
fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Escape TEXT property values per RFC 5545 section 3.3.11
fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("Team Sync"), "Team Sync");
        assert_eq!(sanitize_title("Q1/Q2 review!"), "Q1_Q2 review_");
        assert_eq!(sanitize_title("a-b_c"), "a-b_c");
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("plain"), "plain");
        assert_eq!(escape_text("a;b,c"), "a\\;b\\,c");
        assert_eq!(escape_text("line1\nline2"), "line1\\nline2");
        assert_eq!(escape_text("back\\slash"), "back\\\\slash");
    }
}
