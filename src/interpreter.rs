//! Conversational command interpreter
//!
//! Maps a free-text instruction to a structured command. The grammar is a
//! fixed-priority list checked in order, first match wins:
//!
//! 1. summary keywords anywhere in the message
//! 2. list keywords, with an optional embedded or relative date
//! 3. `add:`/`create:`/`schedule:` pipe-delimited shorthand
//! 4. natural-language add with an explicit YYYY-MM-DD date
//! 5. natural-language add with a trailing relative date
//! 6. `delete:` shorthand
//! 7. natural-language delete
//! 8. fallback to an unknown command
//!
//! The ordering is a behavioral contract. A message matching both the
//! summary and the list keyword sets resolves to a summary because rule 1
//! runs first, and a date inside a list request binds to the list branch
//! before any add or delete rule can see it.

use crate::error::{CalResult, Error};
use crate::utils::time::{parse_date, resolve_relative_date};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

/// What the interpreter decided the message asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Add,
    List,
    ListByDate,
    Delete,
    Summarize,
    Unknown,
}

/// Structured result of a single interpreter pass
#[derive(Debug, Clone)]
pub struct ParsedCommand {
    pub intent: Intent,
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl ParsedCommand {
    fn bare(intent: Intent) -> Self {
        Self {
            intent,
            title: None,
            date: None,
            description: None,
        }
    }

    fn add(title: &str, date: NaiveDate, description: Option<&str>) -> Self {
        Self {
            intent: Intent::Add,
            title: Some(title.to_string()),
            date: Some(date),
            description: description.map(str::to_string),
        }
    }

    fn delete(title: &str) -> Self {
        Self {
            intent: Intent::Delete,
            title: Some(title.to_string()),
            date: None,
            description: None,
        }
    }

    fn list_by_date(date: NaiveDate) -> Self {
        Self {
            intent: Intent::ListByDate,
            title: None,
            date: Some(date),
            description: None,
        }
    }
}

/// Keywords that always resolve to a summary request
const SUMMARY_KEYWORDS: [&str; 5] = ["summarize", "summary", "what's coming", "upcoming", "brief"];

/// Shorthand prefixes for the add intent
const ADD_PREFIXES: [&str; 3] = ["add:", "create:", "schedule:"];

lazy_static! {
    /// A literal YYYY-MM-DD token anywhere in a message
    static ref DATE_TOKEN: Regex = Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap();

    /// add Title on 2026-01-15 [about Description]
    static ref NL_ADD_EXPLICIT: Regex = Regex::new(
        r"(?i)^(?:add|create|schedule)\s+(.+?)\s+(?:on|for)\s+(\d{4}-\d{2}-\d{2})(?:\s+(?:description:|desc:|about)\s*(.+))?$"
    )
    .unwrap();

    /// add Title <anything>; the trailing token may be a relative date
    static ref NL_ADD_ANY: Regex =
        Regex::new(r"(?i)^(?:add|create|schedule)\s+(.+)$").unwrap();

    /// delete [the] [event] Title
    static ref NL_DELETE: Regex =
        Regex::new(r"(?i)^(?:delete|remove|cancel)\s+(?:the\s+)?(?:event\s+)?(.+)$").unwrap();
}

/// Interpret a free-text message against the fixed-priority grammar
///
/// `today` is the process-local calendar day used to resolve relative date
/// tokens. Only shorthand with too few fields, unparseable dates and add
/// phrases without a resolvable date produce errors; anything the grammar
/// does not recognize at all comes back as `Intent::Unknown`.
pub fn parse_message(message: &str, today: NaiveDate) -> CalResult<ParsedCommand> {
    let trimmed = message.trim();
    let lower = trimmed.to_lowercase();

    // 1. Summary keywords win over everything else
    if SUMMARY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return Ok(ParsedCommand::bare(Intent::Summarize));
    }

    // 2. List requests, optionally narrowed to a single date
    if lower.contains("list") || lower.contains("events") || lower.starts_with("what") {
        if let Some(m) = DATE_TOKEN.find(trimmed) {
            if let Some(date) = parse_date(m.as_str()) {
                return Ok(ParsedCommand::list_by_date(date));
            }
        }
        for token in ["today", "tomorrow"] {
            if lower.contains(token) {
                if let Some(date) = resolve_relative_date(token, today) {
                    return Ok(ParsedCommand::list_by_date(date));
                }
            }
        }
        return Ok(ParsedCommand::bare(Intent::List));
    }

    // 3. Pipe-delimited add shorthand
    for prefix in ADD_PREFIXES {
        if let Some(payload) = strip_prefix_ci(trimmed, prefix) {
            let fields: Vec<&str> = payload.splitn(3, '|').map(str::trim).collect();
            if fields.len() < 2 {
                return Err(Error::MalformedShorthand(format!(
                    "expected 'Title|YYYY-MM-DD[|Description]', got '{}'",
                    payload
                )));
            }
            let date = parse_date(fields[1]).ok_or(Error::InvalidDate)?;
            return Ok(ParsedCommand::add(fields[0], date, fields.get(2).copied()));
        }
    }

    // 4. Natural-language add with an explicit date
    if let Some(caps) = NL_ADD_EXPLICIT.captures(trimmed) {
        let date = parse_date(&caps[2]).ok_or(Error::InvalidDate)?;
        let description = caps.get(3).map(|m| m.as_str().trim());
        return Ok(ParsedCommand::add(caps[1].trim(), date, description));
    }

    // 5. Natural-language add with a trailing relative date
    if let Some(caps) = NL_ADD_ANY.captures(trimmed) {
        let rest = caps[1].trim();
        if let Some((title, token)) = rest.rsplit_once(char::is_whitespace) {
            if let Some(date) = resolve_relative_date(token, today) {
                return Ok(ParsedCommand::add(title.trim(), date, None));
            }
        }
        return Err(Error::UnresolvedDate(trimmed.to_string()));
    }

    // 6. Delete shorthand
    if let Some(payload) = strip_prefix_ci(trimmed, "delete:") {
        return Ok(ParsedCommand::delete(payload.trim()));
    }

    // 7. Natural-language delete
    if let Some(caps) = NL_DELETE.captures(trimmed) {
        return Ok(ParsedCommand::delete(caps[1].trim()));
    }

    // 8. Nothing matched
    Ok(ParsedCommand::bare(Intent::Unknown))
}

// ASCII case-insensitive prefix strip; prefixes here are always ASCII
fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    #[test]
    fn summary_outranks_list_and_dates() {
        // Matches the summary keyword set, the list keyword set and carries a
        // date; rule 1 must win.
        let cmd = parse_message("summarize events on 2026-01-01", today()).unwrap();
        assert_eq!(cmd.intent, Intent::Summarize);

        let cmd = parse_message("What's coming this week?", today()).unwrap();
        assert_eq!(cmd.intent, Intent::Summarize);
    }

    #[test]
    fn list_with_embedded_date() {
        let cmd = parse_message("list events for 2026-05-04", today()).unwrap();
        assert_eq!(cmd.intent, Intent::ListByDate);
        assert_eq!(cmd.date, NaiveDate::from_ymd_opt(2026, 5, 4));
    }

    #[test]
    fn list_with_relative_date() {
        let cmd = parse_message("what events are on tomorrow", today()).unwrap();
        assert_eq!(cmd.intent, Intent::ListByDate);
        assert_eq!(cmd.date, NaiveDate::from_ymd_opt(2026, 3, 15));
    }

    #[test]
    fn list_without_date() {
        let cmd = parse_message("list everything", today()).unwrap();
        assert_eq!(cmd.intent, Intent::List);

        // An impossible date token does not resolve, so this is a plain list
        let cmd = parse_message("list events on 2026-13-45", today()).unwrap();
        assert_eq!(cmd.intent, Intent::List);
    }

    #[test]
    fn shorthand_add() {
        let cmd = parse_message("add:Launch|2026-05-04|Rocket day", today()).unwrap();
        assert_eq!(cmd.intent, Intent::Add);
        assert_eq!(cmd.title.as_deref(), Some("Launch"));
        assert_eq!(cmd.date, NaiveDate::from_ymd_opt(2026, 5, 4));
        assert_eq!(cmd.description.as_deref(), Some("Rocket day"));
    }

    #[test]
    fn shorthand_add_two_fields() {
        let cmd = parse_message("schedule:Dentist|2026-02-20", today()).unwrap();
        assert_eq!(cmd.intent, Intent::Add);
        assert_eq!(cmd.title.as_deref(), Some("Dentist"));
        assert_eq!(cmd.description, None);
    }

    #[test]
    fn shorthand_add_too_few_fields() {
        let err = parse_message("add:Launch", today()).unwrap_err();
        assert!(matches!(err, Error::MalformedShorthand(_)));
    }

    #[test]
    fn natural_language_add_matches_shorthand() {
        let shorthand = parse_message("add:Launch|2026-05-04|Rocket day", today()).unwrap();
        let natural = parse_message("Add Launch on 2026-05-04 about Rocket day", today()).unwrap();

        assert_eq!(natural.intent, Intent::Add);
        assert_eq!(natural.title, shorthand.title);
        assert_eq!(natural.date, shorthand.date);
        assert_eq!(natural.description, shorthand.description);
    }

    #[test]
    fn natural_language_add_description_markers() {
        let cmd =
            parse_message("create Review for 2026-06-01 desc: quarterly numbers", today()).unwrap();
        assert_eq!(cmd.intent, Intent::Add);
        assert_eq!(cmd.title.as_deref(), Some("Review"));
        assert_eq!(cmd.description.as_deref(), Some("quarterly numbers"));

        let cmd = parse_message(
            "schedule Standup on 2026-06-01 description: daily sync",
            today(),
        )
        .unwrap();
        assert_eq!(cmd.description.as_deref(), Some("daily sync"));
    }

    #[test]
    fn add_relative_date() {
        let cmd = parse_message("Add Standup tomorrow", today()).unwrap();
        assert_eq!(cmd.intent, Intent::Add);
        assert_eq!(cmd.title.as_deref(), Some("Standup"));
        assert_eq!(cmd.date, NaiveDate::from_ymd_opt(2026, 3, 15));

        let cmd = parse_message("add Team Sync today", today()).unwrap();
        assert_eq!(cmd.title.as_deref(), Some("Team Sync"));
        assert_eq!(cmd.date, Some(today()));
    }

    #[test]
    fn add_without_resolvable_date() {
        let err = parse_message("add Standup sometime", today()).unwrap_err();
        assert!(matches!(err, Error::UnresolvedDate(_)));

        let err = parse_message("schedule a haircut", today()).unwrap_err();
        assert!(matches!(err, Error::UnresolvedDate(_)));
    }

    #[test]
    fn shorthand_delete() {
        let cmd = parse_message("delete:Team Sync", today()).unwrap();
        assert_eq!(cmd.intent, Intent::Delete);
        assert_eq!(cmd.title.as_deref(), Some("Team Sync"));
    }

    #[test]
    fn natural_language_delete_variants() {
        for message in [
            "delete Team Sync",
            "remove the Team Sync",
            "cancel the event Team Sync",
            "Delete event Team Sync",
        ] {
            let cmd = parse_message(message, today()).unwrap();
            assert_eq!(cmd.intent, Intent::Delete, "message: {}", message);
            assert_eq!(cmd.title.as_deref(), Some("Team Sync"));
        }
    }

    #[test]
    fn unknown_fallback() {
        let cmd = parse_message("good morning", today()).unwrap();
        assert_eq!(cmd.intent, Intent::Unknown);

        let cmd = parse_message("", today()).unwrap();
        assert_eq!(cmd.intent, Intent::Unknown);
    }

    #[test]
    fn keyword_checks_are_case_insensitive() {
        let cmd = parse_message("SUMMARIZE my week", today()).unwrap();
        assert_eq!(cmd.intent, Intent::Summarize);

        let cmd = parse_message("ADD:Launch|2026-05-04", today()).unwrap();
        assert_eq!(cmd.intent, Intent::Add);
    }
}
