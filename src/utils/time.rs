use chrono::{NaiveDate, NaiveTime};

/// Parse a date string in strict YYYY-MM-DD format
///
/// Rejects wrong separators, non-padded components and calendar-impossible
/// dates such as month 13 or day 45.
pub fn parse_date(date_str: &str) -> Option<NaiveDate> {
    let mut parts = date_str.split('-');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(y), Some(m), Some(d), None) if y.len() == 4 && m.len() == 2 && d.len() == 2 => {
            let year = y.parse::<i32>().ok()?;
            let month = m.parse::<u32>().ok()?;
            let day = d.parse::<u32>().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        }
        _ => None,
    }
}

/// Parse a time string in strict HH:MM format
pub fn parse_time(time_str: &str) -> Option<NaiveTime> {
    let (hour, minute) = time_str.split_once(':')?;
    if hour.len() != 2 || minute.len() != 2 {
        return None;
    }
    let hour = hour.parse::<u32>().ok()?;
    let minute = minute.parse::<u32>().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Resolve a relative date token against the given calendar day
pub fn resolve_relative_date(token: &str, today: NaiveDate) -> Option<NaiveDate> {
    match token.to_lowercase().as_str() {
        "today" => Some(today),
        "tomorrow" => today.succ_opt(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_date() {
        // Valid cases
        assert_eq!(
            parse_date("2026-01-15"),
            NaiveDate::from_ymd_opt(2026, 1, 15)
        );
        assert_eq!(
            parse_date("2024-02-29"),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );

        // Invalid cases
        assert_eq!(parse_date("2026-13-45"), None); // Impossible month and day
        assert_eq!(parse_date("2026-02-30"), None); // Impossible day
        assert_eq!(parse_date("2026/01/15"), None); // Wrong separators
        assert_eq!(parse_date("2026-1-15"), None); // Non-padded month
        assert_eq!(parse_date("26-01-15"), None); // Short year
        assert_eq!(parse_date("2026-01-15-00"), None); // Too many parts
        assert_eq!(parse_date("abcd-ef-gh"), None); // Non-numeric
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_parse_time() {
        // Valid cases
        assert_eq!(parse_time("00:00"), NaiveTime::from_hms_opt(0, 0, 0));
        assert_eq!(parse_time("12:30"), NaiveTime::from_hms_opt(12, 30, 0));
        assert_eq!(parse_time("23:59"), NaiveTime::from_hms_opt(23, 59, 0));

        // Invalid cases
        assert_eq!(parse_time("24:00"), None); // Hour out of range
        assert_eq!(parse_time("12:60"), None); // Minute out of range
        assert_eq!(parse_time("12:30:45"), None); // Seconds not accepted
        assert_eq!(parse_time("9:30"), None); // Non-padded hour
        assert_eq!(parse_time("12"), None); // Too few parts
        assert_eq!(parse_time("12:ab"), None); // Invalid minute
    }

    #[test]
    fn test_resolve_relative_date() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();

        assert_eq!(resolve_relative_date("today", today), Some(today));
        assert_eq!(resolve_relative_date("Tomorrow", today), today.succ_opt());
        assert_eq!(
            resolve_relative_date("tomorrow", today),
            NaiveDate::from_ymd_opt(2026, 3, 15)
        );
        assert_eq!(resolve_relative_date("yesterday", today), None);
        assert_eq!(resolve_relative_date("", today), None);
    }
}
