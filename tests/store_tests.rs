use calagent::error::Error;
use calagent::store::EventStore;

/// Adding a valid event makes it visible in the listing
#[test]
fn test_add_then_view() {
    let mut store = EventStore::new();
    let message = store
        .add("Team Meeting", "2026-01-15", "Quarterly planning session")
        .unwrap();
    assert_eq!(message, "Event 'Team Meeting' added for 2026-01-15.");

    let listing = store.list();
    assert!(listing.starts_with("Calendar Events:"));
    assert!(listing.contains("- 2026-01-15: Team Meeting - Quarterly planning session"));
}

/// Malformed dates are rejected and never stored
#[test]
fn test_invalid_dates_leave_store_unchanged() {
    let mut store = EventStore::new();

    for date in [
        "2026-13-45", // impossible month and day
        "2026-02-30", // impossible day
        "2026/01/15", // wrong separators
        "15-01-2026", // wrong order
        "not-a-date",
        "",
    ] {
        let err = store.add("Broken", date, "").unwrap_err();
        assert!(matches!(err, Error::InvalidDate), "date: {}", date);
    }

    assert!(store.is_empty());
    assert_eq!(store.list(), "No events scheduled.");
}

/// Listing is sorted ascending by date regardless of insertion order
#[test]
fn test_listing_sorted_by_date() {
    let mut store = EventStore::new();
    store.add("March", "2026-03-01", "").unwrap();
    store.add("January", "2026-01-01", "").unwrap();
    store.add("February", "2026-02-01", "").unwrap();

    let listing = store.list();
    let jan = listing.find("2026-01-01").unwrap();
    let feb = listing.find("2026-02-01").unwrap();
    let mar = listing.find("2026-03-01").unwrap();
    assert!(jan < feb && feb < mar);

    let summary = store.summarize();
    let jan = summary.find("2026-01-01").unwrap();
    let feb = summary.find("2026-02-01").unwrap();
    let mar = summary.find("2026-03-01").unwrap();
    assert!(jan < feb && feb < mar);
}

/// Events sharing a date keep their insertion order
#[test]
fn test_sort_tie_break_is_insertion_order() {
    let mut store = EventStore::new();
    store.add("Second", "2026-06-01", "").unwrap();
    store.add("First", "2026-06-01", "").unwrap();

    let listing = store.list();
    let second = listing.find("Second").unwrap();
    let first = listing.find("First").unwrap();
    assert!(second < first);
}

/// Deletion removes every case-insensitive match and is idempotent
#[test]
fn test_delete_all_matches_idempotent() {
    let mut store = EventStore::new();
    store.add("Standup", "2026-01-01", "").unwrap();
    store.add("STANDUP", "2026-01-02", "").unwrap();
    store.add("Retro", "2026-01-03", "").unwrap();

    assert_eq!(store.delete("standup"), "Event 'standup' deleted.");
    assert_eq!(store.len(), 1);

    // Second call on the same title finds nothing
    assert_eq!(
        store.delete("standup"),
        "No event found with title 'standup'."
    );
    assert_eq!(store.len(), 1);
}

/// Date-filtered listing reports when nothing matches
#[test]
fn test_list_by_date() {
    let mut store = EventStore::new();
    store.add("Launch", "2026-05-04", "Rocket day").unwrap();

    let on_date = store.list_by_date("2026-05-04").unwrap();
    assert!(on_date.contains("- 2026-05-04: Launch - Rocket day"));

    let off_date = store.list_by_date("2026-05-05").unwrap();
    assert_eq!(off_date, "No events found for 2026-05-05.");
}

/// Summary format wraps descriptions in parentheses
#[test]
fn test_summarize_format() {
    let mut store = EventStore::new();
    assert_eq!(store.summarize(), "No events scheduled.");

    store.add("Launch", "2026-05-04", "Rocket day").unwrap();
    store.add("Dentist", "2026-02-20", "").unwrap();

    let summary = store.summarize();
    assert!(summary.starts_with("Upcoming Events Summary:"));
    assert!(summary.contains("- 2026-05-04: Launch (Rocket day)"));
    assert!(summary.contains("- 2026-02-20: Dentist\n"));
}
