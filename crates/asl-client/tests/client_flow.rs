//! Integration tests for the client against the local facility.
//!
//! These tests verify:
//! 1. Logging and searching round trips
//! 2. Level filtering
//! 3. Search ordering and cursor exhaustion
//! 4. Close semantics
//! 5. Descriptor-backed clients
//! 6. Journal persistence through the facility

use std::fs::{File, OpenOptions as FsOpenOptions};
use std::io::{BufRead, BufReader};

use asl_client::constants::keys;
use asl_client::{
    AslError, Client, CursorState, Direction, ErrorKind, FilterMask, Level, LocalFacility,
    LocalFacilityConfig, LocalStoreConfig, Message, OpenOptions, QueryOperator,
};

fn open(facility: &LocalFacility, ident: &str) -> Client {
    Client::open(facility, Some(ident), "user", OpenOptions::empty()).unwrap()
}

fn query(key: &str, value: &str, op: &str) -> Message {
    let mut q = Message::new_query();
    q.set_query(key, value, op.parse::<QueryOperator>().unwrap()).unwrap();
    q
}

fn messages(client: &Client, q: &Message, direction: Direction) -> Vec<String> {
    client
        .search_with_direction(q, direction)
        .unwrap()
        .map(|m| m.unwrap().get_attribute(keys::MSG).unwrap().to_string())
        .collect()
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_log_then_search_by_sender() {
    let facility = LocalFacility::in_memory();
    let client = open(&facility, "roundtrip");

    client.log(None, Level::Error, "first").unwrap();
    client.log(None, Level::Warning, "second").unwrap();

    let found = messages(&client, &query(keys::SENDER, "roundtrip", "eq"), Direction::Forward);
    assert_eq!(found, ["first", "second"]);
}

#[test]
fn test_template_attributes_are_kept() {
    let facility = LocalFacility::in_memory();
    let client = open(&facility, "template");

    let mut template = Message::new_record();
    template.set_attribute("Session", "abc").unwrap();
    client.log(Some(&template), Level::Error, "with session").unwrap();

    let mut cursor = client.search(&query("Session", "abc", "eq")).unwrap();
    let found = cursor.next().unwrap().unwrap();
    assert_eq!(found.get_attribute(keys::MSG).unwrap(), "with session");
    assert_eq!(found.get_attribute(keys::LEVEL).unwrap(), "3");
    assert_eq!(found.get_attribute(keys::SENDER).unwrap(), "template");
    assert!(found.get_attribute(keys::MSG_ID).is_ok());

    // the template itself is untouched
    assert!(template.get_attribute(keys::MSG).is_err());
}

#[test]
fn test_send_record_as_is() {
    let facility = LocalFacility::in_memory();
    let client = open(&facility, "sender");

    let mut record = Message::new_record();
    record.set_attribute(keys::MSG, "sent directly").unwrap();
    record.set_attribute(keys::LEVEL, "2").unwrap();
    client.send(&record).unwrap();

    let found = messages(&client, &query(keys::LEVEL, "2", "=="), Direction::Forward);
    assert_eq!(found, ["sent directly"]);
}

#[test]
fn test_message_id_is_reserved_to_the_store() {
    let facility = LocalFacility::in_memory();
    let client = open(&facility, "reserved");

    let mut record = Message::new_record();
    record.set_attribute(keys::MSG, "own id").unwrap();
    record.set_attribute(keys::MSG_ID, "999").unwrap();
    record.set_attribute(keys::TIME, "100").unwrap();
    client.send(&record).unwrap();

    let found = client.search(&query(keys::MSG, "own id", "eq")).unwrap().next().unwrap().unwrap();
    assert_eq!(found.get_attribute(keys::MSG_ID).unwrap(), "1");
    assert_eq!(found.get_attribute(keys::TIME).unwrap(), "100");
    assert_eq!(found.get_attribute(keys::SENDER).unwrap(), "reserved");
}

#[test]
fn test_search_without_match_is_empty() {
    let facility = LocalFacility::in_memory();
    let client = open(&facility, "nomatch");
    client.log(None, Level::Error, "something").unwrap();

    let mut cursor = client.search(&query(keys::MSG, "nothing", "eq")).unwrap();
    assert!(cursor.next().is_none());
    assert_eq!(cursor.state(), CursorState::Exhausted);
}

#[test]
fn test_empty_query_matches_all() {
    let facility = LocalFacility::in_memory();
    let client = open(&facility, "all");
    for text in ["a", "b", "c"] {
        client.log(None, Level::Notice, text).unwrap();
    }
    assert_eq!(client.search(&Message::new_query()).unwrap().count(), 3);
}

// ============================================================================
// Filtering
// ============================================================================

#[test]
fn test_default_filter_drops_info_and_debug() {
    let facility = LocalFacility::in_memory();
    let client = open(&facility, "filter");

    client.log(None, Level::Notice, "kept").unwrap();
    client.log(None, Level::Info, "dropped").unwrap();
    client.log(None, Level::Debug, "dropped").unwrap();

    let found = messages(&client, &Message::new_query(), Direction::Forward);
    assert_eq!(found, ["kept"]);
}

#[test]
fn test_widened_filter_accepts_debug() {
    let facility = LocalFacility::in_memory();
    let client = open(&facility, "filter");

    let previous = client.set_filter(FilterMask::upto(Level::Debug)).unwrap();
    assert_eq!(previous.bits(), 0x3f);
    client.log(None, Level::Debug, "debug now").unwrap();

    let found = messages(&client, &Message::new_query(), Direction::Forward);
    assert_eq!(found, ["debug now"]);
}

#[test]
fn test_send_is_filtered_by_level_attribute() {
    let facility = LocalFacility::in_memory();
    let client = open(&facility, "filter");
    client.set_filter(FilterMask::of(Level::Error)).unwrap();

    let mut record = Message::new_record();
    record.set_attribute(keys::MSG, "critical").unwrap();
    record.set_attribute(keys::LEVEL, "2").unwrap();
    client.send(&record).unwrap();

    assert_eq!(client.search(&Message::new_query()).unwrap().count(), 0);
}

// ============================================================================
// Ordering and cursors
// ============================================================================

#[test]
fn test_reverse_search_is_newest_first() {
    let facility = LocalFacility::in_memory();
    let client = open(&facility, "order");
    for text in ["one", "two", "three"] {
        client.log(None, Level::Error, text).unwrap();
    }

    let q = query(keys::SENDER, "order", "eq");
    assert_eq!(messages(&client, &q, Direction::Forward), ["one", "two", "three"]);
    assert_eq!(messages(&client, &q, Direction::Reverse), ["three", "two", "one"]);
}

#[test]
fn test_cursor_sees_records_logged_during_iteration() {
    let facility = LocalFacility::in_memory();
    let client = open(&facility, "lazy");
    client.log(None, Level::Error, "before").unwrap();

    let mut cursor = client.search(&Message::new_query()).unwrap();
    assert!(cursor.next().is_some());
    client.log(None, Level::Error, "during").unwrap();
    let next = cursor.next().unwrap().unwrap();
    assert_eq!(next.get_attribute(keys::MSG).unwrap(), "during");
    assert!(cursor.next().is_none());
    assert!(cursor.is_exhausted());
}

#[test]
fn test_regex_and_numeric_terms_combine() {
    let facility = LocalFacility::in_memory();
    let client = open(&facility, "combo");
    client.log(None, Level::Error, "disk sda failed").unwrap();
    client.log(None, Level::Notice, "disk sdb ok").unwrap();
    client.log(None, Level::Error, "fan failed").unwrap();

    let mut q = query(keys::MSG, "^disk .* failed$", "match");
    q.set_query(keys::LEVEL, "3", "<=".parse().unwrap()).unwrap();
    assert_eq!(messages(&client, &q, Direction::Forward), ["disk sda failed"]);
}

#[test]
fn test_invalid_regex_is_reported_at_search() {
    let facility = LocalFacility::in_memory();
    let client = open(&facility, "regex");
    let err = client.search(&query(keys::MSG, "(unclosed", "match")).unwrap_err();
    assert!(matches!(err, AslError::InvalidRegex(_)));
    assert_eq!(err.kind(), ErrorKind::Value);
}

// ============================================================================
// Close
// ============================================================================

#[test]
fn test_operations_after_close_fail() {
    let facility = LocalFacility::in_memory();
    let mut client = open(&facility, "closing");
    client.close().unwrap();
    client.close().unwrap();

    let err = client.log(None, Level::Error, "late").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Value);
    assert!(matches!(client.search(&Message::new_query()), Err(AslError::ClientClosed)));
}

#[test]
fn test_records_outlive_client() {
    let facility = LocalFacility::in_memory();
    {
        let client = open(&facility, "scoped");
        client.log(None, Level::Error, "persisted").unwrap();
    }
    let reader = open(&facility, "reader");
    assert_eq!(
        messages(&reader, &query(keys::SENDER, "scoped", "eq"), Direction::Forward),
        ["persisted"]
    );
}

// ============================================================================
// Descriptor-backed clients
// ============================================================================

#[test]
fn test_open_from_read_only_descriptor_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ro.log");
    File::create(&path).unwrap();
    let read_only = File::open(&path).unwrap();

    let facility = LocalFacility::in_memory();
    let err = Client::open_from_descriptor(&facility, &read_only, Some("fd"), "user").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Os);
}

#[test]
fn test_descriptor_client_writes_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.log");
    let file = FsOpenOptions::new().create(true).append(true).open(&path).unwrap();

    let facility = LocalFacility::in_memory();
    let mut client = Client::open_from_descriptor(&facility, &file, Some("fd"), "user").unwrap();
    client.log(None, Level::Error, "to descriptor").unwrap();
    client.log(None, Level::Critical, "again").unwrap();

    // searchable through the same client, but private to it
    assert_eq!(client.search(&Message::new_query()).unwrap().count(), 2);
    assert!(facility.store().is_empty());
    client.close().unwrap();

    let lines: Vec<serde_json::Value> = BufReader::new(File::open(&path).unwrap())
        .lines()
        .map(|l| serde_json::from_str(&l.unwrap()).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["Message"], "to descriptor");
    assert_eq!(lines[0]["Sender"], "fd");
    assert_eq!(lines[1]["Level"], "2");
}

#[test]
fn test_add_log_file_receives_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("extra.log");
    let extra = File::create(&path).unwrap();

    let facility = LocalFacility::in_memory();
    let client = open(&facility, "extra");
    client.add_log_file(&extra).unwrap();
    client.log(None, Level::Alert, "mirrored").unwrap();
    client.remove_log_file(std::os::fd::AsRawFd::as_raw_fd(&extra)).unwrap();
    client.log(None, Level::Alert, "not mirrored").unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("extra["));
    assert!(content.contains("<Alert>: mirrored"));
    assert!(!content.contains("not mirrored"));
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_journal_survives_facility_restart() {
    let dir = tempfile::tempdir().unwrap();
    let journal = dir.path().join("asl.jsonl");
    let config = || LocalFacilityConfig::default().with_store(LocalStoreConfig::persistent(&journal));

    {
        let facility = LocalFacility::new(config()).unwrap();
        let client = open(&facility, "durable");
        client.log(None, Level::Error, "remember me").unwrap();
    }

    let facility = LocalFacility::new(config()).unwrap();
    let client = open(&facility, "reader");
    assert_eq!(
        messages(&client, &query(keys::SENDER, "durable", "eq"), Direction::Forward),
        ["remember me"]
    );
}
