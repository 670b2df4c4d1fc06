//! Unit tests for the JSONL workflow journal.

use chrono::{Local, TimeZone, Utc};

use taskvault::journal::{Journal, JournalEntry, JsonlJournal, WorkflowEvent};

fn read_lines(path: &std::path::Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .expect("journal file")
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid json line"))
        .collect()
}

#[test]
fn new_creates_missing_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let logs = dir.path().join("Logs");
    JsonlJournal::new(logs.clone()).expect("journal");
    assert!(logs.is_dir());
}

#[test]
fn file_name_carries_the_date() {
    let dir = tempfile::tempdir().expect("tempdir");
    let journal = JsonlJournal::new(dir.path().to_path_buf()).expect("journal");
    let date = chrono::NaiveDate::from_ymd_opt(2026, 2, 3).expect("date");
    assert_eq!(
        journal.file_for(date),
        dir.path().join("workflow-2026-02-03.jsonl")
    );
}

#[test]
fn entries_append_as_snake_case_json_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let journal = JsonlJournal::new(dir.path().to_path_buf()).expect("journal");

    journal
        .record(
            JournalEntry::new(WorkflowEvent::ActionCreated)
                .with_item("FILE_a_2026-01-01.md")
                .with_detail("abc123"),
        )
        .expect("first");
    journal
        .record(
            JournalEntry::new(WorkflowEvent::DispatchFailed)
                .with_batch(vec!["x.md".into(), "y.md".into()])
                .with_detail("exited with code 1"),
        )
        .expect("second");

    let lines = read_lines(&journal.file_for(Local::now().date_naive()));
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["event"], "action_created");
    assert_eq!(lines[0]["item"], "FILE_a_2026-01-01.md");
    assert!(lines[0].get("batch").is_none(), "empty batch is omitted");
    assert_eq!(lines[1]["event"], "dispatch_failed");
    assert_eq!(lines[1]["batch"], serde_json::json!(["x.md", "y.md"]));
    assert!(lines[1].get("item").is_none());
}

#[test]
fn entries_are_filed_under_their_own_date() {
    let dir = tempfile::tempdir().expect("tempdir");
    let journal = JsonlJournal::new(dir.path().to_path_buf()).expect("journal");

    let mut old = JournalEntry::new(WorkflowEvent::ApprovalReady).with_item("old.md");
    old.timestamp = Utc
        .with_ymd_and_hms(2025, 6, 15, 12, 0, 0)
        .single()
        .expect("timestamp");
    let old_day = old.timestamp.with_timezone(&Local).date_naive();

    journal.record(old).expect("old entry");
    journal
        .record(JournalEntry::new(WorkflowEvent::ActionCreated).with_item("new.md"))
        .expect("new entry");

    let old_lines = read_lines(&journal.file_for(old_day));
    assert_eq!(old_lines.len(), 1);
    assert_eq!(old_lines[0]["item"], "old.md");

    let new_lines = read_lines(&journal.file_for(Local::now().date_naive()));
    assert_eq!(new_lines.len(), 1);
    assert_eq!(new_lines[0]["item"], "new.md");
}

#[test]
fn entry_round_trips_through_serde() {
    let entry = JournalEntry::new(WorkflowEvent::ApprovalReady)
        .with_item("PAY_vendor.md")
        .with_detail("payment");
    let text = serde_json::to_string(&entry).expect("serialize");
    let back: JournalEntry = serde_json::from_str(&text).expect("deserialize");
    assert_eq!(back.event, WorkflowEvent::ApprovalReady);
    assert_eq!(back.item.as_deref(), Some("PAY_vendor.md"));
    assert_eq!(back.timestamp, entry.timestamp);
}
