//! End-to-end tests for the drop-folder watcher and its dedup ledger.

use taskvault::models::FrontMatter;
use taskvault::state::StateStore;
use taskvault::watcher::{FileDropWatcher, WatchLoop, Watcher};
use taskvault::workspace::{FolderRole, Workspace};

use super::test_helpers::{names_in, put, workspace};

fn watch_loop(ws: &Workspace) -> WatchLoop<FileDropWatcher> {
    let watcher = FileDropWatcher::new(ws, None).expect("watcher");
    let store = StateStore::new(ws.state_path(), 1000);
    WatchLoop::new(watcher, store, std::time::Duration::from_secs(30))
}

#[test]
fn dropped_file_becomes_action_file() {
    let (_dir, ws) = workspace();
    put(&ws, FolderRole::Drop, "report.pdf", "abc");
    let mut watch = watch_loop(&ws);

    let created = watch.run_cycle().expect("cycle");
    assert_eq!(created.len(), 1);
    let action = &created[0];

    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    assert_eq!(action.file_name(), format!("FILE_report_{today}.md"));
    assert!(action.path.starts_with(ws.folder(FolderRole::NeedsAction)));

    let text = std::fs::read_to_string(&action.path).expect("action file");
    let front = FrontMatter::parse(&text).expect("front matter");
    let keys: Vec<_> = front.iter().map(|(k, _)| k).collect();
    assert_eq!(
        keys,
        vec![
            "type",
            "source",
            "destination",
            "file_type",
            "size",
            "size_human",
            "received",
            "priority",
            "status",
            "hash",
        ]
    );
    assert_eq!(front.get("type"), Some("file_drop"));
    assert_eq!(front.get("source"), Some("report.pdf"));
    assert_eq!(front.get("file_type"), Some("document"));
    assert_eq!(front.get("size"), Some("3"));
    assert_eq!(front.get("size_human"), Some("3.0 B"));
    assert_eq!(front.get("status"), Some("pending"));
    assert_eq!(
        front.get("hash"),
        Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
    );
    assert!(text.contains("# File Drop: report.pdf"));
    assert!(text.contains("## File Details"));
    assert!(text.contains("## Suggested Actions"));
    assert!(text.contains("## Notes"));

    assert_eq!(names_in(&ws, FolderRole::Files), vec!["report.pdf"]);
    assert!(names_in(&ws, FolderRole::Drop).is_empty());

    let state: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(ws.state_path()).expect("state"))
            .expect("json");
    assert_eq!(
        state["processed_ids"],
        serde_json::json!([front.get("hash").expect("hash")])
    );
}

#[test]
fn duplicate_content_in_one_scan_yields_one_action_file() {
    let (_dir, ws) = workspace();
    put(&ws, FolderRole::Drop, "a.txt", "same bytes");
    put(&ws, FolderRole::Drop, "b.txt", "same bytes");
    let mut watch = watch_loop(&ws);

    let created = watch.run_cycle().expect("cycle");
    assert_eq!(created.len(), 1);
    assert!(created[0].file_name().starts_with("FILE_a_"));
    assert_eq!(names_in(&ws, FolderRole::Drop), vec!["b.txt"]);

    let again = watch.run_cycle().expect("second cycle");
    assert!(again.is_empty(), "processed content is never re-offered");
    assert_eq!(names_in(&ws, FolderRole::NeedsAction).len(), 1);
}

#[test]
fn ledger_survives_restart() {
    let (_dir, ws) = workspace();
    put(&ws, FolderRole::Drop, "a.txt", "payload");
    watch_loop(&ws).run_cycle().expect("first run");

    put(&ws, FolderRole::Drop, "renamed.txt", "payload");
    let mut restarted = watch_loop(&ws);
    assert_eq!(restarted.processed().len(), 1, "ledger reloaded from disk");

    let pending = restarted
        .watcher()
        .check_for_updates(restarted.processed())
        .expect("check");
    assert!(pending.is_empty());
    assert!(restarted.run_cycle().expect("cycle").is_empty());
}

#[test]
fn check_for_updates_has_no_side_effects() {
    let (_dir, ws) = workspace();
    put(&ws, FolderRole::Drop, "x.csv", "1,2,3");
    let watch = watch_loop(&ws);

    let first = watch
        .watcher()
        .check_for_updates(watch.processed())
        .expect("check");
    let second = watch
        .watcher()
        .check_for_updates(watch.processed())
        .expect("check");
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].id, second[0].id);
    assert!(watch.processed().is_empty());
    assert!(!ws.state_path().exists());
    assert_eq!(names_in(&ws, FolderRole::Drop), vec!["x.csv"]);
}

#[test]
fn failed_materialization_is_retried() {
    let (_dir, ws) = workspace();
    put(&ws, FolderRole::Drop, "scan.png", "image bytes");
    let mut watch = watch_loop(&ws);

    let needs_action = ws.folder(FolderRole::NeedsAction);
    std::fs::remove_dir(&needs_action).expect("remove folder");
    std::fs::write(&needs_action, "not a directory").expect("block folder");

    let created = watch.run_cycle().expect("cycle tolerates item failure");
    assert!(created.is_empty());
    assert!(watch.processed().is_empty(), "failed item must stay unregistered");
    assert!(
        StateStore::new(ws.state_path(), 1000).load().is_empty(),
        "failed item must not be persisted"
    );
    assert_eq!(names_in(&ws, FolderRole::Drop), vec!["scan.png"]);

    std::fs::remove_file(&needs_action).expect("unblock");
    std::fs::create_dir(&needs_action).expect("recreate");

    let created = watch.run_cycle().expect("retry cycle");
    assert_eq!(created.len(), 1);
    assert_eq!(watch.processed().len(), 1);
    assert_eq!(names_in(&ws, FolderRole::Files), vec!["scan.png"]);
    assert!(names_in(&ws, FolderRole::Drop).is_empty());
}

#[test]
fn same_title_same_day_gets_suffix() {
    let (_dir, ws) = workspace();
    let mut watch = watch_loop(&ws);

    put(&ws, FolderRole::Drop, "memo.txt", "first");
    let first = watch.run_cycle().expect("first");
    put(&ws, FolderRole::Drop, "memo.txt", "second");
    let second = watch.run_cycle().expect("second");

    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    assert_eq!(first[0].file_name(), format!("FILE_memo_{today}.md"));
    assert_eq!(second[0].file_name(), format!("FILE_memo_{today}_2.md"));
    assert_eq!(names_in(&ws, FolderRole::Files).len(), 2);
}

#[test]
fn stored_copy_never_overwrites_other_content() {
    let (_dir, ws) = workspace();
    let mut watch = watch_loop(&ws);

    put(&ws, FolderRole::Drop, "memo.txt", "first");
    watch.run_cycle().expect("first");

    let dropped = put(&ws, FolderRole::Drop, "memo.txt", "second");
    let hash = taskvault::util::hash_file(&dropped).expect("hash");
    let taken = format!("memo_{}.txt", &hash[..8]);
    put(&ws, FolderRole::Files, &taken, "unrelated");

    let created = watch.run_cycle().expect("second");
    assert_eq!(created.len(), 1);

    let files = ws.folder(FolderRole::Files);
    let kept = std::fs::read_to_string(files.join(&taken)).expect("taken copy");
    assert_eq!(kept, "unrelated");
    let stored = format!("memo_{}_2.txt", &hash[..8]);
    assert_eq!(
        std::fs::read_to_string(files.join(&stored)).expect("stored copy"),
        "second"
    );
    let front = FrontMatter::parse(
        &std::fs::read_to_string(&created[0].path).expect("action file"),
    )
    .expect("front matter");
    assert!(front.get("destination").is_some_and(|d| d.ends_with(&stored)));
}

#[test]
fn hidden_files_and_directories_are_ignored() {
    let (_dir, ws) = workspace();
    put(&ws, FolderRole::Drop, ".partial", "in flight");
    std::fs::create_dir(ws.folder(FolderRole::Drop).join("nested")).expect("mkdir");
    let mut watch = watch_loop(&ws);

    assert!(watch.run_cycle().expect("cycle").is_empty());
}

#[test]
fn small_cap_evicts_oldest_ids() {
    let (_dir, ws) = workspace();
    let watcher = FileDropWatcher::new(&ws, None).expect("watcher");
    let store = StateStore::new(ws.state_path(), 2);
    let mut watch = WatchLoop::new(watcher, store, std::time::Duration::from_secs(30));

    for (name, body) in [("a.txt", "1"), ("b.txt", "2"), ("c.txt", "3")] {
        put(&ws, FolderRole::Drop, name, body);
        watch.run_cycle().expect("cycle");
    }
    assert_eq!(watch.processed().len(), 2);
    assert_eq!(StateStore::new(ws.state_path(), 2).load().len(), 2);
}
