//! Unit tests for dashboard stat computation and region rewriting.

use chrono::{Local, NaiveDate};

use taskvault::dashboard::{splice_stats, Dashboard, DashboardStats, STATS_HEADING};
use taskvault::workspace::{FolderRole, Workspace};
use taskvault::AppError;

fn workspace() -> (tempfile::TempDir, Workspace) {
    let dir = tempfile::tempdir().expect("tempdir");
    let workspace = Workspace::init(dir.path()).expect("init");
    (dir, workspace)
}

fn put(workspace: &Workspace, role: FolderRole, name: &str) {
    std::fs::write(workspace.folder(role).join(name), "item").expect("write");
}

#[test]
fn compute_stats_counts_each_folder() {
    let (_dir, ws) = workspace();
    put(&ws, FolderRole::NeedsAction, "a.md");
    put(&ws, FolderRole::NeedsAction, "b.md");
    put(&ws, FolderRole::Plans, "plan.md");
    put(&ws, FolderRole::PendingApproval, "pay.md");
    put(&ws, FolderRole::Done, "FILE_x_2026-04-02.md");
    put(&ws, FolderRole::Done, "FILE_y_2026-04-01.md");

    let today = NaiveDate::from_ymd_opt(2026, 4, 2).expect("date");
    let stats = Dashboard::new(&ws).compute_stats(today).expect("stats");
    assert_eq!(
        stats,
        DashboardStats {
            pending: 2,
            planned: 1,
            awaiting_approval: 1,
            done_today: 1,
        }
    );
}

#[test]
fn status_column_reflects_counts() {
    let idle = DashboardStats::default().render_block().join("\n");
    assert!(idle.contains("| Pending Tasks | 0 | ✅ Clear |"));
    assert!(idle.contains("| Tasks Completed Today | 0 | 📊 No activity |"));

    let busy = DashboardStats {
        pending: 3,
        planned: 1,
        awaiting_approval: 2,
        done_today: 4,
    }
    .render_block()
    .join("\n");
    assert!(busy.contains("| Pending Tasks | 3 | ⚠️ 3 item(s) |"));
    assert!(busy.contains("| Active Plans | 1 | 📋 1 in progress |"));
    assert!(busy.contains("| Awaiting Approval | 2 | ⏳ 2 awaiting |"));
    assert!(busy.contains("| Tasks Completed Today | 4 | 📈 4 done |"));
}

#[test]
fn refresh_rewrites_only_the_stats_region() {
    let (_dir, ws) = workspace();
    let doc = "# Title\n\nintro\n\n---\n\n## 📊 Quick Stats\n\nold table\n\n---\n\n## Notes\n\nhand written\n";
    std::fs::write(ws.dashboard_path(), doc).expect("write");
    put(&ws, FolderRole::NeedsAction, "a.md");

    let stats = Dashboard::new(&ws).refresh().expect("refresh");
    assert_eq!(stats.pending, 1);

    let updated = std::fs::read_to_string(ws.dashboard_path()).expect("read");
    assert!(updated.starts_with("# Title\n\nintro\n\n---\n\n## 📊 Quick Stats\n"));
    assert!(updated.contains("| Pending Tasks | 1 | ⚠️ 1 item(s) |"));
    assert!(!updated.contains("old table"));
    assert!(updated.ends_with("---\n\n## Notes\n\nhand written\n"));
    assert_eq!(updated.matches(STATS_HEADING).count(), 1);
}

#[test]
fn refresh_is_idempotent() {
    let (_dir, ws) = workspace();
    put(&ws, FolderRole::Plans, "p.md");
    let dashboard = Dashboard::new(&ws);

    dashboard.refresh().expect("first");
    let first = std::fs::read_to_string(ws.dashboard_path()).expect("read");
    dashboard.refresh().expect("second");
    let second = std::fs::read_to_string(ws.dashboard_path()).expect("read");
    assert_eq!(first, second);
}

#[test]
fn refresh_counts_done_today_by_local_date() {
    let (_dir, ws) = workspace();
    let today = Local::now().format("%Y-%m-%d");
    put(&ws, FolderRole::Done, &format!("FILE_report_{today}.md"));
    put(&ws, FolderRole::Done, "FILE_report_1999-01-01.md");

    let stats = Dashboard::new(&ws).refresh().expect("refresh");
    assert_eq!(stats.done_today, 1);
}

#[test]
fn done_today_counts_every_entry_kind() {
    let (_dir, ws) = workspace();
    put(&ws, FolderRole::Done, "FILE_scan_2026-04-02.pdf");
    put(&ws, FolderRole::Done, ".FILE_hidden_2026-04-02.md");
    std::fs::create_dir(ws.folder(FolderRole::Done).join("batch_2026-04-02"))
        .expect("mkdir");
    put(&ws, FolderRole::Done, "FILE_old_2026-03-30.md");

    let today = NaiveDate::from_ymd_opt(2026, 4, 2).expect("date");
    let stats = Dashboard::new(&ws).compute_stats(today).expect("stats");
    assert_eq!(stats.done_today, 3);
}

#[test]
fn refresh_without_dashboard_is_not_found() {
    let (_dir, ws) = workspace();
    std::fs::remove_file(ws.dashboard_path()).expect("remove");

    let result = Dashboard::new(&ws).refresh();
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(!ws.dashboard_path().exists(), "refresh must not create it");
}

#[test]
fn splice_without_anchor_appends_block() {
    let block = DashboardStats::default().render_block();
    let out = splice_stats("# Short\n", &block);
    assert!(out.starts_with("# Short\n\n## 📊 Quick Stats\n"));
    assert!(out.ends_with("---\n"));
}

#[test]
fn splice_ignores_separator_in_title_area() {
    let block = DashboardStats::default().render_block();
    let doc = "---\ntitle: x\n---\n# Dash\n\na\nb\n---\nrest";
    let out = splice_stats(doc, &block);
    let lines: Vec<_> = out.lines().collect();
    assert_eq!(lines[7], "---");
    assert_eq!(lines[8], STATS_HEADING);
    assert_eq!(lines.last().copied(), Some("rest"));
}
