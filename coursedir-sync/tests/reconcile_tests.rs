//! End-to-end reconciliation tests over real catalog files
//!
//! Each test builds a root folder in a tempdir, runs a sync, and checks the
//! persisted catalog plus the returned run summary.

use std::fs;
use std::path::{Path, PathBuf};

use coursedir_common::changelog::RunSummary;
use coursedir_common::config::CatalogPaths;
use coursedir_common::schema::{course, offering};
use coursedir_common::{store, Error, Result};
use coursedir_sync::engine::{run_course_sync, run_expiration_sweep};
use coursedir_sync::enrollment::run_enrollment_sync;
use coursedir_sync::notify::{LogNotifier, Notifier};
use tempfile::TempDir;

/// Course row with sensible defaults for the fields a test doesn't care about
struct CourseRow {
    fields: Vec<String>,
}

impl CourseRow {
    fn new(guid: &str, code: &str, title: &str) -> Self {
        let mut fields = vec![String::new(); course::schema().width()];
        fields[course::GUID] = guid.to_string();
        fields[course::CODE] = code.to_string();
        fields[course::TITLE] = title.to_string();
        fields[course::SYNC] = "Yes".to_string();
        fields[course::PERSIST] = "No".to_string();
        fields[course::INCLUDED] = "Yes".to_string();
        fields[course::UPDATED] = "2026-01-01T00:00:00Z".to_string();
        Self { fields }
    }

    fn set(mut self, idx: usize, value: &str) -> Self {
        self.fields[idx] = value.to_string();
        self
    }

    fn line(&self) -> String {
        self.fields.join("\t")
    }
}

fn feed_line(code: &str, title: &str, provider: &str, desc: &str, hours: &str) -> String {
    [code, title, provider, desc, hours, "Beginner", "https://example.org/c"].join("\t")
}

fn write_courses(root: &Path, rows: &[String]) {
    let mut content = course::schema().header();
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(root.join("courses.tsv"), content).unwrap();
}

fn write_partners(root: &Path) {
    fs::write(
        root.join("partners.tsv"),
        "id\tname\tcontact\np-7\tAcme Training\tacme@example.org\np-9\tNorthside College\t\n",
    )
    .unwrap();
}

fn write_feed(root: &Path, rows: &[String]) -> PathBuf {
    let path = root.join("feed.tsv");
    let mut content = String::from("code\ttitle\tprovider_name\tdescription\thours\tlevel\turl\n");
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(&path, content).unwrap();
    path
}

fn setup(rows: &[String]) -> (TempDir, CatalogPaths) {
    let dir = TempDir::new().unwrap();
    write_courses(dir.path(), rows);
    write_partners(dir.path());
    let paths = CatalogPaths::new(dir.path());
    (dir, paths)
}

fn load_courses(paths: &CatalogPaths) -> Vec<coursedir_common::Record> {
    store::load(&paths.courses(), &course::schema()).unwrap().records
}

#[test]
fn test_update_merges_fields_and_logs_changes() {
    let (_dir, paths) = setup(&[CourseRow::new("g-1", "ITEM-1", "Welding Basics")
        .set(course::PROVIDER, "p-7")
        .set(course::HOURS, "8")
        .line()]);
    let feed = write_feed(
        paths.root(),
        &[feed_line("ITEM-1", "Welding Basics", "Acme Training", "Updated blurb", "16")],
    );

    let summary = run_course_sync(&paths, &feed, &LogNotifier).unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.created, 0);

    let records = load_courses(&paths);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get(course::HOURS), "16");
    assert_eq!(records[0].get(course::DESCRIPTION), "Updated blurb");
    // Modification timestamp was refreshed
    assert_ne!(records[0].get(course::UPDATED), "2026-01-01T00:00:00Z");
}

#[test]
fn test_second_run_with_unchanged_feed_is_empty_and_byte_identical() {
    let (_dir, paths) = setup(&[CourseRow::new("g-1", "ITEM-1", "Welding Basics")
        .set(course::PROVIDER, "p-7")
        .line()]);
    let feed = write_feed(
        paths.root(),
        &[
            feed_line("ITEM-1", "Welding Basics", "Acme Training", "A blurb", "8"),
            feed_line("ITEM-2", "Forklift Operation", "Northside College", "B blurb", "4"),
        ],
    );

    let first = run_course_sync(&paths, &feed, &LogNotifier).unwrap();
    assert_eq!(first.updated, 1);
    assert_eq!(first.created, 1);
    let after_first = fs::read_to_string(paths.courses()).unwrap();

    let second = run_course_sync(&paths, &feed, &LogNotifier).unwrap();
    assert_eq!(second.updated, 0);
    assert_eq!(second.created, 0);
    assert!(second.changes.is_empty());
    let after_second = fs::read_to_string(paths.courses()).unwrap();
    assert_eq!(after_first, after_second);
}

#[test]
fn test_name_collision_yields_duplicate_candidate_and_no_mutation() {
    let (_dir, paths) = setup(&[CourseRow::new("g-1", "OLD-5", "Safety at Heights").line()]);
    let before = fs::read_to_string(paths.courses()).unwrap();
    let feed = write_feed(
        paths.root(),
        &[feed_line("ITEM-5", "SAFETY  at heights", "", "", "")],
    );

    let summary = run_course_sync(&paths, &feed, &LogNotifier).unwrap();
    assert_eq!(summary.created, 0);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.duplicates.len(), 1);
    assert_eq!(summary.duplicates[0].feed_code, "ITEM-5");
    assert_eq!(summary.duplicates[0].catalog_code, "OLD-5");
    assert_eq!(summary.duplicates[0].catalog_guid, "g-1");

    // Zero catalog mutations
    let after = fs::read_to_string(paths.courses()).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_no_match_creates_record_appended_at_end() {
    let (_dir, paths) = setup(&[CourseRow::new("g-1", "ITEM-1", "Welding Basics").line()]);
    let feed = write_feed(
        paths.root(),
        &[
            feed_line("ITEM-1", "Welding Basics", "", "", ""),
            feed_line("ITEM-9", "Crane &amp; Rigging", "Acme Training", "New course", "24"),
        ],
    );

    let summary = run_course_sync(&paths, &feed, &LogNotifier).unwrap();
    assert_eq!(summary.created, 1);

    let records = load_courses(&paths);
    assert_eq!(records.len(), 2);
    // Survivors keep their position; the new record is appended
    assert_eq!(records[0].get(course::CODE), "ITEM-1");
    let created = &records[1];
    assert_eq!(created.get(course::CODE), "ITEM-9");
    assert_eq!(created.get(course::TITLE), "Crane & Rigging");
    assert_eq!(created.get(course::PROVIDER), "p-7");
    assert_eq!(created.get(course::INCLUDED), "Yes");
    assert!(coursedir_common::ids::parse(created.get(course::GUID)).is_ok());
}

#[test]
fn test_absence_hides_plain_record_with_one_entry() {
    let (_dir, paths) = setup(&[CourseRow::new("g-1", "ITEM-1", "Welding Basics").line()]);
    let feed = write_feed(paths.root(), &[]);

    let summary = run_course_sync(&paths, &feed, &LogNotifier).unwrap();
    assert_eq!(summary.hidden, 1);
    assert_eq!(summary.changes.len(), 1);
    assert!(summary.changes[0].description.contains("included"));

    let records = load_courses(&paths);
    assert_eq!(records[0].get(course::INCLUDED), "No");
}

#[test]
fn test_absence_demotes_persist_record_but_keeps_it_visible() {
    let (_dir, paths) = setup(&[CourseRow::new("g-1", "ITEM-1", "Welding Basics")
        .set(course::PERSIST, "Yes")
        .set(course::PERSIST_STATE, "active")
        .line()]);
    let feed = write_feed(paths.root(), &[]);

    let summary = run_course_sync(&paths, &feed, &LogNotifier).unwrap();
    assert_eq!(summary.hidden, 0);
    assert_eq!(summary.changes.len(), 1);
    assert!(summary.changes[0].description.contains("persist_state"));

    let records = load_courses(&paths);
    assert_eq!(records[0].get(course::INCLUDED), "Yes");
    assert_eq!(records[0].get(course::PERSIST_STATE), "inactive");
}

#[test]
fn test_opt_out_blocks_hiding_on_absence() {
    let (_dir, paths) = setup(&[CourseRow::new("g-1", "ITEM-1", "Welding Basics")
        .set(course::SYNC, "No")
        .line()]);
    let feed = write_feed(paths.root(), &[]);

    let summary = run_course_sync(&paths, &feed, &LogNotifier).unwrap();
    assert_eq!(summary.hidden, 0);
    assert!(summary.changes.is_empty());
    assert_eq!(load_courses(&paths)[0].get(course::INCLUDED), "Yes");
}

#[test]
fn test_expiration_hides_record_even_when_present_in_feed() {
    let (_dir, paths) = setup(&[CourseRow::new("g-1", "ITEM-1", "Welding Basics")
        .set(course::EXPIRES, "2020-01-01")
        .line()]);
    let feed = write_feed(paths.root(), &[feed_line("ITEM-1", "Welding Basics", "", "", "")]);

    let summary = run_course_sync(&paths, &feed, &LogNotifier).unwrap();
    assert_eq!(summary.hidden, 1);
    assert_eq!(load_courses(&paths)[0].get(course::INCLUDED), "No");
}

#[test]
fn test_excluded_record_reappearing_in_feed_is_restored() {
    let (_dir, paths) = setup(&[CourseRow::new("g-1", "ITEM-1", "Welding Basics")
        .set(course::INCLUDED, "No")
        .line()]);
    let feed = write_feed(paths.root(), &[feed_line("ITEM-1", "Welding Basics", "", "", "")]);

    run_course_sync(&paths, &feed, &LogNotifier).unwrap();
    assert_eq!(load_courses(&paths)[0].get(course::INCLUDED), "Yes");
}

#[test]
fn test_locally_originated_record_without_key_is_never_swept() {
    let (_dir, paths) = setup(&[CourseRow::new("g-1", "", "Homegrown Course").line()]);
    let feed = write_feed(paths.root(), &[]);

    let summary = run_course_sync(&paths, &feed, &LogNotifier).unwrap();
    assert_eq!(summary.hidden, 0);
    assert_eq!(load_courses(&paths)[0].get(course::INCLUDED), "Yes");
}

#[test]
fn test_unknown_provider_keeps_prior_value_and_run_completes() {
    let (_dir, paths) = setup(&[CourseRow::new("g-1", "ITEM-1", "Welding Basics")
        .set(course::PROVIDER, "p-7")
        .line()]);
    let feed = write_feed(
        paths.root(),
        &[feed_line("ITEM-1", "Welding Basics", "Unknown Partner LLC", "", "")],
    );

    let summary = run_course_sync(&paths, &feed, &LogNotifier).unwrap();
    assert_eq!(summary.unresolved_fields, 1);
    assert_eq!(load_courses(&paths)[0].get(course::PROVIDER), "p-7");
}

#[test]
fn test_malformed_catalog_row_survives_run_verbatim() {
    let (_dir, paths) = setup(&[
        CourseRow::new("g-1", "ITEM-1", "Welding Basics").line(),
        "mangled\trow".to_string(),
    ]);
    let feed = write_feed(paths.root(), &[feed_line("ITEM-1", "Welding Basics", "", "", "")]);

    let summary = run_course_sync(&paths, &feed, &LogNotifier).unwrap();
    assert_eq!(summary.malformed_rows, 1);
    let content = fs::read_to_string(paths.courses()).unwrap();
    assert!(content.contains("mangled\trow"));
}

#[test]
fn test_missing_feed_aborts_before_any_mutation() {
    let (_dir, paths) = setup(&[CourseRow::new("g-1", "ITEM-1", "Welding Basics").line()]);
    let before = fs::read_to_string(paths.courses()).unwrap();

    let result = run_course_sync(&paths, &paths.root().join("absent.tsv"), &LogNotifier);
    assert!(matches!(result, Err(Error::SourceUnreadable { .. })));

    // Catalog untouched, no backup written
    assert_eq!(fs::read_to_string(paths.courses()).unwrap(), before);
    let backups = fs::read_dir(paths.root())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".bak"))
        .count();
    assert_eq!(backups, 0);
}

#[test]
fn test_backup_is_byte_identical_to_pre_run_catalog() {
    let (_dir, paths) = setup(&[CourseRow::new("g-1", "ITEM-1", "Welding Basics").line()]);
    let before = fs::read_to_string(paths.courses()).unwrap();
    let feed = write_feed(
        paths.root(),
        &[feed_line("ITEM-1", "Welding Basics", "", "fresh", "")],
    );

    run_course_sync(&paths, &feed, &LogNotifier).unwrap();

    let backup = fs::read_dir(paths.root())
        .unwrap()
        .filter_map(|e| e.ok())
        .find(|e| e.file_name().to_string_lossy().ends_with(".bak"))
        .expect("backup file written");
    assert_eq!(fs::read_to_string(backup.path()).unwrap(), before);
}

struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _summary: &RunSummary) -> Result<()> {
        Err(Error::Config("smtp relay down".to_string()))
    }
}

#[test]
fn test_notifier_failure_does_not_roll_back_commit() {
    let (_dir, paths) = setup(&[CourseRow::new("g-1", "ITEM-1", "Welding Basics").line()]);
    let feed = write_feed(
        paths.root(),
        &[feed_line("ITEM-1", "Welding Basics", "", "changed", "")],
    );

    let summary = run_course_sync(&paths, &feed, &FailingNotifier).unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(load_courses(&paths)[0].get(course::DESCRIPTION), "changed");
}

#[test]
fn test_change_log_files_written_after_commit() {
    let (_dir, paths) = setup(&[CourseRow::new("g-1", "ITEM-1", "Welding Basics").line()]);
    let feed = write_feed(
        paths.root(),
        &[feed_line("ITEM-1", "Welding Basics", "", "changed", "")],
    );

    run_course_sync(&paths, &feed, &LogNotifier).unwrap();

    let persistent = fs::read_to_string(paths.log_dir().join("sync.log")).unwrap();
    assert!(persistent.contains("ITEM-1"));
}

#[test]
fn test_expiration_sweep_hides_only_expired_records() {
    let (_dir, paths) = setup(&[
        CourseRow::new("g-1", "ITEM-1", "Welding Basics")
            .set(course::EXPIRES, "2020-01-01")
            .line(),
        CourseRow::new("g-2", "ITEM-2", "Forklift Operation")
            .set(course::EXPIRES, "2999-12-31")
            .line(),
        CourseRow::new("g-3", "ITEM-3", "Confined Spaces").line(),
    ]);

    let summary = run_expiration_sweep(&paths, &LogNotifier).unwrap();
    assert_eq!(summary.hidden, 1);

    let records = load_courses(&paths);
    assert_eq!(records[0].get(course::INCLUDED), "No");
    assert_eq!(records[1].get(course::INCLUDED), "Yes");
    assert_eq!(records[2].get(course::INCLUDED), "Yes");
}

#[test]
fn test_expiration_sweep_without_expired_records_rewrites_nothing() {
    let (_dir, paths) = setup(&[CourseRow::new("g-1", "ITEM-1", "Welding Basics").line()]);
    let before = fs::read_to_string(paths.courses()).unwrap();

    let summary = run_expiration_sweep(&paths, &LogNotifier).unwrap();
    assert!(summary.changes.is_empty());
    assert_eq!(fs::read_to_string(paths.courses()).unwrap(), before);
    // No backup either: the catalog was never replaced
    let backups = fs::read_dir(paths.root())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".bak"))
        .count();
    assert_eq!(backups, 0);
}

fn offering_line(guid: &str, code: &str, seats: &str, enrolled: &str, waitlisted: &str) -> String {
    [guid, code, "course-g", "2026-09-01", seats, enrolled, "2026-01-01T00:00:00Z", waitlisted]
        .join("\t")
}

fn write_offerings(root: &Path, rows: &[String]) {
    let mut content = offering::schema().header();
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(root.join("offerings.tsv"), content).unwrap();
}

fn write_enrollment_feed(root: &Path, rows: &[&str]) -> PathBuf {
    let path = root.join("attendance.tsv");
    let mut content = String::from("code\tenrolled\twaitlisted\tseats\n");
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_enrollment_sync_updates_counters() {
    let dir = TempDir::new().unwrap();
    write_offerings(
        dir.path(),
        &[
            offering_line("og-1", "OFF-1", "30", "12", "0"),
            offering_line("og-2", "OFF-2", "20", "20", "3"),
        ],
    );
    let paths = CatalogPaths::new(dir.path());
    let feed = write_enrollment_feed(dir.path(), &["OFF-1\t15\t0\t30", "OFF-2\t20\t3\t20"]);

    let summary = run_enrollment_sync(&paths, &feed, &LogNotifier).unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.changes.len(), 1);
    assert!(summary.changes[0].description.contains("enrolled"));

    let records = store::load(&paths.offerings(), &offering::schema())
        .unwrap()
        .records;
    assert_eq!(records[0].get(offering::ENROLLED), "15");
    assert_eq!(records[1].get(offering::ENROLLED), "20");
}

#[test]
fn test_enrollment_sync_never_creates_records() {
    let dir = TempDir::new().unwrap();
    write_offerings(dir.path(), &[offering_line("og-1", "OFF-1", "30", "12", "0")]);
    let paths = CatalogPaths::new(dir.path());
    let feed = write_enrollment_feed(dir.path(), &["OFF-9\t5\t0\t10"]);

    let summary = run_enrollment_sync(&paths, &feed, &LogNotifier).unwrap();
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.unmatched, 1);
    assert_eq!(summary.created, 0);

    let records = store::load(&paths.offerings(), &offering::schema())
        .unwrap()
        .records;
    assert_eq!(records.len(), 1);
}

#[test]
fn test_enrollment_sync_fills_padded_historical_column() {
    let dir = TempDir::new().unwrap();
    // 7-field row from before the waitlisted column existed
    let historical = ["og-1", "OFF-1", "course-g", "2026-09-01", "30", "12", "2026-01-01T00:00:00Z"]
        .join("\t");
    write_offerings(dir.path(), &[historical]);
    let paths = CatalogPaths::new(dir.path());
    let feed = write_enrollment_feed(dir.path(), &["OFF-1\t12\t4\t30"]);

    let summary = run_enrollment_sync(&paths, &feed, &LogNotifier).unwrap();
    assert_eq!(summary.updated, 1);

    let records = store::load(&paths.offerings(), &offering::schema())
        .unwrap()
        .records;
    assert_eq!(records[0].get(offering::WAITLISTED), "4");
    assert_eq!(records[0].fields().len(), offering::schema().width());
}

#[test]
fn test_enrollment_sync_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write_offerings(dir.path(), &[offering_line("og-1", "OFF-1", "30", "12", "0")]);
    let paths = CatalogPaths::new(dir.path());
    let feed = write_enrollment_feed(dir.path(), &["OFF-1\t15\t1\t30"]);

    let first = run_enrollment_sync(&paths, &feed, &LogNotifier).unwrap();
    assert_eq!(first.updated, 1);
    let after_first = fs::read_to_string(paths.offerings()).unwrap();

    let second = run_enrollment_sync(&paths, &feed, &LogNotifier).unwrap();
    assert_eq!(second.updated, 0);
    assert!(second.changes.is_empty());
    assert_eq!(fs::read_to_string(paths.offerings()).unwrap(), after_first);
}
