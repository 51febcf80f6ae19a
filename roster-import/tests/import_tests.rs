//! End-to-end batch imports against SQLite
//!
//! Every test starts from an in-memory database with the full schema and
//! seeds canonical classes, teachers and subjects through ordinary imports.

use std::sync::Arc;

use roster_common::config::{CompoundAlias, OverrideRule, ResolverConfig};
use roster_import::batch::{BatchError, BatchProcessor};
use roster_import::models::{BatchRow, EntityKind, ErrorKind, RowStatus, WriteKind};
use roster_import::resolve::IdentifierResolver;
use roster_import::store::{CanonicalStore, SqliteStore};
use roster_import::validate::{ReferencePolicy, ValidationRules};
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

/// Test helper: in-memory database with schema
///
/// One connection only: each `sqlite::memory:` connection is its own database.
async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    roster_common::db::create_schema(&pool)
        .await
        .expect("Failed to create schema");
    pool
}

fn resolver_config() -> ResolverConfig {
    ResolverConfig {
        overrides: vec![OverrideRule {
            from: "pak.budi@school.id".to_string(),
            to: "budi.santoso@school.id".to_string(),
        }],
        compound_aliases: vec![CompoundAlias {
            compact: "adisasmito".to_string(),
            expanded: "adi.sasmito".to_string(),
        }],
    }
}

fn create_processor(pool: &SqlitePool) -> BatchProcessor {
    BatchProcessor::new(
        Arc::new(SqliteStore::new(pool.clone())),
        Arc::new(IdentifierResolver::from_config(&resolver_config())),
        ValidationRules::default(),
    )
}

fn rows(records: &[&[(&str, &str)]]) -> Vec<BatchRow> {
    records
        .iter()
        .enumerate()
        .map(|(i, fields)| BatchRow::new(i + 1, fields.iter().copied()))
        .collect()
}

/// Canonical classes, teachers and subjects every scenario resolves against
async fn seed(processor: &BatchProcessor) {
    let classes = rows(&[
        &[("ClassName", "VII-A"), ("Grade", "7")],
        &[("ClassName", "VII-B"), ("Grade", "7")],
    ]);
    let teachers = rows(&[
        &[("Name", "Budi Santoso"), ("Email", "budi.santoso@school.id"), ("Password", "pw1")],
        &[("Name", "Adi Sasmito"), ("Email", "adi.sasmito.s.pd@school.id"), ("Password", "pw2")],
        &[("Name", "Rina Wati"), ("Email", "rina.wati@school.id"), ("Password", "pw3")],
    ]);
    let subjects = rows(&[
        &[("Subject", "Mathematics"), ("Code", "MTK")],
        &[("Subject", "Biology"), ("Code", "BIO")],
    ]);

    for (batch, kind) in [
        (classes, EntityKind::Class),
        (teachers, EntityKind::Teacher),
        (subjects, EntityKind::Subject),
    ] {
        let report = processor.process(batch, kind).await.unwrap();
        assert_eq!(report.summary().failed, 0, "seeding {}", kind);
    }
}

fn schedule(class: &str, teacher: &str, subject: &str, day: &str, start: &str, end: &str) -> Vec<(String, String)> {
    [
        ("ClassName", class),
        ("TeacherEmail", teacher),
        ("Subject", subject),
        ("Day", day),
        ("StartTime", start),
        ("EndTime", end),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn schedule_rows(records: Vec<Vec<(String, String)>>) -> Vec<BatchRow> {
    records
        .into_iter()
        .enumerate()
        .map(|(i, fields)| BatchRow::new(i + 1, fields))
        .collect()
}

#[tokio::test]
async fn test_schedule_batch_with_one_bad_day() {
    let pool = create_test_pool().await;
    let processor = create_processor(&pool);
    seed(&processor).await;

    let batch = schedule_rows(vec![
        schedule("VII-A", "budi@school.id", "Mathematics", "1", "07:00", "08:00"),
        schedule("VII-A", "rina@school.id", "Biology", "9", "08:00", "09:00"),
        schedule("VII-B", "adisasmito@school.id", "biology", "2", "7:30", "09:00"),
    ]);

    let report = processor.process(batch, EntityKind::Schedule).await.unwrap();
    let body = serde_json::to_value(&report).unwrap();

    assert_eq!(body["summary"], json!({"imported": 2, "failed": 1, "skipped": 0}));
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);
    assert_eq!(body["errors"][0]["row"], 2);
    assert!(body.get("cancelled").is_none());

    let stored: Vec<(String, String)> = sqlx::query_as(
        "SELECT teacher_email, start_time FROM schedules ORDER BY rowid",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(
        stored,
        vec![
            ("budi.santoso@school.id".to_string(), "07:00".to_string()),
            ("adi.sasmito.s.pd@school.id".to_string(), "07:30".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let pool = create_test_pool().await;
    let processor = create_processor(&pool);
    seed(&processor).await;

    let batch = schedule_rows(vec![
        schedule("VII-A", "budi@school.id", "Mathematics", "1", "07:00", "08:00"),
        schedule("VII-B", "rina.wati@school.id", "Biology", "3", "10:00", "11:00"),
    ]);

    let first = processor.process(batch.clone(), EntityKind::Schedule).await.unwrap();
    let second = processor.process(batch, EntityKind::Schedule).await.unwrap();

    assert!(first.outcomes().iter().all(|o| o.write == Some(WriteKind::Created)));
    assert_eq!(second.summary().imported, 2);
    assert!(second.outcomes().iter().all(|o| o.write == Some(WriteKind::Updated)));

    let store = SqliteStore::new(pool.clone());
    assert_eq!(store.count(EntityKind::Schedule).await.unwrap(), 2);
    assert_eq!(store.count(EntityKind::Teacher).await.unwrap(), 3);
}

#[tokio::test]
async fn test_override_and_unresolved_teacher() {
    let pool = create_test_pool().await;
    let processor = create_processor(&pool);
    seed(&processor).await;

    let batch = schedule_rows(vec![
        schedule("VII-A", "pak.budi@school.id", "Mathematics", "1", "07:00", "08:00"),
        schedule("VII-A", "zzqq@school.id", "Mathematics", "1", "08:00", "09:00"),
    ]);

    let report = processor.process(batch, EntityKind::Schedule).await.unwrap();

    let outcomes = report.outcomes();
    assert_eq!(outcomes[0].status, RowStatus::Imported);
    let error = outcomes[1].error.as_ref().unwrap();
    assert_eq!(error.kind, ErrorKind::UnresolvedReference);
    assert!(error.message.contains("zzqq@school.id"));
}

#[tokio::test]
async fn test_email_fix_mode_keeps_raw_identifier() {
    let pool = create_test_pool().await;
    let processor = create_processor(&pool);
    seed(&processor).await;

    let batch = schedule_rows(vec![schedule(
        "VII-A",
        "zzqq@school.id",
        "Mathematics",
        "1",
        "08:00",
        "09:00",
    )]);

    let report = processor
        .with_policy(ReferencePolicy::PassThrough)
        .process(batch, EntityKind::Schedule)
        .await
        .unwrap();
    assert_eq!(report.summary().imported, 1);

    let (email, guid): (String, Option<String>) =
        sqlx::query_as("SELECT teacher_email, teacher_guid FROM schedules")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(email, "zzqq@school.id");
    assert!(guid.is_none());
}

#[tokio::test]
async fn test_student_class_resolved_by_substring() {
    let pool = create_test_pool().await;
    let processor = create_processor(&pool);
    seed(&processor).await;

    let batch = rows(&[&[
        ("Name", "Sari Dewi"),
        ("Email", "Sari.Dewi@school.id"),
        ("Password", "secret"),
        ("Role", "Student"),
        ("ClassName", "vii b"),
    ]]);

    let report = processor.process(batch, EntityKind::Student).await.unwrap();
    assert_eq!(report.summary().imported, 1);

    let (email_key, class_name, class_guid): (String, String, Option<String>) =
        sqlx::query_as("SELECT email_key, class_name, class_guid FROM students")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(email_key, "sari.dewi@school.id");
    assert_eq!(class_name, "VII-B");
    assert!(class_guid.is_some());
}

#[tokio::test]
async fn test_passwords_are_hashed() {
    let pool = create_test_pool().await;
    let processor = create_processor(&pool);
    seed(&processor).await;

    let (hash, salt): (String, String) = sqlx::query_as(
        "SELECT password_hash, password_salt FROM teachers WHERE email_key = 'budi.santoso@school.id'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    assert_ne!(hash, "pw1");
    assert!(roster_common::password::verify_password(
        "pw1",
        &roster_common::password::PasswordHash { hash, salt }
    ));
}

#[tokio::test]
async fn test_persistence_failure_keeps_processing() {
    let pool = create_test_pool().await;
    let processor = create_processor(&pool);
    seed(&processor).await;

    sqlx::query("DROP TABLE teachers").execute(&pool).await.unwrap();

    let batch = rows(&[
        &[("Name", "New One"), ("Email", "new.one@school.id"), ("Password", "pw")],
        &[("Name", "New Two"), ("Email", "new.two@school.id"), ("Password", "pw")],
    ]);
    let report = processor.process(batch, EntityKind::Teacher).await.unwrap();

    assert_eq!(report.summary().failed, 2);
    assert!(report
        .errors()
        .all(|o| o.error.as_ref().map(|e| e.kind) == Some(ErrorKind::PersistenceError)));
}

#[tokio::test]
async fn test_csv_missing_column_rejects_whole_batch() {
    let pool = create_test_pool().await;
    let processor = create_processor(&pool);

    let csv = "ClassName,Subject,Day,StartTime,EndTime\nVII-A,Mathematics,1,07:00,08:00\n";
    let err = processor
        .import_csv(csv.as_bytes(), EntityKind::Schedule, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, BatchError::Input(_)));
    let store = SqliteStore::new(pool.clone());
    assert_eq!(store.count(EntityKind::Schedule).await.unwrap(), 0);
}

#[tokio::test]
async fn test_csv_import_records_history() {
    let pool = create_test_pool().await;
    let processor = create_processor(&pool);
    seed(&processor).await;

    let csv = "\
ClassName,TeacherEmail,Subject,Day,StartTime,EndTime
VII-A,budi@school.id,Mathematics,1,07:00,08:00
,,,,,
VII-B,rina@school.id,Biology,8,07:00,08:00
";
    let (batch_id, report) = processor
        .import_csv(csv.as_bytes(), EntityKind::Schedule, &CancellationToken::new())
        .await
        .unwrap();

    let summary = report.summary();
    assert_eq!((summary.imported, summary.failed, summary.skipped), (1, 1, 1));

    let store = SqliteStore::new(pool.clone());
    let record = store.load_batch(batch_id).await.unwrap().unwrap();
    assert_eq!(record.kind, EntityKind::Schedule);
    assert_eq!(record.total_rows, 3);
    assert_eq!(record.errors.len(), 1);
    assert_eq!(record.errors[0].row, 3);
}

#[tokio::test]
async fn test_cancelled_batch_writes_nothing() {
    let pool = create_test_pool().await;
    let processor = create_processor(&pool);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let batch = rows(&[&[("Subject", "Art")], &[("Subject", "Music")]]);

    let (batch_id, report) = processor
        .import(batch, EntityKind::Subject, &cancel)
        .await
        .unwrap();

    assert!(report.cancelled());
    assert_eq!(report.summary().skipped, 2);
    let store = SqliteStore::new(pool.clone());
    assert_eq!(store.count(EntityKind::Subject).await.unwrap(), 0);
    assert!(store.load_batch(batch_id).await.unwrap().unwrap().cancelled);
}

#[tokio::test]
async fn test_file_database_is_created() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("nested").join("roster.db");

    let store = SqliteStore::open(&db_path).await.unwrap();

    assert!(db_path.exists());
    assert_eq!(store.count(EntityKind::Class).await.unwrap(), 0);
}
