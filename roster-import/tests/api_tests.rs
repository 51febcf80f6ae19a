//! Integration tests for roster-import API endpoints

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use roster_import::batch::BatchProcessor;
use roster_import::models::{CanonicalEntity, EntityKind};
use roster_import::resolve::IdentifierResolver;
use roster_import::store::MemoryStore;
use roster_import::validate::ValidationRules;
use roster_import::{build_router, AppState};
use uuid::Uuid;

/// Test helper: app over an in-memory store seeded with one class, teacher
/// and subject
fn create_test_app() -> axum::Router {
    let store = MemoryStore::new();
    for (kind, identifier) in [
        (EntityKind::Class, "VII-A"),
        (EntityKind::Teacher, "budi.santoso@school.id"),
        (EntityKind::Subject, "Mathematics"),
    ] {
        store
            .seed(kind, CanonicalEntity::new(Uuid::new_v4(), identifier, identifier))
            .unwrap();
    }

    let processor = BatchProcessor::new(
        Arc::new(store),
        Arc::new(IdentifierResolver::default()),
        ValidationRules::default(),
    );
    build_router(AppState::new(processor))
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (status, body) = send(create_test_app(), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "roster-import");
}

#[tokio::test]
async fn test_import_json_schedule_with_bad_day() {
    let request = post_json(
        "/import/schedules",
        json!({
            "rows": [
                {"ClassName": "VII-A", "TeacherEmail": "budi@school.id", "Subject": "Mathematics",
                 "Day": 1, "StartTime": "07:00", "EndTime": "08:00"},
                {"ClassName": "VII-A", "TeacherEmail": "budi@school.id", "Subject": "Mathematics",
                 "Day": 9, "StartTime": "08:00", "EndTime": "09:00"},
                {"ClassName": "VII-A", "TeacherEmail": "budi@school.id", "Subject": "Mathematics",
                 "Day": "2", "StartTime": "08:00", "EndTime": "09:00"}
            ]
        }),
    );

    let (status, body) = send(create_test_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["summary"], json!({"imported": 2, "failed": 1, "skipped": 0}));
    assert_eq!(json["errors"][0]["row"], 2);
    assert!(json["batch_id"].is_string());
}

#[tokio::test]
async fn test_import_unknown_kind_is_bad_request() {
    let (status, body) = send(
        create_test_app(),
        post_json("/import/parents", json!({"rows": []})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_import_csv_missing_column() {
    let request = Request::builder()
        .method("POST")
        .uri("/import/subject/csv")
        .header("content-type", "text/csv")
        .body(Body::from("Code\nMTK\n"))
        .unwrap();

    let (status, body) = send(create_test_app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["code"], "BATCH_INPUT_ERROR");
}

#[tokio::test]
async fn test_import_csv_then_fetch_batch() {
    let app = create_test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/import/subject/csv")
        .header("content-type", "text/csv")
        .body(Body::from("Subject,Code\nBiology,BIO\nMathematics,MTK\n"))
        .unwrap();

    let (status, body) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["summary"]["imported"], 2);
    let batch_id = json["batch_id"].as_str().unwrap().to_string();

    let (status, body) = send(app, get(&format!("/batches/{}", batch_id))).await;
    assert_eq!(status, StatusCode::OK);
    let record: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(record["kind"], "subject");
    assert_eq!(record["total_rows"], 2);
}

#[tokio::test]
async fn test_unknown_batch_is_not_found() {
    let uri = format!("/batches/{}", Uuid::new_v4());
    let (status, _) = send(create_test_app(), get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_email_fix_query_keeps_unresolved_teacher() {
    let rows = json!({
        "rows": [{"ClassName": "VII-A", "TeacherEmail": "zzqq@school.id", "Subject": "Mathematics",
                  "Day": 1, "StartTime": "07:00", "EndTime": "08:00"}]
    });

    let (_, strict) = send(create_test_app(), post_json("/import/schedule", rows.clone())).await;
    let (_, lenient) = send(
        create_test_app(),
        post_json("/import/schedule?email_fix=true", rows),
    )
    .await;

    let strict: Value = serde_json::from_slice(&strict).unwrap();
    let lenient: Value = serde_json::from_slice(&lenient).unwrap();
    assert_eq!(strict["summary"]["failed"], 1);
    assert_eq!(lenient["summary"]["imported"], 1);
}

#[tokio::test]
async fn test_template_download() {
    let (status, body) = send(create_test_app(), get("/templates/schedule")).await;

    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("ClassName,TeacherEmail,Subject,Day,StartTime,EndTime")
    );
    assert_eq!(lines.count(), 2);
}

#[tokio::test]
async fn test_resolve_endpoint_reports_tiers() {
    let request = post_json(
        "/resolve/teachers",
        json!({"identifiers": ["BUDI.SANTOSO@school.id", "budi@school.id", "zzqq@school.id"]}),
    );

    let (status, body) = send(create_test_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let statuses: Vec<&str> = json["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["EXACT", "NORMALIZED_PREFIX", "UNRESOLVED"]);
    assert_eq!(json["results"][2]["raw_identifier"], "zzqq@school.id");
    assert_eq!(json["unresolved"], 1);
}
