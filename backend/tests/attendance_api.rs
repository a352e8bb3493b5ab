use attendance_backend::models::user::UserRole;
use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

mod support;

use support::{
    create_test_token, json_request, response_json, seed_subject, seed_user, test_app, test_pool,
};

async fn integration_guard() -> tokio::sync::MutexGuard<'static, ()> {
    static GUARD: std::sync::OnceLock<tokio::sync::Mutex<()>> = std::sync::OnceLock::new();
    GUARD
        .get_or_init(|| tokio::sync::Mutex::new(()))
        .lock()
        .await
}

fn session_body(subject_id: &str) -> Value {
    let start = Utc::now();
    json!({
        "subject_id": subject_id,
        "start_time": start,
        "end_time": start + Duration::hours(1),
    })
}

fn entry_for<'a>(session: &'a Value, student_id: &str) -> &'a Value {
    session["students"]
        .as_array()
        .expect("students array")
        .iter()
        .find(|entry| entry["student_id"] == student_id)
        .expect("entry for student")
}

#[tokio::test]
async fn session_lifecycle_from_creation_to_completion() {
    let _guard = integration_guard().await;
    let pool = test_pool().await;
    let teacher = seed_user(&pool, UserRole::Teacher).await;
    let s1 = seed_user(&pool, UserRole::Student).await;
    let s2 = seed_user(&pool, UserRole::Student).await;
    let s3 = seed_user(&pool, UserRole::Student).await;
    let subject = seed_subject(&pool, Some(teacher.id), &[s1.id, s2.id, s3.id]).await;
    let app = test_app(pool.clone());
    let token = create_test_token(&teacher);

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/attendance/sessions",
            Some(&token),
            Some(session_body(&subject.id.to_string())),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = response_json(response).await;
    let session_id = created["session"]["id"].as_str().unwrap().to_string();
    let qr_token = created["qr_token"].as_str().unwrap().to_string();
    assert_eq!(created["session"]["status"], "active");
    let students = created["session"]["students"].as_array().unwrap();
    assert_eq!(students.len(), 3);
    assert!(students.iter().all(|entry| entry["status"] == "absent"));
    assert!(students.iter().all(|entry| entry["scanned_at"].is_null()));

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/attendance/scan",
            None,
            Some(json!({ "qr_token": qr_token, "student_id": s1.id.to_string() })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let entry = response_json(response).await;
    assert_eq!(entry["status"], "present");
    assert!(!entry["scanned_at"].is_null());

    let response = app
        .clone()
        .oneshot(json_request(
            Method::PUT,
            "/api/attendance/update-status",
            Some(&token),
            Some(json!({
                "session_id": session_id,
                "student_id": s2.id.to_string(),
                "status": "leave",
                "reason": "  medical  ",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let entry = response_json(response).await;
    assert_eq!(entry["status"], "leave");
    assert_eq!(entry["reason"], "medical");

    let response = app
        .clone()
        .oneshot(json_request(
            Method::GET,
            &format!("/api/attendance/sessions/{}", session_id),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session = response_json(response).await;
    assert_eq!(entry_for(&session, &s1.id.to_string())["status"], "present");
    assert_eq!(entry_for(&session, &s2.id.to_string())["status"], "leave");
    assert_eq!(entry_for(&session, &s3.id.to_string())["status"], "absent");

    let response = app
        .clone()
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/attendance/sessions/{}/complete", session_id),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let completed = response_json(response).await;
    assert_eq!(completed["records_created"], 3);
    assert_eq!(completed["session"]["status"], "completed");

    let response = app
        .clone()
        .oneshot(json_request(
            Method::GET,
            &format!("/api/attendance/sessions/{}/records", session_id),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let records = response_json(response).await;
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 3);
    let count = |status: &str| records.iter().filter(|r| r["status"] == status).count();
    assert_eq!(count("present"), 1);
    assert_eq!(count("leave"), 1);
    assert_eq!(count("absent"), 1);

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/attendance/scan",
            None,
            Some(json!({ "qr_token": qr_token, "student_id": s3.id.to_string() })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let rejected = response_json(response).await;
    assert_eq!(rejected["error"], "Attendance session is not active");

    let response = app
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/attendance/sessions/{}/complete", session_id),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let rejected = response_json(response).await;
    assert_eq!(rejected["error"], "Attendance session is already completed");

    let stored: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM attendance_records WHERE session_id = $1")
            .bind(&session_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(stored, 3);
}

#[tokio::test]
async fn repeated_scan_keeps_first_timestamp() {
    let _guard = integration_guard().await;
    let pool = test_pool().await;
    let teacher = seed_user(&pool, UserRole::Teacher).await;
    let student = seed_user(&pool, UserRole::Student).await;
    let subject = seed_subject(&pool, Some(teacher.id), &[student.id]).await;
    let app = test_app(pool);
    let token = create_test_token(&teacher);

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/attendance/sessions",
            Some(&token),
            Some(session_body(&subject.id.to_string())),
        ))
        .await
        .unwrap();
    let created = response_json(response).await;
    let qr_token = created["qr_token"].as_str().unwrap().to_string();
    let scan = json!({ "qr_token": qr_token, "student_id": student.id.to_string() });

    let first = response_json(
        app.clone()
            .oneshot(json_request(Method::POST, "/api/attendance/scan", None, Some(scan.clone())))
            .await
            .unwrap(),
    )
    .await;
    let second = response_json(
        app.oneshot(json_request(Method::POST, "/api/attendance/scan", None, Some(scan)))
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(second["status"], "present");
    assert_eq!(first["scanned_at"], second["scanned_at"]);
}

#[tokio::test]
async fn unassigned_teacher_cannot_open_session() {
    let _guard = integration_guard().await;
    let pool = test_pool().await;
    let owner = seed_user(&pool, UserRole::Teacher).await;
    let other = seed_user(&pool, UserRole::Teacher).await;
    let subject = seed_subject(&pool, Some(owner.id), &[]).await;
    let app = test_app(pool.clone());

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/attendance/sessions",
            Some(&create_test_token(&other)),
            Some(session_body(&subject.id.to_string())),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let sessions: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM attendance_sessions WHERE subject_id = $1")
            .bind(subject.id.to_string())
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(sessions, 0);
}

#[tokio::test]
async fn inverted_window_is_rejected() {
    let _guard = integration_guard().await;
    let pool = test_pool().await;
    let teacher = seed_user(&pool, UserRole::Teacher).await;
    let subject = seed_subject(&pool, Some(teacher.id), &[]).await;
    let app = test_app(pool);

    let start = Utc::now();
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/attendance/sessions",
            Some(&create_test_token(&teacher)),
            Some(json!({
                "subject_id": subject.id.to_string(),
                "start_time": start,
                "end_time": start - Duration::minutes(5),
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn forged_scan_token_is_rejected() {
    let _guard = integration_guard().await;
    let pool = test_pool().await;
    let student = seed_user(&pool, UserRole::Student).await;
    let app = test_app(pool);

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/attendance/scan",
            None,
            Some(json!({ "qr_token": "not-a-token", "student_id": student.id.to_string() })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn student_outside_roster_cannot_scan() {
    let _guard = integration_guard().await;
    let pool = test_pool().await;
    let teacher = seed_user(&pool, UserRole::Teacher).await;
    let enrolled = seed_user(&pool, UserRole::Student).await;
    let outsider = seed_user(&pool, UserRole::Student).await;
    let subject = seed_subject(&pool, Some(teacher.id), &[enrolled.id]).await;
    let app = test_app(pool);

    let created = response_json(
        app.clone()
            .oneshot(json_request(
                Method::POST,
                "/api/attendance/sessions",
                Some(&create_test_token(&teacher)),
                Some(session_body(&subject.id.to_string())),
            ))
            .await
            .unwrap(),
    )
    .await;

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/attendance/scan",
            None,
            Some(json!({
                "qr_token": created["qr_token"],
                "student_id": outsider.id.to_string(),
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancelled_session_rejects_status_updates() {
    let _guard = integration_guard().await;
    let pool = test_pool().await;
    let teacher = seed_user(&pool, UserRole::Teacher).await;
    let student = seed_user(&pool, UserRole::Student).await;
    let subject = seed_subject(&pool, Some(teacher.id), &[student.id]).await;
    let app = test_app(pool);
    let token = create_test_token(&teacher);

    let created = response_json(
        app.clone()
            .oneshot(json_request(
                Method::POST,
                "/api/attendance/sessions",
                Some(&token),
                Some(session_body(&subject.id.to_string())),
            ))
            .await
            .unwrap(),
    )
    .await;
    let session_id = created["session"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/attendance/sessions/{}/cancel", session_id),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["status"], "cancelled");

    let response = app
        .oneshot(json_request(
            Method::PUT,
            "/api/attendance/update-status",
            Some(&token),
            Some(json!({
                "session_id": session_id,
                "student_id": student.id.to_string(),
                "status": "present",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let rejected = response_json(response).await;
    assert_eq!(rejected["error"], "Attendance session is not active");
}

#[tokio::test]
async fn students_only_list_sessions_of_their_subjects() {
    let _guard = integration_guard().await;
    let pool = test_pool().await;
    let teacher = seed_user(&pool, UserRole::Teacher).await;
    let student = seed_user(&pool, UserRole::Student).await;
    let mine = seed_subject(&pool, Some(teacher.id), &[student.id]).await;
    let other = seed_subject(&pool, Some(teacher.id), &[]).await;
    let app = test_app(pool);
    let token = create_test_token(&teacher);

    for subject in [&mine, &other] {
        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/attendance/sessions",
                Some(&token),
                Some(session_body(&subject.id.to_string())),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .oneshot(json_request(
            Method::GET,
            "/api/attendance/sessions",
            Some(&create_test_token(&student)),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let sessions = response_json(response).await;
    let sessions = sessions.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["subject_id"], mine.id.to_string());
}

#[tokio::test]
async fn requests_without_bearer_token_are_unauthorized() {
    let pool = test_pool().await;
    let app = test_app(pool);

    let response = app
        .oneshot(json_request(Method::GET, "/api/attendance/sessions", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
