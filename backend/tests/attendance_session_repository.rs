use std::sync::Arc;

use attendance_backend::{
    models::{
        attendance_session::{AttendanceSession, SessionStatus, StudentStatus},
        user::UserRole,
    },
    repositories::{
        AttendanceSessionRepository, AttendanceSessionRepositoryTrait, EntryUpdate, SessionFilter,
    },
};
use chrono::{Duration, Utc};

mod support;

use support::{seed_subject, seed_user, test_pool};

async fn integration_guard() -> tokio::sync::MutexGuard<'static, ()> {
    static GUARD: std::sync::OnceLock<tokio::sync::Mutex<()>> = std::sync::OnceLock::new();
    GUARD
        .get_or_init(|| tokio::sync::Mutex::new(()))
        .lock()
        .await
}

#[tokio::test]
async fn concurrent_completion_archives_once() {
    let _guard = integration_guard().await;
    let pool = test_pool().await;
    let teacher = seed_user(&pool, UserRole::Teacher).await;
    let s1 = seed_user(&pool, UserRole::Student).await;
    let s2 = seed_user(&pool, UserRole::Student).await;
    let subject = seed_subject(&pool, Some(teacher.id), &[s1.id, s2.id]).await;
    let repo = Arc::new(AttendanceSessionRepository::new(pool.clone()));

    let now = Utc::now();
    let session = AttendanceSession::new(
        subject.id,
        now,
        now + Duration::hours(1),
        teacher.id,
        &subject.students,
        now,
    );
    repo.create(&session).await.expect("create session");

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let repo = repo.clone();
            let id = session.id;
            tokio::spawn(async move { repo.complete(id, Utc::now()).await })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        if let Some((completed, archived)) = handle.await.unwrap().expect("complete") {
            winners += 1;
            assert_eq!(completed.status, SessionStatus::Completed);
            assert_eq!(archived, 2);
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(repo.list_records(session.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn entry_updates_stop_once_session_is_closed() {
    let _guard = integration_guard().await;
    let pool = test_pool().await;
    let teacher = seed_user(&pool, UserRole::Teacher).await;
    let student = seed_user(&pool, UserRole::Student).await;
    let subject = seed_subject(&pool, Some(teacher.id), &[student.id]).await;
    let repo = AttendanceSessionRepository::new(pool.clone());

    let now = Utc::now();
    let session = AttendanceSession::new(
        subject.id,
        now,
        now + Duration::hours(1),
        teacher.id,
        &subject.students,
        now,
    );
    repo.create(&session).await.unwrap();

    let update = EntryUpdate {
        session_id: session.id,
        student_id: student.id,
        status: StudentStatus::Present,
        updated_by: student.id,
        reason: None,
        at: Utc::now(),
    };
    let first = repo.update_entry(update.clone()).await.unwrap().expect("entry");
    assert_eq!(first.status, StudentStatus::Present);
    let first_scan = first.scanned_at.expect("scan time");

    let again = repo
        .update_entry(EntryUpdate {
            at: Utc::now() + Duration::seconds(30),
            ..update.clone()
        })
        .await
        .unwrap()
        .expect("entry");
    assert_eq!(again.scanned_at, Some(first_scan));

    repo.cancel(session.id, Utc::now())
        .await
        .unwrap()
        .expect("cancelled");
    assert!(repo.update_entry(update).await.unwrap().is_none());
    assert!(repo.complete(session.id, Utc::now()).await.unwrap().is_none());

    let listed = repo
        .list(SessionFilter {
            session_id: Some(session.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, SessionStatus::Cancelled);
    assert_eq!(listed[0].students.len(), 1);
}
