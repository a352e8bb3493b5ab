//! Attendance sessions, their embedded per-student entries and the archived
//! records produced when a session completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::types::{AttendanceRecordId, SessionId, SubjectId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn db_value(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    Present,
    Absent,
    Leave,
}

impl StudentStatus {
    pub fn db_value(&self) -> &'static str {
        match self {
            StudentStatus::Present => "present",
            StudentStatus::Absent => "absent",
            StudentStatus::Leave => "leave",
        }
    }
}

impl Default for StudentStatus {
    fn default() -> Self {
        StudentStatus::Absent
    }
}

/// One roster member's state inside a session. Entries are created with the
/// session and only ever mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StudentEntry {
    pub session_id: SessionId,
    pub student_id: UserId,
    pub status: StudentStatus,
    /// Set by the first scan or present-override; never cleared.
    pub scanned_at: Option<DateTime<Utc>>,
    pub updated_by: UserId,
    pub updated_at: DateTime<Utc>,
    pub reason: Option<String>,
    #[serde(skip)]
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttendanceSession {
    pub id: SessionId,
    pub subject_id: SubjectId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_by: UserId,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub students: Vec<StudentEntry>,
}

impl AttendanceSession {
    /// Builds an active session with one `absent` entry per roster member.
    pub fn new(
        subject_id: SubjectId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        created_by: UserId,
        roster: &[UserId],
        now: DateTime<Utc>,
    ) -> Self {
        let id = SessionId::new();
        let students = roster
            .iter()
            .enumerate()
            .map(|(position, student_id)| StudentEntry {
                session_id: id,
                student_id: *student_id,
                status: StudentStatus::Absent,
                scanned_at: None,
                updated_by: created_by,
                updated_at: now,
                reason: None,
                position: position as i32,
            })
            .collect();

        Self {
            id,
            subject_id,
            start_time,
            end_time,
            created_by,
            status: SessionStatus::Active,
            created_at: now,
            updated_at: now,
            students,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn entry(&self, student_id: &UserId) -> Option<&StudentEntry> {
        self.students
            .iter()
            .find(|entry| &entry.student_id == student_id)
    }

    pub fn tally(&self) -> StatusTally {
        let mut tally = StatusTally::default();
        for entry in &self.students {
            tally.record(entry.status);
        }
        tally
    }
}

/// Count of entries per student status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusTally {
    pub present: i64,
    pub absent: i64,
    pub leave: i64,
}

impl StatusTally {
    pub fn record(&mut self, status: StudentStatus) {
        match status {
            StudentStatus::Present => self.present += 1,
            StudentStatus::Absent => self.absent += 1,
            StudentStatus::Leave => self.leave += 1,
        }
    }

    pub fn merge(&mut self, other: StatusTally) {
        self.present += other.present;
        self.absent += other.absent;
        self.leave += other.leave;
    }
}

/// Immutable archive row written once per (completed session, student).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: AttendanceRecordId,
    pub session_id: SessionId,
    pub subject_id: SubjectId,
    pub student_id: UserId,
    pub status: StudentStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub scanned_at: Option<DateTime<Utc>>,
    pub updated_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn from_entry(session: &AttendanceSession, entry: &StudentEntry, now: DateTime<Utc>) -> Self {
        Self {
            id: AttendanceRecordId::new(),
            session_id: session.id,
            subject_id: session.subject_id,
            student_id: entry.student_id,
            status: entry.status,
            start_time: session.start_time,
            end_time: session.end_time,
            scanned_at: entry.scanned_at,
            updated_by: entry.updated_by,
            created_at: now,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    pub subject_id: SubjectId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateSessionResponse {
    pub session: AttendanceSession,
    pub qr_token: String,
    pub token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ScanRequest {
    #[validate(length(min = 1))]
    pub qr_token: String,
    pub student_id: UserId,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusRequest {
    pub session_id: SessionId,
    pub student_id: UserId,
    pub status: StudentStatus,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CompleteSessionResponse {
    pub session: AttendanceSession,
    pub records_created: u64,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct SessionListQuery {
    pub subject_id: Option<SubjectId>,
    pub status: Option<SessionStatus>,
    pub created_by: Option<UserId>,
}
