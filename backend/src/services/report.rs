//! Reporting engine: per-subject reports, the admin dashboard and CSV export.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::error::AttendanceError;
use crate::models::attendance_session::{AttendanceSession, StatusTally};
use crate::models::report::{
    AdminDashboard, DashboardQuery, DashboardTotals, ExportQuery, ExportResponse, PeriodFilter,
    RecentSession, ReportQuery, SessionTally, SubjectBreakdown, SubjectReport, SubjectSummary,
    TimeWindow,
};
use crate::models::subject::Subject;
use crate::models::user::{User, UserRole};
use crate::repositories::{
    AttendanceSessionRepositoryTrait, SessionFilter, SubjectFilter, SubjectRepositoryTrait,
    UserRepositoryTrait,
};
use crate::services::authorization::{authorize, require_role};
use crate::types::{SubjectId, UserId};
use crate::utils::csv::append_csv_row;
use crate::utils::time::{date_window, local_midnight, now_in_timezone, period_window};

const STAFF: &[UserRole] = &[UserRole::Teacher, UserRole::Admin];
const RECENT_SESSIONS: i64 = 10;

/// `present / expected * 100`, rounded to two decimals. Zero when nothing
/// was expected.
pub fn attendance_percentage(present: i64, expected: i64) -> f64 {
    if expected <= 0 {
        return 0.0;
    }
    let ratio = present as f64 / expected as f64 * 100.0;
    (ratio * 100.0).round() / 100.0
}

/// Combines the period bucket and exact date into one window. `None` means
/// unfiltered.
pub fn resolve_window(
    filter: Option<PeriodFilter>,
    date: Option<NaiveDate>,
    now: DateTime<Tz>,
) -> Option<TimeWindow> {
    let tz = now.timezone();
    let period = filter.and_then(|filter| period_window(filter, now));
    let day = date.and_then(|date| date_window(&tz, date));
    match (period, day) {
        (Some(a), Some(b)) => Some(a.intersect(&b)),
        (a, b) => a.or(b),
    }
}

fn summarize(subject: &Subject) -> SubjectSummary {
    SubjectSummary {
        id: subject.id,
        code: subject.code.clone(),
        title: subject.title.clone(),
    }
}

fn session_tally(session: &AttendanceSession) -> SessionTally {
    SessionTally {
        session_id: session.id,
        start_time: session.start_time,
        end_time: session.end_time,
        status: session.status,
        tally: session.tally(),
    }
}

#[derive(Clone)]
pub struct ReportService {
    sessions: Arc<dyn AttendanceSessionRepositoryTrait>,
    subjects: Arc<dyn SubjectRepositoryTrait>,
    users: Arc<dyn UserRepositoryTrait>,
    time_zone: Tz,
}

impl ReportService {
    pub fn new(
        sessions: Arc<dyn AttendanceSessionRepositoryTrait>,
        subjects: Arc<dyn SubjectRepositoryTrait>,
        users: Arc<dyn UserRepositoryTrait>,
        time_zone: Tz,
    ) -> Self {
        Self {
            sessions,
            subjects,
            users,
            time_zone,
        }
    }

    pub async fn subject_report(
        &self,
        actor: &User,
        subject_id: SubjectId,
        query: ReportQuery,
    ) -> Result<SubjectReport, AttendanceError> {
        let subject = self.load_subject(subject_id).await?;
        authorize(actor, &subject, STAFF)?;

        let window = resolve_window(
            query.filter_by,
            query.date,
            now_in_timezone(&self.time_zone),
        );
        let sessions = self
            .sessions
            .list(SessionFilter {
                session_id: query.session_id,
                subject_id: Some(subject.id),
                status: query.status,
                window,
                ..Default::default()
            })
            .await?;

        let sessions: Vec<SessionTally> = sessions.iter().map(session_tally).collect();
        let mut totals = StatusTally::default();
        for session in &sessions {
            totals.merge(session.tally);
        }
        let roster_size = subject.roster_size() as i64;
        let total_sessions = sessions.len() as i64;

        Ok(SubjectReport {
            subject: summarize(&subject),
            window,
            roster_size,
            total_sessions,
            totals,
            attendance_percentage: attendance_percentage(
                totals.present,
                roster_size * total_sessions,
            ),
            sessions,
        })
    }

    pub async fn admin_dashboard(
        &self,
        actor: &User,
        query: DashboardQuery,
    ) -> Result<AdminDashboard, AttendanceError> {
        require_role(actor, &[UserRole::Admin])?;

        let window = resolve_window(query.filter_by, None, now_in_timezone(&self.time_zone));
        let subjects = self.subjects.list(SubjectFilter::default()).await?;
        let sessions = self
            .sessions
            .list(SessionFilter {
                window,
                ..Default::default()
            })
            .await?;

        let mut per_subject: HashMap<SubjectId, (i64, StatusTally)> = HashMap::new();
        for session in &sessions {
            let slot = per_subject.entry(session.subject_id).or_default();
            slot.0 += 1;
            slot.1.merge(session.tally());
        }

        let mut totals = DashboardTotals {
            total_subjects: subjects.len() as i64,
            total_enrollments: 0,
            total_sessions: 0,
            tally: StatusTally::default(),
            attendance_percentage: 0.0,
        };
        let mut expected = 0;
        let mut breakdown = Vec::with_capacity(subjects.len());
        for subject in &subjects {
            let roster_size = subject.roster_size() as i64;
            let (total_sessions, tally) = per_subject.remove(&subject.id).unwrap_or_default();
            totals.total_enrollments += roster_size;
            totals.total_sessions += total_sessions;
            totals.tally.merge(tally);
            expected += roster_size * total_sessions;
            breakdown.push(SubjectBreakdown {
                subject: summarize(subject),
                roster_size,
                total_sessions,
                tally,
                attendance_percentage: attendance_percentage(
                    tally.present,
                    roster_size * total_sessions,
                ),
            });
        }
        totals.attendance_percentage = attendance_percentage(totals.tally.present, expected);

        let titles: HashMap<SubjectId, &str> = subjects
            .iter()
            .map(|subject| (subject.id, subject.title.as_str()))
            .collect();
        let recent_sessions = self
            .sessions
            .list(SessionFilter {
                limit: Some(RECENT_SESSIONS),
                ..Default::default()
            })
            .await?
            .into_iter()
            .map(|session| RecentSession {
                session_id: session.id,
                subject_id: session.subject_id,
                subject_title: titles.get(&session.subject_id).map(|t| t.to_string()),
                start_time: session.start_time,
                end_time: session.end_time,
                status: session.status,
                created_at: session.created_at,
                roster_size: session.students.len() as i64,
                present: session.tally().present,
            })
            .collect();

        Ok(AdminDashboard {
            window,
            totals,
            subjects: breakdown,
            recent_sessions,
        })
    }

    /// CSV of archived records for one subject; `to` is inclusive.
    pub async fn export_subject_records(
        &self,
        actor: &User,
        subject_id: SubjectId,
        query: ExportQuery,
    ) -> Result<ExportResponse, AttendanceError> {
        let subject = self.load_subject(subject_id).await?;
        authorize(actor, &subject, STAFF)?;

        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from > to {
                return Err(AttendanceError::InvalidRange);
            }
        }
        let window = match (query.from, query.to) {
            (None, None) => None,
            (from, to) => {
                let lower = from
                    .and_then(|d| local_midnight(&self.time_zone, d))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC);
                let upper = to
                    .and_then(|d| d.succ_opt())
                    .and_then(|d| local_midnight(&self.time_zone, d))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                Some(TimeWindow {
                    from: lower,
                    to: upper,
                })
            }
        };

        let records = self
            .sessions
            .list_subject_records(subject.id, window)
            .await?;
        let student_ids: Vec<UserId> = records
            .iter()
            .map(|record| record.student_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let students: HashMap<UserId, User> = self
            .users
            .find_many(&student_ids)
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();

        let tz = self.time_zone;
        let format_time = move |at: DateTime<Utc>| {
            at.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S").to_string()
        };

        let mut csv = String::new();
        append_csv_row(
            &mut csv,
            &[
                "Student Name".to_string(),
                "Student Email".to_string(),
                "Session ID".to_string(),
                "Start Time".to_string(),
                "End Time".to_string(),
                "Status".to_string(),
                "Scanned At".to_string(),
            ],
        );
        for record in &records {
            let (name, email) = students
                .get(&record.student_id)
                .map(|user| (user.name.clone(), user.email.clone()))
                .unwrap_or_default();
            append_csv_row(
                &mut csv,
                &[
                    name,
                    email,
                    record.session_id.to_string(),
                    format_time(record.start_time),
                    format_time(record.end_time),
                    record.status.db_value().to_string(),
                    record.scanned_at.map(format_time).unwrap_or_default(),
                ],
            );
        }

        tracing::info!(subject_id = %subject.id, rows = records.len(), "attendance export generated");
        Ok(ExportResponse {
            csv_data: csv,
            filename: format!(
                "attendance_{}_{}.csv",
                subject.code,
                now_in_timezone(&self.time_zone).format("%Y%m%d_%H%M%S")
            ),
        })
    }

    async fn load_subject(&self, id: SubjectId) -> Result<Subject, AttendanceError> {
        self.subjects
            .find_by_id(id)
            .await?
            .ok_or(AttendanceError::SubjectNotFound)
    }
}
