//! Aggregated attendance statistics returned by the reporting endpoints.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::attendance_session::{SessionStatus, StatusTally};
use crate::types::{SessionId, SubjectId};

/// Coarse time bucket relative to the current moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PeriodFilter {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Half-open `[from, to)` window applied to session start times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.from && instant < self.to
    }

    /// Intersection of two windows; an empty intersection collapses to `from == to`.
    pub fn intersect(&self, other: &TimeWindow) -> TimeWindow {
        let from = self.from.max(other.from);
        let to = self.to.min(other.to).max(from);
        TimeWindow { from, to }
    }
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    pub status: Option<SessionStatus>,
    #[serde(rename = "filterBy")]
    pub filter_by: Option<PeriodFilter>,
    pub session_id: Option<SessionId>,
    /// Exact calendar date (`YYYY-MM-DD`) in the server time zone.
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct DashboardQuery {
    #[serde(rename = "filterBy")]
    pub filter_by: Option<PeriodFilter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionTally {
    pub session_id: SessionId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SessionStatus,
    #[serde(flatten)]
    pub tally: StatusTally,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubjectSummary {
    pub id: SubjectId,
    pub code: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubjectReport {
    pub subject: SubjectSummary,
    pub window: Option<TimeWindow>,
    pub roster_size: i64,
    pub total_sessions: i64,
    pub totals: StatusTally,
    pub attendance_percentage: f64,
    pub sessions: Vec<SessionTally>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubjectBreakdown {
    pub subject: SubjectSummary,
    pub roster_size: i64,
    pub total_sessions: i64,
    #[serde(flatten)]
    pub tally: StatusTally,
    pub attendance_percentage: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DashboardTotals {
    pub total_subjects: i64,
    pub total_enrollments: i64,
    pub total_sessions: i64,
    #[serde(flatten)]
    pub tally: StatusTally,
    pub attendance_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecentSession {
    pub session_id: SessionId,
    pub subject_id: SubjectId,
    pub subject_title: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub roster_size: i64,
    pub present: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminDashboard {
    pub window: Option<TimeWindow>,
    pub totals: DashboardTotals,
    pub subjects: Vec<SubjectBreakdown>,
    pub recent_sessions: Vec<RecentSession>,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExportResponse {
    pub csv_data: String,
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn window_is_half_open() {
        let window = TimeWindow { from: at(9), to: at(10) };
        assert!(window.contains(at(9)));
        assert!(!window.contains(at(10)));
    }

    #[test]
    fn disjoint_windows_intersect_to_empty() {
        let a = TimeWindow { from: at(1), to: at(2) };
        let b = TimeWindow { from: at(5), to: at(6) };
        let both = a.intersect(&b);
        assert_eq!(both.from, both.to);
        assert!(!both.contains(at(5)));
    }

    #[test]
    fn period_filter_deserializes_lowercase() {
        let query: ReportQuery =
            serde_json::from_value(serde_json::json!({ "filterBy": "weekly" })).unwrap();
        assert_eq!(query.filter_by, Some(PeriodFilter::Weekly));
    }
}
