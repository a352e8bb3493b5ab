use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};

use crate::{
    error::AppError,
    models::{
        report::{
            AdminDashboard, DashboardQuery, ExportQuery, ExportResponse, ReportQuery,
            SubjectReport,
        },
        user::User,
    },
    state::AppState,
    types::SubjectId,
};

pub async fn subject_report(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(subject_id): Path<SubjectId>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<SubjectReport>, AppError> {
    let report = state
        .reports
        .subject_report(&user, subject_id, query)
        .await?;
    Ok(Json(report))
}

pub async fn export_subject_records(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(subject_id): Path<SubjectId>,
    Query(query): Query<ExportQuery>,
) -> Result<Json<ExportResponse>, AppError> {
    let export = state
        .reports
        .export_subject_records(&user, subject_id, query)
        .await?;
    Ok(Json(export))
}

pub async fn admin_dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<AdminDashboard>, AppError> {
    let dashboard = state.reports.admin_dashboard(&user, query).await?;
    Ok(Json(dashboard))
}
