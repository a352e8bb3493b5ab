#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use crate::models::{
    attendance_session::{
        AttendanceRecord, AttendanceSession, CompleteSessionResponse, CreateSessionRequest,
        CreateSessionResponse, ScanRequest, SessionListQuery, SessionStatus, StatusTally,
        StudentEntry, StudentStatus, UpdateStatusRequest,
    },
    report::{
        AdminDashboard, DashboardQuery, DashboardTotals, ExportQuery, ExportResponse,
        PeriodFilter, RecentSession, ReportQuery, SessionTally, SubjectBreakdown, SubjectReport,
        SubjectSummary, TimeWindow,
    },
    subject::{
        CreateSubjectRequest, JoinSubjectRequest, JoinSubjectResponse, Subject,
        SubjectListQuery, UpdateSubjectRequest,
    },
    user::{
        SignInRequest, SignInResponse, SignUpRequest, UpdateUserRequest, UserResponse, UserRole,
    },
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        sign_up_doc,
        sign_in_doc,
        me_doc,
        sign_out_doc,
        health_doc,
        list_users_doc,
        list_teachers_doc,
        get_user_doc,
        update_user_doc,
        list_subjects_doc,
        create_subject_doc,
        get_subject_doc,
        update_subject_doc,
        delete_subject_doc,
        join_subject_doc,
        create_session_doc,
        scan_doc,
        update_status_doc,
        complete_session_doc,
        cancel_session_doc,
        list_sessions_doc,
        get_session_doc,
        session_records_doc,
        subject_report_doc,
        export_subject_doc,
        admin_dashboard_doc
    ),
    components(
        schemas(
            // auth & users
            SignUpRequest,
            SignInRequest,
            SignInResponse,
            UserResponse,
            UserRole,
            UpdateUserRequest,
            // subjects
            Subject,
            CreateSubjectRequest,
            UpdateSubjectRequest,
            JoinSubjectRequest,
            JoinSubjectResponse,
            SubjectListQuery,
            // sessions
            AttendanceSession,
            StudentEntry,
            SessionStatus,
            StudentStatus,
            AttendanceRecord,
            CreateSessionRequest,
            CreateSessionResponse,
            ScanRequest,
            UpdateStatusRequest,
            CompleteSessionResponse,
            SessionListQuery,
            // reports
            PeriodFilter,
            TimeWindow,
            StatusTally,
            SessionTally,
            SubjectSummary,
            SubjectReport,
            SubjectBreakdown,
            DashboardTotals,
            RecentSession,
            AdminDashboard,
            ReportQuery,
            DashboardQuery,
            ExportQuery,
            ExportResponse
        )
    ),
    modifiers(&SecuritySchemes),
    tags(
        (name = "Auth", description = "Registration and sign-in"),
        (name = "Users", description = "User directory"),
        (name = "Health", description = "Liveness and database reachability"),
        (name = "Subjects", description = "Subjects and enrollment"),
        (name = "Attendance", description = "Attendance sessions and QR scans"),
        (name = "Reports", description = "Subject reports and the admin dashboard")
    ),
    security(("BearerAuth" = []))
)]
pub struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();

        let mut bearer = Http::new(HttpAuthScheme::Bearer);
        bearer.bearer_format = Some("JWT".to_string());

        components.add_security_scheme("BearerAuth", SecurityScheme::Http(bearer));
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth",
    security(())
)]
fn sign_up_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, body = SignInResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth",
    security(())
)]
fn sign_in_doc() {}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses((status = 200, body = UserResponse)),
    tag = "Auth"
)]
fn me_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/sign-out",
    responses((status = 200, description = "Signed out; the client discards its token")),
    tag = "Auth"
)]
fn sign_out_doc() {}

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service and database are reachable"),
        (status = 503, description = "Database unreachable")
    ),
    tag = "Health",
    security(())
)]
fn health_doc() {}

#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, body = [UserResponse]),
        (status = 403, description = "Admin only")
    ),
    tag = "Users"
)]
fn list_users_doc() {}

#[utoipa::path(
    get,
    path = "/api/users/teachers",
    responses((status = 200, body = [UserResponse])),
    tag = "Users"
)]
fn list_teachers_doc() {}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(("user_id" = String, Path)),
    responses(
        (status = 200, body = UserResponse),
        (status = 403, description = "Not the caller and caller is not an admin"),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
fn get_user_doc() {}

#[utoipa::path(
    put,
    path = "/api/users/{user_id}",
    params(("user_id" = String, Path)),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, body = UserResponse),
        (status = 403, description = "Editing someone else, or changing a role without admin rights"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Users"
)]
fn update_user_doc() {}

#[utoipa::path(
    get,
    path = "/api/subjects",
    params(SubjectListQuery),
    responses((status = 200, body = [Subject])),
    tag = "Subjects"
)]
fn list_subjects_doc() {}

#[utoipa::path(
    post,
    path = "/api/subjects",
    request_body = CreateSubjectRequest,
    responses((status = 201, body = Subject)),
    tag = "Subjects"
)]
fn create_subject_doc() {}

#[utoipa::path(
    get,
    path = "/api/subjects/{subject_id}",
    params(("subject_id" = String, Path)),
    responses(
        (status = 200, body = Subject),
        (status = 404, description = "Subject not found")
    ),
    tag = "Subjects"
)]
fn get_subject_doc() {}

#[utoipa::path(
    put,
    path = "/api/subjects/{subject_id}",
    params(("subject_id" = String, Path)),
    request_body = UpdateSubjectRequest,
    responses(
        (status = 200, body = Subject),
        (status = 403, description = "Admin only")
    ),
    tag = "Subjects"
)]
fn update_subject_doc() {}

#[utoipa::path(
    delete,
    path = "/api/subjects/{subject_id}",
    params(("subject_id" = String, Path)),
    responses(
        (status = 204, description = "Subject removed"),
        (status = 403, description = "Admin only")
    ),
    tag = "Subjects"
)]
fn delete_subject_doc() {}

#[utoipa::path(
    post,
    path = "/api/subjects/{subject_id}/join",
    params(("subject_id" = String, Path)),
    request_body = JoinSubjectRequest,
    responses((status = 200, body = JoinSubjectResponse)),
    tag = "Subjects"
)]
fn join_subject_doc() {}

#[utoipa::path(
    post,
    path = "/api/attendance/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, body = CreateSessionResponse),
        (status = 403, description = "Caller is not the assigned teacher or an admin"),
        (status = 404, description = "Subject not found")
    ),
    tag = "Attendance"
)]
fn create_session_doc() {}

#[utoipa::path(
    post,
    path = "/api/attendance/scan",
    request_body = ScanRequest,
    responses(
        (status = 200, body = StudentEntry),
        (status = 401, description = "INVALID_TOKEN: signature, audience or expiry check failed"),
        (status = 404, description = "Session not found or student not on the roster"),
        (status = 409, description = "Session is no longer active"),
        (status = 429, description = "Rate limited")
    ),
    tag = "Attendance",
    security(())
)]
fn scan_doc() {}

#[utoipa::path(
    put,
    path = "/api/attendance/update-status",
    request_body = UpdateStatusRequest,
    responses((status = 200, body = StudentEntry)),
    tag = "Attendance"
)]
fn update_status_doc() {}

#[utoipa::path(
    put,
    path = "/api/attendance/sessions/{session_id}/complete",
    params(("session_id" = String, Path)),
    responses(
        (status = 200, body = CompleteSessionResponse),
        (status = 409, description = "Session already completed or cancelled")
    ),
    tag = "Attendance"
)]
fn complete_session_doc() {}

#[utoipa::path(
    put,
    path = "/api/attendance/sessions/{session_id}/cancel",
    params(("session_id" = String, Path)),
    responses((status = 200, body = AttendanceSession)),
    tag = "Attendance"
)]
fn cancel_session_doc() {}

#[utoipa::path(
    get,
    path = "/api/attendance/sessions",
    params(SessionListQuery),
    responses((status = 200, body = [AttendanceSession])),
    tag = "Attendance"
)]
fn list_sessions_doc() {}

#[utoipa::path(
    get,
    path = "/api/attendance/sessions/{session_id}",
    params(("session_id" = String, Path)),
    responses((status = 200, body = AttendanceSession)),
    tag = "Attendance"
)]
fn get_session_doc() {}

#[utoipa::path(
    get,
    path = "/api/attendance/sessions/{session_id}/records",
    params(("session_id" = String, Path)),
    responses((status = 200, body = [AttendanceRecord])),
    tag = "Attendance"
)]
fn session_records_doc() {}

#[utoipa::path(
    get,
    path = "/api/attendance/reports/{subject_id}",
    params(("subject_id" = String, Path), ReportQuery),
    responses((status = 200, body = SubjectReport)),
    tag = "Reports"
)]
fn subject_report_doc() {}

#[utoipa::path(
    get,
    path = "/api/attendance/reports/{subject_id}/export",
    params(("subject_id" = String, Path), ExportQuery),
    responses((status = 200, body = ExportResponse)),
    tag = "Reports"
)]
fn export_subject_doc() {}

#[utoipa::path(
    get,
    path = "/api/attendance/admin/dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, body = AdminDashboard),
        (status = 403, description = "Admin only")
    ),
    tag = "Reports"
)]
fn admin_dashboard_doc() {}
