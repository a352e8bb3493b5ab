pub mod attendance;
pub mod authorization;
pub mod report;

pub use attendance::AttendanceService;
pub use report::ReportService;
