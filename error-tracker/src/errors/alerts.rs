//! New-Group Alert Composition
//!
//! Only the `created` ingest branch alerts; increments and reopens stay
//! quiet. Delivery goes through the `Notifier` sink and never affects the
//! triggering request.

use crate::db::NewReport;

/// Compose the alert subject and body for a newly created group.
pub fn alert_for_new_group(base_url: &str, group_id: i64, report: &NewReport) -> (String, String) {
    let subject = format!(
        "[Monlight] New error in {}: {}",
        report.project, report.exception_type
    );
    let body = format!(
        "A new error group was created.\n\
         \n\
         Project:     {}\n\
         Environment: {}\n\
         Type:        {}\n\
         Message:     {}\n\
         \n\
         View it at {}/errors/{}\n",
        report.project,
        report.environment,
        report.exception_type,
        report.message,
        base_url.trim_end_matches('/'),
        group_id,
    );
    (subject, body)
}
