//! User-filed reports.

use super::envelope::owned_entity;

owned_entity! {
    Report / ReportCreationInput in "reports" as "report" {
        report_type: String,
        concern: String,
    }
}
