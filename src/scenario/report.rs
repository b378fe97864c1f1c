//! Timestamp helpers shared by the report assembly step (§4.7, §6).

use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

/// Current time formatted as ISO-8601 (RFC 3339).
pub fn now_iso8601() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Current time plus 24 hours, formatted the same way — the Day-2
/// report's `next_test_schedule` field.
pub fn next_test_schedule() -> String {
    (OffsetDateTime::now_utc() + Duration::hours(24))
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
