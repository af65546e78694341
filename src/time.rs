//! UTC timestamp formatting for SendingTime (52) / TransactTime (60).

use chrono::{DateTime, Utc};

/// Formats `ts` as `YYYYMMDD-HH:MM:SS.ffffff`, the FIX 4.4 `UTCTimestamp`
/// format this venue uses at microsecond precision.
pub fn format_sending_time(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%d-%H:%M:%S%.6f").to_string()
}

/// Convenience for stamping outbound messages with the current instant.
pub fn now_sending_time() -> String {
    format_sending_time(Utc::now())
}
