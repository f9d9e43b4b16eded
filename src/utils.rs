//! Small helpers shared by the pipeline stages.
//!
//! - Reading the clock in the reference timezone
//! - Date stamps for artifact names
//! - String truncation for log previews

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Current wall-clock time in `tz`.
pub fn now_in(tz: Tz) -> DateTime<Tz> {
    let now = Utc::now().with_timezone(&tz);
    tracing::debug!(%now, "Read reference clock");
    now
}

/// `YYYYMMDD` stamp used in dated artifact names.
pub fn date_stamp(now: &DateTime<Tz>) -> String {
    now.format("%Y%m%d").to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes on a character boundary and get
/// a `"…(+N bytes)"` suffix.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}
