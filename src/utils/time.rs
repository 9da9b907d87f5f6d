use chrono::Utc;

/// Current wall-clock time in whole unix seconds.
pub fn unix_timestamp() -> i64 {
    Utc::now().timestamp()
}
