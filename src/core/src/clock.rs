//! Wall-clock helpers
//!
//! The protocol timestamps everything with epoch seconds as `f64`, the
//! format peers exchange on the wire and persist to disk.

/// Current wall-clock time as fractional epoch seconds.
pub fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
