use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime};

/// Format used inside file names: `20261016_134502`.
pub const FILE_STAMP: &str = "%Y%m%d_%H%M%S";
/// Format used inside documents.
pub const HUMAN_STAMP: &str = "%Y-%m-%d %H:%M:%S";

pub fn file_stamp(at: &DateTime<Local>) -> String {
    at.format(FILE_STAMP).to_string()
}

pub fn human_stamp(at: &DateTime<Local>) -> String {
    at.format(HUMAN_STAMP).to_string()
}

pub fn parse_file_stamp(stamp: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(stamp, FILE_STAMP).ok()
}

/// `mm:ss`, or `h:mm:ss` past the hour.
pub fn clock(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

/// `duration` multiplied by `scale`. Non-positive scales and products too
/// large to represent leave `duration` unchanged.
pub fn scale_duration(duration: Duration, scale: f64) -> Duration {
    if !scale.is_finite() || scale <= 0.0 {
        return duration;
    }
    Duration::try_from_secs_f64(duration.as_secs_f64() * scale).unwrap_or(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_formats_minutes_and_hours() {
        assert_eq!(clock(Duration::from_secs(5)), "00:05");
        assert_eq!(clock(Duration::from_secs(305)), "05:05");
        assert_eq!(clock(Duration::from_secs(3725)), "1:02:05");
    }

    #[test]
    fn scaling_never_overflows() {
        let budget = Duration::from_secs(600);
        assert_eq!(scale_duration(budget, 0.5), Duration::from_secs(300));
        assert_eq!(scale_duration(budget, 1e20), budget);
        assert_eq!(scale_duration(budget, f64::INFINITY), budget);
        assert_eq!(scale_duration(budget, -2.0), budget);
    }

    #[test]
    fn file_stamp_parses_back() {
        let parsed = parse_file_stamp("20261016_134502").unwrap();
        assert_eq!(parsed.format(HUMAN_STAMP).to_string(), "2026-10-16 13:45:02");
        assert!(parse_file_stamp("2026-10-16").is_none());
    }
}
