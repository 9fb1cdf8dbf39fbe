// Time windows for the scheduled jobs
//
// Every job samples "now" exactly once and derives all of its bounds from
// that sample. Windows are closed-open: `start <= t < end`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Half-open `[start, end)` interval of absolute instants.
///
/// Serialized as `{ "startTime": ..., "endTime": ... }` in job responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TimeWindow {
    #[serde(rename = "startTime")]
    pub start: DateTime<Utc>,
    #[serde(rename = "endTime")]
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The previous full wall-clock hour, matched against `end_time`.
    pub fn recreation(now: DateTime<Utc>) -> Self {
        let hour_start = truncate_to_hour(now);
        Self::new(hour_start - Duration::hours(1), hour_start)
    }

    /// Events that ended roughly an hour ago, matched against `end_time`.
    ///
    /// 60 minute target delay plus a 5 minute buffer behind, 5 minutes ahead.
    pub fn followup(now: DateTime<Utc>) -> Self {
        Self::new(now - Duration::minutes(65), now + Duration::minutes(5))
    }

    /// Events starting in about a day, matched against `start_time`.
    pub fn reminder(now: DateTime<Utc>) -> Self {
        Self::new(now + Duration::hours(23), now + Duration::hours(25))
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn width(&self) -> Duration {
        self.end - self.start
    }
}

/// Bounds used to pick unread messages worth an email digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestWindow {
    /// Oldest message timestamp still considered
    pub lookback_from: DateTime<Utc>,
    /// Messages newer than this may still be read in-app, so they wait
    pub settled_before: DateTime<Utc>,
    /// A recipient notified after this instant is skipped
    pub dedup_since: DateTime<Utc>,
}

/// Unread messages younger than this are left for the recipient to see in-app
pub const DIGEST_SETTLE_DELAY: Duration = Duration::minutes(20);
pub const DIGEST_LOOKBACK: Duration = Duration::days(7);
pub const DIGEST_DEDUP_PERIOD: Duration = Duration::hours(24);

impl DigestWindow {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            lookback_from: now - DIGEST_LOOKBACK,
            settled_before: now - DIGEST_SETTLE_DELAY,
            dedup_since: now - DIGEST_DEDUP_PERIOD,
        }
    }

    /// Whether a message sent at `timestamp` is old enough and recent enough
    pub fn covers(&self, timestamp: DateTime<Utc>) -> bool {
        self.lookback_from <= timestamp && timestamp <= self.settled_before
    }
}

fn truncate_to_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    let into_hour = Duration::seconds(now.timestamp().rem_euclid(3600))
        + Duration::nanoseconds(i64::from(now.timestamp_subsec_nanos()));
    now - into_hour
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_recreation_window_is_previous_hour() {
        let window = TimeWindow::recreation(at("2024-12-14T15:03:27.512Z"));
        assert_eq!(window.start, at("2024-12-14T14:00:00Z"));
        assert_eq!(window.end, at("2024-12-14T15:00:00Z"));
        assert_eq!(window.width(), Duration::hours(1));
    }

    #[test]
    fn test_recreation_window_on_exact_hour() {
        let window = TimeWindow::recreation(at("2024-12-14T15:00:00Z"));
        assert_eq!(window.start, at("2024-12-14T14:00:00Z"));
        assert_eq!(window.end, at("2024-12-14T15:00:00Z"));
    }

    #[test]
    fn test_recreation_window_across_midnight() {
        let window = TimeWindow::recreation(at("2025-01-01T00:10:00Z"));
        assert_eq!(window.start, at("2024-12-31T23:00:00Z"));
        assert_eq!(window.end, at("2025-01-01T00:00:00Z"));
    }

    #[test]
    fn test_followup_window() {
        let now = at("2024-12-14T15:00:00Z");
        let window = TimeWindow::followup(now);
        assert_eq!(window.start, at("2024-12-14T13:55:00Z"));
        assert_eq!(window.end, at("2024-12-14T15:05:00Z"));
    }

    #[test]
    fn test_reminder_window() {
        let now = at("2024-12-14T15:00:00Z");
        let window = TimeWindow::reminder(now);
        assert_eq!(window.start, at("2024-12-15T14:00:00Z"));
        assert_eq!(window.end, at("2024-12-15T16:00:00Z"));
    }

    #[test]
    fn test_window_is_half_open() {
        let window = TimeWindow::recreation(at("2024-12-14T15:03:00Z"));
        assert!(window.contains(at("2024-12-14T14:00:00Z")));
        assert!(window.contains(at("2024-12-14T14:59:59.999Z")));
        assert!(!window.contains(at("2024-12-14T15:00:00Z")));
        assert!(!window.contains(at("2024-12-14T13:59:59Z")));
    }

    #[test]
    fn test_time_range_serialization() {
        let window = TimeWindow::recreation(at("2024-12-14T15:03:00Z"));
        let json = serde_json::to_value(window).unwrap();
        assert_eq!(json["startTime"], "2024-12-14T14:00:00Z");
        assert_eq!(json["endTime"], "2024-12-14T15:00:00Z");
    }

    #[test]
    fn test_digest_window() {
        let now = at("2024-12-14T15:00:00Z");
        let window = DigestWindow::at(now);
        assert!(window.covers(at("2024-12-14T14:40:00Z")));
        assert!(!window.covers(at("2024-12-14T14:50:00Z")));
        assert!(!window.covers(at("2024-12-07T14:00:00Z")));
        assert_eq!(window.dedup_since, at("2024-12-13T15:00:00Z"));
    }
}
