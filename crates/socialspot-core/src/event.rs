// Event domain types and the weekly recurrence rule

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Fixed period between two occurrences of a repeating series
pub const RECURRENCE_PERIOD: Duration = Duration::days(7);

/// Upper bound (exclusive) of the random event identifier space
pub const EVENT_ID_SPACE: i64 = 1_000_000_000;

/// One dated occurrence of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Event {
    pub event_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    /// Free-form age tag, e.g. "18-30"
    pub age: Option<String>,
    /// Base ticket price in cents; 0 for free events
    pub cost: i64,
    pub max_participants: Option<i32>,
    pub timezone: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub repeating_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_time < now
    }

    pub fn is_paid(&self) -> bool {
        self.cost > 0
    }
}

/// Compute the next occurrence of `source`.
///
/// The end is advanced by exactly one period and the start is derived from
/// it, so the duration is preserved. Everything except the identifier and the
/// two timestamps is copied; the caller assigns the identifier.
pub fn next_occurrence(source: &Event, new_event_id: i64, now: DateTime<Utc>) -> Result<Event> {
    let duration = source.duration();
    if duration <= Duration::zero() {
        return Err(CoreError::InvalidTimeSequence);
    }

    let end_time = source.end_time + RECURRENCE_PERIOD;
    let start_time = end_time - duration;

    Ok(Event {
        event_id: new_event_id,
        start_time,
        end_time,
        created_at: now,
        updated_at: now,
        ..source.clone()
    })
}

/// How the recreation job decides an occurrence already has a successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeriesMatch {
    /// A later occurrence in the same series with the identical name.
    /// Renaming one occurrence makes the job treat it as a different series.
    #[default]
    NameAndSeries,
    /// Any later occurrence in the same series, regardless of name.
    SeriesOnly,
}

impl SeriesMatch {
    /// Whether `other` counts as a newer occurrence of `candidate`'s series
    pub fn is_successor(&self, candidate: &Event, other: &Event) -> bool {
        if other.event_id == candidate.event_id {
            return false;
        }
        let same_series = match (&candidate.repeating_event_id, &other.repeating_event_id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        if !same_series || other.end_time <= candidate.end_time {
            return false;
        }
        match self {
            SeriesMatch::NameAndSeries => other.name == candidate.name,
            SeriesMatch::SeriesOnly => true,
        }
    }
}

impl fmt::Display for SeriesMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesMatch::NameAndSeries => write!(f, "name_and_series"),
            SeriesMatch::SeriesOnly => write!(f, "series_only"),
        }
    }
}

impl FromStr for SeriesMatch {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "name_and_series" | "name" => Ok(SeriesMatch::NameAndSeries),
            "series_only" | "series" => Ok(SeriesMatch::SeriesOnly),
            other => Err(CoreError::config(format!("unknown series match mode: {other}"))),
        }
    }
}

/// Where the series link should send a visitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesRedirect {
    /// Next upcoming occurrence: straight into sign-up
    Upcoming(i64),
    /// Nothing upcoming: show the most recent past occurrence
    Past(i64),
}

impl SeriesRedirect {
    pub fn location(&self) -> String {
        match self {
            SeriesRedirect::Upcoming(id) => format!("/createprofile?event={id}"),
            SeriesRedirect::Past(id) => format!("/events/{id}"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    pub fn sample_event(id: i64, start: &str, end: &str) -> Event {
        Event {
            event_id: id,
            name: "Board Games Night".to_string(),
            description: Some("Bring a friend".to_string()),
            location: Some("Brisbane".to_string()),
            image_url: Some("https://media.example.com/board.jpg".to_string()),
            age: Some("18-35".to_string()),
            cost: 1500,
            max_participants: Some(20),
            timezone: Some("Australia/Brisbane".to_string()),
            start_time: at(start),
            end_time: at(end),
            repeating_event_id: Some("series-r".to_string()),
            created_at: at("2024-12-01T00:00:00Z"),
            updated_at: at("2024-12-01T00:00:00Z"),
        }
    }

    #[test]
    fn test_next_occurrence_advances_one_week() {
        let source = sample_event(1, "2024-12-14T07:00:00Z", "2024-12-14T14:00:00Z");
        let now = at("2024-12-14T15:03:00Z");

        let next = next_occurrence(&source, 42, now).unwrap();

        assert_eq!(next.event_id, 42);
        assert_eq!(next.start_time, at("2024-12-21T07:00:00Z"));
        assert_eq!(next.end_time, at("2024-12-21T14:00:00Z"));
        assert_eq!(next.duration(), source.duration());
        assert_eq!(next.repeating_event_id, source.repeating_event_id);
        assert_eq!(next.name, source.name);
        assert_eq!(next.cost, source.cost);
        assert_eq!(next.created_at, now);
        assert_eq!(next.updated_at, now);
    }

    #[test]
    fn test_next_occurrence_rejects_inverted_times() {
        let source = sample_event(1, "2024-12-14T14:00:00Z", "2024-12-14T07:00:00Z");
        let err = next_occurrence(&source, 2, at("2024-12-14T15:00:00Z")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid time sequence");
    }

    #[test]
    fn test_next_occurrence_rejects_zero_duration() {
        let source = sample_event(1, "2024-12-14T14:00:00Z", "2024-12-14T14:00:00Z");
        assert!(matches!(
            next_occurrence(&source, 2, at("2024-12-14T15:00:00Z")),
            Err(CoreError::InvalidTimeSequence)
        ));
    }

    #[test]
    fn test_series_match_name_and_series() {
        let candidate = sample_event(1, "2024-12-14T07:00:00Z", "2024-12-14T14:00:00Z");
        let mut later = sample_event(2, "2024-12-21T07:00:00Z", "2024-12-21T14:00:00Z");

        assert!(SeriesMatch::NameAndSeries.is_successor(&candidate, &later));

        later.name = "Board Games Night (renamed)".to_string();
        assert!(!SeriesMatch::NameAndSeries.is_successor(&candidate, &later));
        assert!(SeriesMatch::SeriesOnly.is_successor(&candidate, &later));
    }

    #[test]
    fn test_series_match_ignores_earlier_and_other_series() {
        let candidate = sample_event(1, "2024-12-14T07:00:00Z", "2024-12-14T14:00:00Z");
        let earlier = sample_event(2, "2024-12-07T07:00:00Z", "2024-12-07T14:00:00Z");
        let mut other_series = sample_event(3, "2024-12-21T07:00:00Z", "2024-12-21T14:00:00Z");
        other_series.repeating_event_id = Some("series-q".to_string());

        assert!(!SeriesMatch::SeriesOnly.is_successor(&candidate, &earlier));
        assert!(!SeriesMatch::SeriesOnly.is_successor(&candidate, &other_series));
        assert!(!SeriesMatch::SeriesOnly.is_successor(&candidate, &candidate));
    }

    #[test]
    fn test_series_match_from_str() {
        assert_eq!(
            "series_only".parse::<SeriesMatch>().unwrap(),
            SeriesMatch::SeriesOnly
        );
        assert_eq!(
            "NAME_AND_SERIES".parse::<SeriesMatch>().unwrap(),
            SeriesMatch::NameAndSeries
        );
        assert!("weekly".parse::<SeriesMatch>().is_err());
    }

    #[test]
    fn test_series_redirect_location() {
        assert_eq!(
            SeriesRedirect::Upcoming(7).location(),
            "/createprofile?event=7"
        );
        assert_eq!(SeriesRedirect::Past(7).location(), "/events/7");
    }
}
