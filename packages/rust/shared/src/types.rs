//! Core domain types: the schedule context and the persisted artifact shape.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An untyped scoreboard document exactly as returned by the API.
///
/// Never assumed well-formed: `season`, `week` and `events` may all be absent.
pub type RawDocument = serde_json::Value;

// ---------------------------------------------------------------------------
// SeasonType
// ---------------------------------------------------------------------------

/// Phase of competition, using the scoreboard API's numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SeasonType {
    Preseason = 1,
    Regular = 2,
    Post = 3,
}

impl SeasonType {
    /// Numeric code used in the `seasontype` query parameter.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Map an API code to a season type; unknown codes (e.g. off-season) are `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Preseason),
            2 => Some(Self::Regular),
            3 => Some(Self::Post),
            _ => None,
        }
    }
}

impl TryFrom<u8> for SeasonType {
    type Error = String;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        Self::from_code(i64::from(code))
            .ok_or_else(|| format!("unknown season type {code} (expected 1, 2 or 3)"))
    }
}

impl From<SeasonType> for u8 {
    fn from(value: SeasonType) -> Self {
        value.code()
    }
}

impl FromStr for SeasonType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "pre" | "preseason" => Ok(Self::Preseason),
            "2" | "reg" | "regular" => Ok(Self::Regular),
            "3" | "post" | "postseason" => Ok(Self::Post),
            other => Err(format!(
                "invalid season type '{other}': expected 1-3, preseason, regular or post"
            )),
        }
    }
}

impl fmt::Display for SeasonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Preseason => "preseason",
            Self::Regular => "regular",
            Self::Post => "post",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// The (year, season type, week) triple identifying the "current" slice of
/// the schedule. Recomputed on every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub year: i32,
    pub season_type: SeasonType,
    pub week: u32,
}

impl Context {
    pub fn new(year: i32, season_type: SeasonType, week: u32) -> Self {
        Self {
            year,
            season_type,
            week,
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} week {}", self.year, self.season_type, self.week)
    }
}

/// Explicit year/season-type/week pins (env vars or CLI flags).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub year: Option<i32>,
    pub season_type: Option<SeasonType>,
    pub week: Option<u32>,
}

impl EnvOverrides {
    /// The pinned context, only when all three values are supplied.
    pub fn pinned(&self) -> Option<Context> {
        Some(Context::new(self.year?, self.season_type?, self.week?))
    }
}

// ---------------------------------------------------------------------------
// ScheduleArtifact
// ---------------------------------------------------------------------------

/// The persisted `schedule.json` document consumed by the display templates.
///
/// Field names and nesting are a compatibility boundary with the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleArtifact {
    pub season: SeasonInfo,
    pub week: WeekInfo,
    /// Sorted ascending by `date`.
    pub events: Vec<ScheduleEvent>,
    #[serde(
        rename = "lastUpdated",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonInfo {
    pub year: Option<i64>,
    #[serde(rename = "type")]
    pub season_type: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekInfo {
    pub number: Option<i64>,
}

/// One entry of the artifact's `events` array.
///
/// Filter mode emits the allowlisted projection; flatten mode keeps the
/// upstream object as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScheduleEvent {
    Projected(Box<Event>),
    Upstream(serde_json::Value),
}

impl ScheduleEvent {
    /// Kickoff time string, if the event carries one.
    pub fn date(&self) -> Option<&str> {
        match self {
            Self::Projected(event) => event.date.as_deref(),
            Self::Upstream(value) => value.get("date").and_then(serde_json::Value::as_str),
        }
    }
}

/// Allowlisted projection of an upstream event. Every field is always
/// serialized, as `null` when the upstream value is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Option<String>,
    pub name: Option<String>,
    pub date: Option<String>,
    pub links: Vec<Link>,
    pub season: SeasonInfo,
    pub week: WeekInfo,
    pub competitions: Vec<Competition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Competition {
    pub status: Status,
    pub competitors: Vec<Competitor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub display_clock: Option<String>,
    pub period: Option<i64>,
    #[serde(rename = "type")]
    pub status_type: StatusType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusType {
    pub state: Option<String>,
    pub completed: Option<bool>,
    pub detail: Option<String>,
    pub short_detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeAway {
    Home,
    Away,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
    pub home_away: Option<HomeAway>,
    pub score: Option<String>,
    pub records: Vec<Record>,
    pub team: Team,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub abbreviation: Option<String>,
    pub display_name: Option<String>,
    pub logo: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_type_parses_codes_and_names() {
        assert_eq!("2".parse::<SeasonType>().unwrap(), SeasonType::Regular);
        assert_eq!("post".parse::<SeasonType>().unwrap(), SeasonType::Post);
        assert_eq!(" Preseason ".parse::<SeasonType>().unwrap(), SeasonType::Preseason);
        assert!("4".parse::<SeasonType>().is_err());
        assert_eq!(SeasonType::from_code(4), None);
    }

    #[test]
    fn season_type_serializes_as_code() {
        let json = serde_json::to_string(&SeasonType::Post).unwrap();
        assert_eq!(json, "3");
        let parsed: SeasonType = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, SeasonType::Preseason);
        assert!(serde_json::from_str::<SeasonType>("9").is_err());
    }

    #[test]
    fn overrides_require_all_three() {
        let partial = EnvOverrides {
            year: Some(2025),
            season_type: Some(SeasonType::Regular),
            week: None,
        };
        assert_eq!(partial.pinned(), None);

        let full = EnvOverrides {
            week: Some(7),
            ..partial
        };
        assert_eq!(
            full.pinned(),
            Some(Context::new(2025, SeasonType::Regular, 7))
        );
    }

    #[test]
    fn projected_event_serializes_nulls() {
        let event = Event::default();
        let value = serde_json::to_value(&event).unwrap();
        assert!(value["id"].is_null());
        assert!(value["season"]["year"].is_null());
        assert!(value["week"]["number"].is_null());
        assert_eq!(value["links"], serde_json::json!([]));

        let competitor = serde_json::to_value(Competitor::default()).unwrap();
        assert!(competitor["homeAway"].is_null());
        assert!(competitor["team"]["displayName"].is_null());
    }

    #[test]
    fn artifact_omits_missing_timestamp() {
        let artifact = ScheduleArtifact {
            season: SeasonInfo {
                year: Some(2025),
                season_type: Some(2),
            },
            week: WeekInfo { number: Some(1) },
            events: vec![],
            last_updated: None,
        };
        let json = serde_json::to_string(&artifact).unwrap();
        assert_eq!(
            json,
            r#"{"season":{"year":2025,"type":2},"week":{"number":1},"events":[]}"#
        );
    }

    #[test]
    fn schedule_event_date_reads_both_variants() {
        let projected = ScheduleEvent::Projected(Box::new(Event {
            date: Some("2025-09-05T00:20Z".into()),
            ..Event::default()
        }));
        let upstream = ScheduleEvent::Upstream(serde_json::json!({"date": "2025-09-07T17:00Z"}));
        assert_eq!(projected.date(), Some("2025-09-05T00:20Z"));
        assert_eq!(upstream.date(), Some("2025-09-07T17:00Z"));
    }
}
