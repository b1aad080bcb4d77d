//! Reshape an arbitrary scoreboard document into the `schedule.json` schema.
//!
//! Nothing about the upstream document is trusted: every field access
//! tolerates absence or a wrong JSON type, and missing values become `null`
//! rather than disappearing.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::debug;

use gridsync_shared::{
    Competition, Competitor, Context, Event, HomeAway, Link, NormalizeMode, RawDocument, Record,
    ScheduleArtifact, ScheduleEvent, SeasonInfo, Status, StatusType, Team, WeekInfo,
};

/// Build the artifact for `doc`, filling season/week metadata from `fallback`.
///
/// `doc` is `None` when every fetch failed; the result is then an empty
/// schedule for the fallback context. `now` is only used for the filter-mode
/// `lastUpdated` stamp.
pub fn normalize(
    doc: Option<&RawDocument>,
    fallback: &Context,
    mode: NormalizeMode,
    now: DateTime<Utc>,
) -> ScheduleArtifact {
    let season = doc.and_then(|d| d.get("season")).filter(|s| s.is_object());
    let week = doc.and_then(|d| d.get("week")).filter(|w| w.is_object());

    let season = SeasonInfo {
        year: season
            .and_then(|s| int(s.get("year")))
            .or(Some(i64::from(fallback.year))),
        season_type: season
            .and_then(|s| int(s.get("type")))
            .or(Some(i64::from(fallback.season_type.code()))),
    };
    let week = WeekInfo {
        number: week
            .and_then(|w| int(w.get("number")))
            .or(Some(i64::from(fallback.week))),
    };

    let raw_events = doc
        .and_then(|d| d.get("events"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut events: Vec<ScheduleEvent> = match mode {
        NormalizeMode::Filter => raw_events
            .iter()
            .filter(|e| e.is_object())
            .map(|e| ScheduleEvent::Projected(Box::new(project_event(e))))
            .collect(),
        NormalizeMode::Flatten => raw_events.iter().cloned().map(ScheduleEvent::Upstream).collect(),
    };

    if events.len() != raw_events.len() {
        debug!(
            dropped = raw_events.len() - events.len(),
            "skipped non-object entries in events"
        );
    }

    // ISO-8601 strings in one format sort chronologically as plain text.
    events.sort_by(|a, b| a.date().unwrap_or("").cmp(b.date().unwrap_or("")));

    let last_updated = match mode {
        NormalizeMode::Filter => Some(now.to_rfc3339_opts(SecondsFormat::Secs, true)),
        NormalizeMode::Flatten => None,
    };

    ScheduleArtifact {
        season,
        week,
        events,
        last_updated,
    }
}

// ---------------------------------------------------------------------------
// Allowlist projection
// ---------------------------------------------------------------------------

fn project_event(v: &Value) -> Event {
    Event {
        id: text(v.get("id")),
        name: text(v.get("name")),
        date: text(v.get("date")),
        links: items(v.get("links"))
            .map(|l| Link {
                href: text(l.get("href")),
                text: text(l.get("text")),
            })
            .collect(),
        season: SeasonInfo {
            year: int(v.pointer("/season/year")),
            season_type: int(v.pointer("/season/type")),
        },
        week: WeekInfo {
            number: int(v.pointer("/week/number")),
        },
        competitions: items(v.get("competitions")).map(project_competition).collect(),
    }
}

fn project_competition(c: &Value) -> Competition {
    Competition {
        status: Status {
            display_clock: text(c.pointer("/status/displayClock")),
            period: int(c.pointer("/status/period")),
            status_type: StatusType {
                state: text(c.pointer("/status/type/state")),
                completed: c.pointer("/status/type/completed").and_then(Value::as_bool),
                detail: text(c.pointer("/status/type/detail")),
                short_detail: text(c.pointer("/status/type/shortDetail")),
            },
        },
        competitors: items(c.get("competitors")).map(project_competitor).collect(),
    }
}

fn project_competitor(c: &Value) -> Competitor {
    let home_away = match c.get("homeAway").and_then(Value::as_str) {
        Some("home") => Some(HomeAway::Home),
        Some("away") => Some(HomeAway::Away),
        _ => None,
    };

    Competitor {
        home_away,
        score: text(c.get("score")),
        records: items(c.get("records"))
            .map(|r| Record {
                record_type: text(r.get("type")),
                summary: text(r.get("summary")),
            })
            .collect(),
        team: Team {
            abbreviation: text(c.pointer("/team/abbreviation")),
            display_name: text(c.pointer("/team/displayName")),
            logo: text(c.pointer("/team/logo")),
        },
    }
}

// ---------------------------------------------------------------------------
// Tolerant accessors
// ---------------------------------------------------------------------------

/// Object entries of an optional array; anything else yields nothing.
fn items(v: Option<&Value>) -> impl Iterator<Item = &Value> {
    v.and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|item| item.is_object())
}

/// Strings pass through; numbers and booleans are rendered as text.
fn text(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Integers, or strings holding an integer (the API is inconsistent here).
fn int(v: Option<&Value>) -> Option<i64> {
    match v? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
