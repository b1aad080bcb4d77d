//! Decide which (year, season type, week) is "current".
//!
//! Priority: explicit overrides, then the API's own metadata (today's board,
//! then the default board), then a calendar heuristic. API metadata is taken
//! whole or not at all; a year from one source paired with a week from
//! another yields a confidently wrong context.

use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde_json::Value;
use tracing::{debug, info, instrument};

use gridsync_shared::{Context, EnvOverrides, RawDocument, SeasonType, SyncConfig};
use gridsync_transport::{ScoreboardQuery, ScoreboardSource, fetch_or_warn};

/// Where a resolved context came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    /// All three values pinned by env vars or flags.
    Override,
    /// Metadata from today's date-scoped board.
    TodayBoard,
    /// Metadata from the parameterless board.
    DefaultBoard,
    /// Inside the league window: regular season week 1 of this year.
    CalendarWindow,
    /// Outside the window: the configured historical context.
    OffseasonFallback,
}

impl fmt::Display for ContextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Override => "override",
            Self::TodayBoard => "today-board",
            Self::DefaultBoard => "default-board",
            Self::CalendarWindow => "calendar-window",
            Self::OffseasonFallback => "offseason-fallback",
        };
        f.write_str(name)
    }
}

/// A resolved context and its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub context: Context,
    pub source: ContextSource,
}

/// Resolve the context for `now`.
///
/// Never fails: network problems fall through to the calendar heuristic.
#[instrument(skip_all, fields(now = %now))]
pub async fn resolve_context<S: ScoreboardSource>(
    source: &S,
    config: &SyncConfig,
    now: DateTime<Utc>,
    overrides: &EnvOverrides,
) -> Resolution {
    if let Some(context) = overrides.pinned() {
        info!(%context, "using pinned context");
        return Resolution {
            context,
            source: ContextSource::Override,
        };
    }

    let probes = [
        (ScoreboardQuery::Date(now.date_naive()), ContextSource::TodayBoard),
        (ScoreboardQuery::Default, ContextSource::DefaultBoard),
    ];
    for (query, origin) in probes {
        let Some(doc) = fetch_or_warn(source, &query).await else {
            continue;
        };
        match context_hint(&doc) {
            Some(context) => {
                info!(%context, source = %origin, "context reported by API");
                return Resolution {
                    context,
                    source: origin,
                };
            }
            None => debug!(%query, "incomplete context metadata, ignoring"),
        }
    }

    let resolution = calendar_context(config, now);
    info!(
        context = %resolution.context,
        source = %resolution.source,
        "no usable API context, using calendar fallback"
    );
    resolution
}

/// Calendar heuristic used when the API gives no complete hint.
pub fn calendar_context(config: &SyncConfig, now: DateTime<Utc>) -> Resolution {
    if config.in_season_window(now.month()) {
        Resolution {
            context: Context::new(now.year(), SeasonType::Regular, 1),
            source: ContextSource::CalendarWindow,
        }
    } else {
        Resolution {
            context: config.offseason_fallback,
            source: ContextSource::OffseasonFallback,
        }
    }
}

/// The document's `season.year`, `season.type` and `week.number`, only when
/// all three are present and valid.
pub fn context_hint(doc: &RawDocument) -> Option<Context> {
    let year = i32::try_from(int_at(doc, "/season/year")?).ok()?;
    let season_type = doc_season_type(doc)?;
    let week = doc_week(doc)?;
    Some(Context::new(year, season_type, week))
}

/// `season.type` as a known season type.
pub(crate) fn doc_season_type(doc: &RawDocument) -> Option<SeasonType> {
    SeasonType::from_code(int_at(doc, "/season/type")?)
}

/// `week.number`, if it is a positive integer.
pub(crate) fn doc_week(doc: &RawDocument) -> Option<u32> {
    u32::try_from(int_at(doc, "/week/number")?)
        .ok()
        .filter(|w| *w >= 1)
}

fn int_at(doc: &RawDocument, pointer: &str) -> Option<i64> {
    match doc.pointer(pointer)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubSource;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 15, 0, 0).unwrap()
    }

    fn today_query(now: DateTime<Utc>) -> ScoreboardQuery {
        ScoreboardQuery::Date(now.date_naive())
    }

    #[tokio::test]
    async fn overrides_win_over_api() {
        let now = at(2025, 10, 5);
        let stub = StubSource::new()
            .with(
                today_query(now),
                json!({"season": {"year": 2025, "type": 2}, "week": {"number": 5}}),
            )
            .with(
                ScoreboardQuery::Default,
                json!({"season": {"year": 2025, "type": 2}, "week": {"number": 5}}),
            );
        let overrides = EnvOverrides {
            year: Some(2023),
            season_type: Some(SeasonType::Post),
            week: Some(2),
        };

        let r = resolve_context(&stub, &SyncConfig::default(), now, &overrides).await;

        assert_eq!(r.context, Context::new(2023, SeasonType::Post, 2));
        assert_eq!(r.source, ContextSource::Override);
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn partial_overrides_are_ignored() {
        let now = at(2025, 10, 5);
        let stub = StubSource::new().with(
            today_query(now),
            json!({"season": {"year": 2025, "type": 2}, "week": {"number": 5}}),
        );
        let overrides = EnvOverrides {
            year: Some(2023),
            ..EnvOverrides::default()
        };

        let r = resolve_context(&stub, &SyncConfig::default(), now, &overrides).await;

        assert_eq!(r.context, Context::new(2025, SeasonType::Regular, 5));
        assert_eq!(r.source, ContextSource::TodayBoard);
    }

    #[tokio::test]
    async fn partial_hint_is_not_adopted() {
        let now = at(2025, 10, 5);
        let stub = StubSource::new()
            .with(today_query(now), json!({"season": {"year": 2025, "type": 2}}))
            .with(
                ScoreboardQuery::Default,
                json!({"season": {"year": 2025, "type": 2}, "week": {"number": 6}}),
            );

        let r = resolve_context(&stub, &SyncConfig::default(), now, &EnvOverrides::default()).await;

        assert_eq!(r.context, Context::new(2025, SeasonType::Regular, 6));
        assert_eq!(r.source, ContextSource::DefaultBoard);
        assert_eq!(stub.calls().len(), 2);
    }

    #[tokio::test]
    async fn partial_hints_everywhere_fall_to_calendar() {
        let now = at(2025, 11, 2);
        let stub = StubSource::new()
            .with(today_query(now), json!({"season": {"year": 2025}, "week": {"number": 9}}))
            .with(ScoreboardQuery::Default, json!({"week": {"number": 9}}));

        let r = resolve_context(&stub, &SyncConfig::default(), now, &EnvOverrides::default()).await;

        assert_eq!(r.context, Context::new(2025, SeasonType::Regular, 1));
        assert_eq!(r.source, ContextSource::CalendarWindow);
    }

    #[tokio::test]
    async fn offseason_uses_historical_fallback() {
        let now = at(2025, 7, 15);
        let stub = StubSource::new();
        let config = SyncConfig::default();

        let r = resolve_context(&stub, &config, now, &EnvOverrides::default()).await;

        assert_eq!(r.context, config.offseason_fallback);
        assert_eq!(r.source, ContextSource::OffseasonFallback);
        assert_ne!(r.context.year, 2025);
    }

    #[test]
    fn calendar_window_boundaries() {
        let config = SyncConfig::default();
        assert_eq!(
            calendar_context(&config, at(2026, 2, 28)).source,
            ContextSource::CalendarWindow
        );
        assert_eq!(
            calendar_context(&config, at(2026, 3, 1)).source,
            ContextSource::OffseasonFallback
        );
        assert_eq!(
            calendar_context(&config, at(2025, 8, 31)).source,
            ContextSource::OffseasonFallback
        );
        let sept = calendar_context(&config, at(2025, 9, 1));
        assert_eq!(sept.context, Context::new(2025, SeasonType::Regular, 1));
    }

    #[test]
    fn hint_rejects_unknown_season_type_and_zero_week() {
        assert_eq!(
            context_hint(&json!({"season": {"year": 2025, "type": 4}, "week": {"number": 1}})),
            None
        );
        assert_eq!(
            context_hint(&json!({"season": {"year": 2025, "type": 2}, "week": {"number": 0}})),
            None
        );
        assert_eq!(
            context_hint(&json!({"season": {"year": "2025", "type": "3"}, "week": {"number": 2}})),
            Some(Context::new(2025, SeasonType::Post, 2))
        );
    }
}
