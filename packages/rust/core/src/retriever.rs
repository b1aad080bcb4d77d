//! Event retrieval for a context, and the week scan used when it comes back empty.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, instrument};

use gridsync_shared::{Context, RawDocument, ScanPolicy, SyncConfig};
use gridsync_transport::{ScoreboardQuery, ScoreboardSource, fetch_or_warn};

use crate::resolver::{doc_season_type, doc_week};

/// Outcome of [`retrieve`].
#[derive(Debug, Clone)]
pub struct Retrieval {
    /// The first document whose `events` key was present, if any.
    pub doc: Option<RawDocument>,
    /// The query that produced `doc`.
    pub query: Option<ScoreboardQuery>,
}

impl Retrieval {
    pub fn event_count(&self) -> usize {
        self.doc.as_ref().map_or(0, event_count)
    }
}

/// Query formulations for `ctx`, most specific first.
pub fn strategies(ctx: &Context, today: NaiveDate) -> [ScoreboardQuery; 4] {
    [
        ScoreboardQuery::Week(*ctx),
        ScoreboardQuery::SeasonWeek(*ctx),
        ScoreboardQuery::Default,
        ScoreboardQuery::Date(today),
    ]
}

/// Fetch events for `ctx`, returning the first response that carries an
/// `events` key (an empty list counts: the API understood the query).
#[instrument(skip_all, fields(context = %ctx))]
pub async fn retrieve<S: ScoreboardSource>(
    source: &S,
    ctx: &Context,
    today: NaiveDate,
) -> Retrieval {
    for query in strategies(ctx, today) {
        let Some(doc) = fetch_or_warn(source, &query).await else {
            continue;
        };
        if has_events_key(&doc) {
            info!(
                strategy = query.strategy(),
                %query,
                events = event_count(&doc),
                "events retrieved"
            );
            return Retrieval {
                doc: Some(doc),
                query: Some(query),
            };
        }
        debug!(%query, "response has no events key");
    }

    Retrieval {
        doc: None,
        query: None,
    }
}

// ---------------------------------------------------------------------------
// Scan fallback
// ---------------------------------------------------------------------------

/// A week found by [`scan_weeks`].
#[derive(Debug, Clone)]
pub struct ScanHit {
    /// Context adopted for the found week.
    pub context: Context,
    pub doc: RawDocument,
    pub query: ScoreboardQuery,
    /// Whether the week passed the freshness check.
    pub fresh: bool,
}

/// Probe weeks `1..=scan_max_week` of `base.year` for one with events.
///
/// Under [`ScanPolicy::PreferFresh`] the first week with a game kicking off
/// no more than `freshness_hours` ago wins; failing that, the first non-empty
/// week is used when `stale_fallback` is set.
#[instrument(skip_all, fields(year = base.year, policy = ?config.scan_policy))]
pub async fn scan_weeks<S: ScoreboardSource>(
    source: &S,
    base: &Context,
    config: &SyncConfig,
    now: DateTime<Utc>,
) -> Option<ScanHit> {
    // An unrepresentable window makes every dated event fresh.
    let cutoff = Duration::try_hours(config.freshness_hours.max(0))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let mut first_non_empty: Option<ScanHit> = None;

    for week in 1..=config.scan_max_week {
        let candidate = Context::new(base.year, config.scan_season_type, week);
        let Some((doc, query)) = fetch_non_empty_week(source, &candidate).await else {
            continue;
        };

        let hit = ScanHit {
            context: Context {
                season_type: doc_season_type(&doc).unwrap_or(candidate.season_type),
                week: doc_week(&doc).unwrap_or(week),
                ..candidate
            },
            fresh: has_fresh_event(&doc, cutoff),
            doc,
            query,
        };

        match config.scan_policy {
            ScanPolicy::FirstNonEmpty => {
                info!(context = %hit.context, "scan: first non-empty week");
                return Some(hit);
            }
            ScanPolicy::PreferFresh if hit.fresh => {
                info!(context = %hit.context, "scan: first week with an upcoming game");
                return Some(hit);
            }
            ScanPolicy::PreferFresh => {
                debug!(context = %hit.context, "scan: week has only stale games");
                first_non_empty.get_or_insert(hit);
            }
        }
    }

    match first_non_empty {
        Some(hit) if config.stale_fallback => {
            info!(context = %hit.context, "scan: no fresh week, using first non-empty week");
            Some(hit)
        }
        Some(hit) => {
            info!(context = %hit.context, "scan: no fresh week and stale fallback is off");
            None
        }
        None => None,
    }
}

/// The explicit week queries for `candidate`; the first with events wins.
async fn fetch_non_empty_week<S: ScoreboardSource>(
    source: &S,
    candidate: &Context,
) -> Option<(RawDocument, ScoreboardQuery)> {
    for query in [
        ScoreboardQuery::Week(*candidate),
        ScoreboardQuery::SeasonWeek(*candidate),
    ] {
        if let Some(doc) = fetch_or_warn(source, &query).await {
            if event_count(&doc) > 0 {
                return Some((doc, query));
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Document helpers
// ---------------------------------------------------------------------------

/// `events` is present and not `null`.
pub fn has_events_key(doc: &RawDocument) -> bool {
    doc.get("events").is_some_and(|e| !e.is_null())
}

/// Number of object entries in `events`, zero when absent or not an array.
///
/// Non-object entries never survive normalization, so they do not count.
pub fn event_count(doc: &RawDocument) -> usize {
    doc.get("events")
        .and_then(Value::as_array)
        .map_or(0, |events| events.iter().filter(|e| e.is_object()).count())
}

/// Whether any event kicks off at or after `cutoff`.
pub fn has_fresh_event(doc: &RawDocument, cutoff: DateTime<Utc>) -> bool {
    doc.get("events")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|e| e.get("date").and_then(Value::as_str))
        .filter_map(parse_kickoff)
        .any(|kickoff| kickoff >= cutoff)
}

/// Parse an event date. The API omits seconds (`2025-09-05T00:20Z`), so plain
/// RFC 3339 is tried first and the minute-precision form second.
pub fn parse_kickoff(date: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%MZ", "%Y-%m-%dT%H:%M:%SZ"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(date, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubSource;
    use chrono::TimeZone;
    use gridsync_shared::SeasonType;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap()
    }

    fn reg(week: u32) -> Context {
        Context::new(2025, SeasonType::Regular, week)
    }

    fn week_doc(week: u32, dates: &[&str]) -> Value {
        let events: Vec<Value> = dates
            .iter()
            .enumerate()
            .map(|(i, d)| json!({"id": format!("{week}-{i}"), "date": d}))
            .collect();
        json!({"season": {"year": 2025, "type": 2}, "week": {"number": week}, "events": events})
    }

    #[tokio::test]
    async fn retrieve_prefers_explicit_week() {
        let stub = StubSource::new()
            .with(ScoreboardQuery::Week(reg(4)), week_doc(4, &["2025-09-28T17:00Z"]))
            .with(ScoreboardQuery::Default, week_doc(5, &["2025-10-05T17:00Z"]));

        let r = retrieve(&stub, &reg(4), now().date_naive()).await;

        assert_eq!(r.query, Some(ScoreboardQuery::Week(reg(4))));
        assert_eq!(r.event_count(), 1);
        assert_eq!(stub.calls().len(), 1);
    }

    #[tokio::test]
    async fn retrieve_falls_through_failures_and_missing_key() {
        let today = now().date_naive();
        let stub = StubSource::new()
            .with(ScoreboardQuery::SeasonWeek(reg(4)), json!({"leagues": []}))
            .with(ScoreboardQuery::Default, json!({"events": null}))
            .with(ScoreboardQuery::Date(today), week_doc(5, &[]));

        let r = retrieve(&stub, &reg(4), today).await;

        assert_eq!(r.query, Some(ScoreboardQuery::Date(today)));
        assert_eq!(r.event_count(), 0);
        assert!(r.doc.is_some());
        assert_eq!(stub.calls().len(), 4);
    }

    #[tokio::test]
    async fn retrieve_with_everything_down_is_empty() {
        let stub = StubSource::new();
        let r = retrieve(&stub, &reg(1), now().date_naive()).await;
        assert!(r.doc.is_none());
        assert!(r.query.is_none());
        assert_eq!(r.event_count(), 0);
    }

    #[tokio::test]
    async fn scan_first_non_empty_takes_earliest_week() {
        let stub = StubSource::new()
            .with(ScoreboardQuery::Week(reg(3)), week_doc(3, &["2025-09-21T17:00Z"]))
            .with(ScoreboardQuery::Week(reg(5)), week_doc(5, &["2025-10-05T17:00Z"]));
        let config = SyncConfig {
            scan_policy: ScanPolicy::FirstNonEmpty,
            ..SyncConfig::default()
        };

        let hit = scan_weeks(&stub, &reg(1), &config, now()).await.unwrap();

        assert_eq!(hit.context, reg(3));
        assert!(!hit.fresh);
    }

    #[tokio::test]
    async fn scan_prefer_fresh_skips_completed_weeks() {
        let stub = StubSource::new()
            .with(ScoreboardQuery::Week(reg(3)), week_doc(3, &["2025-09-21T17:00Z"]))
            .with(ScoreboardQuery::Week(reg(5)), week_doc(5, &["2025-10-05T17:00Z"]));

        let hit = scan_weeks(&stub, &reg(1), &SyncConfig::default(), now())
            .await
            .unwrap();

        assert_eq!(hit.context, reg(5));
        assert!(hit.fresh);
    }

    #[tokio::test]
    async fn scan_without_fresh_week_uses_stale_fallback() {
        let stub = StubSource::new()
            .with(ScoreboardQuery::Week(reg(2)), week_doc(2, &["2025-09-14T17:00Z"]))
            .with(ScoreboardQuery::Week(reg(3)), week_doc(3, &["2025-09-21T17:00Z"]));

        let hit = scan_weeks(&stub, &reg(1), &SyncConfig::default(), now())
            .await
            .unwrap();
        assert_eq!(hit.context, reg(2));
        assert!(!hit.fresh);

        let strict = SyncConfig {
            stale_fallback: false,
            ..SyncConfig::default()
        };
        assert!(scan_weeks(&stub, &reg(1), &strict, now()).await.is_none());
    }

    #[tokio::test]
    async fn scan_freshness_window_boundary() {
        // Exactly 24 hours before now is still fresh; one minute more is not.
        let stub = StubSource::new()
            .with(ScoreboardQuery::Week(reg(4)), week_doc(4, &["2025-09-30T11:59Z"]))
            .with(ScoreboardQuery::Week(reg(5)), week_doc(5, &["2025-09-30T12:00Z"]));

        let hit = scan_weeks(&stub, &reg(1), &SyncConfig::default(), now())
            .await
            .unwrap();
        assert_eq!(hit.context.week, 5);
    }

    #[tokio::test]
    async fn scan_reaches_last_week_but_not_beyond() {
        let stub = StubSource::new()
            .with(ScoreboardQuery::Week(reg(21)), week_doc(21, &["2026-02-08T23:30Z"]))
            .with(ScoreboardQuery::Week(reg(22)), week_doc(22, &["2026-02-15T23:30Z"]));

        let hit = scan_weeks(&stub, &reg(1), &SyncConfig::default(), now())
            .await
            .unwrap();
        assert_eq!(hit.context.week, 21);
        assert!(!stub.calls().iter().any(|c| c.ends_with("week=22")));

        let short = SyncConfig {
            scan_max_week: 18,
            ..SyncConfig::default()
        };
        assert!(scan_weeks(&stub, &reg(1), &short, now()).await.is_none());
    }

    #[tokio::test]
    async fn scan_adopts_reported_season_type_and_week() {
        // Week 19 of the regular-season query is answered with postseason round 1.
        let doc = json!({
            "season": {"year": 2025, "type": 3},
            "week": {"number": 1},
            "events": [{"id": "wc1", "date": "2026-01-10T21:30Z"}]
        });
        let stub = StubSource::new().with(ScoreboardQuery::Week(reg(19)), doc);

        let hit = scan_weeks(&stub, &reg(1), &SyncConfig::default(), now())
            .await
            .unwrap();
        assert_eq!(hit.context, Context::new(2025, SeasonType::Post, 1));
    }

    #[tokio::test]
    async fn scan_tries_season_week_query_when_week_query_is_empty() {
        let stub = StubSource::new()
            .with(ScoreboardQuery::Week(reg(6)), week_doc(6, &[]))
            .with(ScoreboardQuery::SeasonWeek(reg(6)), json!({"events": [{"id": "x", "date": "2025-10-12T17:00Z"}]}));

        let hit = scan_weeks(&stub, &reg(1), &SyncConfig::default(), now())
            .await
            .unwrap();
        assert_eq!(hit.context, reg(6));
        assert_eq!(hit.query, ScoreboardQuery::SeasonWeek(reg(6)));
    }

    #[test]
    fn parse_kickoff_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 9, 5, 0, 20, 0).unwrap();
        assert_eq!(parse_kickoff("2025-09-05T00:20Z"), Some(expected));
        assert_eq!(parse_kickoff("2025-09-05T00:20:00Z"), Some(expected));
        assert_eq!(parse_kickoff("2025-09-04T20:20:00-04:00"), Some(expected));
        assert_eq!(parse_kickoff("TBD"), None);
    }

    #[test]
    fn events_key_semantics() {
        assert!(has_events_key(&json!({"events": []})));
        assert!(!has_events_key(&json!({"events": null})));
        assert!(!has_events_key(&json!({})));
        assert_eq!(event_count(&json!({"events": "bogus"})), 0);
        assert_eq!(event_count(&json!({"events": [1, "x", null, {"id": "a"}]})), 1);
    }

    #[tokio::test]
    async fn scan_survives_oversized_freshness_window() {
        let stub = StubSource::new()
            .with(ScoreboardQuery::Week(reg(2)), week_doc(2, &["2025-09-14T17:00Z"]));
        for hours in [i64::MAX / 1000, i64::MAX, -48] {
            let config = SyncConfig {
                freshness_hours: hours,
                ..SyncConfig::default()
            };
            let hit = scan_weeks(&stub, &reg(1), &config, now()).await.unwrap();
            assert_eq!(hit.context, reg(2), "{hours}");
        }
    }

    #[tokio::test]
    async fn scan_skips_weeks_with_only_junk_events() {
        let stub = StubSource::new()
            .with(ScoreboardQuery::Week(reg(2)), json!({"events": [null, 7, "tbd"]}))
            .with(ScoreboardQuery::Week(reg(3)), week_doc(3, &["2025-10-02T00:15Z"]));

        let hit = scan_weeks(&stub, &reg(1), &SyncConfig::default(), now())
            .await
            .unwrap();
        assert_eq!(hit.context, reg(3));
    }
}
