//! Query formulations understood by the scoreboard endpoint.

use std::fmt;

use chrono::NaiveDate;
use gridsync_shared::Context;

/// One way of asking the scoreboard for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreboardQuery {
    /// No parameters: whatever the API considers current.
    Default,
    /// `dates=YYYYMMDD`: the board for one calendar day.
    Date(NaiveDate),
    /// `year=&seasontype=&week=`: an explicit week.
    Week(Context),
    /// `dates=<year>&seasontype=&week=`: the same week keyed by season date.
    SeasonWeek(Context),
}

impl ScoreboardQuery {
    /// Query parameters in the order they are appended to the URL.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Default => Vec::new(),
            Self::Date(day) => vec![("dates", day.format("%Y%m%d").to_string())],
            Self::Week(ctx) => vec![
                ("year", ctx.year.to_string()),
                ("seasontype", ctx.season_type.code().to_string()),
                ("week", ctx.week.to_string()),
            ],
            Self::SeasonWeek(ctx) => vec![
                ("dates", ctx.year.to_string()),
                ("seasontype", ctx.season_type.code().to_string()),
                ("week", ctx.week.to_string()),
            ],
        }
    }

    /// Short strategy name for logs and run reports.
    pub fn strategy(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Date(_) => "date",
            Self::Week(_) => "week",
            Self::SeasonWeek(_) => "season-week",
        }
    }
}

impl fmt::Display for ScoreboardQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self.params();
        if params.is_empty() {
            return f.write_str("(default)");
        }
        let joined: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        f.write_str(&joined.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsync_shared::SeasonType;

    #[test]
    fn display_lists_params() {
        let ctx = Context::new(2025, SeasonType::Post, 2);
        assert_eq!(
            ScoreboardQuery::Week(ctx).to_string(),
            "year=2025&seasontype=3&week=2"
        );
        assert_eq!(ScoreboardQuery::Default.to_string(), "(default)");
    }

    #[test]
    fn date_query_uses_compact_format() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 4).unwrap();
        assert_eq!(
            ScoreboardQuery::Date(day).params(),
            vec![("dates", "20260104".to_string())]
        );
        assert_eq!(ScoreboardQuery::Date(day).strategy(), "date");
    }
}
