//! Week-over-week insights
//!
//! Both computations need two full weeks. Short ranges return
//! [`DashboardError::InsufficientHistory`], which callers treat as "no insight"
//! rather than a failure.

use crate::error::{DashboardError, Result};
use crate::filter::{DashboardFilter, DateWindow};
use crate::models::{DailyCount, KeyCount};
use chrono::Days;
use std::collections::BTreeMap;

/// Days in each compared period
pub const WEEK_DAYS: usize = 7;

/// Days needed for a comparison
pub const MIN_HISTORY_DAYS: usize = 2 * WEEK_DAYS;

/// Movers reported per dimension
pub const TOP_MOVERS: usize = 3;

fn mean(values: &[DailyCount]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|d| d.requests as f64).sum::<f64>() / values.len() as f64
}

/// Percent change of the mean daily count, last 7 entries vs the 7 before.
///
/// Works on the entries of the series, so days without requests do not count
/// towards the 14. A prior mean of zero gives 0.0.
pub fn trend_pct(daily: &[DailyCount]) -> Result<f64> {
    if daily.len() < MIN_HISTORY_DAYS {
        return Err(DashboardError::InsufficientHistory {
            available: daily.len(),
            required: MIN_HISTORY_DAYS,
        });
    }

    let last = &daily[daily.len() - WEEK_DAYS..];
    let prior = &daily[daily.len() - MIN_HISTORY_DAYS..daily.len() - WEEK_DAYS];

    let now = mean(last);
    let before = mean(prior);
    if before == 0.0 {
        return Ok(0.0);
    }
    Ok((now - before) / before * 100.0)
}

/// The two compared weeks, both ending relative to the filter's end date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoverWindows {
    /// `[end - 6, end]`
    pub current: DateWindow,
    /// `[end - 13, end - 7]`
    pub previous: DateWindow,
}

impl MoverWindows {
    /// Windows for `filter`; the range must span at least 14 days.
    pub fn for_filter(filter: &DashboardFilter) -> Result<Self> {
        let window = filter.window();
        let available = usize::try_from(window.days()).unwrap_or(0);
        if available < MIN_HISTORY_DAYS {
            return Err(DashboardError::InsufficientHistory {
                available,
                required: MIN_HISTORY_DAYS,
            });
        }

        let end = window.end;
        let back = |n: u64| {
            end.checked_sub_days(Days::new(n))
                .ok_or_else(|| DashboardError::invalid_filter(format!("{} is too early", end)))
        };

        Ok(Self {
            current: DateWindow::new(back(6)?, end)?,
            previous: DateWindow::new(back(13)?, back(7)?)?,
        })
    }
}

/// One key's change between the two weeks
#[derive(Debug, Clone, PartialEq)]
pub struct Mover {
    pub key: String,
    pub current: i64,
    pub previous: i64,
    pub delta: i64,
    /// `+inf` for keys new this week
    pub pct: f64,
}

impl Mover {
    fn new(key: String, current: i64, previous: i64) -> Self {
        let delta = current - previous;
        let pct = if previous != 0 {
            delta as f64 / previous as f64 * 100.0
        } else if delta > 0 {
            f64::INFINITY
        } else {
            0.0
        };
        Self {
            key,
            current,
            previous,
            delta,
            pct,
        }
    }
}

/// Join both weeks on key (missing = 0) and keep the `n` largest increases.
///
/// Ordered by delta, then current count, both descending; ties on both fall
/// back to the key so output is deterministic.
pub fn top_movers(current: &[KeyCount], previous: &[KeyCount], n: usize) -> Vec<Mover> {
    let mut joined: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
    for row in current {
        joined.entry(row.key.as_str()).or_default().0 += row.requests;
    }
    for row in previous {
        joined.entry(row.key.as_str()).or_default().1 += row.requests;
    }

    let mut movers: Vec<Mover> = joined
        .into_iter()
        .map(|(key, (curr, prev))| Mover::new(key.to_string(), curr, prev))
        .collect();

    movers.sort_by(|a, b| {
        b.delta
            .cmp(&a.delta)
            .then_with(|| b.current.cmp(&a.current))
            .then_with(|| a.key.cmp(&b.key))
    });
    movers.truncate(n);
    movers
}

/// Busiest entry of a list ranked by count, descending
pub fn top_area(ranked: &[KeyCount]) -> Option<&KeyCount> {
    ranked.first().filter(|k| k.requests > 0)
}

/// Insights for one filter; `None` fields mean not enough history
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Insights {
    pub trend_pct: Option<f64>,
    pub top_area: Option<KeyCount>,
    pub category_movers: Option<Vec<Mover>>,
    pub neighborhood_movers: Option<Vec<Mover>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(counts: &[i64]) -> Vec<DailyCount> {
        let start: NaiveDate = "2024-01-01".parse().unwrap();
        counts
            .iter()
            .enumerate()
            .map(|(i, &requests)| DailyCount {
                day: start + Days::new(i as u64),
                requests,
            })
            .collect()
    }

    #[test]
    fn test_trend_compares_last_two_weeks() {
        let mut counts = vec![1_000; 3];
        counts.extend([10; 7]);
        counts.extend([15; 7]);

        assert_eq!(trend_pct(&series(&counts)).unwrap(), 50.0);
    }

    #[test]
    fn test_trend_needs_fourteen_entries() {
        let err = trend_pct(&series(&[5; 13])).unwrap_err();
        assert!(matches!(
            err,
            DashboardError::InsufficientHistory {
                available: 13,
                required: 14
            }
        ));
        assert!(err.is_insufficient_history());
    }

    #[test]
    fn test_trend_zero_prior_is_flat() {
        let mut counts = vec![0; 7];
        counts.extend([4; 7]);
        assert_eq!(trend_pct(&series(&counts)).unwrap(), 0.0);
    }

    #[test]
    fn test_mover_windows() {
        let filter = DashboardFilter::new(
            "2024-03-01".parse().unwrap(),
            "2024-03-14".parse().unwrap(),
        )
        .unwrap();
        let windows = MoverWindows::for_filter(&filter).unwrap();

        assert_eq!(windows.current.to_string(), "2024-03-08..=2024-03-14");
        assert_eq!(windows.previous.to_string(), "2024-03-01..=2024-03-07");
    }

    #[test]
    fn test_mover_windows_need_two_weeks() {
        let filter = DashboardFilter::new(
            "2024-03-01".parse().unwrap(),
            "2024-03-13".parse().unwrap(),
        )
        .unwrap();

        assert!(MoverWindows::for_filter(&filter)
            .unwrap_err()
            .is_insufficient_history());
    }

    #[test]
    fn test_top_movers_ranking() {
        let current = vec![
            KeyCount::new("Graffiti", 120),
            KeyCount::new("Encampments", 40),
            KeyCount::new("Noise", 30),
            KeyCount::new("Potholes", 25),
        ];
        let previous = vec![
            KeyCount::new("Graffiti", 100),
            KeyCount::new("Noise", 10),
            KeyCount::new("Potholes", 50),
            KeyCount::new("Abandoned Vehicle", 8),
        ];

        let movers = top_movers(&current, &previous, TOP_MOVERS);

        let keys: Vec<&str> = movers.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, vec!["Encampments", "Graffiti", "Noise"]);

        assert_eq!(movers[0].delta, 40);
        assert!(movers[0].pct.is_infinite());
        assert_eq!(movers[1].pct, 20.0);
        assert_eq!(movers[2].pct, 200.0);
    }

    #[test]
    fn test_top_movers_ties_broken_by_current() {
        let current = vec![KeyCount::new("a", 15), KeyCount::new("b", 25)];
        let previous = vec![KeyCount::new("a", 5), KeyCount::new("b", 15)];

        let movers = top_movers(&current, &previous, 3);

        assert_eq!(movers[0].key, "b");
        assert_eq!(movers[1].key, "a");
    }

    #[test]
    fn test_dropped_key_has_zero_pct_when_absent_before() {
        let movers = top_movers(&[KeyCount::new("x", 0)], &[], 3);
        assert_eq!(movers[0].pct, 0.0);

        let gone = top_movers(&[], &[KeyCount::new("y", 4)], 3);
        assert_eq!(gone[0].delta, -4);
        assert_eq!(gone[0].pct, -100.0);
    }

    #[test]
    fn test_top_area_takes_first_of_ranked() {
        let ranked = vec![KeyCount::new("Mission", 90), KeyCount::new("SoMa", 90)];
        assert_eq!(top_area(&ranked).unwrap().key, "Mission");
        assert!(top_area(&[]).is_none());
    }
}
