//! Date-range and category scope shared by every dashboard query
//!
//! Dates are inclusive calendar days in UTC. `end` covers the whole day, so the
//! SQL bound is `created_at < end + 1 day`.

use crate::error::{DashboardError, Result};
use chrono::{DateTime, Days, NaiveDate, Utc};
use sqlx::{Postgres, QueryBuilder};
use std::collections::BTreeSet;
use std::fmt;

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Inclusive span of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DashboardError::invalid_filter(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Days covered, counting both ends
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Lower bound, inclusive
    pub fn lower(&self) -> DateTime<Utc> {
        start_of_day(self.start)
    }

    /// Upper bound, exclusive: midnight after `end`
    pub fn upper(&self) -> DateTime<Utc> {
        let next = self.end.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
        start_of_day(next)
    }

    /// Append `created_at >= $n AND created_at < $m`
    pub fn push_bounds(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push("created_at >= ")
            .push_bind(self.lower())
            .push(" AND created_at < ")
            .push_bind(self.upper());
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Scope selected on the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DashboardFilter {
    window: DateWindow,
    categories: BTreeSet<String>,
}

impl DashboardFilter {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        Ok(Self {
            window: DateWindow::new(start, end)?,
            categories: BTreeSet::new(),
        })
    }

    /// Restrict to these categories; blank names are ignored, empty means all
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories
            .into_iter()
            .map(Into::into)
            .map(|c: String| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        self
    }

    pub fn window(&self) -> DateWindow {
        self.window
    }

    pub fn start(&self) -> NaiveDate {
        self.window.start
    }

    pub fn end(&self) -> NaiveDate {
        self.window.end
    }

    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    /// Append ` WHERE ...` for this filter
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE ");
        self.window.push_bounds(qb);

        if !self.categories.is_empty() {
            let categories: Vec<String> = self.categories.iter().cloned().collect();
            qb.push(" AND category = ANY(").push_bind(categories).push(")");
        }
    }

    /// Stable key identifying this filter in the result cache
    pub fn cache_key(&self) -> String {
        let categories: Vec<&str> = self.categories.iter().map(String::as_str).collect();
        format!("{}|{}", self.window, categories.join(","))
    }
}
