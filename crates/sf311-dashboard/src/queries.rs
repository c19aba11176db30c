//! Read-only aggregate queries over the `sf311` relation
//!
//! Each query has a `*_query` builder (pure, inspectable with `.sql()`) and an
//! async method on [`DashboardQueries`] that runs it against the pool.

use crate::error::Result;
use crate::filter::{DashboardFilter, DateWindow};
use crate::models::{
    DailyCount, DateBounds, Dimension, KeyCount, RecentRequest, SliceRow, Summary, UNKNOWN_KEY,
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

pub const TOP_NEIGHBORHOODS: i64 = 15;
pub const TOP_CATEGORIES: i64 = 10;
pub const RECENT_LIMIT: i64 = 25;
pub const EXPORT_LIMIT: i64 = 100_000;

/// Calendar day of `created_at`, fixed to UTC regardless of session time zone
const DAY_EXPR: &str = "(created_at AT TIME ZONE 'UTC')::date";

pub fn daily_counts_query(filter: &DashboardFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {} AS day, COUNT(*)::bigint AS requests FROM sf311",
        DAY_EXPR
    ));
    filter.push_where(&mut qb);
    qb.push(" GROUP BY 1 ORDER BY 1");
    qb
}

/// Non-empty values of `column` ranked by count
fn top_values_query(
    column: &'static str,
    filter: &DashboardFilter,
    limit: i64,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {column} AS key, COUNT(*)::bigint AS requests FROM sf311"
    ));
    filter.push_where(&mut qb);
    qb.push(format!(
        " AND {column} IS NOT NULL AND {column} <> '' GROUP BY {column} ORDER BY requests DESC, key LIMIT "
    ));
    qb.push_bind(limit);
    qb
}

pub fn top_neighborhoods_query(filter: &DashboardFilter, limit: i64) -> QueryBuilder<'static, Postgres> {
    top_values_query("neighborhood", filter, limit)
}

pub fn top_categories_query(filter: &DashboardFilter, limit: i64) -> QueryBuilder<'static, Postgres> {
    top_values_query("category", filter, limit)
}

pub fn status_breakdown_query(filter: &DashboardFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT COALESCE(status, '{UNKNOWN_KEY}') AS key, COUNT(*)::bigint AS requests FROM sf311"
    ));
    filter.push_where(&mut qb);
    qb.push(" GROUP BY 1 ORDER BY requests DESC, key");
    qb
}

pub fn summary_query(filter: &DashboardFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT \
            COUNT(*)::bigint AS total_requests, \
            COUNT(*) FILTER (WHERE status ILIKE 'open%') AS open_count, \
            PERCENTILE_CONT(0.5) WITHIN GROUP ( \
                ORDER BY (EXTRACT(EPOCH FROM (closed_at - created_at)) / 3600)::float8 \
            ) AS median_resolve_hours \
         FROM sf311",
    );
    filter.push_where(&mut qb);
    qb
}

pub fn recent_query(filter: &DashboardFilter, limit: i64) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT request_id, created_at, status, category, neighborhood FROM sf311",
    );
    filter.push_where(&mut qb);
    qb.push(" ORDER BY created_at DESC, request_id LIMIT ").push_bind(limit);
    qb
}

pub fn slice_query(filter: &DashboardFilter, limit: i64) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT request_id, created_at, closed_at, status, category, subcategory, neighborhood \
         FROM sf311",
    );
    filter.push_where(&mut qb);
    qb.push(" ORDER BY created_at DESC, request_id LIMIT ").push_bind(limit);
    qb
}

/// Per-key counts in `window`, null keys grouped under `(unknown)`.
///
/// Only the date window applies; category selection does not narrow movers.
pub fn counts_by_query(dimension: Dimension, window: DateWindow) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT COALESCE({}, '{}') AS key, COUNT(*)::bigint AS requests FROM sf311 WHERE ",
        dimension.column(),
        UNKNOWN_KEY
    ));
    window.push_bounds(&mut qb);
    qb.push(" GROUP BY 1");
    qb
}

/// Handle for dashboard reads; cheap to clone
#[derive(Clone)]
pub struct DashboardQueries {
    pool: PgPool,
}

impl DashboardQueries {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// `None` when the store is empty
    pub async fn date_bounds(&self) -> Result<Option<DateBounds>> {
        let (min, max): (Option<NaiveDate>, Option<NaiveDate>) = sqlx::query_as(&format!(
            "SELECT MIN({DAY_EXPR}), MAX({DAY_EXPR}) FROM sf311"
        ))
        .fetch_one(&self.pool)
        .await?;

        Ok(min.zip(max).map(|(min, max)| DateBounds { min, max }))
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        let categories: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT category FROM sf311 \
             WHERE category IS NOT NULL AND category <> '' ORDER BY 1",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn last_created_at(&self) -> Result<Option<DateTime<Utc>>> {
        let last: Option<DateTime<Utc>> = sqlx::query_scalar("SELECT MAX(created_at) FROM sf311")
            .fetch_one(&self.pool)
            .await?;
        Ok(last)
    }

    pub async fn daily_counts(&self, filter: &DashboardFilter) -> Result<Vec<DailyCount>> {
        let rows = daily_counts_query(filter)
            .build_query_as::<DailyCount>()
            .fetch_all(&self.pool)
            .await?;
        debug!(days = rows.len(), "daily_counts");
        Ok(rows)
    }

    pub async fn top_neighborhoods(&self, filter: &DashboardFilter, limit: i64) -> Result<Vec<KeyCount>> {
        let rows = top_neighborhoods_query(filter, limit)
            .build_query_as::<KeyCount>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn top_categories(&self, filter: &DashboardFilter, limit: i64) -> Result<Vec<KeyCount>> {
        let rows = top_categories_query(filter, limit)
            .build_query_as::<KeyCount>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn status_breakdown(&self, filter: &DashboardFilter) -> Result<Vec<KeyCount>> {
        let rows = status_breakdown_query(filter)
            .build_query_as::<KeyCount>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn summary(&self, filter: &DashboardFilter) -> Result<Summary> {
        let summary = summary_query(filter)
            .build_query_as::<Summary>()
            .fetch_one(&self.pool)
            .await?;
        Ok(summary)
    }

    pub async fn recent(&self, filter: &DashboardFilter, limit: i64) -> Result<Vec<RecentRequest>> {
        let rows = recent_query(filter, limit)
            .build_query_as::<RecentRequest>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn slice(&self, filter: &DashboardFilter, limit: i64) -> Result<Vec<SliceRow>> {
        let rows = slice_query(filter, limit)
            .build_query_as::<SliceRow>()
            .fetch_all(&self.pool)
            .await?;
        debug!(rows = rows.len(), limit, "slice");
        Ok(rows)
    }

    pub async fn counts_by(&self, dimension: Dimension, window: DateWindow) -> Result<Vec<KeyCount>> {
        let rows = counts_by_query(dimension, window)
            .build_query_as::<KeyCount>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
