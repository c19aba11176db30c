//! Cached dashboard reads
//!
//! [`Dashboard`] fronts [`DashboardQueries`] with a [`QueryCache`] and
//! assembles everything one render needs into a [`DashboardSnapshot`].

use crate::cache::QueryCache;
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::filter::{DashboardFilter, DateWindow};
use crate::insights::{top_area, top_movers, trend_pct, Insights, Mover, MoverWindows, TOP_MOVERS};
use crate::models::{DailyCount, DateBounds, Dimension, KeyCount, RecentRequest, SliceRow, Summary};
use crate::queries::{DashboardQueries, EXPORT_LIMIT, RECENT_LIMIT, TOP_CATEGORIES, TOP_NEIGHBORHOODS};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

/// Everything shown for one filter
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSnapshot {
    pub filter: DashboardFilter,
    pub last_created_at: Option<DateTime<Utc>>,
    pub summary: Summary,
    pub daily: Vec<DailyCount>,
    pub top_neighborhoods: Vec<KeyCount>,
    pub top_categories: Vec<KeyCount>,
    pub status_breakdown: Vec<KeyCount>,
    pub recent: Vec<RecentRequest>,
    pub insights: Insights,
}

/// Turn "not enough history" into `None`; log and return anything else.
pub fn skip_insufficient_history<T>(result: Result<T>, insight: &str) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_insufficient_history() => {
            debug!(insight, reason = %e, "Insight skipped");
            Ok(None)
        },
        Err(e) => {
            error!(insight, error = %e, "Insight computation failed");
            Err(e)
        },
    }
}

pub struct Dashboard {
    queries: DashboardQueries,
    cache: QueryCache,
    refresh_each_render: bool,
}

impl Dashboard {
    pub fn new(queries: DashboardQueries, config: &DashboardConfig) -> Self {
        Self {
            queries,
            cache: QueryCache::new(config.cache_ttl()),
            refresh_each_render: false,
        }
    }

    /// Clear the cache before every render instead of honoring the TTL
    pub fn with_refresh_each_render(mut self, refresh: bool) -> Self {
        self.refresh_each_render = refresh;
        self
    }

    /// Call before each render: a full refresh when requested, otherwise
    /// only expired entries are dropped.
    pub fn prepare_render(&self) {
        if self.refresh_each_render {
            self.refresh();
        } else {
            let remaining = self.cache.purge_expired();
            debug!(remaining, "Expired cache entries purged");
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Manual refresh: the next read of every query goes to the database
    pub fn refresh(&self) {
        self.cache.invalidate();
        info!("Dashboard cache cleared");
    }

    pub async fn date_bounds(&self) -> Result<Option<DateBounds>> {
        self.cache
            .get_or_load("date_bounds", || self.queries.date_bounds())
            .await
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        self.cache
            .get_or_load("categories", || self.queries.categories())
            .await
    }

    pub async fn last_created_at(&self) -> Result<Option<DateTime<Utc>>> {
        self.cache
            .get_or_load("last_created_at", || self.queries.last_created_at())
            .await
    }

    pub async fn daily_counts(&self, filter: &DashboardFilter) -> Result<Vec<DailyCount>> {
        let key = format!("daily_counts|{}", filter.cache_key());
        self.cache
            .get_or_load(&key, || self.queries.daily_counts(filter))
            .await
    }

    pub async fn top_neighborhoods(&self, filter: &DashboardFilter) -> Result<Vec<KeyCount>> {
        let key = format!("top_neighborhoods|{}", filter.cache_key());
        self.cache
            .get_or_load(&key, || self.queries.top_neighborhoods(filter, TOP_NEIGHBORHOODS))
            .await
    }

    pub async fn top_categories(&self, filter: &DashboardFilter) -> Result<Vec<KeyCount>> {
        let key = format!("top_categories|{}", filter.cache_key());
        self.cache
            .get_or_load(&key, || self.queries.top_categories(filter, TOP_CATEGORIES))
            .await
    }

    pub async fn status_breakdown(&self, filter: &DashboardFilter) -> Result<Vec<KeyCount>> {
        let key = format!("status_breakdown|{}", filter.cache_key());
        self.cache
            .get_or_load(&key, || self.queries.status_breakdown(filter))
            .await
    }

    pub async fn summary(&self, filter: &DashboardFilter) -> Result<Summary> {
        let key = format!("summary|{}", filter.cache_key());
        self.cache
            .get_or_load(&key, || self.queries.summary(filter))
            .await
    }

    pub async fn recent(&self, filter: &DashboardFilter) -> Result<Vec<RecentRequest>> {
        let key = format!("recent|{}", filter.cache_key());
        self.cache
            .get_or_load(&key, || self.queries.recent(filter, RECENT_LIMIT))
            .await
    }

    /// Rows for CSV export, newest first
    pub async fn slice(&self, filter: &DashboardFilter) -> Result<Vec<SliceRow>> {
        let key = format!("slice|{}", filter.cache_key());
        self.cache
            .get_or_load(&key, || self.queries.slice(filter, EXPORT_LIMIT))
            .await
    }

    pub async fn counts_by(&self, dimension: Dimension, window: DateWindow) -> Result<Vec<KeyCount>> {
        let key = format!("counts_by|{}|{}", dimension.column(), window);
        self.cache
            .get_or_load(&key, || self.queries.counts_by(dimension, window))
            .await
    }

    async fn movers(&self, dimension: Dimension, windows: &MoverWindows) -> Result<Vec<Mover>> {
        let current = self.counts_by(dimension, windows.current).await?;
        let previous = self.counts_by(dimension, windows.previous).await?;
        Ok(top_movers(&current, &previous, TOP_MOVERS))
    }

    /// Trend, busiest area and week-over-week movers for `filter`.
    ///
    /// Short ranges leave the affected fields `None`. Query failures while
    /// computing movers are logged and returned.
    pub async fn insights(
        &self,
        filter: &DashboardFilter,
        daily: &[DailyCount],
        top_neighborhoods: &[KeyCount],
    ) -> Result<Insights> {
        let trend_pct = skip_insufficient_history(trend_pct(daily), "trend")?;

        let windows = skip_insufficient_history(MoverWindows::for_filter(filter), "movers")?;
        let (category_movers, neighborhood_movers) = match windows {
            Some(windows) => {
                let categories = skip_insufficient_history(
                    self.movers(Dimension::Category, &windows).await,
                    "category_movers",
                )?;
                let neighborhoods = skip_insufficient_history(
                    self.movers(Dimension::Neighborhood, &windows).await,
                    "neighborhood_movers",
                )?;
                (categories, neighborhoods)
            },
            None => (None, None),
        };

        Ok(Insights {
            trend_pct,
            top_area: top_area(top_neighborhoods).cloned(),
            category_movers,
            neighborhood_movers,
        })
    }

    /// Run every query for `filter`
    pub async fn snapshot(&self, filter: &DashboardFilter) -> Result<DashboardSnapshot> {
        let daily = self.daily_counts(filter).await?;
        let top_neighborhoods = self.top_neighborhoods(filter).await?;
        let insights = self.insights(filter, &daily, &top_neighborhoods).await?;

        let snapshot = DashboardSnapshot {
            filter: filter.clone(),
            last_created_at: self.last_created_at().await?,
            summary: self.summary(filter).await?,
            top_categories: self.top_categories(filter).await?,
            status_breakdown: self.status_breakdown(filter).await?,
            recent: self.recent(filter).await?,
            daily,
            top_neighborhoods,
            insights,
        };

        info!(
            filter = %filter.cache_key(),
            days = snapshot.daily.len(),
            total = snapshot.summary.total_requests,
            cached = self.cache.len(),
            "Dashboard snapshot ready"
        );
        Ok(snapshot)
    }
}
