//! Durable storage for canonical requests
//!
//! [`RequestStore`] is the seam between the pipeline and the database. The
//! PostgreSQL implementation writes each batch as one multi-row
//! `INSERT .. ON CONFLICT (request_id) DO UPDATE` inside its own transaction.

use crate::error::Result;
use crate::models::{Request, TABLE_NAME};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::borrow::Cow;
use std::collections::HashMap;

/// Storage operations the ingestion pipeline needs
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Latest stored `created_at`, `None` when the store is empty
    async fn max_created_at(&self) -> Result<Option<DateTime<Utc>>>;

    /// Upsert one batch atomically: either every row lands or none does.
    ///
    /// Repeated ids within the batch collapse last-wins before the write.
    /// Returns the number of distinct records written.
    async fn upsert_batch(&self, batch: &[Request]) -> Result<usize>;
}

/// Columns overwritten when the id already exists. `request_id` and `raw` are not.
pub const MUTABLE_COLUMNS: [&str; 6] = [
    "created_at",
    "closed_at",
    "status",
    "category",
    "subcategory",
    "neighborhood",
];

/// One entry per `request_id`, at its first position, carrying the values of
/// its last occurrence. Borrows when the ids are already unique.
pub fn collapse_duplicates(batch: &[Request]) -> Cow<'_, [Request]> {
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(batch.len());
    let mut rows: Vec<&Request> = Vec::with_capacity(batch.len());

    for request in batch {
        match positions.get(request.request_id.as_str()) {
            Some(&idx) => rows[idx] = request,
            None => {
                positions.insert(&request.request_id, rows.len());
                rows.push(request);
            },
        }
    }

    if rows.len() == batch.len() {
        Cow::Borrowed(batch)
    } else {
        Cow::Owned(rows.into_iter().cloned().collect())
    }
}

/// Build the batch upsert statement for `batch`.
///
/// PostgreSQL rejects a statement that touches the same id twice, so callers
/// pass the output of [`collapse_duplicates`].
pub fn build_upsert(batch: &[Request]) -> QueryBuilder<'_, Postgres> {
    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "INSERT INTO {} (request_id, created_at, closed_at, status, category, subcategory, neighborhood, raw) ",
        TABLE_NAME
    ));

    query_builder.push_values(batch, |mut b, request| {
        b.push_bind(&request.request_id)
            .push_bind(request.created_at)
            .push_bind(request.closed_at)
            .push_bind(&request.status)
            .push_bind(&request.category)
            .push_bind(&request.subcategory)
            .push_bind(&request.neighborhood)
            .push_bind(&request.raw);
    });

    let assignments = MUTABLE_COLUMNS
        .iter()
        .map(|column| format!("{column} = EXCLUDED.{column}"))
        .collect::<Vec<_>>()
        .join(", ");
    query_builder.push(format!(" ON CONFLICT (request_id) DO UPDATE SET {}", assignments));

    query_builder
}

/// PostgreSQL-backed store over the `sf311` relation
#[derive(Clone)]
pub struct PgRequestStore {
    pool: PgPool,
}

impl PgRequestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Row count, for reporting
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", TABLE_NAME))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn get(&self, request_id: &str) -> Result<Option<Request>> {
        let row = sqlx::query_as::<_, Request>(&format!(
            "SELECT request_id, created_at, closed_at, status, category, subcategory, neighborhood, raw \
             FROM {} WHERE request_id = $1",
            TABLE_NAME
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl RequestStore for PgRequestStore {
    async fn max_created_at(&self) -> Result<Option<DateTime<Utc>>> {
        let max: Option<DateTime<Utc>> =
            sqlx::query_scalar(&format!("SELECT MAX(created_at) FROM {}", TABLE_NAME))
                .fetch_one(&self.pool)
                .await?;
        Ok(max)
    }

    async fn upsert_batch(&self, batch: &[Request]) -> Result<usize> {
        let batch = collapse_duplicates(batch);
        if batch.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        build_upsert(&batch).build().execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(batch.len())
    }
}
