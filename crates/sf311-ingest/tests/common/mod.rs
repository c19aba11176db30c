//! Shared fixtures for sf311-ingest integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sf311_ingest::store::collapse_duplicates;
use sf311_ingest::{IngestConfig, IngestError, RawRecord, Request, RequestStore, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sf311_ingest=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Turn a `json!({...})` literal into a raw record
pub fn raw(value: Value) -> RawRecord {
    match value {
        Value::Object(map) => map,
        other => panic!("raw records must be JSON objects, got {other}"),
    }
}

pub fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("valid RFC3339 timestamp")
        .with_timezone(&Utc)
}

/// Config pointed at a mock server
pub fn config_for(base_url: &str, page_size: usize) -> IngestConfig {
    IngestConfig {
        base_url: base_url.to_string(),
        page_size,
        http_timeout_secs: 5,
        ..IngestConfig::default()
    }
}

/// In-memory store with the same conflict rule as the SQL upsert.
///
/// A batch either applies fully or not at all, and repeated ids inside one
/// batch collapse last-wins exactly as the PostgreSQL store does. `fail_on_batch(k)` makes the
/// k-th call (1-based) to `upsert_batch` fail before touching anything.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<String, Request>>,
    calls: AtomicUsize,
    fail_on: Option<usize>,
    fail_reads: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: impl IntoIterator<Item = Request>) -> Self {
        let store = Self::default();
        {
            let mut map = store.rows.lock().unwrap();
            for row in rows {
                map.insert(row.request_id.clone(), row);
            }
        }
        store
    }

    pub fn fail_on_batch(mut self, batch_no: usize) -> Self {
        self.fail_on = Some(batch_no);
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn get(&self, request_id: &str) -> Option<Request> {
        self.rows.lock().unwrap().get(request_id).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Request> {
        self.rows.lock().unwrap().clone()
    }

    pub fn batch_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn max_created_at(&self) -> Result<Option<DateTime<Utc>>> {
        if self.fail_reads {
            return Err(IngestError::storage("connection refused"));
        }
        Ok(self.rows.lock().unwrap().values().map(|r| r.created_at).max())
    }

    async fn upsert_batch(&self, batch: &[Request]) -> Result<usize> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on == Some(call) {
            return Err(IngestError::storage("injected failure"));
        }

        let batch = collapse_duplicates(batch);
        let mut rows = self.rows.lock().unwrap();
        for request in batch.iter() {
            match rows.get_mut(&request.request_id) {
                Some(existing) => existing.apply_update(request),
                None => {
                    rows.insert(request.request_id.clone(), request.clone());
                },
            }
        }
        Ok(batch.len())
    }
}
