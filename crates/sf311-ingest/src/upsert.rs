//! Batched, idempotent upserts
//!
//! Records are cut into fixed-size batches straight from the input slice.
//! Every batch commits on its own, so a failure at batch `k` leaves batches
//! `1..k` durable and `k..` unwritten.

use crate::config::{DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE};
use crate::error::{IngestError, Result};
use crate::models::Request;
use crate::store::RequestStore;
use tracing::info;

pub struct BatchUpserter<'a, S: RequestStore + ?Sized> {
    store: &'a S,
    batch_size: usize,
}

impl<'a, S: RequestStore + ?Sized> BatchUpserter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Use a custom batch size, clamped to `1..=MAX_BATCH_SIZE`
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Write `records` and return how many were processed.
    ///
    /// Inserts and updates are not distinguished. On a failed batch the
    /// remaining batches are skipped and the error names the batch.
    pub async fn upsert(&self, records: &[Request]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let total_batches = records.len().div_ceil(self.batch_size);
        let mut written = 0;

        for (idx, batch) in records.chunks(self.batch_size).enumerate() {
            let batch_no = idx + 1;

            let count = self
                .store
                .upsert_batch(batch)
                .await
                .map_err(|e| annotate(e, batch_no, total_batches, written))?;

            written += count;
            info!(batch = batch_no, total_batches, rows = count, written, "Upserted batch");
        }

        Ok(written)
    }
}

fn annotate(err: IngestError, batch_no: usize, total: usize, committed: usize) -> IngestError {
    let context = format!(
        "batch {}/{} failed after {} rows committed",
        batch_no, total, committed
    );
    match err {
        IngestError::Storage { message, source } => IngestError::Storage {
            message: format!("{}: {}", context, message),
            source,
        },
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::epoch_floor;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        batches: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl RequestStore for RecordingStore {
        async fn max_created_at(&self) -> Result<Option<DateTime<Utc>>> {
            Ok(None)
        }

        async fn upsert_batch(&self, batch: &[Request]) -> Result<usize> {
            self.batches.lock().unwrap().push(batch.len());
            Ok(batch.len())
        }
    }

    fn requests(n: usize) -> Vec<Request> {
        (0..n).map(|i| Request::new(i.to_string(), epoch_floor())).collect()
    }

    #[tokio::test]
    async fn test_partitions_into_fixed_batches() {
        let store = RecordingStore::default();
        let upserter = BatchUpserter::new(&store).with_batch_size(2000);

        let written = upserter.upsert(&requests(4500)).await.unwrap();

        assert_eq!(written, 4500);
        assert_eq!(*store.batches.lock().unwrap(), vec![2000, 2000, 500]);
    }

    #[tokio::test]
    async fn test_empty_input_touches_nothing() {
        let store = RecordingStore::default();
        let written = BatchUpserter::new(&store).upsert(&[]).await.unwrap();

        assert_eq!(written, 0);
        assert!(store.batches.lock().unwrap().is_empty());
    }

    #[test]
    fn test_batch_size_clamped() {
        let store = RecordingStore::default();
        assert_eq!(BatchUpserter::new(&store).with_batch_size(0).batch_size(), 1);
        assert_eq!(
            BatchUpserter::new(&store).with_batch_size(65_535).batch_size(),
            MAX_BATCH_SIZE
        );
    }

    #[tokio::test]
    async fn test_oversized_batch_size_splits_at_limit() {
        let store = RecordingStore::default();
        let upserter = BatchUpserter::new(&store).with_batch_size(MAX_BATCH_SIZE * 2);

        upserter.upsert(&requests(MAX_BATCH_SIZE + 5)).await.unwrap();

        assert_eq!(*store.batches.lock().unwrap(), vec![MAX_BATCH_SIZE, 5]);
    }

    #[test]
    fn test_annotate_names_failing_batch() {
        let err = annotate(IngestError::storage("deadlock detected"), 3, 5, 4000);
        assert_eq!(
            err.to_string(),
            "Storage error: batch 3/5 failed after 4000 rows committed: deadlock detected"
        );
    }
}
