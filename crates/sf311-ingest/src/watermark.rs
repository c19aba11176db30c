//! High-water mark for incremental fetches

use crate::error::Result;
use crate::models::epoch_floor;
use crate::store::RequestStore;
use chrono::{DateTime, Utc};

/// Reads the latest stored event time
pub struct WatermarkResolver<'a, S: RequestStore + ?Sized> {
    store: &'a S,
    floor: DateTime<Utc>,
}

impl<'a, S: RequestStore + ?Sized> WatermarkResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            floor: epoch_floor(),
        }
    }

    /// Override the empty-store floor
    pub fn with_floor(mut self, floor: DateTime<Utc>) -> Self {
        self.floor = floor;
        self
    }

    /// `MAX(created_at)` across stored rows, or the floor when there are none.
    ///
    /// Storage failures propagate; a run cannot continue without a watermark.
    pub async fn resolve(&self) -> Result<DateTime<Utc>> {
        let watermark = self.store.max_created_at().await?.unwrap_or(self.floor);
        tracing::debug!(watermark = %watermark, "Watermark resolved");
        Ok(watermark)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use crate::models::Request;
    use async_trait::async_trait;

    struct FixedStore(std::result::Result<Option<DateTime<Utc>>, ()>);

    #[async_trait]
    impl RequestStore for FixedStore {
        async fn max_created_at(&self) -> Result<Option<DateTime<Utc>>> {
            self.0.map_err(|_| IngestError::storage("connection refused"))
        }

        async fn upsert_batch(&self, batch: &[Request]) -> Result<usize> {
            Ok(batch.len())
        }
    }

    #[tokio::test]
    async fn test_empty_store_yields_floor() {
        let store = FixedStore(Ok(None));
        let watermark = WatermarkResolver::new(&store).resolve().await.unwrap();
        assert_eq!(watermark, epoch_floor());
    }

    #[tokio::test]
    async fn test_uses_stored_maximum() {
        let max = DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let store = FixedStore(Ok(Some(max)));
        let watermark = WatermarkResolver::new(&store).resolve().await.unwrap();
        assert_eq!(watermark, max);
    }

    #[tokio::test]
    async fn test_storage_failure_is_fatal() {
        let store = FixedStore(Err(()));
        let err = WatermarkResolver::new(&store).resolve().await.unwrap_err();
        assert!(matches!(err, IngestError::Storage { .. }));
        assert!(err.is_fatal());
    }
}
