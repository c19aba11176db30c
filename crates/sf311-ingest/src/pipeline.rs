//! Incremental ingestion run
//!
//! `Start -> ResolveWatermark -> Fetch -> Normalize -> Upsert -> Done`, each
//! stage finishing before the next begins. A fatal error in any stage ends the
//! run in `Failed`, reported together with the stage it happened in. There is
//! no automatic retry; re-running is safe because writes are upserts.

use crate::error::IngestError;
use crate::fetch::RecordSource;
use crate::normalize::{normalize_with_report, NormalizeReport};
use crate::store::RequestStore;
use crate::upsert::BatchUpserter;
use crate::watermark::WatermarkResolver;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Start,
    ResolveWatermark,
    Fetch,
    Normalize,
    Upsert,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Start => "start",
            PipelineStage::ResolveWatermark => "resolve_watermark",
            PipelineStage::Fetch => "fetch",
            PipelineStage::Normalize => "normalize",
            PipelineStage::Upsert => "upsert",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run that stopped in `stage`
#[derive(Debug, thiserror::Error)]
#[error("ingestion failed during {stage}: {source}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    #[source]
    pub source: IngestError,
}

/// What a completed run did
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub watermark: DateTime<Utc>,
    pub fetched: usize,
    pub normalized: NormalizeReport,
    pub upserted: usize,
    pub elapsed: Duration,
}

pub struct IngestPipeline<'a, R: RecordSource + ?Sized, S: RequestStore + ?Sized> {
    source: &'a R,
    store: &'a S,
    batch_size: usize,
    stage: PipelineStage,
}

impl<'a, R, S> IngestPipeline<'a, R, S>
where
    R: RecordSource + ?Sized,
    S: RequestStore + ?Sized,
{
    pub fn new(source: &'a R, store: &'a S, batch_size: usize) -> Self {
        Self {
            source,
            store,
            batch_size,
            stage: PipelineStage::Start,
        }
    }

    /// Stage the pipeline is in (or ended in)
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    fn enter(&mut self, stage: PipelineStage) {
        info!(from = %self.stage, to = %stage, "Pipeline stage");
        self.stage = stage;
    }

    fn fail(&mut self, source: IngestError) -> PipelineError {
        let stage = self.stage;
        error!(stage = %stage, error = %source, "Ingestion run failed");
        self.stage = PipelineStage::Failed;
        PipelineError { stage, source }
    }

    /// Execute one full run
    pub async fn run(&mut self) -> Result<PipelineReport, PipelineError> {
        let started = Instant::now();

        self.enter(PipelineStage::ResolveWatermark);
        let watermark = match WatermarkResolver::new(self.store).resolve().await {
            Ok(watermark) => watermark,
            Err(e) => return Err(self.fail(e)),
        };
        info!(watermark = %watermark, "Fetching rows after watermark");

        self.enter(PipelineStage::Fetch);
        let raw = match self.source.fetch_since(watermark).await {
            Ok(raw) => raw,
            Err(e) => return Err(self.fail(e)),
        };
        info!(fetched = raw.len(), "Fetched raw records");

        self.enter(PipelineStage::Normalize);
        let (requests, normalized) = normalize_with_report(&raw);
        drop(raw);
        info!(
            input = normalized.input,
            kept = normalized.output,
            missing_request_id = normalized.missing_request_id,
            missing_created_at = normalized.missing_created_at,
            duplicates = normalized.duplicates_collapsed,
            coerced_fields = normalized.coerced_fields,
            "Normalized records"
        );

        self.enter(PipelineStage::Upsert);
        let upserter = BatchUpserter::new(self.store).with_batch_size(self.batch_size);
        let upserted = match upserter.upsert(&requests).await {
            Ok(n) => n,
            Err(e) => return Err(self.fail(e)),
        };

        self.enter(PipelineStage::Done);
        let report = PipelineReport {
            watermark,
            fetched: normalized.input,
            normalized,
            upserted,
            elapsed: started.elapsed(),
        };
        info!(
            watermark = %report.watermark,
            fetched = report.fetched,
            upserted = report.upserted,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Ingestion run complete"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(PipelineStage::ResolveWatermark.to_string(), "resolve_watermark");
        assert_eq!(PipelineStage::Failed.as_str(), "failed");
    }

    #[test]
    fn test_error_message_names_stage() {
        let err = PipelineError {
            stage: PipelineStage::Fetch,
            source: IngestError::transport("503 Service Unavailable"),
        };
        assert_eq!(
            err.to_string(),
            "ingestion failed during fetch: Transport error: 503 Service Unavailable"
        );
    }
}
