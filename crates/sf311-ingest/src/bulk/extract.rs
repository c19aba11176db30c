//! Bulk CSV snapshot download

use super::ensure_parent;
use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::normalize::{EVENT_TIME_FIELD, SOURCE_FIELDS};
use reqwest::Client;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    pub path: PathBuf,
    pub bytes: usize,
}

/// Download the newest `extract_limit` requests as CSV into the raw data path.
pub async fn extract_csv(config: &IngestConfig) -> Result<ExtractReport> {
    config.validate()?;

    let url = config.csv_url();
    let client = Client::builder().timeout(config.http_timeout()).build()?;

    let select = SOURCE_FIELDS.join(",");
    let order = format!("{} DESC", EVENT_TIME_FIELD);
    let limit = config.extract_limit.to_string();

    info!(url = %url, limit = config.extract_limit, "Requesting CSV snapshot");

    let mut request = client.get(&url).query(&[
        ("$select", select.as_str()),
        ("$order", order.as_str()),
        ("$limit", limit.as_str()),
    ]);
    if let Some(token) = &config.app_token {
        request = request.header("X-App-Token", token);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(500).collect();
        return Err(IngestError::transport(format!("{} returned {}: {}", url, status, snippet)));
    }

    let body = response.bytes().await?;
    let path = config.raw_csv_path();
    ensure_parent(&path)?;
    tokio::fs::write(&path, &body).await?;

    info!(path = %path.display(), bytes = body.len(), "Wrote raw CSV");

    Ok(ExtractReport {
        path,
        bytes: body.len(),
    })
}
