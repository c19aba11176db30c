//! End-to-end incremental runs: mock source, in-memory store

mod common;

use common::{config_for, init_tracing, ts, MemoryStore};
use serde_json::json;
use sf311_ingest::{epoch_floor, IngestError, IngestPipeline, PipelineStage, Request, SocrataClient};
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const RESOURCE: &str = "/resource/vw6y-z8j6.json";

#[tokio::test]
async fn test_first_run_loads_everything_after_floor() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(RESOURCE))
        .and(query_param("$where", "requested_datetime > '2000-01-01T00:00:00.000'"))
        .and(query_param("$offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"service_request_id": "101", "requested_datetime": "2024-01-05T10:00:00.000",
             "status_description": "Open", "service_name": "Graffiti",
             "neighborhoods_sffind_boundaries": "Mission"},
            {"service_request_id": "102", "requested_datetime": "2024-01-05T11:00:00.000",
             "status_description": "Closed", "closed_date": "2024-01-06T09:30:00.000"},
            {"service_request_id": "101", "requested_datetime": "2024-01-05T12:00:00.000",
             "status_description": "Closed"},
            {"requested_datetime": "2024-01-05T13:00:00.000"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(RESOURCE))
        .and(query_param("$offset", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let source = SocrataClient::new(&config_for(&server.uri(), 4)).unwrap();
    let store = MemoryStore::new();
    let mut pipeline = IngestPipeline::new(&source, &store, 2);

    let report = pipeline.run().await.unwrap();

    assert_eq!(pipeline.stage(), PipelineStage::Done);
    assert_eq!(report.watermark, epoch_floor());
    assert_eq!(report.fetched, 4);
    assert_eq!(report.normalized.missing_request_id, 1);
    assert_eq!(report.normalized.duplicates_collapsed, 1);
    assert_eq!(report.upserted, 2);

    let first = store.get("101").unwrap();
    assert_eq!(first.created_at, ts("2024-01-05T12:00:00Z"));
    assert_eq!(first.status.as_deref(), Some("Closed"));
    assert_eq!(first.neighborhood, None);
    assert_eq!(
        store.get("102").unwrap().closed_at,
        Some(ts("2024-01-06T09:30:00Z"))
    );
}

#[tokio::test]
async fn test_second_run_starts_from_stored_maximum() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(RESOURCE))
        .and(query_param("$where", "requested_datetime > '2024-03-10T17:45:00.000'"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let store = MemoryStore::with_rows([
        Request::new("1", ts("2024-03-09T08:00:00Z")),
        Request::new("2", ts("2024-03-10T17:45:00Z")),
    ]);
    let source = SocrataClient::new(&config_for(&server.uri(), 100)).unwrap();

    let report = IngestPipeline::new(&source, &store, 100).run().await.unwrap();

    assert_eq!(report.watermark, ts("2024-03-10T17:45:00Z"));
    assert_eq!(report.fetched, 0);
    assert_eq!(report.upserted, 0);
    assert_eq!(store.batch_calls(), 0);
}

#[tokio::test]
async fn test_fetch_failure_reported_with_stage() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(RESOURCE))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store = MemoryStore::new();
    let source = SocrataClient::new(&config_for(&server.uri(), 100)).unwrap();
    let mut pipeline = IngestPipeline::new(&source, &store, 100);

    let err = pipeline.run().await.unwrap_err();

    assert_eq!(err.stage, PipelineStage::Fetch);
    assert!(matches!(err.source, IngestError::Transport(_)));
    assert_eq!(pipeline.stage(), PipelineStage::Failed);
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn test_watermark_failure_stops_before_fetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let store = MemoryStore::new().failing_reads();
    let source = SocrataClient::new(&config_for(&server.uri(), 100)).unwrap();

    let err = IngestPipeline::new(&source, &store, 100)
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.stage, PipelineStage::ResolveWatermark);
    assert!(matches!(err.source, IngestError::Storage { .. }));
}

#[tokio::test]
async fn test_upsert_failure_reported_with_stage() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(RESOURCE))
        .and(query_param("$offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"service_request_id": "1", "requested_datetime": "2024-01-01T00:00:01.000"},
            {"service_request_id": "2", "requested_datetime": "2024-01-01T00:00:02.000"},
            {"service_request_id": "3", "requested_datetime": "2024-01-01T00:00:03.000"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(RESOURCE))
        .and(query_param("$offset", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = MemoryStore::new().fail_on_batch(2);
    let source = SocrataClient::new(&config_for(&server.uri(), 10)).unwrap();

    let err = IngestPipeline::new(&source, &store, 1)
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.stage, PipelineStage::Upsert);
    assert_eq!(store.len(), 1);
    assert!(store.get("1").is_some());
}
