//! CSV extract / transform / load stages

mod common;

use common::{config_for, ts, MemoryStore};
use sf311_ingest::bulk::{extract_csv, load_csv, transform_csv};
use sf311_ingest::IngestError;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const RAW_CSV: &str = "\
\"service_request_id\",\"requested_datetime\",\"closed_date\",\"status_description\",\"service_name\",\"service_subtype\",\"neighborhoods_sffind_boundaries\"
\"5001\",\"2024-07-04T21:15:00.000\",\"\",\"Open\",\"Noise Report\",\"fireworks\",\"Outer Sunset\"
\"5002\",\"2024-07-04T20:00:00.000\",\"2024-07-05T08:00:00.000\",\"Closed\",\"Street Cleaning\",\"\",\"Tenderloin\"
";

#[tokio::test]
async fn test_extract_writes_raw_snapshot() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/resource/vw6y-z8j6.csv"))
        .and(query_param("$order", "requested_datetime DESC"))
        .and(query_param("$limit", "100000"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RAW_CSV))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for(&server.uri(), 10);
    config.data_dir = dir.path().to_path_buf();

    let report = extract_csv(&config).await.unwrap();

    assert_eq!(report.path, dir.path().join("raw").join("sf311.csv"));
    assert_eq!(report.bytes, RAW_CSV.len());
    assert_eq!(std::fs::read_to_string(&report.path).unwrap(), RAW_CSV);
}

#[tokio::test]
async fn test_transform_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw").join("sf311.csv");
    let clean = dir.path().join("clean").join("sf311.csv");
    std::fs::create_dir_all(raw.parent().unwrap()).unwrap();
    std::fs::write(&raw, RAW_CSV).unwrap();

    let transformed = transform_csv(&raw, &clean).unwrap();
    assert_eq!(transformed.output, 2);

    let store = MemoryStore::new();
    let loaded = load_csv(&clean, &store, 1).await.unwrap();

    assert_eq!(loaded.upserted, 2);
    assert_eq!(store.batch_calls(), 2);
    let row = store.get("5002").unwrap();
    assert_eq!(row.closed_at, Some(ts("2024-07-05T08:00:00Z")));
    assert_eq!(row.neighborhood.as_deref(), Some("Tenderloin"));
    assert_eq!(store.get("5001").unwrap().subcategory.as_deref(), Some("fireworks"));
}

#[tokio::test]
async fn test_load_requires_clean_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();

    let err = load_csv(&dir.path().join("missing.csv"), &store, 10)
        .await
        .unwrap_err();

    match err {
        IngestError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("expected IO error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_load_rejects_header_only_file() {
    let dir = tempfile::tempdir().unwrap();
    let clean = dir.path().join("clean.csv");
    std::fs::write(
        &clean,
        "request_id,created_at,closed_at,status,category,subcategory,neighborhood\n",
    )
    .unwrap();

    let store = MemoryStore::new();
    let err = load_csv(&clean, &store, 10).await.unwrap_err();

    match err {
        IngestError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::InvalidData),
        other => panic!("expected IO error, got {other:?}"),
    }
    assert_eq!(store.batch_calls(), 0);
}
