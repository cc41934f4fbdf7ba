//! Batched record export tests.
//!
//! The stitched result of a batched tabular export must reproduce the
//! single-request export of the same id set byte for byte, and batch
//! iteration must be strictly sequential and fail fast.

use redcapi::{ExportRecordsQuery, Format, RedcapClient, RedcapError, RedcapProject};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "12345678901234567890123456789012";

fn project(server: &MockServer) -> RedcapProject {
    let client = RedcapClient::new(&server.uri()).unwrap();
    RedcapProject::new(client, TOKEN).unwrap()
}

/// Mount the two calls every batched export starts with: the metadata
/// export naming the record-id field, and the id-universe listing.
async fn mount_id_universe(server: &MockServer, ids: &[u32]) {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("content=metadata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"field_name": "record_id", "form_name": "demographics"},
            {"field_name": "age", "form_name": "demographics"}
        ])))
        .mount(server)
        .await;

    let listing: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| serde_json::json!({"record_id": id.to_string()}))
        .collect();
    Mock::given(method("POST"))
        .and(body_string_contains("content=record"))
        .and(body_string_contains("fields%5B0%5D=record_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing))
        .mount(server)
        .await;
}

fn batch_csv(ids: std::ops::RangeInclusive<u32>) -> String {
    let mut csv = String::from("record_id,age\n");
    for id in ids {
        csv.push_str(&format!("{id},{}\n", id - 71));
    }
    csv
}

#[tokio::test]
async fn test_batched_csv_export_equals_single_export() {
    let server = MockServer::start().await;
    let ids: Vec<u32> = (101..=110).collect();
    mount_id_universe(&server, &ids).await;

    // Four batches of at most 3 ids; each serves its own header line.
    for (first, range) in [(101, 101..=103), (104, 104..=106), (107, 107..=109), (110, 110..=110)]
    {
        Mock::given(method("POST"))
            .and(body_string_contains("format=csv"))
            .and(body_string_contains(format!("records%5B0%5D={first}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(batch_csv(range)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let stitched = project(&server)
        .export_records_in_batches_raw(Format::Csv, 3, &ExportRecordsQuery::default())
        .await
        .unwrap();

    // What one request over the full id set would have returned.
    let single = batch_csv(101..=110);
    assert_eq!(stitched, single);
}

#[tokio::test]
async fn test_batched_decoded_export_merges_in_order() {
    let server = MockServer::start().await;
    let ids: Vec<u32> = (1..=5).collect();
    mount_id_universe(&server, &ids).await;

    for (first, range) in [(1, 1..=2), (3, 3..=4), (5, 5..=5)] {
        let rows: Vec<serde_json::Value> = range
            .map(|id: u32| serde_json::json!({"record_id": id.to_string()}))
            .collect();
        Mock::given(method("POST"))
            .and(body_string_contains(format!("records%5B0%5D={first}")))
            .and(body_string_contains("records%5B0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows))
            .mount(&server)
            .await;
    }

    let records = project(&server)
        .export_records_in_batches(2, &ExportRecordsQuery::default())
        .await
        .unwrap();

    let exported: Vec<&str> = records
        .iter()
        .map(|record| record["record_id"].as_str().unwrap())
        .collect();
    assert_eq!(exported, ["1", "2", "3", "4", "5"]);
}

#[tokio::test]
async fn test_invalid_batch_size_fails_before_any_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = project(&server)
        .export_records_in_batches(0, &ExportRecordsQuery::default())
        .await;
    assert!(matches!(result, Err(RedcapError::InvalidArgument(_))));

    let result = project(&server).record_id_batches(0, None).await;
    assert!(matches!(result, Err(RedcapError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_batched_export_rejects_explicit_record_ids() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let query = ExportRecordsQuery {
        records: vec!["1001".to_string()],
        ..Default::default()
    };
    let result = project(&server).export_records_in_batches(10, &query).await;
    assert!(matches!(result, Err(RedcapError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_batch_error_aborts_remaining_batches() {
    let server = MockServer::start().await;
    let ids: Vec<u32> = (1..=6).collect();
    mount_id_universe(&server, &ids).await;

    Mock::given(method("POST"))
        .and(body_string_contains("records%5B0%5D=1"))
        .and(body_string_contains("format=csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("record_id\n1\n2\n"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("records%5B0%5D=3"))
        .and(body_string_contains("format=csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "{\"error\":\"You do not have permission to export these records\"}",
        ))
        .mount(&server)
        .await;
    // The third batch must never be requested.
    Mock::given(method("POST"))
        .and(body_string_contains("records%5B0%5D=5"))
        .respond_with(ResponseTemplate::new(200).set_body_string("record_id\n5\n6\n"))
        .expect(0)
        .mount(&server)
        .await;

    let result = project(&server)
        .export_records_in_batches_raw(Format::Csv, 2, &ExportRecordsQuery::default())
        .await;

    match result {
        Err(RedcapError::ApiError { message, .. }) => {
            assert!(message.contains("permission"));
        }
        other => panic!("expected ApiError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_filter_is_reapplied_on_every_batch_fetch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("content=metadata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"field_name": "record_id"}
        ])))
        .mount(&server)
        .await;

    // Both the id listing and the per-batch fetch carry the filter.
    Mock::given(method("POST"))
        .and(body_string_contains("fields%5B0%5D=record_id"))
        .and(body_string_contains("filterLogic="))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"record_id": "1"}, {"record_id": "2"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("records%5B0%5D=1"))
        .and(body_string_contains("filterLogic="))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"record_id": "1", "age": "40"}, {"record_id": "2", "age": "41"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let query = ExportRecordsQuery {
        filter_logic: Some("[age] > 30".to_string()),
        ..Default::default()
    };
    let records = project(&server)
        .export_records_in_batches(5, &query)
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
}
