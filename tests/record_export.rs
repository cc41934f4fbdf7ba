//! Record export/import tests against a mocked REDCap endpoint.
//!
//! Uses wiremock to stand in for the API and verify the form-POST wire
//! contract.

use redcapi::{
    ExportRecordsQuery, Format, ImportRecordsOptions, ImportResult, RedcapClient,
    RedcapProject, ReturnContent,
};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "12345678901234567890123456789012";

fn project(server: &MockServer) -> RedcapProject {
    let client = RedcapClient::new(&server.uri()).unwrap();
    RedcapProject::new(client, TOKEN).unwrap()
}

#[tokio::test]
async fn test_export_records_decodes_json() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("content=record"))
        .and(body_string_contains("format=json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"record_id": "1001", "age": "42"},
            {"record_id": "1002", "age": "57"}
        ])))
        .mount(&server)
        .await;

    let records = project(&server)
        .export_records(&ExportRecordsQuery::default())
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["record_id"], "1001");
    assert_eq!(records[1]["age"], "57");
}

#[tokio::test]
async fn test_export_records_raw_csv_is_passed_through() {
    let server = MockServer::start().await;
    let csv = "record_id,age\n1001,42\n1002,57\n";

    Mock::given(method("POST"))
        .and(body_string_contains("content=record"))
        .and(body_string_contains("format=csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(csv))
        .mount(&server)
        .await;

    let body = project(&server)
        .export_records_raw(Format::Csv, &ExportRecordsQuery::default())
        .await
        .unwrap();

    assert_eq!(body, csv);
}

#[tokio::test]
async fn test_export_sends_query_parameters() {
    let server = MockServer::start().await;

    // Indexed array keys and the filter must reach the wire.
    Mock::given(method("POST"))
        .and(body_string_contains("token=12345678901234567890123456789012"))
        .and(body_string_contains("fields%5B0%5D=record_id"))
        .and(body_string_contains("fields%5B1%5D=age"))
        .and(body_string_contains("filterLogic="))
        .and(body_string_contains("type=flat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let query = ExportRecordsQuery {
        fields: vec!["record_id".to_string(), "age".to_string()],
        filter_logic: Some("[age] > 30".to_string()),
        ..Default::default()
    };
    project(&server).export_records(&query).await.unwrap();
}

#[tokio::test]
async fn test_export_records_empty_body_means_no_data() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let records = project(&server)
        .export_records(&ExportRecordsQuery::default())
        .await
        .unwrap();

    assert!(records.is_empty());
}

#[tokio::test]
async fn test_import_records_returns_count() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("content=record"))
        .and(body_string_contains("overwriteBehavior=normal"))
        .and(body_string_contains("returnContent=count"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"count": 2})),
        )
        .mount(&server)
        .await;

    let records = vec![
        serde_json::json!({"record_id": "1001", "age": "42"}),
        serde_json::json!({"record_id": "1002", "age": "57"}),
    ];
    let result = project(&server)
        .import_records(&records, &ImportRecordsOptions::default())
        .await
        .unwrap();

    assert_eq!(result, ImportResult::Count(2));
}

#[tokio::test]
async fn test_import_records_returns_ids_when_requested() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("returnContent=ids"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!(["1001", "1002"])),
        )
        .mount(&server)
        .await;

    let options = ImportRecordsOptions {
        return_content: ReturnContent::Ids,
        ..Default::default()
    };
    let result = project(&server)
        .import_records(&[serde_json::json!({"record_id": "1001"})], &options)
        .await
        .unwrap();

    assert_eq!(result.ids().unwrap(), ["1001", "1002"]);
}

#[tokio::test]
async fn test_import_overwrite_is_explicit_on_the_wire() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("overwriteBehavior=overwrite"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"count": 1})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let options = ImportRecordsOptions {
        overwrite: true,
        ..Default::default()
    };
    project(&server)
        .import_records(&[serde_json::json!({"record_id": "1001"})], &options)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_records_returns_count() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("action=delete"))
        .and(body_string_contains("records%5B0%5D=1001"))
        .and(body_string_contains("records%5B1%5D=1002"))
        .respond_with(ResponseTemplate::new(200).set_body_string("2"))
        .mount(&server)
        .await;

    let deleted = project(&server)
        .delete_records(&["1001".to_string(), "1002".to_string()], None)
        .await
        .unwrap();

    assert_eq!(deleted, 2);
}

#[tokio::test]
async fn test_delete_records_requires_explicit_ids() {
    let server = MockServer::start().await;

    // Validation fails before any request is made.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = project(&server).delete_records(&[], None).await;
    assert!(matches!(result, Err(redcapi::RedcapError::InvalidArgument(_))));
}
