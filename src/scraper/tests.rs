#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ScraperClient {
    let config = ScraperConfig {
        base_url: server.uri(),
        api_key: Some("test-key".into()),
        request_timeout: Duration::from_secs(5),
        ..ScraperConfig::default()
    };
    ScraperClient::new(&config).unwrap()
}

async fn mount_locations(server: &MockServer, country: &str, regions: &[&str]) {
    let items: Vec<Value> = regions.iter().map(|r| json!({"v": r})).collect();
    Mock::given(method("GET"))
        .and(path("/locations"))
        .and(query_param("country", country))
        .and(header("X-API-KEY", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": items})))
        .mount(server)
        .await;
}

fn status(raw: Value) -> JobStatus {
    JobStatus::from_raw("job-1", raw)
}

#[test]
fn client_requires_api_key() {
    let err = ScraperClient::new(&ScraperConfig::default()).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

#[test]
fn resolve_rejects_unfinished_jobs() {
    let err = resolve_result_url(&status(json!({"status": "PENDING"}))).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Task job-1 is not completed. Current status: PENDING"
    );
}

#[test]
fn resolve_requires_results_and_file_url() {
    let err = resolve_result_url(&status(json!({"status": "SUCCESS", "results": []}))).unwrap_err();
    assert!(matches!(err, Error::Dispatch(DispatchError::NoResults { .. })));

    let err = resolve_result_url(&status(json!({"status": "SUCCESS"}))).unwrap_err();
    assert!(matches!(err, Error::Dispatch(DispatchError::NoResults { .. })));

    let err = resolve_result_url(&status(json!({"status": "SUCCESS", "results": [{"id": 1}]})))
        .unwrap_err();
    assert!(matches!(err, Error::Dispatch(DispatchError::MissingFileUrl { .. })));
}

#[test]
fn resolve_uses_first_result() {
    let url = resolve_result_url(&status(json!({
        "status": "SUCCESS",
        "results": [{"file_url": "https://files.test/a.csv"}, {"file_url": "https://files.test/b.csv"}]
    })))
    .unwrap();
    assert_eq!(url, "https://files.test/a.csv");
}

#[test]
fn filename_comes_from_url_path() {
    assert_eq!(filename_from_url("https://f.test/x/leads.csv?sig=1", "j"), "leads.csv");
    assert_eq!(filename_from_url("https://f.test/x/download", "j"), "task_j.csv");
    assert_eq!(filename_from_url("https://f.test/", "j"), "task_j.csv");
    assert_eq!(filename_from_url("not a url", "j"), "task_j.csv");
}

#[tokio::test]
async fn locations_are_prefixed_with_country() {
    let server = MockServer::start().await;
    mount_locations(&server, "IT", &["Lombardy", "", "Lazio"]).await;

    let result = client(&server).get_locations("IT").await.unwrap();
    assert_eq!(result.locations, vec!["IT>Lombardy", "IT>Lazio"]);
    assert_eq!(result.total_count, 2);
}

#[tokio::test]
async fn submit_posts_google_maps_task() {
    let server = MockServer::start().await;
    mount_locations(&server, "IT", &["Lombardy"]).await;
    Mock::given(method("POST"))
        .and(path("/tasks"))
        .and(header("X-API-KEY", "test-key"))
        .and(body_partial_json(json!({
            "service_name": "google_maps_service_v2",
            "categories": ["restaurant"],
            "locations": ["IT>Lombardy"],
            "region": "IT",
            "limit": 100,
            "language": "en",
            "organizationsPerQueryLimit": 500,
            "useZipCodes": true,
            "dropDuplicates": "true",
            "enrichments": ["domains_service"],
            "settings": {"output_extension": "csv"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "job-42"})))
        .expect(1)
        .mount(&server)
        .await;

    let job = client(&server)
        .submit_job(Some("restaurant"), "IT", Some(100))
        .await
        .unwrap();
    assert_eq!(job.task_id, "job-42");
    assert_eq!(job.locations, vec!["IT>Lombardy"]);
}

#[tokio::test]
async fn remote_errors_carry_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/job-1"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let err = client(&server).get_task_info("job-1").await.unwrap_err();
    match err {
        Error::Remote { status, message } => {
            assert_eq!(status, Some(401));
            assert_eq!(message, "bad key");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn job_status_reads_status_and_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "job-1",
            "status": "SUCCESS",
            "results": [{"file_url": "https://files.test/leads.csv"}]
        })))
        .mount(&server)
        .await;

    let status = client(&server).get_job_status("job-1").await.unwrap();
    assert!(status.is_success());
    assert_eq!(
        resolve_result_url(&status).unwrap(),
        "https://files.test/leads.csv"
    );
}

#[tokio::test]
async fn result_file_is_streamed_to_disk() {
    let server = MockServer::start().await;
    let body = "name,email_1\nAcme,info@acme.test\n";
    Mock::given(method("GET"))
        .and(path("/files/leads.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("task_job-1");
    let url = format!("{}/files/leads.csv", server.uri());

    let file = client(&server)
        .fetch_result_file("job-1", &url, &dest)
        .await
        .unwrap();

    assert_eq!(file.filename, "leads.csv");
    assert_eq!(file.file_size, body.len() as u64);
    assert_eq!(file.local_path, dest.join("leads.csv"));
    assert_eq!(tokio::fs::read_to_string(&file.local_path).await.unwrap(), body);
}

#[tokio::test]
async fn failed_download_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/gone.csv"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let url = format!("{}/files/gone.csv", server.uri());
    let err = client(&server)
        .fetch_result_file("job-1", &url, dir.path())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Remote { status: Some(404), .. }));
    assert!(!dir.path().join("gone.csv").exists());
}
