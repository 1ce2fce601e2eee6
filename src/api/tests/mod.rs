use super::*;
use crate::service::test_helpers::{
    RecordingMailTransport, leads_csv, recording_transport, test_config,
};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod system;

/// Router over a temporary data root, a mock scraping API and a recording transport
struct TestApp {
    dir: TempDir,
    server: MockServer,
    flow: Arc<LeadFlow>,
    config: Arc<Config>,
    transport: Arc<RecordingMailTransport>,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        let mut config = test_config(&dir, &server.uri());
        adjust(&mut config);
        let (transport, dyn_transport) = recording_transport();
        let flow = Arc::new(LeadFlow::with_transport(config.clone(), dyn_transport).unwrap());
        Self {
            dir,
            server,
            flow,
            config: Arc::new(config),
            transport,
        }
    }

    fn router(&self) -> Router {
        create_router(self.flow.clone(), self.config.clone())
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        // Extractor rejections answer with plain text
        let json = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, json)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, None).await
    }

    /// Write a lead file into a campaign folder
    async fn write_file(&self, campaign_id: &str, filename: &str, contents: &str) {
        let folder = self.dir.path().join(format!("task_{campaign_id}"));
        tokio::fs::create_dir_all(&folder).await.unwrap();
        tokio::fs::write(folder.join(filename), contents).await.unwrap();
    }

    /// Remote job that finished with one result file
    async fn mount_finished_job(&self, job_id: &str, csv: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/tasks/{job_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": job_id,
                "status": "SUCCESS",
                "results": [{"file_url": format!("{}/files/{job_id}/leads.csv", self.server.uri())}]
            })))
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/files/{job_id}/leads.csv")))
            .respond_with(ResponseTemplate::new(200).set_body_string(csv.to_string()))
            .mount(&self.server)
            .await;
    }

    async fn wait_terminal(&self, task_id: &str) -> Value {
        for _ in 0..500 {
            let (status, body) = self.get(&format!("/api/tasks/{task_id}")).await;
            assert_eq!(status, StatusCode::OK);
            if body["status"] != "processing" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {task_id} did not finish");
    }
}

fn send_body(job_id: Option<&str>) -> Value {
    json!({
        "campaign": {
            "id": "campaign-1",
            "outscraperTaskId": job_id,
            "emailTemplate": {"subject": "Hello {name}", "content": "Dear {name}, we found you."},
            "emailsPerDay": 2,
            "currentPosition": 0
        },
        "user": {"id": "user-1", "subscription": {"plan": "pro"}},
        "emailConfig": {
            "smtpServer": "smtp.example.com",
            "smtpPort": 587,
            "emailAddress": "sender@example.com",
            "emailPassword": "secret"
        }
    })
}

#[tokio::test]
async fn api_server_serves_until_shutdown() {
    let app = TestApp::with_config(|config| {
        config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    })
    .await;

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(start_api_server(
        app.flow.clone(),
        app.config.clone(),
        async move {
            rx.await.ok();
        },
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server should stop after shutdown signal")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn cors_allows_any_origin_by_default() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn cors_restricts_to_listed_origins() {
    let app = TestApp::with_config(|config| {
        config.server.api.cors_origins = vec!["http://app.example.com".to_string()];
    })
    .await;

    let allowed = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://app.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(allowed).await.unwrap();
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://app.example.com"
    );

    let denied = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://evil.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(denied).await.unwrap();
    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn cors_can_be_disabled() {
    let app = TestApp::with_config(|config| config.server.api.cors_enabled = false).await;
    let request = Request::builder()
        .uri("/api/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.router().oneshot(request).await.unwrap();
    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn api_key_guards_routes_when_configured() {
    let app = TestApp::with_config(|config| {
        config.server.api.api_key = Some("s3cret".to_string());
    })
    .await;

    let (status, body) = app.get("/api/campaigns").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder()
        .uri("/api/campaigns")
        .header("X-Api-Key", "s3cret")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn swagger_ui_follows_config() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .uri("/swagger-ui/")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let app = TestApp::with_config(|config| config.server.api.swagger_ui = false).await;
    let request = Request::builder()
        .uri("/swagger-ui/")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let app = TestApp::new().await;
    let (status, _) = app.get("/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
