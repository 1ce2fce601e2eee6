use super::*;
use crate::types::CampaignId;
use tokio_stream::StreamExt;

#[tokio::test]
async fn health_reports_version_and_active_tasks() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["active_tasks"], 0);

    app.flow.tasks().start("job-1").await.unwrap();
    let (_, body) = app.get("/api/health").await;
    assert_eq!(body["active_tasks"], 1);
}

#[tokio::test]
async fn openapi_json_is_served() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "LeadFlow Scraper Service");
    assert!(body["paths"]["/api/send"]["post"].is_object());
}

#[tokio::test]
async fn events_stream_dispatch_progress() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .uri("/api/events")
        .header("Accept", "text/event-stream")
        .body(Body::empty())
        .unwrap();

    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.contains("text/event-stream"), "{content_type}");

    app.write_file("c1", "leads.csv", &leads_csv(1)).await;
    app.flow.cleanup(&CampaignId::new("c1")).await.unwrap();

    let mut stream = response.into_body().into_data_stream();
    let chunk = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("an event should arrive")
        .unwrap()
        .unwrap();
    let text = String::from_utf8(chunk.to_vec()).unwrap();
    assert!(text.contains("event: folder_cleaned"), "{text}");
    assert!(text.contains(r#""campaign_id":"c1""#), "{text}");
}
