//! Scrape submission, send trigger and task status handlers.

use crate::api::AppState;
use crate::error::Result;
use crate::types::{ScrapeRequest, SendRequest, TaskEntry, TaskResponse};
use axum::{
    Json,
    extract::{Path, State},
};

/// POST /scrape - Submit a scraping job for a campaign
#[utoipa::path(
    post,
    path = "/api/scrape",
    tag = "sending",
    request_body = ScrapeRequest,
    responses(
        (status = 200, description = "Scraping job accepted by the remote API", body = TaskResponse),
        (status = 400, description = "Campaign has no location", body = crate::error::ApiError),
        (status = 502, description = "Remote API failure", body = crate::error::ApiError)
    )
)]
pub async fn start_scrape(
    State(state): State<AppState>,
    Json(request): Json<ScrapeRequest>,
) -> Result<Json<TaskResponse>> {
    let response = state.flow.start_scrape(request).await?;
    Ok(Json(response))
}

/// POST /send - Download the job's result file and email one batch of leads
///
/// Returns immediately; poll `GET /api/tasks/{task_id}` for the outcome.
#[utoipa::path(
    post,
    path = "/api/send",
    tag = "sending",
    request_body = SendRequest,
    responses(
        (status = 200, description = "Send task started", body = TaskResponse),
        (status = 400, description = "Campaign has no outscraperTaskId", body = crate::error::ApiError),
        (status = 409, description = "A send for this job is still processing", body = crate::error::ApiError)
    )
)]
pub async fn trigger_send(
    State(state): State<AppState>,
    Json(request): Json<SendRequest>,
) -> Result<Json<TaskResponse>> {
    let response = state.flow.trigger_send(request).await?;
    Ok(Json(response))
}

/// GET /tasks/:id - Status of a background send
#[utoipa::path(
    get,
    path = "/api/tasks/{task_id}",
    tag = "sending",
    params(
        ("task_id" = String, Path, description = "Remote job ID the send was started for")
    ),
    responses(
        (status = 200, description = "Task status", body = TaskEntry),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn get_task_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskEntry>> {
    let entry = state.flow.task_status(&task_id).await?;
    Ok(Json(entry))
}
