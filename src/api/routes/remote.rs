//! Remote scraping API views and result file downloads.

use super::{
    DownloadFileQuery, DownloadResponse, JobStatusResponse, LocationsResponse, SUCCESS,
    TaskInfoResponse,
};
use crate::api::AppState;
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, Query, State},
};

/// Country used when none is given
pub const DEFAULT_COUNTRY: &str = "IT";

async fn locations_response(state: &AppState, country: &str) -> Result<Json<LocationsResponse>> {
    let data = state.flow.locations(country).await?;
    Ok(Json(LocationsResponse {
        status: SUCCESS.to_string(),
        message: format!(
            "Successfully retrieved {} locations for {country}",
            data.total_count
        ),
        data,
    }))
}

/// GET /locations/:country - Regions of a country
#[utoipa::path(
    get,
    path = "/api/locations/{country}",
    tag = "remote",
    params(
        ("country" = String, Path, description = "Two-letter country code")
    ),
    responses(
        (status = 200, description = "Regions formatted as COUNTRY>REGION", body = LocationsResponse),
        (status = 502, description = "Remote API failure", body = crate::error::ApiError)
    )
)]
pub async fn get_locations(
    State(state): State<AppState>,
    Path(country): Path<String>,
) -> Result<Json<LocationsResponse>> {
    locations_response(&state, &country).await
}

/// GET /locations - Regions of the default country
#[utoipa::path(
    get,
    path = "/api/locations",
    tag = "remote",
    responses(
        (status = 200, description = "Regions of IT", body = LocationsResponse),
        (status = 502, description = "Remote API failure", body = crate::error::ApiError)
    )
)]
pub async fn get_default_locations(State(state): State<AppState>) -> Result<Json<LocationsResponse>> {
    locations_response(&state, DEFAULT_COUNTRY).await
}

/// GET /scrape/task/:id - Status and results of a remote job
#[utoipa::path(
    get,
    path = "/api/scrape/task/{task_id}",
    tag = "remote",
    params(
        ("task_id" = String, Path, description = "Remote job ID")
    ),
    responses(
        (status = 200, description = "Job status", body = JobStatusResponse),
        (status = 502, description = "Remote API failure", body = crate::error::ApiError)
    )
)]
pub async fn get_scrape_task_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<JobStatusResponse>> {
    let data = state.flow.job_status(&task_id).await?;
    Ok(Json(JobStatusResponse {
        status: SUCCESS.to_string(),
        message: format!("Successfully retrieved task status for {task_id}"),
        data,
    }))
}

async fn task_info_response(state: &AppState, task_id: &str) -> Result<Json<TaskInfoResponse>> {
    let data = state.flow.task_info(task_id).await?;
    Ok(Json(TaskInfoResponse {
        status: SUCCESS.to_string(),
        message: format!("Successfully retrieved task info for {task_id}"),
        data,
    }))
}

/// GET /scrape/task/:id/info - Full remote task document
#[utoipa::path(
    get,
    path = "/api/scrape/task/{task_id}/info",
    tag = "remote",
    params(
        ("task_id" = String, Path, description = "Remote job ID")
    ),
    responses(
        (status = 200, description = "Task document", body = TaskInfoResponse),
        (status = 502, description = "Remote API failure", body = crate::error::ApiError)
    )
)]
pub async fn get_scrape_task_info(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskInfoResponse>> {
    task_info_response(&state, &task_id).await
}

/// GET /task/:id - Full remote task document
#[utoipa::path(
    get,
    path = "/api/task/{task_id}",
    tag = "remote",
    params(
        ("task_id" = String, Path, description = "Remote job ID")
    ),
    responses(
        (status = 200, description = "Task document", body = TaskInfoResponse),
        (status = 502, description = "Remote API failure", body = crate::error::ApiError)
    )
)]
pub async fn get_task_info(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskInfoResponse>> {
    task_info_response(&state, &task_id).await
}

/// GET /task/:id/raw - Remote task document, unwrapped
///
/// A document without `status` is reported as `IN_PROGRESS`.
#[utoipa::path(
    get,
    path = "/api/task/{task_id}/raw",
    tag = "remote",
    params(
        ("task_id" = String, Path, description = "Remote job ID")
    ),
    responses(
        (status = 200, description = "Task document as returned by the remote API"),
        (status = 502, description = "Remote API failure", body = crate::error::ApiError)
    )
)]
pub async fn get_task_info_raw(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let raw = state.flow.task_info_raw(&task_id).await?;
    Ok(Json(raw))
}

/// GET /task/:id/download - Fetch a finished job's result file into its campaign folder
#[utoipa::path(
    get,
    path = "/api/task/{task_id}/download",
    tag = "remote",
    params(
        ("task_id" = String, Path, description = "Remote job ID")
    ),
    responses(
        (status = 200, description = "File saved", body = DownloadResponse),
        (status = 400, description = "Job not completed", body = crate::error::ApiError),
        (status = 404, description = "Job has no results or no file URL", body = crate::error::ApiError),
        (status = 502, description = "Remote API or download failure", body = crate::error::ApiError)
    )
)]
pub async fn download_task_file(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<DownloadResponse>> {
    let file = state.flow.download_job_file(&task_id).await?;
    Ok(Json(DownloadResponse::new(file)))
}

/// POST /download/file - Fetch an arbitrary URL into a campaign folder
#[utoipa::path(
    post,
    path = "/api/download/file",
    tag = "remote",
    params(
        ("file_url" = String, Query, description = "URL of the file to fetch"),
        ("task_id" = Option<String>, Query, description = "Folder to store the file under")
    ),
    responses(
        (status = 200, description = "File saved", body = DownloadResponse),
        (status = 400, description = "Invalid URL or task ID", body = crate::error::ApiError),
        (status = 502, description = "Download failure", body = crate::error::ApiError)
    )
)]
pub async fn download_file_by_url(
    State(state): State<AppState>,
    Query(query): Query<DownloadFileQuery>,
) -> Result<Json<DownloadResponse>> {
    let file = state
        .flow
        .download_by_url(&query.file_url, query.task_id)
        .await?;
    Ok(Json(DownloadResponse::new(file)))
}
