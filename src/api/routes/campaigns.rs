//! Campaign folder and lead file handlers.

use super::{
    AllFilesResponse, CampaignFilesResponse, CampaignsResponse, CleanupResponse, FolderResponse,
    SUCCESS, ValidationResponse,
};
use crate::api::AppState;
use crate::error::Result;
use crate::types::{CampaignId, CleanupStatus};
use axum::{
    Json,
    extract::{Path, State},
};

/// GET /campaigns - Campaigns that have a folder
#[utoipa::path(
    get,
    path = "/api/campaigns",
    tag = "campaigns",
    responses(
        (status = 200, description = "Campaign IDs", body = CampaignsResponse),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn list_campaigns(State(state): State<AppState>) -> Result<Json<CampaignsResponse>> {
    let campaigns = state.flow.campaigns().await?;
    Ok(Json(CampaignsResponse {
        status: SUCCESS.to_string(),
        count: campaigns.len(),
        campaigns,
    }))
}

/// GET /campaigns/:id/csv-files - Lead files of a campaign
#[utoipa::path(
    get,
    path = "/api/campaigns/{campaign_id}/csv-files",
    tag = "campaigns",
    params(
        ("campaign_id" = String, Path, description = "Campaign ID")
    ),
    responses(
        (status = 200, description = "Lead files in lexical order", body = CampaignFilesResponse),
        (status = 400, description = "Invalid campaign ID", body = crate::error::ApiError)
    )
)]
pub async fn list_campaign_files(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
) -> Result<Json<CampaignFilesResponse>> {
    let campaign_id = CampaignId::new(campaign_id);
    let files = state.flow.campaign_files(&campaign_id).await?;
    Ok(Json(CampaignFilesResponse {
        status: SUCCESS.to_string(),
        campaign_id,
        count: files.len(),
        files,
    }))
}

/// GET /campaigns/:id/csv-files/:filename/validate - Check a lead file's structure
///
/// An unreadable or malformed file is reported inside `validation`, not as an error status.
#[utoipa::path(
    get,
    path = "/api/campaigns/{campaign_id}/csv-files/{filename}/validate",
    tag = "campaigns",
    params(
        ("campaign_id" = String, Path, description = "Campaign ID"),
        ("filename" = String, Path, description = "Lead file name")
    ),
    responses(
        (status = 200, description = "Validation result", body = ValidationResponse),
        (status = 400, description = "Invalid campaign ID or file name", body = crate::error::ApiError)
    )
)]
pub async fn validate_campaign_file(
    State(state): State<AppState>,
    Path((campaign_id, filename)): Path<(String, String)>,
) -> Result<Json<ValidationResponse>> {
    let campaign_id = CampaignId::new(campaign_id);
    let validation = state.flow.validate_file(&campaign_id, &filename).await?;
    Ok(Json(ValidationResponse {
        status: SUCCESS.to_string(),
        campaign_id,
        filename,
        validation,
    }))
}

/// POST /campaigns/:id/create-folder - Create a campaign folder
#[utoipa::path(
    post,
    path = "/api/campaigns/{campaign_id}/create-folder",
    tag = "campaigns",
    params(
        ("campaign_id" = String, Path, description = "Campaign ID")
    ),
    responses(
        (status = 200, description = "Folder exists", body = FolderResponse),
        (status = 400, description = "Invalid campaign ID", body = crate::error::ApiError)
    )
)]
pub async fn create_campaign_folder(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
) -> Result<Json<FolderResponse>> {
    let campaign_id = CampaignId::new(campaign_id);
    let folder_path = state.flow.create_folder(&campaign_id).await?;
    Ok(Json(FolderResponse {
        status: SUCCESS.to_string(),
        campaign_id,
        folder_path,
        message: "Campaign folder created successfully".to_string(),
    }))
}

/// DELETE /campaigns/:id/cleanup - Remove a campaign folder and its files
#[utoipa::path(
    delete,
    path = "/api/campaigns/{campaign_id}/cleanup",
    tag = "campaigns",
    params(
        ("campaign_id" = String, Path, description = "Campaign ID")
    ),
    responses(
        (status = 200, description = "Folder removed, or skipped when absent", body = CleanupResponse),
        (status = 400, description = "Invalid campaign ID", body = crate::error::ApiError)
    )
)]
pub async fn cleanup_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
) -> Result<Json<CleanupResponse>> {
    let report = state.flow.cleanup(&CampaignId::new(campaign_id)).await?;
    let status = match report.status {
        CleanupStatus::Success => "success",
        CleanupStatus::Skipped => "skipped",
        CleanupStatus::Error => "error",
    };
    Ok(Json(CleanupResponse {
        status: status.to_string(),
        message: report.message.clone(),
        data: report,
    }))
}

/// GET /csv-files/all - Lead files of every campaign
#[utoipa::path(
    get,
    path = "/api/csv-files/all",
    tag = "campaigns",
    responses(
        (status = 200, description = "File names keyed by campaign", body = AllFilesResponse),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn list_all_files(State(state): State<AppState>) -> Result<Json<AllFilesResponse>> {
    let files_by_campaign = state.flow.all_files().await?;
    Ok(Json(AllFilesResponse {
        status: SUCCESS.to_string(),
        files_by_campaign,
    }))
}
