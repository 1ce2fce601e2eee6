//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`campaigns`]: Campaign folders and their lead files
//! - [`sending`]: Scrape submission, send trigger and task status
//! - [`remote`]: Pass-through views of the remote scraping API and file downloads
//! - [`system`]: Health, events, OpenAPI

use crate::scraper::{JobStatus, Locations};
use crate::types::{CampaignId, CleanupReport, DownloadedFile, FileValidation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use utoipa::ToSchema;

mod campaigns;
mod remote;
mod sending;
mod system;

pub use campaigns::*;
pub use remote::*;
pub use sending::*;
pub use system::*;

/// Status string of every successful response envelope
pub(crate) const SUCCESS: &str = "success";

// ============================================================================
// Query Types
// ============================================================================

/// Query parameters for POST /download/file
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct DownloadFileQuery {
    /// URL of the file to fetch
    pub file_url: String,
    /// Folder to store the file under (default: `manual_{YYYYmmdd_HHMMSS}`)
    #[serde(default)]
    pub task_id: Option<String>,
}

// ============================================================================
// Response Types
// ============================================================================

/// Campaigns that have a folder on disk
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CampaignsResponse {
    /// Always "success"
    pub status: String,
    /// Campaign IDs in lexical order
    pub campaigns: Vec<CampaignId>,
    /// Number of campaigns
    pub count: usize,
}

/// Lead files of one campaign
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CampaignFilesResponse {
    /// Always "success"
    pub status: String,
    /// Campaign queried
    pub campaign_id: CampaignId,
    /// File names in lexical order
    pub files: Vec<String>,
    /// Number of files
    pub count: usize,
}

/// Structural check of a lead file
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidationResponse {
    /// Always "success"; see `validation.valid` for the verdict
    pub status: String,
    /// Campaign the file belongs to
    pub campaign_id: CampaignId,
    /// File checked
    pub filename: String,
    /// Check result
    pub validation: FileValidation,
}

/// Campaign folder creation result
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FolderResponse {
    /// Always "success"
    pub status: String,
    /// Campaign whose folder was created
    pub campaign_id: CampaignId,
    /// Folder location
    pub folder_path: PathBuf,
    /// Human-readable summary
    pub message: String,
}

/// Lead files of every campaign
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AllFilesResponse {
    /// Always "success"
    pub status: String,
    /// File names keyed by campaign ID
    pub files_by_campaign: BTreeMap<CampaignId, Vec<String>>,
}

/// Campaign folder deletion result
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CleanupResponse {
    /// "success", "skipped" or "error"
    pub status: String,
    /// Human-readable summary
    pub message: String,
    /// Deletion details
    pub data: CleanupReport,
}

/// Regions of a country
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LocationsResponse {
    /// Always "success"
    pub status: String,
    /// Human-readable summary
    pub message: String,
    /// Regions found
    pub data: Locations,
}

/// Status view of a remote job
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobStatusResponse {
    /// Always "success"
    pub status: String,
    /// Human-readable summary
    pub message: String,
    /// Job status
    pub data: JobStatus,
}

/// Full remote task document
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskInfoResponse {
    /// Always "success"
    pub status: String,
    /// Human-readable summary
    pub message: String,
    /// Task document as returned by the remote API
    pub data: serde_json::Value,
}

/// A file saved into a campaign folder
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadResponse {
    /// Always "success"
    pub status: String,
    /// Human-readable summary
    pub message: String,
    /// File details
    pub data: DownloadedFile,
}

impl DownloadResponse {
    pub(crate) fn new(file: DownloadedFile) -> Self {
        Self {
            status: SUCCESS.to_string(),
            message: format!("Successfully downloaded file for task {}", file.task_id),
            data: file,
        }
    }
}

/// Health check body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always "ok"
    pub status: String,
    /// Crate version
    pub version: String,
    /// Background sends still processing
    pub active_tasks: usize,
}
