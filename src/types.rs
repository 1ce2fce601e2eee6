//! Core types and events for leadflow

use crate::config::SmtpConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use utoipa::ToSchema;

/// Prefix of every campaign folder under the data root
pub const CAMPAIGN_FOLDER_PREFIX: &str = "task_";

/// Identifier of a campaign, equal to the remote scraping job ID
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct CampaignId(pub String);

impl CampaignId {
    /// Create a new CampaignId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the folder holding this campaign's lead files
    pub fn folder_name(&self) -> String {
        format!("{CAMPAIGN_FOLDER_PREFIX}{}", self.0)
    }

    /// Reject IDs that cannot safely name a folder under the data root
    pub fn validate(&self) -> crate::error::Result<()> {
        check_path_component("campaign ID", &self.0)
    }

    /// Recover a campaign ID from a folder name, if it follows the naming convention
    pub fn from_folder_name(folder: &str) -> Option<Self> {
        folder
            .strip_prefix(CAMPAIGN_FOLDER_PREFIX)
            .filter(|id| !id.is_empty())
            .map(Self::new)
    }
}

/// Ensure `value` is a single, non-traversing path component
pub fn check_path_component(kind: &str, value: &str) -> crate::error::Result<()> {
    if value.is_empty()
        || value == "."
        || value.contains("..")
        || value.contains(['/', '\\', '\0'])
    {
        return Err(crate::error::Error::InvalidRequest(format!(
            "invalid {kind}: {value:?}"
        )));
    }
    Ok(())
}

impl std::fmt::Display for CampaignId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CampaignId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CampaignId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Subject and body patterns with a `{name}` placeholder
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EmailTemplate {
    /// Subject pattern
    #[serde(default)]
    pub subject: String,
    /// Body pattern
    #[serde(default)]
    pub content: String,
}

/// Account submitting a request
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// User identifier
    pub id: String,
    /// Opaque subscription details, passed through for logging only
    #[serde(default)]
    pub subscription: serde_json::Value,
}

/// Campaign as submitted by the caller
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    /// Caller-side campaign identifier
    pub id: String,
    /// Business category to scrape
    #[serde(default)]
    pub business_type: Option<String>,
    /// Target country code
    #[serde(default)]
    pub location: Option<String>,
    /// Maximum number of scraped results
    #[serde(default)]
    pub maximum_results: Option<u32>,
    /// Outreach template
    #[serde(default)]
    pub email_template: Option<EmailTemplate>,
    /// Remote scraping job ID; doubles as the dispatch campaign ID
    #[serde(default)]
    pub outscraper_task_id: Option<String>,
    /// Daily send quota (default: 50)
    #[serde(default)]
    pub emails_per_day: Option<usize>,
    /// Zero-based cursor into the lead list (default: 0)
    #[serde(default)]
    pub current_position: Option<usize>,
}

/// Body of a scrape submission
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ScrapeRequest {
    /// Campaign to scrape leads for
    pub campaign: Campaign,
    /// Requesting account
    pub user: User,
}

/// Body of a send trigger
#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    /// Campaign to dispatch; `outscraperTaskId` is required
    pub campaign: Campaign,
    /// Requesting account
    pub user: User,
    /// Mail relay to send through
    pub email_config: SmtpConfig,
}

/// One row of a downloaded lead file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Lead {
    /// Business name
    pub name: String,
    /// Primary email address as read from the file, if the cell was present and non-empty
    pub email: Option<String>,
    /// Every column of the row, keyed by header
    pub fields: BTreeMap<String, String>,
}

impl Lead {
    /// The trimmed primary email, or `None` if the lead cannot be contacted
    pub fn deliverable_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}

/// Result of a single delivery attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Relay accepted the message
    Success,
    /// Connection, authentication or submission failed
    Failed,
}

/// Per-lead delivery outcome
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryRecord {
    /// Outcome
    pub status: DeliveryStatus,
    /// Recipient address
    pub email: String,
    /// Human-readable summary
    pub message: String,
    /// Transport error text on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryRecord {
    /// Record a successful delivery
    pub fn success(email: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            status: DeliveryStatus::Success,
            message: format!("Sent to {email}"),
            email,
            error: None,
        }
    }

    /// Record a failed delivery
    pub fn failure(email: impl Into<String>, error: impl Into<String>) -> Self {
        let email = email.into();
        let error = error.into();
        Self {
            status: DeliveryStatus::Failed,
            message: format!("Failed to send to {email}: {error}"),
            email,
            error: Some(error),
        }
    }

    /// Whether the relay accepted the message
    pub fn is_success(&self) -> bool {
        self.status == DeliveryStatus::Success
    }
}

/// Pagination bookkeeping for one dispatch batch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    /// Rows in the lead file
    pub total_rows: usize,
    /// Cursor the batch started from
    pub current_position: usize,
    /// Cursor the caller should submit next time
    pub next_position: usize,
    /// Quota applied to this batch
    pub emails_per_day: usize,
    /// Whether rows remain after `next_position`
    pub has_more: bool,
}

/// Outcome of a campaign folder deletion
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CleanupStatus {
    /// Folder existed and was removed
    Success,
    /// Folder did not exist
    Skipped,
    /// Removal failed
    Error,
}

/// Report returned by campaign folder deletion
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CleanupReport {
    /// Outcome
    pub status: CleanupStatus,
    /// Human-readable summary
    pub message: String,
    /// Campaign whose folder was targeted
    pub campaign_id: CampaignId,
    /// Folder location
    pub folder_path: PathBuf,
    /// Whether a folder was actually removed
    pub removed: bool,
    /// Entries in the folder before removal
    pub files_removed: usize,
}

/// Aggregated result of one dispatch batch
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchResult {
    /// Campaign dispatched
    pub campaign_id: CampaignId,
    /// Lead file used
    pub csv_file: String,
    /// Leads in the page (valid and skipped)
    pub total_leads: usize,
    /// Messages accepted by the relay
    pub emails_sent: usize,
    /// Messages that failed
    pub emails_failed: usize,
    /// Leads without a usable email address
    pub emails_skipped: usize,
    /// Recipients that were delivered, in send order
    pub successful_emails: Vec<String>,
    /// Recipients that failed, in send order
    pub failed_emails: Vec<String>,
    /// One record per attempted lead
    pub details: Vec<DeliveryRecord>,
    /// Cursor bookkeeping
    pub pagination: Pagination,
    /// Folder deletion performed after the batch
    pub cleanup: CleanupReport,
}

/// Error payload of a failed dispatch
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DispatchFailure {
    /// Campaign dispatched
    pub campaign_id: CampaignId,
    /// Error text
    pub error: String,
}

/// Structured outcome of a dispatch; dispatch never returns an error to its caller
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DispatchOutcome {
    /// The batch ran (individual deliveries may still have failed)
    Success {
        /// Summary line
        message: String,
        /// Batch details
        data: BatchResult,
    },
    /// The batch aborted before or during the send loop
    Error {
        /// Summary line
        message: String,
        /// Failure details
        data: DispatchFailure,
    },
}

/// Diagnostic view of a lead file
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FileValidation {
    /// Whether the file could be read and carries the required columns
    pub valid: bool,
    /// Campaign the file belongs to
    pub campaign_id: CampaignId,
    /// File name
    pub filename: String,
    /// Data rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<usize>,
    /// Rows whose email cell contains `@`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_emails: Option<usize>,
    /// Header names in file order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    /// First three rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_data: Option<Vec<BTreeMap<String, String>>>,
    /// Why the file is invalid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A result file saved into a campaign folder
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DownloadedFile {
    /// Job (or manual) ID the file was stored under
    pub task_id: String,
    /// Source URL
    pub file_url: String,
    /// Where the file was written
    pub local_path: PathBuf,
    /// File name inside the campaign folder
    pub filename: String,
    /// Bytes written
    pub file_size: u64,
}

/// Lifecycle state of a background operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Still running
    Processing,
    /// Finished with a result
    Completed,
    /// Finished with an error
    Failed,
}

impl TaskState {
    /// Whether no further transition is allowed
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskState::Processing)
    }
}

/// Status of a background operation keyed by job ID
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskEntry {
    /// Job ID
    pub task_id: String,
    /// Current state
    pub status: TaskState,
    /// Result payload once completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error text once failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the operation was launched
    pub created_at: DateTime<Utc>,
    /// When the operation reached a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Acknowledgement returned by the scrape and send triggers
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskResponse {
    /// Remote job ID
    pub task_id: String,
    /// "success" for scrape submissions, "processing" for send triggers
    pub status: String,
    /// Human-readable summary
    pub message: String,
}

/// Email sending section of a completed send task
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EmailSendingSummary {
    /// Always "success" when present
    pub status: String,
    /// Summary line from the dispatcher
    pub message: String,
    /// Batch details
    #[serde(flatten)]
    pub batch: BatchResult,
}

/// Result payload stored on a completed send task
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SendReport {
    /// File fetched from the remote job
    pub download: DownloadedFile,
    /// Dispatch outcome
    pub email_sending: EmailSendingSummary,
    /// Folder deletion performed after the batch
    pub cleanup: CleanupReport,
}

/// Events emitted while campaigns are dispatched
///
/// Consumers subscribe via [`crate::LeadFlow::subscribe`] or the SSE stream.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A send task was accepted and runs in the background
    SendQueued {
        /// Campaign ID
        campaign_id: CampaignId,
    },

    /// A result file was downloaded into the campaign folder
    FileDownloaded {
        /// Campaign ID
        campaign_id: CampaignId,
        /// File name
        filename: String,
        /// Bytes written
        file_size: u64,
    },

    /// A batch started sending
    DispatchStarted {
        /// Campaign ID
        campaign_id: CampaignId,
        /// Lead file used
        csv_file: String,
        /// Leads with a usable address in this page
        valid_leads: usize,
        /// Leads skipped in this page
        skipped_leads: usize,
    },

    /// One message was attempted
    LeadDelivered {
        /// Campaign ID
        campaign_id: CampaignId,
        /// Recipient
        email: String,
        /// Whether the relay accepted it
        success: bool,
    },

    /// A lead in the page had no usable email address
    LeadSkipped {
        /// Campaign ID
        campaign_id: CampaignId,
        /// Business name of the skipped row
        name: String,
    },

    /// A batch finished its send loop
    DispatchCompleted {
        /// Campaign ID
        campaign_id: CampaignId,
        /// Messages accepted
        sent: usize,
        /// Messages failed
        failed: usize,
        /// Leads skipped
        skipped: usize,
        /// Cursor for the next batch
        next_position: usize,
        /// Whether rows remain
        has_more: bool,
    },

    /// A batch or send task aborted
    DispatchFailed {
        /// Campaign ID
        campaign_id: CampaignId,
        /// Error text
        error: String,
    },

    /// A campaign folder was removed
    FolderCleaned {
        /// Campaign ID
        campaign_id: CampaignId,
        /// Entries removed
        files_removed: usize,
    },
}
