//! Error types for leadflow
//!
//! This module provides the error taxonomy for the service, including:
//! - Lead file errors (missing required columns, missing files)
//! - Remote job errors (job not ready, missing result file URL)
//! - Transport errors (remote scraping API, mail relay)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for leadflow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for leadflow
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "smtpServer")
        key: Option<String>,
    },

    /// A lead file lacks one or more required columns
    #[error("lead file {} is missing required columns: {}", .file.display(), .missing.join(", "))]
    Schema {
        /// The file that was read
        file: PathBuf,
        /// Required column names absent from the header
        missing: Vec<String>,
    },

    /// Campaign dispatch or remote job lookup failed
    #[error("{0}")]
    Dispatch(#[from] DispatchError),

    /// Network error talking to a remote HTTP service
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Remote scraping API answered with a non-success status
    #[error("remote API error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Remote {
        /// HTTP status returned by the remote API, if any
        status: Option<u16>,
        /// Error message or response body
        message: String,
    },

    /// Mail relay error
    #[error("SMTP error: {0}")]
    Smtp(String),

    /// Malformed lead file
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Request is missing a required field or has an invalid value
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation conflicts with one already in progress
    #[error("conflict: {0}")]
    Conflict(String),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Errors raised while resolving the lead file for a campaign dispatch
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No lead file exists in the campaign folder
    #[error("No CSV files found for campaign {campaign_id}")]
    NoFiles {
        /// The campaign whose folder was searched
        campaign_id: String,
    },

    /// The named lead file does not exist
    #[error("CSV file not found: {}", .path.display())]
    FileNotFound {
        /// The campaign the file belongs to
        campaign_id: String,
        /// The expected location of the file
        path: PathBuf,
    },

    /// The remote scraping job has not reached its terminal success state
    #[error("Task {job_id} is not completed. Current status: {status}")]
    JobNotReady {
        /// The remote job ID
        job_id: String,
        /// The status reported by the remote API
        status: String,
    },

    /// The remote job finished without any result entries
    #[error("No results found for task {job_id}")]
    NoResults {
        /// The remote job ID
        job_id: String,
    },

    /// The first result of the remote job carries no file URL
    #[error("No file URL found in results for task {job_id}")]
    MissingFileUrl {
        /// The remote job ID
        job_id: String,
    },
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "job_not_ready",
///     "message": "Task abc is not completed. Current status: PENDING",
///     "details": { "job_id": "abc", "status": "PENDING" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "schema_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - caller supplied something unusable
            Error::Config { .. } => 400,
            Error::InvalidRequest(_) => 400,
            Error::Dispatch(DispatchError::JobNotReady { .. }) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,
            Error::Dispatch(DispatchError::NoFiles { .. }) => 404,
            Error::Dispatch(DispatchError::FileNotFound { .. }) => 404,
            Error::Dispatch(DispatchError::NoResults { .. }) => 404,
            Error::Dispatch(DispatchError::MissingFileUrl { .. }) => 404,

            // 409 Conflict
            Error::Conflict(_) => 409,

            // 422 Unprocessable Entity - the lead file exists but is unusable
            Error::Schema { .. } => 422,
            Error::Csv(_) => 422,

            // 502 Bad Gateway - external service errors
            Error::Network(_) => 502,
            Error::Remote { .. } => 502,
            Error::Smtp(_) => 502,

            // 500 Internal Server Error
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Schema { .. } => "schema_error",
            Error::Dispatch(e) => match e {
                DispatchError::NoFiles { .. } => "no_files",
                DispatchError::FileNotFound { .. } => "file_not_found",
                DispatchError::JobNotReady { .. } => "job_not_ready",
                DispatchError::NoResults { .. } => "no_results",
                DispatchError::MissingFileUrl { .. } => "missing_file_url",
            },
            Error::Network(_) => "network_error",
            Error::Remote { .. } => "remote_error",
            Error::Smtp(_) => "smtp_error",
            Error::Csv(_) => "csv_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::InvalidRequest(_) => "invalid_request",
            Error::NotFound(_) => "not_found",
            Error::Conflict(_) => "conflict",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            Error::Schema { file, missing } => Some(serde_json::json!({
                "file": file,
                "missing_columns": missing,
            })),
            Error::Dispatch(DispatchError::NoFiles { campaign_id }) => {
                Some(serde_json::json!({ "campaign_id": campaign_id }))
            }
            Error::Dispatch(DispatchError::FileNotFound { campaign_id, path }) => {
                Some(serde_json::json!({
                    "campaign_id": campaign_id,
                    "path": path,
                }))
            }
            Error::Dispatch(DispatchError::JobNotReady { job_id, status }) => {
                Some(serde_json::json!({
                    "job_id": job_id,
                    "status": status,
                }))
            }
            Error::Dispatch(DispatchError::NoResults { job_id })
            | Error::Dispatch(DispatchError::MissingFileUrl { job_id }) => {
                Some(serde_json::json!({ "job_id": job_id }))
            }
            Error::Remote {
                status: Some(status),
                ..
            } => Some(serde_json::json!({ "upstream_status": status })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn all_error_variants() -> Vec<(Error, u16, &'static str)> {
        vec![
            (Error::config("smtpServer", "missing"), 400, "config_error"),
            (
                Error::InvalidRequest("outscraperTaskId is required".into()),
                400,
                "invalid_request",
            ),
            (
                Error::Schema {
                    file: PathBuf::from("leads.csv"),
                    missing: vec!["email_1".into()],
                },
                422,
                "schema_error",
            ),
            (
                Error::Dispatch(DispatchError::NoFiles {
                    campaign_id: "c1".into(),
                }),
                404,
                "no_files",
            ),
            (
                Error::Dispatch(DispatchError::FileNotFound {
                    campaign_id: "c1".into(),
                    path: PathBuf::from("app/data/task_c1/x.csv"),
                }),
                404,
                "file_not_found",
            ),
            (
                Error::Dispatch(DispatchError::JobNotReady {
                    job_id: "j1".into(),
                    status: "PENDING".into(),
                }),
                400,
                "job_not_ready",
            ),
            (
                Error::Dispatch(DispatchError::NoResults {
                    job_id: "j1".into(),
                }),
                404,
                "no_results",
            ),
            (
                Error::Dispatch(DispatchError::MissingFileUrl {
                    job_id: "j1".into(),
                }),
                404,
                "missing_file_url",
            ),
            (
                Error::Remote {
                    status: Some(401),
                    message: "bad key".into(),
                },
                502,
                "remote_error",
            ),
            (Error::Smtp("auth rejected".into()), 502, "smtp_error"),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                500,
                "io_error",
            ),
            (Error::NotFound("Task".into()), 404, "not_found"),
            (Error::Conflict("busy".into()), 409, "conflict"),
            (
                Error::ApiServerError("bind failed".into()),
                500,
                "api_server_error",
            ),
            (Error::Other("unknown".into()), 500, "internal_error"),
        ]
    }

    #[test]
    fn every_variant_maps_to_expected_status_and_code() {
        for (error, status, code) in all_error_variants() {
            assert_eq!(error.status_code(), status, "status for {error:?}");
            assert_eq!(error.error_code(), code, "code for {error:?}");
        }
    }

    #[test]
    fn job_not_ready_message_names_current_status() {
        let error = Error::Dispatch(DispatchError::JobNotReady {
            job_id: "abc".into(),
            status: "PENDING".into(),
        });
        assert_eq!(
            error.to_string(),
            "Task abc is not completed. Current status: PENDING"
        );
    }

    #[test]
    fn schema_error_lists_missing_columns() {
        let error = Error::Schema {
            file: PathBuf::from("leads.csv"),
            missing: vec!["name".into(), "email_1".into()],
        };
        let message = error.to_string();
        assert!(message.contains("leads.csv"));
        assert!(message.contains("name, email_1"));
    }

    #[test]
    fn remote_error_message_includes_upstream_status() {
        let error = Error::Remote {
            status: Some(503),
            message: "maintenance".into(),
        };
        assert_eq!(error.to_string(), "remote API error (503): maintenance");

        let error = Error::Remote {
            status: None,
            message: "malformed body".into(),
        };
        assert_eq!(error.to_string(), "remote API error: malformed body");
    }

    #[test]
    fn api_error_from_job_not_ready_has_job_and_status() {
        let api_error: ApiError = Error::Dispatch(DispatchError::JobNotReady {
            job_id: "abc".into(),
            status: "PENDING".into(),
        })
        .into();

        assert_eq!(api_error.error.code, "job_not_ready");
        let details = api_error.error.details.unwrap();
        assert_eq!(details["job_id"], "abc");
        assert_eq!(details["status"], "PENDING");
    }

    #[test]
    fn api_error_from_schema_lists_missing_columns() {
        let api_error: ApiError = Error::Schema {
            file: PathBuf::from("leads.csv"),
            missing: vec!["email_1".into()],
        }
        .into();

        let details = api_error.error.details.unwrap();
        assert_eq!(details["missing_columns"][0], "email_1");
    }

    #[test]
    fn api_error_from_config_names_the_key() {
        let api_error: ApiError = Error::config("emailPassword", "must not be empty").into();
        assert_eq!(api_error.error.code, "config_error");
        assert_eq!(api_error.error.details.unwrap()["key"], "emailPassword");
    }

    #[test]
    fn plain_errors_carry_no_details() {
        let api_error: ApiError = Error::Other("boom".into()).into();
        assert!(api_error.error.details.is_none());
    }
}
