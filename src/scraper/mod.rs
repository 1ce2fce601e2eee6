//! Client for the remote business-data scraping API
//!
//! Every API request carries the account key in the `X-API-KEY` header; result
//! file downloads go to pre-signed URLs without it. The API is
//! treated as an opaque request/response boundary: task documents are passed
//! through as JSON, and only the fields needed to find a result file are read.

#[cfg(test)]
mod tests;

use crate::config::ScraperConfig;
use crate::error::{DispatchError, Error, Result};
use crate::types::{CampaignId, DownloadedFile};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use utoipa::ToSchema;

/// Terminal success status of a remote task
pub const SUCCESS_STATUS: &str = "SUCCESS";

/// Status reported for a task document without one
pub const IN_PROGRESS_STATUS: &str = "IN_PROGRESS";

/// Scraping service used for every job
const SERVICE_NAME: &str = "google_maps_service_v2";

/// Regions the remote API knows for a country
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Locations {
    /// Country code queried
    pub country: String,
    /// Regions formatted as `"{country}>{region}"`
    pub locations: Vec<String>,
    /// Number of regions
    pub total_count: usize,
    /// Unmodified API response
    pub raw_response: Value,
}

/// A scraping job accepted by the remote API
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobSubmission {
    /// Remote job ID
    pub task_id: String,
    /// Category searched
    pub business_type: Option<String>,
    /// Regions searched
    pub locations: Vec<String>,
    /// Result cap
    pub max_results: Option<u32>,
    /// Country code
    pub country: String,
    /// Unmodified API response
    pub raw_response: Value,
}

/// Status view of a remote job
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobStatus {
    /// Remote job ID
    pub task_id: String,
    /// Status string as reported, if any
    pub task_status: Option<String>,
    /// Result entries as reported
    pub results: Option<Vec<Value>>,
    /// Unmodified API response
    pub raw_response: Value,
}

impl JobStatus {
    /// Build the status view from a raw task document
    pub fn from_raw(task_id: &str, raw: Value) -> Self {
        let task_status = raw.get("status").and_then(Value::as_str).map(str::to_string);
        let results = raw.get("results").and_then(Value::as_array).cloned();
        Self {
            task_id: task_id.to_string(),
            task_status,
            results,
            raw_response: raw,
        }
    }

    /// Whether the job reached its terminal success state
    pub fn is_success(&self) -> bool {
        self.task_status.as_deref() == Some(SUCCESS_STATUS)
    }
}

/// Find the result file URL of a finished job.
///
/// The job must be in the success state, have at least one result, and its
/// first result must carry a `file_url`.
pub fn resolve_result_url(status: &JobStatus) -> Result<String> {
    if !status.is_success() {
        return Err(DispatchError::JobNotReady {
            job_id: status.task_id.clone(),
            status: status.task_status.clone().unwrap_or_else(|| "None".to_string()),
        }
        .into());
    }

    let first = status
        .results
        .as_deref()
        .and_then(<[Value]>::first)
        .ok_or_else(|| DispatchError::NoResults {
            job_id: status.task_id.clone(),
        })?;

    first
        .get("file_url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            DispatchError::MissingFileUrl {
                job_id: status.task_id.clone(),
            }
            .into()
        })
}

/// Name under which a downloaded file is stored.
///
/// Uses the last path segment of the URL when it looks like a file name,
/// otherwise `task_{id}.csv`.
pub fn filename_from_url(file_url: &str, task_id: &str) -> String {
    url::Url::parse(file_url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .map(str::to_string)
        })
        .filter(|name| name.contains('.') && name != "." && name != ".." && !name.contains('\\'))
        .unwrap_or_else(|| format!("{}.csv", CampaignId::new(task_id).folder_name()))
}

/// HTTP client for the remote scraping API
#[derive(Clone)]
pub struct ScraperClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    language: String,
    organizations_per_query_limit: u32,
}

impl std::fmt::Debug for ScraperClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScraperClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ScraperClient {
    /// Build a client from configuration; the API key is required
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::config(
                    crate::config::API_KEY_ENV,
                    "OUTSCRAPER_API_KEY not found in environment variables",
                )
            })?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            language: config.language.clone(),
            organizations_per_query_limit: config.organizations_per_query_limit,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_json(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote {
                status: Some(status.as_u16()),
                message: if body.is_empty() {
                    status.to_string()
                } else {
                    body
                },
            });
        }
        Ok(response.json().await?)
    }

    /// Regions of `country`, formatted as `"{country}>{region}"`
    pub async fn get_locations(&self, country: &str) -> Result<Locations> {
        let response = self
            .http
            .get(self.url("/locations"))
            .header("X-API-KEY", &self.api_key)
            .query(&[("country", country)])
            .send()
            .await?;
        let raw = Self::read_json(response).await?;

        let locations: Vec<String> = raw
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("v").and_then(Value::as_str))
                    .filter(|region| !region.is_empty())
                    .map(|region| format!("{country}>{region}"))
                    .collect()
            })
            .unwrap_or_default();

        tracing::debug!(country = %country, count = locations.len(), "Fetched locations");

        Ok(Locations {
            country: country.to_string(),
            total_count: locations.len(),
            locations,
            raw_response: raw,
        })
    }

    /// Submit a scraping job for `business_type` across every region of `country`
    pub async fn submit_job(
        &self,
        business_type: Option<&str>,
        country: &str,
        max_results: Option<u32>,
    ) -> Result<JobSubmission> {
        let locations = self.get_locations(country).await?.locations;
        let payload = self.job_payload(business_type, &locations, country, max_results);

        let response = self
            .http
            .post(self.url("/tasks"))
            .header("X-API-KEY", &self.api_key)
            .json(&payload)
            .send()
            .await?;
        let raw = Self::read_json(response).await?;

        let task_id = match raw.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(Error::Remote {
                    status: None,
                    message: "task submission response carries no id".to_string(),
                });
            }
        };

        tracing::info!(
            task_id = %task_id,
            country = %country,
            regions = locations.len(),
            "Submitted scraping job"
        );

        Ok(JobSubmission {
            task_id,
            business_type: business_type.map(str::to_string),
            locations,
            max_results,
            country: country.to_string(),
            raw_response: raw,
        })
    }

    fn job_payload(
        &self,
        business_type: Option<&str>,
        locations: &[String],
        country: &str,
        max_results: Option<u32>,
    ) -> Value {
        let categories: Vec<&str> = business_type.filter(|b| !b.is_empty()).into_iter().collect();
        json!({
            "service_name": SERVICE_NAME,
            "queries": [],
            "enrich": false,
            "settings": {
                "output_extension": "csv",
                "output_columns": []
            },
            "tags": [],
            "enrichments": ["domains_service"],
            "categories": categories,
            "locations": locations,
            "language": self.language,
            "region": country,
            "limit": max_results,
            "organizationsPerQueryLimit": self.organizations_per_query_limit,
            "filters": [],
            "exactMatch": false,
            "useZipCodes": true,
            "dropDuplicates": "true",
            "dropEmailDuplicates": false,
            "ignoreWithoutEmails": false,
            "UISettings": {
                "isCustomQueries": false,
                "isCustomCategories": false,
                "isCustomLocations": false
            },
            "enrichLocations": true
        })
    }

    /// Raw task document for `task_id`
    pub async fn get_task_info(&self, task_id: &str) -> Result<Value> {
        let response = self
            .http
            .get(self.url(&format!("/tasks/{task_id}")))
            .header("X-API-KEY", &self.api_key)
            .send()
            .await?;
        Self::read_json(response).await
    }

    /// Status view of `task_id`
    pub async fn get_job_status(&self, task_id: &str) -> Result<JobStatus> {
        let raw = self.get_task_info(task_id).await?;
        Ok(JobStatus::from_raw(task_id, raw))
    }

    /// Download `file_url` into `dest_dir`, creating it if needed
    pub async fn fetch_result_file(
        &self,
        task_id: &str,
        file_url: &str,
        dest_dir: &Path,
    ) -> Result<DownloadedFile> {
        let filename = filename_from_url(file_url, task_id);
        tokio::fs::create_dir_all(dest_dir).await?;
        let local_path = dest_dir.join(&filename);

        let mut response = self.http.get(file_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Remote {
                status: Some(status.as_u16()),
                message: format!("Download failed for {file_url}"),
            });
        }

        let mut file = tokio::fs::File::create(&local_path).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        let file_size = tokio::fs::metadata(&local_path).await?.len();
        tracing::info!(
            task_id = %task_id,
            filename = %filename,
            file_size,
            "Downloaded result file"
        );

        Ok(DownloadedFile {
            task_id: task_id.to_string(),
            file_url: file_url.to_string(),
            local_path,
            filename,
            file_size,
        })
    }
}
