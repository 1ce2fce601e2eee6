//! Top-level orchestration of scraping, downloading and dispatch
//!
//! [`LeadFlow`] wires the remote scrape client, the lead store, the dispatcher
//! and the task map together. Send requests run in the background; callers poll
//! the task map for the outcome.

#[cfg(test)]
pub(crate) mod test_helpers;


use crate::config::Config;
use crate::dispatch::{DispatchRequest, Dispatcher};
use crate::error::{Error, Result};
use crate::leads::{CsvLeadStore, LeadStore};
use crate::mail::{MailTransport, SmtpMailTransport};
use crate::pacing::DelayRange;
use crate::scraper::{self, IN_PROGRESS_STATUS, JobStatus, Locations, ScraperClient};
use crate::tasks::TaskStore;
use crate::types::{
    CampaignId, CleanupReport, DispatchOutcome, DownloadedFile, EmailSendingSummary, Event,
    FileValidation, ScrapeRequest, SendReport, SendRequest, TaskEntry, TaskResponse,
    check_path_component,
};
use chrono::Local;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// The leadflow service
///
/// Cheap to clone; every clone shares the same task map, lock table and
/// event channel.
#[derive(Clone)]
pub struct LeadFlow {
    config: Arc<Config>,
    store: Arc<dyn LeadStore>,
    scraper: ScraperClient,
    dispatcher: Arc<Dispatcher>,
    tasks: TaskStore,
    event_tx: broadcast::Sender<Event>,
}

impl LeadFlow {
    /// Service delivering through SMTP with a filesystem lead store
    pub fn new(config: Config) -> Result<Self> {
        Self::with_transport(config, Arc::new(SmtpMailTransport::new()))
    }

    /// Service delivering through the given transport
    pub fn with_transport(config: Config, transport: Arc<dyn MailTransport>) -> Result<Self> {
        let store: Arc<dyn LeadStore> = Arc::new(
            CsvLeadStore::new(&config.storage.data_dir).with_columns(
                config.dispatch.name_column.clone(),
                config.dispatch.email_column.clone(),
            ),
        );
        Self::with_parts(config, store, transport)
    }

    /// Service over an arbitrary lead store and transport
    pub fn with_parts(
        config: Config,
        store: Arc<dyn LeadStore>,
        transport: Arc<dyn MailTransport>,
    ) -> Result<Self> {
        let scraper = ScraperClient::new(&config.scraper)?;
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            transport,
            DelayRange::from_config(&config.dispatch),
            config.dispatch.tracking.clone(),
            event_tx.clone(),
        ));
        let tasks = TaskStore::new(config.tasks.retention);

        Ok(Self {
            config: Arc::new(config),
            store,
            scraper,
            dispatcher,
            tasks,
            event_tx,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lead store backing this service
    pub fn store(&self) -> &Arc<dyn LeadStore> {
        &self.store
    }

    /// Background task map
    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    /// Subscribe to dispatch events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Submit a scraping job for the campaign and return its job ID
    pub async fn start_scrape(&self, request: ScrapeRequest) -> Result<TaskResponse> {
        let country = request
            .campaign
            .location
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| Error::InvalidRequest("location is required in campaign".into()))?;

        tracing::info!(
            campaign = %request.campaign.id,
            user = %request.user.id,
            country = %country,
            "Submitting scraping job"
        );

        let job = self
            .scraper
            .submit_job(
                request.campaign.business_type.as_deref(),
                country,
                request.campaign.maximum_results,
            )
            .await?;

        Ok(TaskResponse {
            message: format!(
                "Scraping task initiated successfully. Outscraper task ID: {}",
                job.task_id
            ),
            task_id: job.task_id,
            status: "success".to_string(),
        })
    }

    /// Accept a send request and run it in the background.
    ///
    /// Returns as soon as the task entry exists; the outcome lands in the task
    /// map under the campaign's job ID.
    pub async fn trigger_send(&self, request: SendRequest) -> Result<TaskResponse> {
        let campaign_id = send_campaign_id(&request)?;
        self.tasks.start(campaign_id.as_str()).await?;
        self.emit(Event::SendQueued {
            campaign_id: campaign_id.clone(),
        });

        tracing::info!(
            campaign_id = %campaign_id,
            user = %request.user.id,
            cursor = request.campaign.current_position.unwrap_or(0),
            "Send task queued"
        );

        let this = self.clone();
        let task_id = campaign_id.to_string();
        tokio::spawn(async move {
            match this.run_send(&request).await {
                Ok(report) => match serde_json::to_value(&report) {
                    Ok(value) => {
                        this.tasks.complete(&task_id, value).await;
                    }
                    Err(e) => {
                        this.tasks.fail(&task_id, e.to_string()).await;
                    }
                },
                Err(e) => {
                    tracing::error!(campaign_id = %task_id, error = %e, "Send task failed");
                    this.tasks.fail(&task_id, e.to_string()).await;
                }
            }
        });

        Ok(TaskResponse {
            message: format!("Email sending task started for Outscraper task ID: {campaign_id}"),
            task_id: campaign_id.to_string(),
            status: "processing".to_string(),
        })
    }

    /// Download the job's result file and dispatch one batch, holding the
    /// campaign lock throughout
    pub async fn run_send(&self, request: &SendRequest) -> Result<SendReport> {
        let campaign_id = send_campaign_id(request)?;
        let _guard = self.dispatcher.locks().acquire(&campaign_id).await;

        let download = match self.download_job_file_locked(&campaign_id).await {
            Ok(download) => download,
            Err(e) => {
                self.emit(Event::DispatchFailed {
                    campaign_id: campaign_id.clone(),
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        let dispatch = DispatchRequest {
            campaign_id: campaign_id.clone(),
            template: request.campaign.email_template.clone().unwrap_or_default(),
            smtp: request.email_config.clone(),
            cursor: request.campaign.current_position.unwrap_or(0),
            daily_quota: request
                .campaign
                .emails_per_day
                .unwrap_or(self.config.dispatch.default_daily_quota),
            lead_file: Some(download.filename.clone()),
        };

        match self.dispatcher.dispatch_locked(&dispatch).await {
            DispatchOutcome::Success { message, data } => Ok(SendReport {
                download,
                cleanup: data.cleanup.clone(),
                email_sending: EmailSendingSummary {
                    status: "success".to_string(),
                    message,
                    batch: data,
                },
            }),
            DispatchOutcome::Error { message, .. } => Err(Error::Other(message)),
        }
    }

    /// Check the job, then download its first result file into the campaign folder
    pub async fn download_job_file(&self, job_id: &str) -> Result<DownloadedFile> {
        let campaign_id = CampaignId::new(job_id);
        campaign_id.validate()?;
        let _guard = self.dispatcher.locks().acquire(&campaign_id).await;
        self.download_job_file_locked(&campaign_id).await
    }

    async fn download_job_file_locked(&self, campaign_id: &CampaignId) -> Result<DownloadedFile> {
        let status = self.scraper.get_job_status(campaign_id.as_str()).await?;
        let file_url = scraper::resolve_result_url(&status)?;
        let folder = self.store.ensure_folder(campaign_id).await?;
        let file = self
            .scraper
            .fetch_result_file(campaign_id.as_str(), &file_url, &folder)
            .await?;

        self.emit(Event::FileDownloaded {
            campaign_id: campaign_id.clone(),
            filename: file.filename.clone(),
            file_size: file.file_size,
        });
        Ok(file)
    }

    /// Download an arbitrary URL into the folder of `task_id`
    ///
    /// Without a task ID the file goes to `manual_{YYYYmmdd_HHMMSS}`.
    pub async fn download_by_url(
        &self,
        file_url: &str,
        task_id: Option<String>,
    ) -> Result<DownloadedFile> {
        url::Url::parse(file_url)
            .map_err(|e| Error::InvalidRequest(format!("invalid file_url '{file_url}': {e}")))?;

        let task_id = task_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("manual_{}", Local::now().format("%Y%m%d_%H%M%S")));
        let campaign_id = CampaignId::new(task_id);
        campaign_id.validate()?;

        let _guard = self.dispatcher.locks().acquire(&campaign_id).await;
        let folder = self.store.ensure_folder(&campaign_id).await?;
        self.scraper
            .fetch_result_file(campaign_id.as_str(), file_url, &folder)
            .await
    }

    /// Status of a background send
    pub async fn task_status(&self, task_id: &str) -> Result<TaskEntry> {
        self.tasks
            .get(task_id)
            .await
            .ok_or_else(|| Error::NotFound("Task not found".to_string()))
    }

    /// Regions of `country` known to the remote API
    pub async fn locations(&self, country: &str) -> Result<Locations> {
        self.scraper.get_locations(country).await
    }

    /// Status view of a remote job
    pub async fn job_status(&self, job_id: &str) -> Result<JobStatus> {
        self.scraper.get_job_status(job_id).await
    }

    /// Remote task document as returned by the API
    pub async fn task_info(&self, job_id: &str) -> Result<Value> {
        self.scraper.get_task_info(job_id).await
    }

    /// Remote task document with a `status` field guaranteed
    pub async fn task_info_raw(&self, job_id: &str) -> Result<Value> {
        let mut raw = self.scraper.get_task_info(job_id).await?;
        if let Value::Object(map) = &mut raw {
            map.entry("status")
                .or_insert_with(|| Value::String(IN_PROGRESS_STATUS.to_string()));
        }
        Ok(raw)
    }

    /// Remove a campaign folder outside of a dispatch
    pub async fn cleanup(&self, campaign_id: &CampaignId) -> Result<CleanupReport> {
        campaign_id.validate()?;
        let _guard = self.dispatcher.locks().acquire(campaign_id).await;
        let report = self.store.delete_folder(campaign_id).await?;
        if report.removed {
            self.emit(Event::FolderCleaned {
                campaign_id: campaign_id.clone(),
                files_removed: report.files_removed,
            });
        }
        Ok(report)
    }

    /// Campaigns that currently have a folder
    pub async fn campaigns(&self) -> Result<Vec<CampaignId>> {
        self.store.list_campaign_folders().await
    }

    /// Lead files stored for a campaign
    pub async fn campaign_files(&self, campaign_id: &CampaignId) -> Result<Vec<String>> {
        campaign_id.validate()?;
        self.store.list_files(campaign_id).await
    }

    /// Lead files of every campaign
    pub async fn all_files(&self) -> Result<BTreeMap<CampaignId, Vec<String>>> {
        self.store.list_all_files().await
    }

    /// Structural check of one lead file
    pub async fn validate_file(
        &self,
        campaign_id: &CampaignId,
        filename: &str,
    ) -> Result<FileValidation> {
        campaign_id.validate()?;
        check_path_component("filename", filename)?;
        Ok(self.store.validate_structure(campaign_id, filename).await)
    }

    /// Create the campaign folder if it does not exist yet
    pub async fn create_folder(&self, campaign_id: &CampaignId) -> Result<PathBuf> {
        campaign_id.validate()?;
        let path = self.store.ensure_folder(campaign_id).await?;
        tracing::info!(campaign_id = %campaign_id, path = %path.display(), "Campaign folder ready");
        Ok(path)
    }
}

fn send_campaign_id(request: &SendRequest) -> Result<CampaignId> {
    let id = request
        .campaign
        .outscraper_task_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::InvalidRequest("outscraperTaskId is required in campaign".into()))?;
    let campaign_id = CampaignId::new(id);
    campaign_id.validate()?;
    Ok(campaign_id)
}
