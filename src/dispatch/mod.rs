//! Paginated batch dispatch of outreach emails
//!
//! One dispatch takes a page of leads from the campaign's lead file, sends one
//! message per contactable lead with a random pause between sends, and then
//! removes the campaign folder. The caller owns the cursor: the returned
//! [`Pagination`] tells it where the next batch starts.

mod locks;


pub use locks::CampaignLocks;

use crate::config::{SmtpConfig, TrackingConfig};
use crate::error::{DispatchError, Result};
use crate::leads::LeadStore;
use crate::mail::{MailTransport, OutgoingMessage};
use crate::pacing::DelayRange;
use crate::template;
use crate::types::{
    BatchResult, CampaignId, CleanupReport, CleanupStatus, DispatchFailure, DispatchOutcome,
    EmailTemplate, Event, Lead, Pagination,
};
use std::ops::Range;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Parameters of one dispatch batch
#[derive(Clone, Debug)]
pub struct DispatchRequest {
    /// Campaign to send for
    pub campaign_id: CampaignId,
    /// Subject and body patterns
    pub template: EmailTemplate,
    /// Relay settings
    pub smtp: SmtpConfig,
    /// Zero-based row where this batch starts
    pub cursor: usize,
    /// Maximum number of rows in this batch
    pub daily_quota: usize,
    /// Lead file to read; the lexically first `.csv` in the folder when `None`
    pub lead_file: Option<String>,
}

/// Compute the page `[cursor, min(cursor + quota, total))` and its bookkeeping.
///
/// A cursor past the end yields an empty page with `next_position == total_rows`.
pub fn paginate(total_rows: usize, cursor: usize, daily_quota: usize) -> (Range<usize>, Pagination) {
    let end = cursor.saturating_add(daily_quota).min(total_rows);
    let start = cursor.min(end);
    let pagination = Pagination {
        total_rows,
        current_position: cursor,
        next_position: end,
        emails_per_day: daily_quota,
        has_more: end < total_rows,
    };
    (start..end, pagination)
}

/// Split a page into contactable leads (with their trimmed address) and skipped leads,
/// both in row order
pub fn partition_leads(page: &[Lead]) -> (Vec<(&Lead, &str)>, Vec<&Lead>) {
    let mut valid = Vec::new();
    let mut skipped = Vec::new();
    for lead in page {
        match lead.deliverable_email() {
            Some(email) => valid.push((lead, email)),
            None => skipped.push(lead),
        }
    }
    (valid, skipped)
}

/// Drives the per-lead send loop for campaign batches
pub struct Dispatcher {
    store: Arc<dyn LeadStore>,
    transport: Arc<dyn MailTransport>,
    delays: DelayRange,
    tracking: TrackingConfig,
    events: broadcast::Sender<Event>,
    locks: CampaignLocks,
}

impl Dispatcher {
    /// Create a dispatcher over the given store and transport
    pub fn new(
        store: Arc<dyn LeadStore>,
        transport: Arc<dyn MailTransport>,
        delays: DelayRange,
        tracking: TrackingConfig,
        events: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            store,
            transport,
            delays,
            tracking,
            events,
            locks: CampaignLocks::new(),
        }
    }

    /// Per-campaign lock table shared with callers that extend the critical section
    pub fn locks(&self) -> &CampaignLocks {
        &self.locks
    }

    /// Run one batch under the campaign's lock.
    ///
    /// Never fails: configuration, lookup and read errors come back as
    /// [`DispatchOutcome::Error`].
    pub async fn dispatch(&self, request: &DispatchRequest) -> DispatchOutcome {
        let _guard = self.locks.acquire(&request.campaign_id).await;
        self.dispatch_locked(request).await
    }

    /// Run one batch; the caller must already hold the campaign's lock
    pub(crate) async fn dispatch_locked(&self, request: &DispatchRequest) -> DispatchOutcome {
        match self.run(request).await {
            Ok(batch) => DispatchOutcome::Success {
                message: format!(
                    "Successfully sent {} emails, {} failed",
                    batch.emails_sent, batch.emails_failed
                ),
                data: batch,
            },
            Err(e) => {
                tracing::error!(campaign_id = %request.campaign_id, error = %e, "Dispatch failed");
                self.emit(Event::DispatchFailed {
                    campaign_id: request.campaign_id.clone(),
                    error: e.to_string(),
                });
                DispatchOutcome::Error {
                    message: format!("Failed to send emails: {e}"),
                    data: DispatchFailure {
                        campaign_id: request.campaign_id.clone(),
                        error: e.to_string(),
                    },
                }
            }
        }
    }

    async fn select_file(&self, campaign_id: &CampaignId) -> Result<String> {
        let files = self.store.list_files(campaign_id).await?;
        let Some(csv_file) = files.first().cloned() else {
            return Err(DispatchError::NoFiles {
                campaign_id: campaign_id.to_string(),
            }
            .into());
        };
        if files.len() > 1 {
            tracing::warn!(
                campaign_id = %campaign_id,
                files = files.len(),
                selected = %csv_file,
                "Campaign has several lead files, using the first"
            );
        }
        Ok(csv_file)
    }

    async fn run(&self, request: &DispatchRequest) -> Result<BatchResult> {
        let campaign_id = &request.campaign_id;
        request.smtp.validate()?;

        let csv_file = match &request.lead_file {
            Some(file) => file.clone(),
            None => self.select_file(campaign_id).await?,
        };

        let leads = self.store.read_leads(campaign_id, &csv_file).await?;
        let (range, pagination) = paginate(leads.len(), request.cursor, request.daily_quota);
        let page = &leads[range];
        let (valid, skipped) = partition_leads(page);

        tracing::info!(
            campaign_id = %campaign_id,
            csv_file = %csv_file,
            total_rows = pagination.total_rows,
            cursor = request.cursor,
            valid = valid.len(),
            skipped = skipped.len(),
            "Starting dispatch batch"
        );

        for lead in &skipped {
            self.emit(Event::LeadSkipped {
                campaign_id: campaign_id.clone(),
                name: lead.name.clone(),
            });
        }
        self.emit(Event::DispatchStarted {
            campaign_id: campaign_id.clone(),
            csv_file: csv_file.clone(),
            valid_leads: valid.len(),
            skipped_leads: skipped.len(),
        });

        let mut details = Vec::with_capacity(valid.len());
        let mut successful_emails = Vec::new();
        let mut failed_emails = Vec::new();

        for (index, (lead, email)) in valid.iter().enumerate() {
            if index > 0 {
                self.delays.pause().await;
            }

            let rendered = template::render(
                &lead.name,
                &request.template,
                Some(campaign_id),
                &self.tracking,
            );
            let message = OutgoingMessage {
                to: (*email).to_string(),
                subject: rendered.subject,
                body: rendered.body,
            };
            let record = self.transport.send(&request.smtp, &message).await;

            if record.is_success() {
                successful_emails.push(record.email.clone());
            } else {
                failed_emails.push(record.email.clone());
            }
            self.emit(Event::LeadDelivered {
                campaign_id: campaign_id.clone(),
                email: record.email.clone(),
                success: record.is_success(),
            });
            details.push(record);
        }

        let cleanup = self.cleanup(campaign_id).await;

        let batch = BatchResult {
            campaign_id: campaign_id.clone(),
            csv_file,
            total_leads: page.len(),
            emails_sent: successful_emails.len(),
            emails_failed: failed_emails.len(),
            emails_skipped: skipped.len(),
            successful_emails,
            failed_emails,
            details,
            pagination,
            cleanup,
        };

        tracing::info!(
            campaign_id = %campaign_id,
            sent = batch.emails_sent,
            failed = batch.emails_failed,
            skipped = batch.emails_skipped,
            next_position = pagination.next_position,
            has_more = pagination.has_more,
            "Dispatch batch completed"
        );
        self.emit(Event::DispatchCompleted {
            campaign_id: campaign_id.clone(),
            sent: batch.emails_sent,
            failed: batch.emails_failed,
            skipped: batch.emails_skipped,
            next_position: pagination.next_position,
            has_more: pagination.has_more,
        });

        Ok(batch)
    }

    /// Remove the campaign folder; a failure is reported, not raised
    async fn cleanup(&self, campaign_id: &CampaignId) -> CleanupReport {
        match self.store.delete_folder(campaign_id).await {
            Ok(report) => {
                if report.removed {
                    self.emit(Event::FolderCleaned {
                        campaign_id: campaign_id.clone(),
                        files_removed: report.files_removed,
                    });
                }
                report
            }
            Err(e) => {
                tracing::warn!(campaign_id = %campaign_id, error = %e, "Campaign folder cleanup failed");
                CleanupReport {
                    status: CleanupStatus::Error,
                    message: format!("Failed to cleanup campaign files: {e}"),
                    campaign_id: campaign_id.clone(),
                    folder_path: self.store.folder_path(campaign_id),
                    removed: false,
                    files_removed: 0,
                }
            }
        }
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        self.events.send(event).ok();
    }
}
