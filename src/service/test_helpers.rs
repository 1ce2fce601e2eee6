//! Shared test helpers for dispatch and service tests.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::config::{Config, SmtpConfig};
use crate::leads::{CsvLeadStore, LeadStore};
use crate::mail::{MailTransport, OutgoingMessage};
use crate::types::{CampaignId, DeliveryRecord};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

/// Mail transport that records every message instead of talking to a relay.
#[derive(Default)]
pub(crate) struct RecordingMailTransport {
    sent: Mutex<Vec<(OutgoingMessage, Instant)>>,
    failing: HashSet<String>,
}

impl RecordingMailTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Transport that reports a failure for each of the given recipients
    pub(crate) fn failing_for(recipients: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: recipients.iter().map(|r| r.to_string()).collect(),
        }
    }

    pub(crate) fn messages(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    pub(crate) fn send_times(&self) -> Vec<Instant> {
        self.sent.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl MailTransport for RecordingMailTransport {
    async fn send(&self, _config: &SmtpConfig, message: &OutgoingMessage) -> DeliveryRecord {
        self.sent
            .lock()
            .unwrap()
            .push((message.clone(), Instant::now()));
        if self.failing.contains(&message.to) {
            DeliveryRecord::failure(&message.to, "550 mailbox unavailable")
        } else {
            DeliveryRecord::success(&message.to)
        }
    }
}

pub(crate) fn smtp_config() -> SmtpConfig {
    SmtpConfig {
        smtp_server: "smtp.example.com".into(),
        smtp_port: 587,
        email_address: "sender@example.com".into(),
        email_password: "secret".into(),
    }
}

/// Lead file with `count` rows named `Lead {i}` at `lead{i}@example.test`
pub(crate) fn leads_csv(count: usize) -> String {
    let mut csv = String::from("name,email_1,phone\n");
    for i in 0..count {
        csv.push_str(&format!("Lead {i},lead{i}@example.test,555-{i:04}\n"));
    }
    csv
}

/// Write `contents` as `filename` into the campaign folder
pub(crate) async fn write_lead_file(
    store: &CsvLeadStore,
    campaign_id: &CampaignId,
    filename: &str,
    contents: &str,
) {
    let folder = store.ensure_folder(campaign_id).await.unwrap();
    tokio::fs::write(folder.join(filename), contents).await.unwrap();
}

/// Configuration pointing at a temporary data root and the given scraper URL,
/// with no pauses between sends
pub(crate) fn test_config(dir: &TempDir, scraper_url: &str) -> Config {
    let mut config = Config::default();
    config.storage.data_dir = dir.path().to_path_buf();
    config.scraper.base_url = scraper_url.to_string();
    config.scraper.api_key = Some("test-key".into());
    config.scraper.request_timeout = Duration::from_secs(5);
    config.dispatch.min_delay = Duration::ZERO;
    config.dispatch.max_delay = Duration::ZERO;
    config
}

/// Shared transport handle usable both as the trait object and for assertions
pub(crate) fn recording_transport() -> (Arc<RecordingMailTransport>, Arc<dyn MailTransport>) {
    let transport = Arc::new(RecordingMailTransport::new());
    let dyn_transport: Arc<dyn MailTransport> = transport.clone();
    (transport, dyn_transport)
}
