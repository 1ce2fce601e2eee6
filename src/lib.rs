//! # leadflow
//!
//! Lead-generation glue service: submits scraping campaigns to a remote
//! business-data API, downloads the resulting lead files, and emails the leads
//! in paced, quota-limited batches.
//!
//! ## Flow
//!
//! 1. `start_scrape` submits a scraping job and returns the remote job ID
//! 2. `trigger_send` downloads the job's result file into `task_{job_id}/`
//!    and dispatches one page of leads in the background
//! 3. `task_status` reports the outcome, including the cursor for the next page
//!
//! ## Quick Start
//!
//! ```no_run
//! use leadflow::{Config, LeadFlow};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let flow = LeadFlow::new(config)?;
//!
//!     let mut events = flow.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Paginated batch dispatch
pub mod dispatch;
/// Error types
pub mod error;
/// Campaign-scoped lead file storage
pub mod leads;
/// Outbound mail delivery
pub mod mail;
/// Randomized pauses between sends
pub mod pacing;
/// Remote scraping API client
pub mod scraper;
/// Service orchestration
pub mod service;
/// Background task status map
pub mod tasks;
/// Outreach template rendering
pub mod template;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{Config, SmtpConfig};
pub use dispatch::{DispatchRequest, Dispatcher};
pub use error::{ApiError, DispatchError, Error, ErrorDetail, Result, ToHttpStatus};
pub use leads::{CsvLeadStore, LeadStore};
pub use mail::{MailTransport, OutgoingMessage, SmtpMailTransport};
pub use service::LeadFlow;
pub use tasks::TaskStore;
pub use types::{
    BatchResult, Campaign, CampaignId, DeliveryRecord, DispatchOutcome, EmailTemplate, Event,
    Lead, Pagination, ScrapeRequest, SendRequest, TaskEntry, TaskState, User,
};

/// Serve the REST API until a termination signal arrives.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Background sends still running when the signal arrives are abandoned; their
/// task entries are lost with the process.
pub async fn run_with_shutdown(flow: LeadFlow) -> Result<()> {
    let config = std::sync::Arc::new(flow.config().clone());
    api::start_api_server(std::sync::Arc::new(flow), config, wait_for_signal()).await
}

/// Resolve once the process receives SIGTERM or SIGINT
#[cfg(unix)]
pub async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

/// Resolve once the process receives Ctrl+C
#[cfg(not(unix))]
pub async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
