//! Application state for the API server

use crate::{Config, LeadFlow};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The leadflow service
    pub flow: Arc<LeadFlow>,

    /// Configuration the router was built from
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(flow: Arc<LeadFlow>, config: Arc<Config>) -> Self {
        Self { flow, config }
    }
}
