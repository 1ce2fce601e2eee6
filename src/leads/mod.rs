//! Campaign-scoped lead file storage
//!
//! Every campaign owns one folder under the data root, named `task_{campaign_id}`.
//! The folder holds the result files downloaded from the remote scraping job.
//! [`LeadStore`] is the capability the dispatcher depends on; [`CsvLeadStore`]
//! is the filesystem implementation.

mod csv_store;

pub use csv_store::CsvLeadStore;

use crate::error::Result;
use crate::types::{CampaignId, CleanupReport, FileValidation, Lead};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Storage of downloaded lead files, keyed by campaign
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Location of the campaign's folder, whether or not it exists
    fn folder_path(&self, campaign_id: &CampaignId) -> PathBuf;

    /// Campaigns that currently have a folder
    async fn list_campaign_folders(&self) -> Result<Vec<CampaignId>>;

    /// Lead files in the campaign folder, in lexical order
    ///
    /// Returns an empty list when the folder does not exist.
    async fn list_files(&self, campaign_id: &CampaignId) -> Result<Vec<String>>;

    /// Every row of a lead file, unfiltered
    ///
    /// Fails with [`crate::Error::Schema`] when the name or email column is absent.
    async fn read_leads(&self, campaign_id: &CampaignId, filename: &str) -> Result<Vec<Lead>>;

    /// Non-throwing diagnostic view of a lead file
    async fn validate_structure(&self, campaign_id: &CampaignId, filename: &str)
    -> FileValidation;

    /// Create the campaign folder if needed and return its path
    async fn ensure_folder(&self, campaign_id: &CampaignId) -> Result<PathBuf>;

    /// Remove the campaign folder and everything in it
    ///
    /// Deleting an absent folder is not an error; the report says `removed = false`.
    async fn delete_folder(&self, campaign_id: &CampaignId) -> Result<CleanupReport>;

    /// Lead files of every campaign
    async fn list_all_files(&self) -> Result<BTreeMap<CampaignId, Vec<String>>> {
        let mut all = BTreeMap::new();
        for campaign_id in self.list_campaign_folders().await? {
            let files = self.list_files(&campaign_id).await?;
            all.insert(campaign_id, files);
        }
        Ok(all)
    }
}
