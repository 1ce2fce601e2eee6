use super::LeadStore;
use crate::error::{DispatchError, Error, Result};
use crate::types::{CampaignId, CleanupReport, CleanupStatus, FileValidation, Lead};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Cell values treated as an absent email address
const MISSING_MARKERS: &[&str] = &["nan", "NaN", "null", "NULL", "None", "N/A", "n/a", "NA"];

/// Rows included in a validation sample
const SAMPLE_ROWS: usize = 3;

/// Filesystem lead store reading comma-separated files
#[derive(Clone, Debug)]
pub struct CsvLeadStore {
    root: PathBuf,
    name_column: String,
    email_column: String,
}

impl CsvLeadStore {
    /// Store rooted at `root`, reading the `name` and `email_1` columns
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            name_column: "name".to_string(),
            email_column: "email_1".to_string(),
        }
    }

    /// Override the required column names
    pub fn with_columns(mut self, name_column: impl Into<String>, email_column: impl Into<String>) -> Self {
        self.name_column = name_column.into();
        self.email_column = email_column.into();
        self
    }

    async fn read_file(&self, campaign_id: &CampaignId, filename: &str) -> Result<(PathBuf, Vec<u8>)> {
        let path = self.folder_path(campaign_id).join(filename);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok((path, bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(DispatchError::FileNotFound {
                campaign_id: campaign_id.to_string(),
                path,
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl LeadStore for CsvLeadStore {
    fn folder_path(&self, campaign_id: &CampaignId) -> PathBuf {
        self.root.join(campaign_id.folder_name())
    }

    async fn list_campaign_folders(&self) -> Result<Vec<CampaignId>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut campaigns = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(CampaignId::from_folder_name) {
                campaigns.push(id);
            }
        }
        campaigns.sort();
        Ok(campaigns)
    }

    async fn list_files(&self, campaign_id: &CampaignId) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(self.folder_path(campaign_id)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if is_csv(&name) {
                files.push(name);
            }
        }
        files.sort();
        Ok(files)
    }

    async fn read_leads(&self, campaign_id: &CampaignId, filename: &str) -> Result<Vec<Lead>> {
        let (path, bytes) = self.read_file(campaign_id, filename).await?;
        let table = parse_table(&bytes)?;
        let (name_idx, email_idx) = table.required_columns(&path, &self.name_column, &self.email_column)?;

        let leads = table
            .rows
            .into_iter()
            .map(|row| {
                let cell = |idx: usize| row.get(idx).map(String::as_str).unwrap_or_default();
                let name = cell(name_idx).trim().to_string();
                let email = Some(cell(email_idx).trim())
                    .filter(|e| !e.is_empty() && !MISSING_MARKERS.contains(e))
                    .map(str::to_string);
                let fields = table.headers.iter().cloned().zip(row.iter().cloned()).collect();
                Lead { name, email, fields }
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            campaign_id = %campaign_id,
            file = %filename,
            rows = leads.len(),
            "Read lead file"
        );
        Ok(leads)
    }

    async fn validate_structure(&self, campaign_id: &CampaignId, filename: &str) -> FileValidation {
        let inspect = async {
            let (path, bytes) = self.read_file(campaign_id, filename).await?;
            let table = parse_table(&bytes)?;
            let (_, email_idx) = table.required_columns(&path, &self.name_column, &self.email_column)?;
            Ok::<_, Error>((table, email_idx))
        };

        match inspect.await {
            Ok((table, email_idx)) => {
                let valid_emails = table
                    .rows
                    .iter()
                    .filter(|row| row.get(email_idx).is_some_and(|e| e.contains('@')))
                    .count();
                let sample_data = table
                    .rows
                    .iter()
                    .take(SAMPLE_ROWS)
                    .map(|row| table.headers.iter().cloned().zip(row.iter().cloned()).collect())
                    .collect();
                FileValidation {
                    valid: true,
                    campaign_id: campaign_id.clone(),
                    filename: filename.to_string(),
                    total_rows: Some(table.rows.len()),
                    valid_emails: Some(valid_emails),
                    columns: Some(table.headers),
                    sample_data: Some(sample_data),
                    error: None,
                }
            }
            Err(e) => FileValidation {
                valid: false,
                campaign_id: campaign_id.clone(),
                filename: filename.to_string(),
                total_rows: None,
                valid_emails: None,
                columns: None,
                sample_data: None,
                error: Some(format!(
                    "Error reading CSV file {filename} in campaign {campaign_id}: {e}"
                )),
            },
        }
    }

    async fn ensure_folder(&self, campaign_id: &CampaignId) -> Result<PathBuf> {
        let path = self.folder_path(campaign_id);
        tokio::fs::create_dir_all(&path).await?;
        Ok(path)
    }

    async fn delete_folder(&self, campaign_id: &CampaignId) -> Result<CleanupReport> {
        let path = self.folder_path(campaign_id);

        let mut entries = match tokio::fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(CleanupReport {
                    status: CleanupStatus::Skipped,
                    message: format!("Task folder {} does not exist", path.display()),
                    campaign_id: campaign_id.clone(),
                    folder_path: path,
                    removed: false,
                    files_removed: 0,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let mut count = 0;
        while entries.next_entry().await?.is_some() {
            count += 1;
        }

        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {}
            // Lost a race with another deletion
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            campaign_id = %campaign_id,
            files_removed = count,
            "Removed campaign folder"
        );

        Ok(CleanupReport {
            status: CleanupStatus::Success,
            message: format!("Successfully cleaned up {count} files from task folder"),
            campaign_id: campaign_id.clone(),
            folder_path: path,
            removed: true,
            files_removed: count,
        })
    }
}

fn is_csv(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn required_columns(&self, path: &Path, name: &str, email: &str) -> Result<(usize, usize)> {
        match (self.column(name), self.column(email)) {
            (Some(n), Some(e)) => Ok((n, e)),
            (n, e) => {
                let mut missing = Vec::new();
                if n.is_none() {
                    missing.push(name.to_string());
                }
                if e.is_none() {
                    missing.push(email.to_string());
                }
                Err(Error::Schema {
                    file: path.to_path_buf(),
                    missing,
                })
            }
        }
    }
}

fn parse_table(bytes: &[u8]) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);

    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table { headers, rows })
}
