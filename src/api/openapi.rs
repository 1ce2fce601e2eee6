//! OpenAPI documentation and schema generation
//!
//! The specification is generated at compile time with utoipa and served at
//! `/api/openapi.json`; Swagger UI renders it at `/swagger-ui`.

use utoipa::OpenApi;

/// OpenAPI documentation for the leadflow REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "LeadFlow Scraper Service",
        version = "1.0.0",
        description = "API service for scraping leads and sending emails"
    ),
    servers(
        (url = "http://localhost:3002", description = "Local development server")
    ),
    paths(
        // Scraping and sending
        crate::api::routes::start_scrape,
        crate::api::routes::trigger_send,
        crate::api::routes::get_task_status,

        // Campaign folders and lead files
        crate::api::routes::list_campaigns,
        crate::api::routes::list_campaign_files,
        crate::api::routes::validate_campaign_file,
        crate::api::routes::create_campaign_folder,
        crate::api::routes::cleanup_campaign,
        crate::api::routes::list_all_files,

        // Remote scraping API
        crate::api::routes::get_locations,
        crate::api::routes::get_default_locations,
        crate::api::routes::get_scrape_task_status,
        crate::api::routes::get_scrape_task_info,
        crate::api::routes::get_task_info,
        crate::api::routes::get_task_info_raw,
        crate::api::routes::download_task_file,
        crate::api::routes::download_file_by_url,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Requests
        crate::types::ScrapeRequest,
        crate::types::SendRequest,
        crate::types::Campaign,
        crate::types::User,
        crate::types::EmailTemplate,
        crate::config::SmtpConfig,

        // Task tracking
        crate::types::TaskResponse,
        crate::types::TaskEntry,
        crate::types::TaskState,
        crate::types::SendReport,
        crate::types::EmailSendingSummary,

        // Dispatch results
        crate::types::CampaignId,
        crate::types::BatchResult,
        crate::types::DeliveryRecord,
        crate::types::DeliveryStatus,
        crate::types::Pagination,
        crate::types::CleanupReport,
        crate::types::CleanupStatus,
        crate::types::FileValidation,
        crate::types::DownloadedFile,
        crate::types::Event,

        // Remote API views
        crate::scraper::Locations,
        crate::scraper::JobStatus,

        // Route envelopes
        crate::api::routes::CampaignsResponse,
        crate::api::routes::CampaignFilesResponse,
        crate::api::routes::ValidationResponse,
        crate::api::routes::FolderResponse,
        crate::api::routes::AllFilesResponse,
        crate::api::routes::CleanupResponse,
        crate::api::routes::LocationsResponse,
        crate::api::routes::JobStatusResponse,
        crate::api::routes::TaskInfoResponse,
        crate::api::routes::DownloadResponse,
        crate::api::routes::DownloadFileQuery,
        crate::api::routes::HealthResponse,

        // Errors
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "sending", description = "Scrape submission, email sending and background task status"),
        (name = "campaigns", description = "Campaign folders and the lead files stored in them"),
        (name = "remote", description = "Remote scraping API views and result file downloads"),
        (name = "system", description = "Health check, OpenAPI spec, event stream"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the `X-Api-Key` header scheme
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Api-Key"),
                    ),
                ),
            );
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let spec = ApiDoc::openapi();
        for path in [
            "/api/scrape",
            "/api/send",
            "/api/tasks/{task_id}",
            "/api/campaigns",
            "/api/campaigns/{campaign_id}/csv-files",
            "/api/campaigns/{campaign_id}/csv-files/{filename}/validate",
            "/api/campaigns/{campaign_id}/create-folder",
            "/api/campaigns/{campaign_id}/cleanup",
            "/api/csv-files/all",
            "/api/locations",
            "/api/locations/{country}",
            "/api/scrape/task/{task_id}",
            "/api/scrape/task/{task_id}/info",
            "/api/task/{task_id}",
            "/api/task/{task_id}/raw",
            "/api/task/{task_id}/download",
            "/api/download/file",
            "/api/health",
            "/api/openapi.json",
            "/api/events",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn request_schemas_are_registered() {
        let components = ApiDoc::openapi().components.unwrap();
        for schema in ["SendRequest", "ScrapeRequest", "SmtpConfig", "TaskEntry", "ApiError"] {
            assert!(components.schemas.contains_key(schema), "missing {schema}");
        }
        assert!(components.security_schemes.contains_key("api_key"));
    }

    #[test]
    fn spec_serializes_as_openapi_3() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "LeadFlow Scraper Service");

        let json = serde_json::to_value(&spec).unwrap();
        assert!(json["openapi"].as_str().unwrap().starts_with("3."));
        let tags: Vec<&str> = json["tags"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|t| t["name"].as_str())
            .collect();
        assert_eq!(tags, vec!["sending", "campaigns", "remote", "system"]);
    }
}
