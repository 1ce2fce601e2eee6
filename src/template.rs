//! Outreach template rendering

use crate::config::TrackingConfig;
use crate::types::{CampaignId, EmailTemplate};

/// Token replaced with the lead's business name
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Subject and body ready to send
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedMessage {
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
}

/// Substitute `business_name` for every `{name}` in the template.
///
/// When a campaign ID is given, a blank line and the tracking marker are
/// appended to the body. The marker is empty unless a tracking base URL is
/// configured.
pub fn render(
    business_name: &str,
    template: &EmailTemplate,
    campaign_id: Option<&CampaignId>,
    tracking: &TrackingConfig,
) -> RenderedMessage {
    let subject = template.subject.replace(NAME_PLACEHOLDER, business_name);
    let mut body = template.content.replace(NAME_PLACEHOLDER, business_name);

    if let Some(id) = campaign_id {
        body.push_str("\n\n");
        body.push_str(&tracking_marker(id, tracking));
    }

    RenderedMessage { subject, body }
}

fn tracking_marker(campaign_id: &CampaignId, tracking: &TrackingConfig) -> String {
    match tracking.pixel_base_url.as_deref() {
        Some(base) => format!(
            r#"<img src="{}/api/campaigns/{campaign_id}/track" width="1" height="1" alt="" />"#,
            base.trim_end_matches('/')
        ),
        None => String::new(),
    }
}
