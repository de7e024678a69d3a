pub mod brokers;
pub mod listings;
pub mod requests;
pub mod submissions;

pub use brokers::{search_brokers, BrokerDraft, BrokerManager};
pub use listings::{ListingDraft, ListingManager, ListingWizard, MediaRef, WizardStep};
pub use requests::{search_requests, AnalysisQueue};
pub use submissions::PublicSubmission;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::WebhookClient;
use std::sync::Arc;

pub(crate) fn webhook(client: &Option<Arc<WebhookClient>>) -> GatewayResult<&WebhookClient> {
    client
        .as_deref()
        .ok_or_else(|| GatewayError::Rejected("upload webhook is not configured".to_string()))
}
