//! Profile page: current account details and the update sent through the webhook.

use crate::backoffice::webhook;
use crate::error::{require, AppResult};
use crate::gateway::webhook::{function, MediaFile, Submission};
use crate::gateway::{AccountStore, WebhookClient};
use crate::models::{User, UserId};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileDraft {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Replacement photo; the stored one is kept when absent
    pub photo: Option<MediaFile>,
}

impl ProfileDraft {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone().unwrap_or_default(),
            photo: None,
        }
    }

    pub fn to_submission(&self) -> AppResult<Submission> {
        require(&[("nome", self.name.as_str()), ("email", self.email.as_str())])?;

        let mut submission = Submission::new(function::PROFILE)
            .text("nome", self.name.trim())
            .text("email", self.email.trim())
            .text("telefone", self.phone.trim());
        if let Some(photo) = &self.photo {
            submission = submission.file("foto", photo.clone());
        }
        Ok(submission.text("id", self.id))
    }
}

pub struct ProfileEditor {
    accounts: Arc<dyn AccountStore>,
    webhook: Option<Arc<WebhookClient>>,
}

impl ProfileEditor {
    pub fn new(accounts: Arc<dyn AccountStore>, webhook: Option<Arc<WebhookClient>>) -> Self {
        Self { accounts, webhook }
    }

    /// Stored account row, including the current photo url
    pub async fn load(&self, id: UserId) -> AppResult<User> {
        Ok(self.accounts.user(id).await?)
    }

    pub async fn save(&self, draft: &ProfileDraft) -> AppResult<()> {
        let submission = draft.to_submission()?;
        webhook(&self.webhook)?.post(submission).await?;
        info!("Profile update for user {} sent", draft.id);
        Ok(())
    }
}
