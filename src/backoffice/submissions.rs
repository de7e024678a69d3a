use super::webhook;
use crate::error::{require, AppError, AppResult};
use crate::gateway::webhook::{MediaFile, Submission};
use crate::gateway::WebhookClient;
use std::sync::Arc;
use tracing::info;

/// Property offered for review through the public contact page.
///
/// Every field except the phone is required, along with at least one photo
/// and the consent box. Nothing is sent until all of them are present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublicSubmission {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub property_type: String,
    pub purpose: String,
    pub title: String,
    pub address: String,
    pub area: String,
    pub bedrooms: String,
    pub bathrooms: String,
    pub parking_spaces: String,
    pub price: String,
    pub message: String,
    pub agree: bool,
    photos: Vec<MediaFile>,
}

impl PublicSubmission {
    pub fn add_photo(&mut self, file: MediaFile) {
        self.photos.push(file);
    }

    pub fn remove_photo(&mut self, index: usize) -> Option<MediaFile> {
        (index < self.photos.len()).then(|| self.photos.remove(index))
    }

    pub fn photos(&self) -> &[MediaFile] {
        &self.photos
    }

    pub fn validate(&self) -> AppResult<()> {
        let mut missing = match require(&[
            ("name", self.name.as_str()),
            ("email", self.email.as_str()),
            ("message", self.message.as_str()),
            ("tipo", self.property_type.as_str()),
            ("finalidade", self.purpose.as_str()),
            ("titulo", self.title.as_str()),
            ("endereco", self.address.as_str()),
            ("area", self.area.as_str()),
            ("quarto", self.bedrooms.as_str()),
            ("banheiro", self.bathrooms.as_str()),
            ("vaga", self.parking_spaces.as_str()),
            ("valor", self.price.as_str()),
        ]) {
            Ok(()) => Vec::new(),
            Err(AppError::Validation { missing }) => missing,
            Err(other) => return Err(other),
        };
        if self.photos.is_empty() {
            missing.push("foto");
        }
        if !self.agree {
            missing.push("agree");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(missing))
        }
    }

    /// Untagged multipart payload; the webhook routes it to the review queue
    pub fn to_submission(&self) -> AppResult<Submission> {
        self.validate()?;
        let mut submission = Submission::default()
            .text("name", self.name.trim())
            .text("email", self.email.trim())
            .text("phone", &self.phone)
            .text("tipo", &self.property_type)
            .text("finalidade", &self.purpose)
            .text("titulo", &self.title)
            .text("endereco", &self.address)
            .text("area", &self.area)
            .text("quarto", &self.bedrooms)
            .text("banheiro", &self.bathrooms)
            .text("vaga", &self.parking_spaces)
            .text("valor", &self.price)
            .text("message", &self.message)
            .text("agree", self.agree);
        for photo in &self.photos {
            submission = submission.file("foto", photo.clone());
        }
        Ok(submission)
    }

    /// Validate, send, and clear the form on success
    pub async fn send(&mut self, client: &Option<Arc<WebhookClient>>) -> AppResult<()> {
        let submission = self.to_submission()?;
        webhook(client)?.post(submission).await?;
        info!("Public submission '{}' sent for review", self.title);
        *self = Self::default();
        Ok(())
    }
}
