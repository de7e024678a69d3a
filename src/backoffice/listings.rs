use super::webhook;
use crate::error::{require, AppError, AppResult};
use crate::gateway::webhook::{function, MediaFile, Submission};
use crate::gateway::{ListingStore, WebhookClient};
use crate::models::{Listing, ListingId};
use std::sync::Arc;
use tracing::info;

/// Listing form state. Values stay as typed; the webhook does the conversion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingDraft {
    pub title: String,
    pub advertiser: String,
    pub description: String,
    pub city: String,
    pub neighborhood: String,
    pub street: String,
    pub number: String,
    pub postal_code: String,
    pub property_type: String,
    pub transaction: String,
    pub price: String,
    pub bedrooms: String,
    pub bathrooms: String,
    pub area: String,
    pub parking_spaces: String,
    pub features: String,
    pub amenities: String,
}

fn text<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

fn number(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 => format!("{}", v as i64),
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

impl ListingDraft {
    /// Prefill the edit form from a stored listing
    pub fn from_listing(listing: &Listing) -> Self {
        let loc = &listing.location;
        Self {
            title: listing.title.clone(),
            advertiser: text(&listing.advertiser),
            description: text(&listing.description),
            city: text(&loc.city),
            neighborhood: text(&loc.neighborhood),
            street: text(&loc.street),
            number: text(&loc.number),
            postal_code: text(&loc.postal_code),
            property_type: text(&listing.property_type),
            transaction: text(&listing.transaction),
            price: number(listing.price),
            bedrooms: text(&listing.bedrooms),
            bathrooms: text(&listing.bathrooms),
            area: number(listing.area),
            parking_spaces: text(&listing.parking_spaces),
            features: text(&listing.features),
            amenities: text(&listing.amenities),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        require(&[
            ("titulo", self.title.as_str()),
            ("cidade", self.city.as_str()),
            ("bairro", self.neighborhood.as_str()),
            ("tipo", self.property_type.as_str()),
            ("negociacao", self.transaction.as_str()),
            ("valor", self.price.as_str()),
        ])
    }

    pub fn address(&self) -> String {
        [&self.street, &self.number, &self.neighborhood, &self.city]
            .into_iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Listing columns under their table names
    fn append_to(&self, submission: Submission) -> Submission {
        submission
            .text("titulo", &self.title)
            .text("nome_anunciante", &self.advertiser)
            .text("descricao", &self.description)
            .text("cidade", &self.city)
            .text("bairro", &self.neighborhood)
            .text("rua", &self.street)
            .text("numero", &self.number)
            .text("cep", &self.postal_code)
            .text("tipo", &self.property_type)
            .text("negociacao", &self.transaction)
            .text("valor", &self.price)
            .text("quartos", &self.bedrooms)
            .text("banheiros", &self.bathrooms)
            .text("metros", &self.area)
            .text("vagas", &self.parking_spaces)
            .text("caracteristicas", &self.features)
            .text("Condominio", &self.amenities)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Details,
    Media,
}

/// Two-step creation form: listing details, then photos and videos
#[derive(Debug, Clone)]
pub struct ListingWizard {
    step: WizardStep,
    pub draft: ListingDraft,
    photos: Vec<MediaFile>,
    videos: Vec<MediaFile>,
}

impl Default for ListingWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingWizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Details,
            draft: ListingDraft::default(),
            photos: Vec::new(),
            videos: Vec::new(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    /// Move to the media step once the required details are filled in
    pub fn next(&mut self) -> AppResult<WizardStep> {
        self.draft.validate()?;
        self.step = WizardStep::Media;
        Ok(self.step)
    }

    pub fn back(&mut self) -> WizardStep {
        self.step = WizardStep::Details;
        self.step
    }

    pub fn add_media(&mut self, file: MediaFile) {
        if file.is_video() {
            self.videos.push(file);
        } else {
            self.photos.push(file);
        }
    }

    pub fn media_count(&self) -> usize {
        self.photos.len() + self.videos.len()
    }

    /// Payload for the webhook; only available on the media step
    pub fn submission(&self) -> AppResult<Submission> {
        self.draft.validate()?;
        if self.step != WizardStep::Media {
            return Err(AppError::validation(vec!["midia"]));
        }

        let d = &self.draft;
        let mut submission = d
            .append_to(Submission::new(function::CREATE_LISTING))
            // field names the webhook shares with the public submission form
            .text("area", &d.area)
            .text("quarto", &d.bedrooms)
            .text("banheiro", &d.bathrooms)
            .text("vaga", &d.parking_spaces)
            .text("endereco", d.address())
            .text("finalidade", &d.transaction)
            .text("name", &d.advertiser)
            .text("condominio", &d.amenities)
            .text("agree", true);

        for file in self.photos.iter().chain(self.videos.iter()) {
            submission = submission.file("foto", file.clone());
        }
        Ok(submission)
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Reference to a listing's media during an edit
#[derive(Debug, Clone, PartialEq)]
pub enum MediaRef {
    Stored(String),
    New(MediaFile),
}

/// Back-office listing CRUD
pub struct ListingManager {
    store: Arc<dyn ListingStore>,
    webhook: Option<Arc<WebhookClient>>,
}

impl ListingManager {
    pub fn new(store: Arc<dyn ListingStore>, webhook: Option<Arc<WebhookClient>>) -> Self {
        Self { store, webhook }
    }

    /// Every listing, including withdrawn ones
    pub async fn all(&self) -> AppResult<Vec<Listing>> {
        Ok(self.store.listings().await?)
    }

    pub async fn get(&self, id: ListingId) -> AppResult<Listing> {
        Ok(self.store.listing(id).await?)
    }

    pub async fn delete(&self, ids: &[ListingId]) -> AppResult<()> {
        self.store.delete_listings(ids).await?;
        info!("Deleted listings {:?}", ids);
        Ok(())
    }

    pub async fn set_availability(&self, id: ListingId, available: bool) -> AppResult<()> {
        self.store.set_availability(id, available).await?;
        info!("Listing {} availability set to {}", id, available);
        Ok(())
    }

    /// Stored media of `listing`, as the starting point of an edit
    pub fn media_refs(listing: &Listing) -> Vec<MediaRef> {
        listing
            .media_urls()
            .into_iter()
            .map(|url| MediaRef::Stored(url.to_string()))
            .collect()
    }

    /// Update payload carrying all current media, old and new
    pub fn update_submission(
        id: ListingId,
        draft: &ListingDraft,
        media: &[MediaRef],
    ) -> AppResult<Submission> {
        draft.validate()?;
        let mut submission = draft
            .append_to(Submission::new(function::UPDATE_LISTING).text("atualiza_imoveis", true))
            .text("id", id);
        for item in media {
            submission = match item {
                MediaRef::Stored(url) => submission.text("midia_url", url),
                MediaRef::New(file) => submission.file("midia", file.clone()),
            };
        }
        Ok(submission)
    }

    pub async fn update(
        &self,
        id: ListingId,
        draft: &ListingDraft,
        media: &[MediaRef],
    ) -> AppResult<()> {
        let submission = Self::update_submission(id, draft, media)?;
        webhook(&self.webhook)?.post(submission).await?;
        info!("Listing {} update sent", id);
        Ok(())
    }

    /// Send a finished wizard; the wizard resets only on success
    pub async fn create(&self, wizard: &mut ListingWizard) -> AppResult<()> {
        let submission = wizard.submission()?;
        webhook(&self.webhook)?.post(submission).await?;
        info!("New listing '{}' sent for upload", wizard.draft.title);
        wizard.reset();
        Ok(())
    }
}
