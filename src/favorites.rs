use crate::error::{AppError, AppResult};
use crate::gateway::{FavoriteStore, ListingStore};
use crate::models::{Favorite, Listing, ListingId, UserId};
use crate::view::Loadable;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a favorite action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Favorited,
    Unfavorited,
    /// No signed-in user; the caller should surface a login prompt
    AuthenticationRequired,
}

/// Favorited listing ids of the session user, kept in step with the store.
/// Local state changes only after the store confirms a write.
pub struct FavoriteController {
    store: Arc<dyn FavoriteStore>,
    user: Option<UserId>,
    ids: Loadable<Vec<ListingId>>,
}

impl FavoriteController {
    pub fn new(store: Arc<dyn FavoriteStore>, user: Option<UserId>) -> Self {
        let ids = match user {
            Some(_) => Loadable::Pending,
            None => Loadable::Ready(Vec::new()),
        };
        Self { store, user, ids }
    }

    pub fn user(&self) -> Option<UserId> {
        self.user
    }

    pub fn state(&self) -> &Loadable<Vec<ListingId>> {
        &self.ids
    }

    /// Fetch the session user's favorite ids
    pub async fn load(&mut self) -> AppResult<()> {
        let user = match self.user {
            Some(user) => user,
            None => return Ok(()),
        };

        match self.store.favorite_ids(user).await {
            Ok(ids) => {
                let mut unique = Vec::with_capacity(ids.len());
                for id in ids {
                    if !unique.contains(&id) {
                        unique.push(id);
                    }
                }
                debug!("Loaded {} favorites for user {}", unique.len(), user);
                self.ids = Loadable::Ready(unique);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load favorites for user {}: {}", user, e);
                self.ids = Loadable::Failed(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Star state; false until the ids have loaded
    pub fn is_favorited(&self, listing: ListingId) -> bool {
        self.ids
            .ready()
            .map_or(false, |ids| ids.contains(&listing))
    }

    pub fn ids(&self) -> &[ListingId] {
        self.ids.ready().map(Vec::as_slice).unwrap_or(&[])
    }

    async fn ensure_loaded(&mut self) -> AppResult<()> {
        if self.ids.is_ready() {
            return Ok(());
        }
        self.load().await
    }

    /// Flip the star of `listing`
    pub async fn toggle(&mut self, listing: ListingId) -> AppResult<ToggleOutcome> {
        if self.user.is_none() {
            info!("Favorite toggle on {} refused: no session", listing);
            return Ok(ToggleOutcome::AuthenticationRequired);
        }
        self.ensure_loaded().await?;

        if self.is_favorited(listing) {
            self.unfavorite(listing).await
        } else {
            self.favorite(listing).await
        }
    }

    /// Mark `listing` favorited; no write when it already is
    pub async fn favorite(&mut self, listing: ListingId) -> AppResult<ToggleOutcome> {
        let user = match self.user {
            Some(user) => user,
            None => return Ok(ToggleOutcome::AuthenticationRequired),
        };
        self.ensure_loaded().await?;
        if self.is_favorited(listing) {
            debug!("Listing {} already favorited by {}", listing, user);
            return Ok(ToggleOutcome::Favorited);
        }

        self.store
            .insert_favorite(&Favorite::new(user, listing))
            .await
            .map_err(|e| {
                warn!("Failed to add favorite {} for {}: {}", listing, user, e);
                AppError::from(e)
            })?;

        if let Some(ids) = self.ids.ready_mut() {
            ids.push(listing);
        }
        info!("User {} favorited listing {}", user, listing);
        Ok(ToggleOutcome::Favorited)
    }

    /// Remove the star of `listing`; no write when it is not favorited
    pub async fn unfavorite(&mut self, listing: ListingId) -> AppResult<ToggleOutcome> {
        let user = match self.user {
            Some(user) => user,
            None => return Ok(ToggleOutcome::AuthenticationRequired),
        };
        self.ensure_loaded().await?;
        if !self.is_favorited(listing) {
            return Ok(ToggleOutcome::Unfavorited);
        }

        self.store
            .delete_favorite(user, listing)
            .await
            .map_err(|e| {
                warn!("Failed to remove favorite {} for {}: {}", listing, user, e);
                AppError::from(e)
            })?;

        if let Some(ids) = self.ids.ready_mut() {
            ids.retain(|id| *id != listing);
        }
        info!("User {} unfavorited listing {}", user, listing);
        Ok(ToggleOutcome::Unfavorited)
    }

    /// The user's favorited listings that are still available, for the favorites page
    pub async fn favorite_listings(&mut self, listings: &dyn ListingStore) -> AppResult<Vec<Listing>> {
        if self.user.is_none() {
            return Err(AppError::AuthenticationRequired);
        }
        self.ensure_loaded().await?;
        let ids = self.ids().to_vec();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(listings.available_by_ids(&ids).await?)
    }

    /// Drop listings that are no longer favorited from a displayed collection
    pub fn reconcile(&self, displayed: &mut Vec<Listing>) {
        displayed.retain(|listing| self.is_favorited(listing.id));
    }
}
