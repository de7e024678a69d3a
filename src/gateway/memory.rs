use crate::error::{GatewayError, GatewayResult};
use crate::gateway::traits::{AccountStore, BackOfficeStore, FavoriteStore, ListingStore};
use crate::gateway::types::{ANALYSIS_REQUESTS, BROKERS, CONTACTS, FAVORITES, LISTINGS, USERS};
use crate::models::{
    AnalysisRequest, Broker, BrokerId, Contact, Favorite, Listing, ListingId, NewUser,
    RequestStatus, User, UserId, UserKind,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

/// Write issued against the in-memory tables, recorded in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    InsertFavorite { user: UserId, listing: ListingId },
    DeleteFavorite { user: UserId, listing: ListingId },
    InsertUser { email: String },
    SetAvailability { listing: ListingId, available: bool },
    DeleteListings(Vec<ListingId>),
    DeleteBrokers(Vec<BrokerId>),
    SetRequestStatus { id: i64, status: String },
}

#[derive(Default)]
struct Tables {
    listings: Vec<Listing>,
    favorites: Vec<Favorite>,
    users: Vec<(User, String)>,
    brokers: Vec<Broker>,
    requests: Vec<AnalysisRequest>,
    contacts: Vec<Contact>,
    next_id: i64,
    writes: Vec<WriteOp>,
}

impl Tables {
    fn assign_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process stand-in for the hosted store; enforces (user, listing) uniqueness
#[derive(Default)]
pub struct MemoryGateway {
    tables: Mutex<Tables>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listings(mut self, listings: Vec<Listing>) -> Self {
        let tables = self.tables.get_mut();
        let highest = listings.iter().map(|l| l.id).max().unwrap_or(0);
        tables.next_id = tables.next_id.max(highest);
        tables.listings = listings;
        self
    }

    pub fn with_favorites(mut self, favorites: Vec<Favorite>) -> Self {
        self.tables.get_mut().favorites = favorites;
        self
    }

    /// Seed an account together with its password
    pub fn with_user(mut self, user: User, password: &str) -> Self {
        let tables = self.tables.get_mut();
        tables.next_id = tables.next_id.max(user.id);
        tables.users.push((user, password.to_string()));
        self
    }

    pub fn with_brokers(mut self, brokers: Vec<Broker>) -> Self {
        self.tables.get_mut().brokers = brokers;
        self
    }

    pub fn with_requests(mut self, requests: Vec<AnalysisRequest>) -> Self {
        self.tables.get_mut().requests = requests;
        self
    }

    pub fn with_contacts(mut self, contacts: Vec<Contact>) -> Self {
        self.tables.get_mut().contacts = contacts;
        self
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn writes(&self) -> Vec<WriteOp> {
        self.tables.lock().await.writes.clone()
    }

    pub async fn favorites_snapshot(&self) -> Vec<Favorite> {
        self.tables.lock().await.favorites.clone()
    }

    fn check_read(&self, table: &str) -> GatewayResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(unavailable(table));
        }
        Ok(())
    }

    fn check_write(&self, table: &str) -> GatewayResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable(table));
        }
        Ok(())
    }
}

fn unavailable(table: &str) -> GatewayError {
    GatewayError::Status {
        table: table.to_string(),
        status: 503,
        body: "service unavailable".to_string(),
    }
}

fn not_found(table: &str, id: i64) -> GatewayError {
    GatewayError::NotFound {
        table: table.to_string(),
        id,
    }
}

#[async_trait]
impl ListingStore for MemoryGateway {
    async fn listings(&self) -> GatewayResult<Vec<Listing>> {
        self.check_read(LISTINGS)?;
        Ok(self.tables.lock().await.listings.clone())
    }

    async fn listing(&self, id: ListingId) -> GatewayResult<Listing> {
        self.check_read(LISTINGS)?;
        self.tables
            .lock()
            .await
            .listings
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or_else(|| not_found(LISTINGS, id))
    }

    async fn available_by_ids(&self, ids: &[ListingId]) -> GatewayResult<Vec<Listing>> {
        self.check_read(LISTINGS)?;
        Ok(self
            .tables
            .lock()
            .await
            .listings
            .iter()
            .filter(|l| l.available && ids.contains(&l.id))
            .cloned()
            .collect())
    }

    async fn set_availability(&self, id: ListingId, available: bool) -> GatewayResult<()> {
        self.check_write(LISTINGS)?;
        let mut tables = self.tables.lock().await;
        let listing = tables
            .listings
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| not_found(LISTINGS, id))?;
        listing.available = available;
        tables.writes.push(WriteOp::SetAvailability {
            listing: id,
            available,
        });
        Ok(())
    }

    async fn delete_listings(&self, ids: &[ListingId]) -> GatewayResult<()> {
        self.check_write(LISTINGS)?;
        let mut tables = self.tables.lock().await;
        tables.listings.retain(|l| !ids.contains(&l.id));
        tables.writes.push(WriteOp::DeleteListings(ids.to_vec()));
        Ok(())
    }
}

#[async_trait]
impl FavoriteStore for MemoryGateway {
    async fn favorite_ids(&self, user: UserId) -> GatewayResult<Vec<ListingId>> {
        self.check_read(FAVORITES)?;
        Ok(self
            .tables
            .lock()
            .await
            .favorites
            .iter()
            .filter(|f| f.user_id == user)
            .map(|f| f.listing_id)
            .collect())
    }

    async fn all_favorites(&self) -> GatewayResult<Vec<Favorite>> {
        self.check_read(FAVORITES)?;
        Ok(self.tables.lock().await.favorites.clone())
    }

    async fn insert_favorite(&self, favorite: &Favorite) -> GatewayResult<()> {
        self.check_write(FAVORITES)?;
        let mut tables = self.tables.lock().await;
        tables.writes.push(WriteOp::InsertFavorite {
            user: favorite.user_id,
            listing: favorite.listing_id,
        });

        let exists = tables
            .favorites
            .iter()
            .any(|f| f.user_id == favorite.user_id && f.listing_id == favorite.listing_id);
        if exists {
            debug!(
                "favorite ({}, {}) already stored, ignoring",
                favorite.user_id, favorite.listing_id
            );
            return Ok(());
        }

        let id = tables.assign_id();
        tables.favorites.push(Favorite {
            id: Some(id),
            ..favorite.clone()
        });
        Ok(())
    }

    async fn delete_favorite(&self, user: UserId, listing: ListingId) -> GatewayResult<()> {
        self.check_write(FAVORITES)?;
        let mut tables = self.tables.lock().await;
        tables
            .favorites
            .retain(|f| !(f.user_id == user && f.listing_id == listing));
        tables.writes.push(WriteOp::DeleteFavorite { user, listing });
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryGateway {
    async fn find_by_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> GatewayResult<Option<User>> {
        self.check_read(USERS)?;
        Ok(self
            .tables
            .lock()
            .await
            .users
            .iter()
            .find(|(user, secret)| user.email == email && secret == password)
            .map(|(user, _)| user.clone()))
    }

    async fn insert_user(&self, new_user: &NewUser) -> GatewayResult<()> {
        self.check_write(USERS)?;
        let mut tables = self.tables.lock().await;
        let id = tables.assign_id();
        let user = User {
            id,
            name: new_user.name.clone(),
            email: new_user.email.clone(),
            kind: new_user.kind.clone(),
            created_at: Some(new_user.created_at),
            phone: None,
            photo_url: None,
        };
        tables.users.push((user, new_user.password.clone()));
        tables.writes.push(WriteOp::InsertUser {
            email: new_user.email.clone(),
        });
        Ok(())
    }

    async fn user(&self, id: UserId) -> GatewayResult<User> {
        self.check_read(USERS)?;
        self.tables
            .lock()
            .await
            .users
            .iter()
            .find(|(user, _)| user.id == id)
            .map(|(user, _)| user.clone())
            .ok_or_else(|| not_found(USERS, id))
    }

    async fn users_of_kind(&self, kind: &UserKind) -> GatewayResult<Vec<User>> {
        self.check_read(USERS)?;
        Ok(self
            .tables
            .lock()
            .await
            .users
            .iter()
            .filter(|(user, _)| &user.kind == kind)
            .map(|(user, _)| user.clone())
            .collect())
    }
}

#[async_trait]
impl BackOfficeStore for MemoryGateway {
    async fn brokers(&self) -> GatewayResult<Vec<Broker>> {
        self.check_read(BROKERS)?;
        Ok(self.tables.lock().await.brokers.clone())
    }

    async fn delete_brokers(&self, ids: &[BrokerId]) -> GatewayResult<()> {
        self.check_write(BROKERS)?;
        let mut tables = self.tables.lock().await;
        tables.brokers.retain(|b| !ids.contains(&b.id));
        tables.writes.push(WriteOp::DeleteBrokers(ids.to_vec()));
        Ok(())
    }

    async fn analysis_requests(&self) -> GatewayResult<Vec<AnalysisRequest>> {
        self.check_read(ANALYSIS_REQUESTS)?;
        Ok(self.tables.lock().await.requests.clone())
    }

    async fn analysis_request(&self, id: i64) -> GatewayResult<AnalysisRequest> {
        self.check_read(ANALYSIS_REQUESTS)?;
        self.tables
            .lock()
            .await
            .requests
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| not_found(ANALYSIS_REQUESTS, id))
    }

    async fn set_request_status(&self, id: i64, status: RequestStatus) -> GatewayResult<()> {
        self.check_write(ANALYSIS_REQUESTS)?;
        let mut tables = self.tables.lock().await;
        let request = tables
            .requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found(ANALYSIS_REQUESTS, id))?;
        request.status = status.clone();
        tables.writes.push(WriteOp::SetRequestStatus {
            id,
            status: status.as_str().to_string(),
        });
        Ok(())
    }

    async fn contacts(&self) -> GatewayResult<Vec<Contact>> {
        self.check_read(CONTACTS)?;
        Ok(self.tables.lock().await.contacts.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_favorite_insert_keeps_one_row() {
        let gw = MemoryGateway::new();
        let fav = Favorite::new(1, 10);
        gw.insert_favorite(&fav).await.unwrap();
        gw.insert_favorite(&fav).await.unwrap();

        assert_eq!(gw.favorites_snapshot().await.len(), 1);
        assert_eq!(gw.favorite_ids(1).await.unwrap(), vec![10]);
    }

    #[tokio::test]
    async fn injected_failures_surface_as_status_errors() {
        let gw = MemoryGateway::new().with_listings(vec![Listing::new(1, "Casa")]);
        gw.fail_reads(true);
        assert!(matches!(
            gw.listings().await,
            Err(GatewayError::Status { status: 503, .. })
        ));
        gw.fail_reads(false);
        assert_eq!(gw.listings().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn available_by_ids_skips_withdrawn_rows() {
        let mut sold = Listing::new(2, "Vendido");
        sold.available = false;
        let gw = MemoryGateway::new().with_listings(vec![Listing::new(1, "Casa"), sold]);

        let found = gw.available_by_ids(&[1, 2, 3]).await.unwrap();
        assert_eq!(found.iter().map(|l| l.id).collect::<Vec<_>>(), vec![1]);
    }
}
