use crate::error::GatewayResult;
use crate::models::{
    AnalysisRequest, Broker, BrokerId, Contact, Favorite, Listing, ListingId, NewUser,
    RequestStatus, User, UserId, UserKind,
};
use async_trait::async_trait;

/// Listings table
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Every row, available or not
    async fn listings(&self) -> GatewayResult<Vec<Listing>>;

    async fn listing(&self, id: ListingId) -> GatewayResult<Listing>;

    /// Available listings among `ids`; ids with no row are skipped
    async fn available_by_ids(&self, ids: &[ListingId]) -> GatewayResult<Vec<Listing>>;

    async fn set_availability(&self, id: ListingId, available: bool) -> GatewayResult<()>;

    async fn delete_listings(&self, ids: &[ListingId]) -> GatewayResult<()>;
}

/// Favorites join table, keyed by (user_id, imovel_id)
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    async fn favorite_ids(&self, user: UserId) -> GatewayResult<Vec<ListingId>>;

    async fn all_favorites(&self) -> GatewayResult<Vec<Favorite>>;

    /// Inserting a pair that already exists must not create a second row
    async fn insert_favorite(&self, favorite: &Favorite) -> GatewayResult<()>;

    async fn delete_favorite(&self, user: UserId, listing: ListingId) -> GatewayResult<()>;
}

/// Users table
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_credentials(&self, email: &str, password: &str)
        -> GatewayResult<Option<User>>;

    async fn insert_user(&self, user: &NewUser) -> GatewayResult<()>;

    async fn user(&self, id: UserId) -> GatewayResult<User>;

    async fn users_of_kind(&self, kind: &UserKind) -> GatewayResult<Vec<User>>;
}

/// Brokers, submitted-listing review queue and contact log
#[async_trait]
pub trait BackOfficeStore: Send + Sync {
    async fn brokers(&self) -> GatewayResult<Vec<Broker>>;

    async fn delete_brokers(&self, ids: &[BrokerId]) -> GatewayResult<()>;

    async fn analysis_requests(&self) -> GatewayResult<Vec<AnalysisRequest>>;

    async fn analysis_request(&self, id: i64) -> GatewayResult<AnalysisRequest>;

    async fn set_request_status(&self, id: i64, status: RequestStatus) -> GatewayResult<()>;

    async fn contacts(&self) -> GatewayResult<Vec<Contact>>;
}
