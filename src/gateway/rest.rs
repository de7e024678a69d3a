use crate::config::Config;
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::traits::{AccountStore, BackOfficeStore, FavoriteStore, ListingStore};
use crate::gateway::types::{
    Query, ANALYSIS_REQUESTS, BROKERS, CONTACTS, FAVORITES, LISTINGS, USERS,
};
use crate::models::{
    AnalysisRequest, Broker, BrokerId, Contact, Favorite, Listing, ListingId, NewUser,
    RequestStatus, User, UserId, UserKind,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

const FAVORITE_KEY: &str = "user_id,imovel_id";
const IGNORE_DUPLICATES: &str = "resolution=ignore-duplicates,return=minimal";

/// PostgREST reports an `on_conflict` target without a matching unique index as 42P10
fn is_missing_conflict_target(error: &GatewayError) -> bool {
    matches!(error, GatewayError::Status { status: 400, body, .. } if body.contains("42P10"))
}

/// Client for the hosted table store's REST surface
pub struct RestGateway {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct ListingIdRow {
    imovel_id: ListingId,
}

impl RestGateway {
    pub fn new(config: &Config) -> GatewayResult<Self> {
        Self::with_timeout(&config.store_url, &config.store_key, config.request_timeout)
    }

    pub fn with_timeout(base_url: &str, api_key: &str, timeout: Duration) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("estate-desk/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout,
        })
    }

    pub(crate) fn endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, query: &Query) -> RequestBuilder {
        self.client
            .request(method, self.endpoint(query.table))
            .query(query.params())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, table: &str, builder: RequestBuilder) -> GatewayResult<Response> {
        let response = builder.send().await.map_err(|e| self.transport(e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!("{} returned status: {}", table, status);
        Err(GatewayError::Status {
            table: table.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    fn transport(&self, error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::Timeout(self.timeout)
        } else {
            GatewayError::Transport(error)
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, query: Query) -> GatewayResult<Vec<T>> {
        debug!("GET {} {:?}", query.table, query.params());
        let response = self.send(query.table, self.request(Method::GET, &query)).await?;
        let body = response.text().await.map_err(|e| self.transport(e))?;
        let rows: Vec<T> = serde_json::from_str(&body).map_err(|source| GatewayError::Decode {
            table: query.table.to_string(),
            source,
        })?;
        debug!("{} returned {} rows", query.table, rows.len());
        Ok(rows)
    }

    async fn fetch_one<T: DeserializeOwned>(&self, query: Query, id: i64) -> GatewayResult<T> {
        let table = query.table;
        self.fetch(query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound {
                table: table.to_string(),
                id,
            })
    }

    async fn insert<T: Serialize + Sync>(
        &self,
        query: Query,
        rows: &[T],
        prefer: &str,
    ) -> GatewayResult<()> {
        debug!("POST {} ({} rows)", query.table, rows.len());
        let builder = self.insert_request(&query, rows, prefer);
        self.send(query.table, builder).await.map(|_| ())
    }

    fn insert_request<T: Serialize>(&self, query: &Query, rows: &[T], prefer: &str) -> RequestBuilder {
        self.request(Method::POST, query)
            .header("Prefer", prefer)
            .json(rows)
    }

    async fn patch(&self, query: Query, body: serde_json::Value) -> GatewayResult<()> {
        debug!("PATCH {} {:?}", query.table, query.params());
        let builder = self
            .request(Method::PATCH, &query)
            .header("Prefer", "return=minimal")
            .json(&body);
        self.send(query.table, builder).await.map(|_| ())
    }

    async fn delete(&self, query: Query) -> GatewayResult<()> {
        if !query.is_filtered() {
            return Err(GatewayError::Rejected(format!(
                "refusing unfiltered delete on {}",
                query.table
            )));
        }
        debug!("DELETE {} {:?}", query.table, query.params());
        let builder = self.request(Method::DELETE, &query);
        self.send(query.table, builder).await.map(|_| ())
    }
}

#[async_trait]
impl ListingStore for RestGateway {
    async fn listings(&self) -> GatewayResult<Vec<Listing>> {
        self.fetch(Query::table(LISTINGS).select("*")).await
    }

    async fn listing(&self, id: ListingId) -> GatewayResult<Listing> {
        self.fetch_one(Query::table(LISTINGS).select("*").eq("id", id), id)
            .await
    }

    async fn available_by_ids(&self, ids: &[ListingId]) -> GatewayResult<Vec<Listing>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch(
            Query::table(LISTINGS)
                .select("*")
                .in_list("id", ids)
                .eq("status", true),
        )
        .await
    }

    async fn set_availability(&self, id: ListingId, available: bool) -> GatewayResult<()> {
        self.patch(
            Query::table(LISTINGS).eq("id", id),
            json!({ "status": available }),
        )
        .await
    }

    async fn delete_listings(&self, ids: &[ListingId]) -> GatewayResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.delete(Query::table(LISTINGS).in_list("id", ids)).await
    }
}

#[async_trait]
impl FavoriteStore for RestGateway {
    async fn favorite_ids(&self, user: UserId) -> GatewayResult<Vec<ListingId>> {
        let rows: Vec<ListingIdRow> = self
            .fetch(
                Query::table(FAVORITES)
                    .select("imovel_id")
                    .eq("user_id", user),
            )
            .await?;
        Ok(rows.into_iter().map(|row| row.imovel_id).collect())
    }

    async fn all_favorites(&self) -> GatewayResult<Vec<Favorite>> {
        self.fetch(Query::table(FAVORITES).select("*")).await
    }

    /// Duplicate-ignoring upsert on (user_id, imovel_id). Stores without that unique
    /// constraint answer 42P10; those get a plain insert instead.
    async fn insert_favorite(&self, favorite: &Favorite) -> GatewayResult<()> {
        let rows = std::slice::from_ref(favorite);
        match self
            .insert(
                Query::table(FAVORITES).on_conflict(FAVORITE_KEY),
                rows,
                IGNORE_DUPLICATES,
            )
            .await
        {
            Err(e) if is_missing_conflict_target(&e) => {
                warn!("{} has no unique ({}) constraint, inserting without upsert", FAVORITES, FAVORITE_KEY);
                self.insert(Query::table(FAVORITES), rows, "return=minimal").await
            }
            other => other,
        }
    }

    async fn delete_favorite(&self, user: UserId, listing: ListingId) -> GatewayResult<()> {
        self.delete(
            Query::table(FAVORITES)
                .eq("user_id", user)
                .eq("imovel_id", listing),
        )
        .await
    }
}

#[async_trait]
impl AccountStore for RestGateway {
    async fn find_by_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> GatewayResult<Option<User>> {
        let rows: Vec<User> = self
            .fetch(
                Query::table(USERS)
                    .select("id,name,email,tipo,data")
                    .eq("email", email)
                    .eq("senha", password),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_user(&self, user: &NewUser) -> GatewayResult<()> {
        self.insert(
            Query::table(USERS),
            std::slice::from_ref(user),
            "return=minimal",
        )
        .await
    }

    async fn user(&self, id: UserId) -> GatewayResult<User> {
        self.fetch_one(
            Query::table(USERS)
                .select("*")
                .eq("id", id),
            id,
        )
        .await
    }

    async fn users_of_kind(&self, kind: &UserKind) -> GatewayResult<Vec<User>> {
        self.fetch(
            Query::table(USERS)
                .select("id,name,email,tipo,data")
                .eq("tipo", kind),
        )
        .await
    }
}

#[async_trait]
impl BackOfficeStore for RestGateway {
    async fn brokers(&self) -> GatewayResult<Vec<Broker>> {
        self.fetch(Query::table(BROKERS).select("*")).await
    }

    async fn delete_brokers(&self, ids: &[BrokerId]) -> GatewayResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.delete(Query::table(BROKERS).in_list("id", ids)).await
    }

    async fn analysis_requests(&self) -> GatewayResult<Vec<AnalysisRequest>> {
        self.fetch(Query::table(ANALYSIS_REQUESTS).select("*")).await
    }

    async fn analysis_request(&self, id: i64) -> GatewayResult<AnalysisRequest> {
        self.fetch_one(Query::table(ANALYSIS_REQUESTS).select("*").eq("id", id), id)
            .await
    }

    async fn set_request_status(&self, id: i64, status: RequestStatus) -> GatewayResult<()> {
        self.patch(
            Query::table(ANALYSIS_REQUESTS).eq("id", id),
            json!({ "status": status.as_str() }),
        )
        .await
    }

    async fn contacts(&self) -> GatewayResult<Vec<Contact>> {
        self.fetch(
            Query::table(CONTACTS).select("client_id,id_corretor,created_at"),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> RestGateway {
        RestGateway::with_timeout("https://demo.supabase.co/", "anon", Duration::from_secs(15))
            .unwrap()
    }

    #[test]
    fn endpoint_joins_base_and_table() {
        assert_eq!(
            gateway().endpoint(LISTINGS),
            "https://demo.supabase.co/rest/v1/HA_IMOVEIS"
        );
    }

    #[test]
    fn requests_carry_key_headers_and_filters() {
        let gw = gateway();
        let request = gw
            .request(
                Method::GET,
                &Query::table(FAVORITES).select("imovel_id").eq("user_id", 5),
            )
            .build()
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "https://demo.supabase.co/rest/v1/HA_favorito?select=imovel_id&user_id=eq.5"
        );
        assert_eq!(request.headers()["apikey"], "anon");
        assert_eq!(request.headers()["authorization"], "Bearer anon");
    }

    #[test]
    fn favorite_upsert_names_conflict_target_and_prefer() {
        let gw = gateway();
        let request = gw
            .insert_request(
                &Query::table(FAVORITES).on_conflict(FAVORITE_KEY),
                &[Favorite::new(4, 9)],
                IGNORE_DUPLICATES,
            )
            .build()
            .unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(
            request.url().as_str(),
            "https://demo.supabase.co/rest/v1/HA_favorito?on_conflict=user_id%2Cimovel_id"
        );
        assert_eq!(
            request.headers()["prefer"],
            "resolution=ignore-duplicates,return=minimal"
        );
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(body).unwrap(),
            json!([{"user_id": 4, "imovel_id": 9}])
        );
    }

    #[test]
    fn only_missing_constraint_errors_fall_back_to_plain_insert() {
        let missing = GatewayError::Status {
            table: FAVORITES.to_string(),
            status: 400,
            body: r#"{"code":"42P10","message":"there is no unique or exclusion constraint"}"#.into(),
        };
        let other = GatewayError::Status {
            table: FAVORITES.to_string(),
            status: 400,
            body: r#"{"code":"23503"}"#.into(),
        };
        assert!(is_missing_conflict_target(&missing));
        assert!(!is_missing_conflict_target(&other));
        assert!(!is_missing_conflict_target(&GatewayError::Timeout(Duration::from_secs(1))));
    }

    #[tokio::test]
    async fn unfiltered_delete_is_refused_before_sending() {
        let err = gateway().delete(Query::table(LISTINGS)).await.unwrap_err();
        assert!(matches!(err, GatewayError::Rejected(_)));
    }

    #[tokio::test]
    async fn empty_id_lists_short_circuit() {
        let gw = gateway();
        assert!(gw.available_by_ids(&[]).await.unwrap().is_empty());
        gw.delete_listings(&[]).await.unwrap();
        gw.delete_brokers(&[]).await.unwrap();
    }
}
