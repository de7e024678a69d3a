mod wire;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use wire::{lenient_text, lenient_timestamp, null_as_default, parse_timestamp};

/// Identifier assigned by the hosted table store.
pub type ListingId = i64;
pub type UserId = i64;
pub type BrokerId = i64;

/// Media references keyed by whatever name the upload webhook chose
pub type MediaMap = BTreeMap<String, String>;

/// Address of a property, stored as independent columns
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Location {
    #[serde(rename = "cidade", default)]
    pub city: Option<String>,
    #[serde(rename = "bairro", default)]
    pub neighborhood: Option<String>,
    #[serde(rename = "rua", default)]
    pub street: Option<String>,
    #[serde(rename = "numero", default, deserialize_with = "lenient_text")]
    pub number: Option<String>,
    #[serde(rename = "cep", default, deserialize_with = "lenient_text")]
    pub postal_code: Option<String>,
}

/// One row of the listings table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub id: ListingId,
    #[serde(rename = "titulo", default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub location: Location,
    /// Property type, e.g. "Casa" or "Apartamento"
    #[serde(rename = "tipo", default)]
    pub property_type: Option<String>,
    /// Transaction kind, "venda" or "aluguel"
    #[serde(rename = "negociacao", default)]
    pub transaction: Option<String>,
    #[serde(rename = "valor", default)]
    pub price: Option<f64>,
    #[serde(rename = "quartos", default)]
    pub bedrooms: Option<u32>,
    #[serde(rename = "banheiros", default)]
    pub bathrooms: Option<u32>,
    #[serde(rename = "vagas", default)]
    pub parking_spaces: Option<u32>,
    #[serde(rename = "metros", default)]
    pub area: Option<f64>,
    #[serde(rename = "caracteristicas", default, deserialize_with = "wire::comma_blob")]
    pub features: Option<String>,
    #[serde(rename = "Condominio", default, deserialize_with = "wire::comma_blob")]
    pub amenities: Option<String>,
    #[serde(rename = "url", default, deserialize_with = "wire::media_map")]
    pub media: MediaMap,
    /// true while listed; false once sold or withdrawn
    #[serde(rename = "status", default, deserialize_with = "null_as_default")]
    pub available: bool,
    #[serde(rename = "nome_anunciante", default)]
    pub advertiser: Option<String>,
    #[serde(rename = "data", default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Listing {
    /// Minimal available listing, mostly useful for fixtures
    pub fn new(id: ListingId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            location: Location::default(),
            property_type: None,
            transaction: None,
            price: None,
            bedrooms: None,
            bathrooms: None,
            parking_spaces: None,
            area: None,
            features: None,
            amenities: None,
            media: MediaMap::new(),
            available: true,
            advertiser: None,
            created_at: None,
        }
    }

    /// Unit features, split on commas
    pub fn features(&self) -> Vec<String> {
        split_blob(self.features.as_deref())
    }

    /// Condominium amenities, split on commas
    pub fn amenities(&self) -> Vec<String> {
        split_blob(self.amenities.as_deref())
    }

    /// Media URLs in key order
    pub fn media_urls(&self) -> Vec<&str> {
        self.media.values().map(String::as_str).collect()
    }

    /// Street, number, neighborhood and city joined with commas, skipping blanks
    pub fn address(&self) -> String {
        let loc = &self.location;
        [&loc.street, &loc.number, &loc.neighborhood, &loc.city]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub(crate) fn split_blob(blob: Option<&str>) -> Vec<String> {
    blob.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// One user–listing pair of the favorites table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Favorite {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: UserId,
    #[serde(rename = "imovel_id")]
    pub listing_id: ListingId,
}

impl Favorite {
    pub fn new(user_id: UserId, listing_id: ListingId) -> Self {
        Self {
            id: None,
            user_id,
            listing_id,
        }
    }
}

/// Coarse account type tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum UserKind {
    Client,
    Admin,
    Other(String),
}

impl UserKind {
    pub fn as_str(&self) -> &str {
        match self {
            UserKind::Client => "cliente",
            UserKind::Admin => "adm",
            UserKind::Other(tag) => tag,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserKind::Admin)
    }
}

impl Default for UserKind {
    fn default() -> Self {
        UserKind::Client
    }
}

impl From<String> for UserKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "cliente" => UserKind::Client,
            "adm" => UserKind::Admin,
            _ => UserKind::Other(tag),
        }
    }
}

impl From<Option<String>> for UserKind {
    fn from(tag: Option<String>) -> Self {
        tag.map(UserKind::from).unwrap_or_default()
    }
}

impl From<UserKind> for String {
    fn from(kind: UserKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for UserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the users table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(rename = "tipo", default)]
    pub kind: UserKind,
    #[serde(rename = "data", default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "telefone", default, deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    /// Profile photo
    #[serde(rename = "url", default)]
    pub photo_url: Option<String>,
}

/// Insert payload for a new account
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(rename = "senha")]
    pub password: String,
    #[serde(rename = "tipo")]
    pub kind: UserKind,
    #[serde(rename = "data")]
    pub created_at: DateTime<Utc>,
}

/// Back-office broker record
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Broker {
    pub id: BrokerId,
    #[serde(rename = "nome", default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(rename = "numero", default, deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    /// CRECI registration number
    #[serde(rename = "creci", default, deserialize_with = "lenient_text")]
    pub license: Option<String>,
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
    #[serde(rename = "foto", default)]
    pub photo: Option<String>,
}

/// Review state of a submitted listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum RequestStatus {
    Pending,
    Sent,
    Other(String),
}

impl RequestStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RequestStatus::Pending => "pendente",
            RequestStatus::Sent => "enviado",
            RequestStatus::Other(tag) => tag,
        }
    }
}

impl Default for RequestStatus {
    fn default() -> Self {
        RequestStatus::Pending
    }
}

impl From<String> for RequestStatus {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "pendente" | "" => RequestStatus::Pending,
            "enviado" => RequestStatus::Sent,
            _ => RequestStatus::Other(tag),
        }
    }
}

impl From<Option<String>> for RequestStatus {
    fn from(tag: Option<String>) -> Self {
        tag.map(RequestStatus::from).unwrap_or_default()
    }
}

impl From<RequestStatus> for String {
    fn from(status: RequestStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Listing submitted from the public contact page, waiting for review
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRequest {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "numero", default, deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    #[serde(rename = "tipo", default)]
    pub property_type: Option<String>,
    #[serde(rename = "finalidade", default)]
    pub purpose: Option<String>,
    #[serde(rename = "titulo", default)]
    pub title: Option<String>,
    #[serde(rename = "endereço", alias = "endereco", default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub area: Option<String>,
    #[serde(rename = "quarto", default, deserialize_with = "lenient_text")]
    pub bedrooms: Option<String>,
    #[serde(rename = "banheiro", default, deserialize_with = "lenient_text")]
    pub bathrooms: Option<String>,
    #[serde(rename = "vaga", default, deserialize_with = "lenient_text")]
    pub parking_spaces: Option<String>,
    #[serde(rename = "valor", default, deserialize_with = "lenient_text")]
    pub price: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: RequestStatus,
}

impl AnalysisRequest {
    /// Comma-separated media URLs of the submission
    pub fn media_urls(&self) -> Vec<String> {
        split_blob(self.url.as_deref())
    }
}

/// Row of the contacts table, used only for dashboard aggregation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    #[serde(default)]
    pub client_id: Option<UserId>,
    #[serde(rename = "id_corretor", default)]
    pub broker_id: Option<BrokerId>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_listing_row_with_wire_names() {
        let row = json!({
            "id": 7,
            "titulo": "Casa em Condomínio Fechado",
            "cidade": "Barueri",
            "bairro": "Alphaville",
            "rua": "Alameda Rio Negro",
            "numero": 120,
            "cep": 6454000,
            "tipo": "Casa",
            "negociacao": "venda",
            "valor": 2200000,
            "quartos": 4,
            "banheiros": 3,
            "metros": 350,
            "caracteristicas": "Piscina, Churrasqueira,, Jardim ",
            "Condominio": ["Portaria 24h", "Academia"],
            "url": "{\"img1\":\"https://cdn/a.jpg\",\"img2\":\"https://cdn/b.jpg\"}",
            "status": true,
            "nome_anunciante": "H.A Imóveis"
        });

        let listing: Listing = serde_json::from_value(row).unwrap();
        assert_eq!(listing.id, 7);
        assert_eq!(listing.location.number.as_deref(), Some("120"));
        assert_eq!(listing.location.postal_code.as_deref(), Some("6454000"));
        assert_eq!(listing.price, Some(2_200_000.0));
        assert_eq!(listing.parking_spaces, None);
        assert_eq!(listing.features(), vec!["Piscina", "Churrasqueira", "Jardim"]);
        assert_eq!(listing.amenities(), vec!["Portaria 24h", "Academia"]);
        assert_eq!(listing.media_urls(), vec!["https://cdn/a.jpg", "https://cdn/b.jpg"]);
        assert!(listing.available);
        assert_eq!(
            listing.address(),
            "Alameda Rio Negro, 120, Alphaville, Barueri"
        );
    }

    #[test]
    fn missing_optional_columns_decode_as_absent() {
        let listing: Listing = serde_json::from_value(json!({"id": 1, "url": null})).unwrap();
        assert!(listing.media.is_empty());
        assert!(!listing.available);
        assert_eq!(listing.bedrooms, None);
        assert!(listing.features().is_empty());
    }

    #[test]
    fn explicit_null_columns_decode_as_defaults() {
        let listing: Listing =
            serde_json::from_value(json!({"id": 1, "titulo": "Casa", "status": null})).unwrap();
        assert!(!listing.available);

        let rows: Vec<Listing> = serde_json::from_value(json!([
            {"id": 1, "titulo": "Casa", "status": true},
            {"id": 2, "titulo": null, "status": true, "valor": null, "url": null}
        ]))
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].title, "");
        assert_eq!(rows[1].price, None);

        let user: User = serde_json::from_value(json!({
            "id": 3, "name": null, "email": null, "tipo": null, "data": null
        }))
        .unwrap();
        assert_eq!(user.name, "");
        assert_eq!(user.kind, UserKind::Client);

        let broker: Broker =
            serde_json::from_value(json!({"id": 5, "nome": null, "email": null})).unwrap();
        assert_eq!(broker.name, "");
    }

    #[test]
    fn user_kind_tags() {
        let user: User = serde_json::from_value(json!({
            "id": 3, "name": "Ana", "email": "ana@example.com", "tipo": "adm"
        }))
        .unwrap();
        assert!(user.kind.is_admin());
        assert_eq!(UserKind::from("corretor".to_string()), UserKind::Other("corretor".into()));
        assert_eq!(serde_json::to_value(UserKind::Client).unwrap(), json!("cliente"));
    }

    #[test]
    fn favorite_uses_table_column_names() {
        let fav = Favorite::new(4, 9);
        assert_eq!(
            serde_json::to_value(&fav).unwrap(),
            json!({"user_id": 4, "imovel_id": 9})
        );
    }

    #[test]
    fn analysis_request_splits_media_field() {
        let req: AnalysisRequest = serde_json::from_value(json!({
            "id": 12,
            "titulo": "Apartamento",
            "valor": 450000,
            "url": "https://cdn/1.jpg, https://cdn/2.mp4",
            "status": "enviado"
        }))
        .unwrap();
        assert_eq!(req.price.as_deref(), Some("450000"));
        assert_eq!(req.status, RequestStatus::Sent);
        assert_eq!(req.media_urls(), vec!["https://cdn/1.jpg", "https://cdn/2.mp4"]);
    }
}
