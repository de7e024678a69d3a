//! Persisted "current user" slot and the account flows that fill it.
//!
//! The slot is trusted on read: it carries no token or expiry and only drives
//! navigation. Access control belongs to the hosted backend.

use crate::error::{require, AppError, AppResult};
use crate::gateway::AccountStore;
use crate::models::{NewUser, User, UserId, UserKind};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const SESSION_SLOT: &str = "ha_user";

/// What the slot holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: UserId,
    #[serde(rename = "nome", default)]
    pub display_name: String,
    #[serde(rename = "tipo", default)]
    pub kind: UserKind,
}

impl SessionRecord {
    pub fn is_admin(&self) -> bool {
        self.kind.is_admin()
    }
}

impl From<&User> for SessionRecord {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            display_name: user.name.clone(),
            kind: user.kind.clone(),
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> AppResult<Option<SessionRecord>>;
    async fn save(&self, record: &SessionRecord) -> AppResult<()>;
    async fn clear(&self) -> AppResult<()>;
}

/// JSON file of named slots; only `ha_user` is touched, other slots survive
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_slots(&self) -> AppResult<Map<String, Value>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(AppError::Session(e.to_string())),
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(slots)) => Ok(slots),
            _ => {
                warn!("Session file {} is not a JSON object, ignoring", self.path.display());
                Ok(Map::new())
            }
        }
    }

    async fn write_slots(&self, slots: Map<String, Value>) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Session(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(&Value::Object(slots))
            .map_err(|e| AppError::Session(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| AppError::Session(e.to_string()))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> AppResult<Option<SessionRecord>> {
        let mut slots = self.read_slots().await?;
        let Some(value) = slots.remove(SESSION_SLOT) else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Unreadable session record, treating as signed out: {}", e);
                Ok(None)
            }
        }
    }

    async fn save(&self, record: &SessionRecord) -> AppResult<()> {
        let mut slots = self.read_slots().await?;
        let value = serde_json::to_value(record).map_err(|e| AppError::Session(e.to_string()))?;
        slots.insert(SESSION_SLOT.to_string(), value);
        self.write_slots(slots).await
    }

    async fn clear(&self) -> AppResult<()> {
        let mut slots = self.read_slots().await?;
        if slots.remove(SESSION_SLOT).is_some() {
            self.write_slots(slots).await?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(record: SessionRecord) -> Self {
        Self {
            slot: Mutex::new(Some(record)),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> AppResult<Option<SessionRecord>> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&self, record: &SessionRecord) -> AppResult<()> {
        *self.slot.lock().await = Some(record.clone());
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        *self.slot.lock().await = None;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Uninitialized,
    Loading,
    Resolved(Option<SessionRecord>),
}

impl SessionState {
    pub fn user(&self) -> Option<&SessionRecord> {
        match self {
            SessionState::Resolved(user) => user.as_ref(),
            _ => None,
        }
    }
}

/// Root application context; the only reader and writer of the session slot
pub struct AppContext {
    store: Arc<dyn SessionStore>,
    state: SessionState,
}

impl AppContext {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            state: SessionState::Uninitialized,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user(&self) -> Option<&SessionRecord> {
        self.state.user()
    }

    /// Read the slot once; storage errors resolve to signed out
    pub async fn resolve(&mut self) -> &SessionState {
        if let SessionState::Resolved(_) = self.state {
            return &self.state;
        }
        self.state = SessionState::Loading;
        let user = match self.store.load().await {
            Ok(user) => user,
            Err(e) => {
                warn!("Could not read session: {}", e);
                None
            }
        };
        debug!("Session resolved: {:?}", user.as_ref().map(|u| u.id));
        self.state = SessionState::Resolved(user);
        &self.state
    }

    pub async fn login(
        &mut self,
        accounts: &dyn AccountStore,
        email: &str,
        password: &str,
    ) -> AppResult<SessionRecord> {
        require(&[("email", email), ("senha", password)])?;

        let user = accounts
            .find_by_credentials(email.trim(), password)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let record = SessionRecord::from(&user);
        self.store.save(&record).await?;
        info!("Signed in as {} ({})", record.display_name, record.kind);
        self.state = SessionState::Resolved(Some(record.clone()));
        Ok(record)
    }

    /// Create a client account; does not sign in
    pub async fn register(
        &self,
        accounts: &dyn AccountStore,
        name: &str,
        email: &str,
        password: &str,
    ) -> AppResult<()> {
        require(&[("nome", name), ("email", email), ("senha", password)])?;

        accounts
            .insert_user(&NewUser {
                name: name.trim().to_string(),
                email: email.trim().to_string(),
                password: password.to_string(),
                kind: UserKind::Client,
                created_at: Utc::now(),
            })
            .await?;
        info!("Registered account for {}", email.trim());
        Ok(())
    }

    pub async fn logout(&mut self) -> AppResult<()> {
        self.store.clear().await?;
        self.state = SessionState::Resolved(None);
        info!("Signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::WriteOp;
    use crate::gateway::MemoryGateway;

    fn admin() -> User {
        User {
            id: 1,
            name: "Helena".into(),
            email: "helena@ha.com".into(),
            kind: UserKind::Admin,
            created_at: None,
            phone: None,
            photo_url: None,
        }
    }

    #[tokio::test]
    async fn file_store_round_trips_and_preserves_other_slots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, r#"{"theme":"dark"}"#).await.unwrap();

        let store = FileSessionStore::new(&path);
        assert_eq!(store.load().await.unwrap(), None);

        let record = SessionRecord::from(&admin());
        store.save(&record).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(record));

        let raw: Value = serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap())
            .unwrap();
        assert_eq!(raw["theme"], "dark");
        assert_eq!(raw[SESSION_SLOT]["nome"], "Helena");
        assert_eq!(raw[SESSION_SLOT]["tipo"], "adm");

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_or_corrupt_file_means_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("absent.json"));
        assert_eq!(store.load().await.unwrap(), None);

        let corrupt = dir.path().join("corrupt.json");
        tokio::fs::write(&corrupt, r#"{"ha_user": {"nome": 5}}"#).await.unwrap();
        assert_eq!(FileSessionStore::new(corrupt).load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn context_moves_through_lifecycle() {
        let mut ctx = AppContext::new(Arc::new(MemorySessionStore::signed_in(
            SessionRecord::from(&admin()),
        )));
        assert_eq!(ctx.state(), &SessionState::Uninitialized);
        assert!(ctx.user().is_none());

        ctx.resolve().await;
        assert!(ctx.user().unwrap().is_admin());

        ctx.logout().await.unwrap();
        assert_eq!(ctx.state(), &SessionState::Resolved(None));
    }

    #[tokio::test]
    async fn login_saves_record_and_rejects_bad_password() {
        let gw = MemoryGateway::new().with_user(admin(), "segredo");
        let store = Arc::new(MemorySessionStore::new());
        let mut ctx = AppContext::new(store.clone());

        assert!(matches!(
            ctx.login(&gw, "helena@ha.com", "errada").await,
            Err(AppError::InvalidCredentials)
        ));
        assert_eq!(store.load().await.unwrap(), None);

        let record = ctx.login(&gw, " helena@ha.com ", "segredo").await.unwrap();
        assert_eq!(record.id, 1);
        assert_eq!(store.load().await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn register_validates_before_calling_gateway() {
        let gw = MemoryGateway::new();
        let ctx = AppContext::new(Arc::new(MemorySessionStore::new()));

        let err = ctx.register(&gw, "Ana", "", "").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { ref missing } if missing == &["email", "senha"]));
        assert!(gw.writes().await.is_empty());

        ctx.register(&gw, "Ana", "ana@example.com", "123456").await.unwrap();
        assert_eq!(
            gw.writes().await,
            vec![WriteOp::InsertUser { email: "ana@example.com".into() }]
        );
        let user = gw.find_by_credentials("ana@example.com", "123456").await.unwrap().unwrap();
        assert_eq!(user.kind, UserKind::Client);
    }
}
