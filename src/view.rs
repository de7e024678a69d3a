//! Load states, stale-response guards and user-facing notices.

use crate::error::{AppError, GatewayError, GatewayResult};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Data a view depends on; nothing may be read from it before `Ready`
#[derive(Debug, Clone, PartialEq)]
pub enum Loadable<T> {
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Loadable::Pending
    }
}

impl<T> Loadable<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Loadable::Ready(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Loadable::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn ready_mut(&mut self) -> Option<&mut T> {
        match self {
            Loadable::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn from_result<E: fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Loadable::Ready(value),
            Err(e) => Loadable::Failed(e.to_string()),
        }
    }
}

/// Generation counter that lets a view drop responses arriving after it was torn
/// down or after a newer request was issued.
#[derive(Debug, Clone, Default)]
pub struct LoadGuard {
    generation: Arc<AtomicU64>,
}

#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    guard: LoadGuard,
}

impl LoadGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request; any earlier ticket becomes stale
    pub fn begin(&self) -> Ticket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket {
            generation,
            guard: self.clone(),
        }
    }

    /// Teardown: every outstanding ticket becomes stale
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl Ticket {
    pub fn is_current(&self) -> bool {
        self.guard.generation.load(Ordering::SeqCst) == self.generation
    }

    /// Hand back `value` only if no newer request or teardown happened
    pub fn accept<T>(&self, value: T) -> Option<T> {
        if self.is_current() {
            Some(value)
        } else {
            warn!("discarding stale response (generation {})", self.generation);
            None
        }
    }
}

/// Turn a hung gateway call into `GatewayError::Timeout`
pub async fn with_timeout<F, T>(limit: Duration, call: F) -> GatewayResult<T>
where
    F: Future<Output = GatewayResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout(limit)),
    }
}

/// Explicit empty result, never an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    NoListings,
    NoFavorites,
    NoBrokers,
    NoRequests,
}

impl EmptyState {
    pub fn message(self) -> &'static str {
        match self {
            EmptyState::NoListings => "no listings found",
            EmptyState::NoFavorites => "no favorites yet",
            EmptyState::NoBrokers => "no brokers registered",
            EmptyState::NoRequests => "no listings awaiting review",
        }
    }
}

impl fmt::Display for EmptyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

/// Transient notice shown after an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: message.into(),
        }
    }

    /// Failure of `action`, e.g. "save listing"
    pub fn failure(action: &str, error: &AppError) -> Self {
        let message = match error {
            AppError::Validation { missing } => {
                format!("{action}: fill in {}", missing.join(", "))
            }
            other => format!("could not {action}: {other}"),
        };
        Self {
            level: Level::Error,
            message,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Level::Info => write!(f, "{}", self.message),
            Level::Error => write!(f, "error: {}", self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_request_makes_older_ticket_stale() {
        let guard = LoadGuard::new();
        let first = guard.begin();
        let second = guard.begin();

        assert_eq!(first.accept(1), None);
        assert_eq!(second.accept(2), Some(2));
    }

    #[test]
    fn cancel_discards_in_flight_response() {
        let guard = LoadGuard::new();
        let ticket = guard.begin();
        guard.cancel();
        assert!(!ticket.is_current());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_call_times_out() {
        let limit = Duration::from_secs(15);
        let result: GatewayResult<()> =
            with_timeout(limit, std::future::pending::<GatewayResult<()>>()).await;
        assert!(matches!(result, Err(GatewayError::Timeout(d)) if d == limit));
    }

    #[tokio::test]
    async fn completed_call_passes_through() {
        let result = with_timeout(Duration::from_secs(1), async { Ok::<_, GatewayError>(5) }).await;
        assert_eq!(result.unwrap(), 5);
    }

    #[test]
    fn loadable_reads_only_when_ready() {
        let pending: Loadable<Vec<i64>> = Loadable::default();
        assert!(pending.ready().is_none());

        let failed = Loadable::<i64>::from_result(Err::<i64, _>("offline"));
        assert_eq!(failed, Loadable::Failed("offline".into()));
    }

    #[test]
    fn validation_notice_names_fields() {
        let notice = Notification::failure(
            "save broker",
            &AppError::validation(vec!["nome", "email"]),
        );
        assert_eq!(notice.level, Level::Error);
        assert_eq!(notice.to_string(), "error: save broker: fill in nome, email");
        assert_eq!(EmptyState::NoListings.to_string(), "no listings found");
    }
}
