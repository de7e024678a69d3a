use std::time::Duration;
use thiserror::Error;

/// Failure of a single round trip to the hosted store or the upload webhook
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{table} returned status {status}: {body}")]
    Status {
        table: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode {table} rows: {source}")]
    Decode {
        table: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no response after {0:?}")]
    Timeout(Duration),

    #[error("{table} row {id} not found")]
    NotFound { table: String, id: i64 },

    #[error("{0}")]
    Rejected(String),
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }
}

/// Errors surfaced to a page or command
#[derive(Error, Debug)]
pub enum AppError {
    #[error("missing required fields: {}", missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    #[error(transparent)]
    Remote(#[from] GatewayError),

    #[error("sign in to continue")]
    AuthenticationRequired,

    #[error("incorrect e-mail or password")]
    InvalidCredentials,

    #[error("session storage: {0}")]
    Session(String),
}

impl AppError {
    pub fn validation(missing: Vec<&'static str>) -> Self {
        AppError::Validation { missing }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
pub type AppResult<T> = Result<T, AppError>;

/// Collect the names of blank required fields, or Ok when none are blank
pub fn require(fields: &[(&'static str, &str)]) -> AppResult<()> {
    let missing: Vec<&'static str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_lists_every_blank_field() {
        let err = require(&[("nome", "Ana"), ("email", "  "), ("senha", "")]).unwrap_err();
        match err {
            AppError::Validation { missing } => assert_eq!(missing, vec!["email", "senha"]),
            other => panic!("unexpected error: {other}"),
        }
        assert!(require(&[("nome", "Ana")]).is_ok());
    }
}
