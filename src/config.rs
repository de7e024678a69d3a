use anyhow::{Context, Result};
use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};
use tracing::{info, warn};

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the hosted table store, e.g. https://xyz.supabase.co
    pub store_url: String,
    pub store_key: String,
    /// Upload webhook receiving multipart listing and broker submissions
    pub webhook_url: Option<String>,
    pub session_path: PathBuf,
    pub request_timeout: Duration,
}

impl Config {
    /// Load from the environment, reading an optional `.env` first
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs: u64 = try_load(&lookup, "REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            warn!("Invalid REQUEST_TIMEOUT_SECS value: must be at least 1");
            anyhow::bail!("invalid REQUEST_TIMEOUT_SECS value \"0\": must be at least 1");
        }

        Ok(Self {
            store_url: required(&lookup, "SUPABASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            store_key: required(&lookup, "SUPABASE_ANON_KEY")?,
            webhook_url: optional(&lookup, "WEBHOOK_URL"),
            session_path: optional(&lookup, "SESSION_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".estate-desk/session.json")),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.trim().is_empty())
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key).with_context(|| format!("environment variable {key} is not set"))
}

fn try_load<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match optional(lookup, key) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            warn!("Invalid {key} value: {e}");
            anyhow::anyhow!("invalid {key} value {raw:?}: {e}")
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_values_are_missing() {
        let config = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", "https://demo.supabase.co/"),
            ("SUPABASE_ANON_KEY", "anon"),
        ]))
        .unwrap();

        assert_eq!(config.store_url, "https://demo.supabase.co");
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert!(config.webhook_url.is_none());
        assert_eq!(config.session_path, PathBuf::from(".estate-desk/session.json"));
    }

    #[test]
    fn missing_store_url_is_an_error() {
        assert!(Config::from_lookup(lookup(&[("SUPABASE_ANON_KEY", "anon")])).is_err());
    }

    #[test]
    fn malformed_timeout_is_rejected() {
        let result = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", "https://demo.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("REQUEST_TIMEOUT_SECS", "soon"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let result = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", "https://demo.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("REQUEST_TIMEOUT_SECS", "0"),
        ]));
        let message = result.unwrap_err().to_string();
        assert!(message.contains("REQUEST_TIMEOUT_SECS"));
    }
}
