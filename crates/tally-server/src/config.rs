use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

use tally_api::youtube::DEFAULT_API_BASE;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub admin_emails: String,
    pub youtube_api_key: Option<String>,
    pub youtube_api_base: String,
    pub youtube_timeout: Duration,
    /// Seconds between scheduled reconciliations; 0 disables them.
    pub reconcile_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = var("TALLY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("TALLY_JWT_SECRET is unset or still a placeholder; it must match the identity provider's signing secret");
        }

        let port = match var("TALLY_PORT") {
            Some(raw) => raw.parse().with_context(|| format!("Invalid TALLY_PORT '{raw}'"))?,
            None => 3000,
        };
        let timeout_secs: u64 = match var("YOUTUBE_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("Invalid YOUTUBE_TIMEOUT_SECS '{raw}'"))?,
            None => 5,
        };
        let reconcile_interval_secs = match var("TALLY_RECONCILE_INTERVAL_SECS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("Invalid TALLY_RECONCILE_INTERVAL_SECS '{raw}'"))?,
            None => 3600,
        };

        Ok(Self {
            host: var("TALLY_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("TALLY_DB_PATH").unwrap_or_else(|| "tally.db".into()).into(),
            jwt_secret,
            admin_emails: var("TALLY_ADMIN_EMAILS").unwrap_or_default(),
            youtube_api_key: var("YOUTUBE_API_KEY").filter(|k| !k.trim().is_empty()),
            youtube_api_base: var("YOUTUBE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.into()),
            youtube_timeout: Duration::from_secs(timeout_secs),
            reconcile_interval_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_the_secret_is_set() {
        let config = Config::from_lookup(lookup(&[("TALLY_JWT_SECRET", "s3cr3t-for-tests")])).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.db_path, PathBuf::from("tally.db"));
        assert_eq!(config.youtube_api_key, None);
        assert_eq!(config.youtube_api_base, DEFAULT_API_BASE);
        assert_eq!(config.youtube_timeout, Duration::from_secs(5));
        assert_eq!(config.reconcile_interval_secs, 3600);
    }

    #[test]
    fn missing_or_placeholder_secret_is_fatal() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("TALLY_JWT_SECRET", "dev-secret-change-me")])).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("TALLY_JWT_SECRET", "s3cr3t-for-tests"),
            ("TALLY_PORT", "8080"),
            ("YOUTUBE_API_KEY", "yt-key"),
            ("YOUTUBE_TIMEOUT_SECS", "2"),
            ("TALLY_RECONCILE_INTERVAL_SECS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.youtube_api_key.as_deref(), Some("yt-key"));
        assert_eq!(config.youtube_timeout, Duration::from_secs(2));
        assert_eq!(config.reconcile_interval_secs, 0);
    }

    #[test]
    fn malformed_port_is_an_error() {
        let err = Config::from_lookup(lookup(&[
            ("TALLY_JWT_SECRET", "s3cr3t-for-tests"),
            ("TALLY_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("TALLY_PORT"));
    }
}
