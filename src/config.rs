use rand::RngCore;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroizing;

use crate::domain::services::interest::DEFAULT_GRACE_PERIOD_DAYS;
use crate::domain::value_objects::daily_rate::DailyRate;

/// Service configuration read from the environment
#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Used when neither the lot nor the user's settings carry a rate
    pub default_daily_interest_rate: DailyRate,
    pub default_grace_period_days: i64,
    /// Hold length when a hold is placed without a date
    pub default_hold_days: i64,
    pub storage_root: PathBuf,
    /// Base of the links handed out for documents
    pub public_base_url: String,
    pub storage_signing_key: Zeroizing<String>,
    pub signed_url_ttl: Duration,
    pub rate_limit_per_minute: u32,
    pub max_upload_bytes: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("default_daily_interest_rate", &self.default_daily_interest_rate)
            .field("default_grace_period_days", &self.default_grace_period_days)
            .field("default_hold_days", &self.default_hold_days)
            .field("storage_root", &self.storage_root)
            .field("public_base_url", &self.public_base_url)
            .field("storage_signing_key", &"<redacted>")
            .field("signed_url_ttl", &self.signed_url_ttl)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            default_daily_interest_rate: DailyRate::DEFAULT,
            default_grace_period_days: DEFAULT_GRACE_PERIOD_DAYS,
            default_hold_days: 30,
            storage_root: PathBuf::from("data/documents"),
            public_base_url: "http://127.0.0.1:3000".to_string(),
            storage_signing_key: random_signing_key(),
            signed_url_ttl: Duration::from_secs(3600),
            rate_limit_per_minute: 100,
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppConfig {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source. Invalid values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> AppConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        config.bind_addr = parse_or(&lookup, "BIND_ADDR", config.bind_addr, |_| true, "a socket address");

        let rate = parse_or(
            &lookup,
            "DEFAULT_DAILY_INTEREST_RATE",
            config.default_daily_interest_rate.value(),
            |v| DailyRate::new(*v).is_ok(),
            "between 0.0 and 1.0",
        );
        config.default_daily_interest_rate =
            DailyRate::new(rate).unwrap_or(config.default_daily_interest_rate);

        config.default_grace_period_days = parse_or(
            &lookup,
            "DEFAULT_GRACE_PERIOD_DAYS",
            config.default_grace_period_days,
            |v| (0..=3650).contains(v),
            "between 0 and 3650",
        );

        config.default_hold_days = parse_or(
            &lookup,
            "DEFAULT_HOLD_DAYS",
            config.default_hold_days,
            |v| (1..=3650).contains(v),
            "between 1 and 3650",
        );

        if let Some(root) = lookup("STORAGE_ROOT").filter(|v| !v.trim().is_empty()) {
            config.storage_root = PathBuf::from(root.trim());
        }

        if let Some(base) = lookup("PUBLIC_BASE_URL") {
            match url::Url::parse(base.trim()) {
                Ok(_) => config.public_base_url = base.trim().trim_end_matches('/').to_string(),
                Err(e) => tracing::warn!(
                    "Invalid PUBLIC_BASE_URL '{}': {}, using default: {}",
                    base,
                    e,
                    config.public_base_url
                ),
            }
        }

        match lookup("STORAGE_SIGNING_KEY").filter(|v| !v.is_empty()) {
            Some(key) if key.len() >= 32 => config.storage_signing_key = Zeroizing::new(key),
            Some(key) => tracing::warn!(
                "STORAGE_SIGNING_KEY is too short (length: {}, minimum: 32), using a random key; \
                 document links will not survive a restart",
                key.len()
            ),
            None => tracing::warn!(
                "STORAGE_SIGNING_KEY not set, using a random key; document links will not survive a restart"
            ),
        }

        let ttl = parse_or(
            &lookup,
            "SIGNED_URL_TTL_SECONDS",
            config.signed_url_ttl.as_secs(),
            |v| (1..=7 * 24 * 3600).contains(v),
            "between 1 and 604800",
        );
        config.signed_url_ttl = Duration::from_secs(ttl);

        config.rate_limit_per_minute = parse_or(
            &lookup,
            "RATE_LIMIT_PER_MINUTE",
            config.rate_limit_per_minute,
            |v| *v > 0,
            "greater than 0",
        );

        config.max_upload_bytes = parse_or(
            &lookup,
            "MAX_UPLOAD_BYTES",
            config.max_upload_bytes,
            |v| *v > 0,
            "greater than 0",
        );

        config
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T, valid: impl Fn(&T) -> bool, rule: &str) -> T
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return default;
    };

    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        Ok(value) => {
            tracing::warn!(
                "Invalid {} value: {} (must be {}), using default: {}",
                key,
                value,
                rule,
                default
            );
            default
        }
        Err(e) => {
            tracing::warn!("Failed to parse {} '{}': {}, using default: {}", key, raw, e, default);
            default
        }
    }
}

fn random_signing_key() -> Zeroizing<String> {
    let mut bytes = Zeroizing::new([0u8; 32]);
    rand::thread_rng().fill_bytes(&mut bytes[..]);
    Zeroizing::new(hex::encode(&bytes[..]))
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
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.default_daily_interest_rate, DailyRate::DEFAULT);
        assert_eq!(config.default_grace_period_days, 30);
        assert_eq!(config.default_hold_days, 30);
        assert_eq!(config.signed_url_ttl, Duration::from_secs(3600));
        assert_eq!(config.rate_limit_per_minute, 100);
        assert_eq!(config.max_upload_bytes, 25 * 1024 * 1024);
        assert_eq!(config.storage_signing_key.len(), 64);
    }

    #[test]
    fn test_values_from_lookup() {
        let config = AppConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("DEFAULT_DAILY_INTEREST_RATE", "0.0005"),
            ("DEFAULT_HOLD_DAYS", "14"),
            ("PUBLIC_BASE_URL", "https://files.example.com/"),
            ("STORAGE_SIGNING_KEY", "0123456789abcdef0123456789abcdef"),
            ("SIGNED_URL_TTL_SECONDS", "600"),
        ]));
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.default_daily_interest_rate.value(), 0.0005);
        assert_eq!(config.default_hold_days, 14);
        assert_eq!(config.public_base_url, "https://files.example.com");
        assert_eq!(config.storage_signing_key.as_str(), "0123456789abcdef0123456789abcdef");
        assert_eq!(config.signed_url_ttl, Duration::from_secs(600));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DEFAULT_DAILY_INTEREST_RATE", "1.5"),
            ("DEFAULT_GRACE_PERIOD_DAYS", "soon"),
            ("RATE_LIMIT_PER_MINUTE", "0"),
            ("PUBLIC_BASE_URL", "not a url"),
            ("STORAGE_SIGNING_KEY", "short"),
        ]));
        assert_eq!(config.default_daily_interest_rate, DailyRate::DEFAULT);
        assert_eq!(config.default_grace_period_days, 30);
        assert_eq!(config.rate_limit_per_minute, 100);
        assert_eq!(config.public_base_url, "http://127.0.0.1:3000");
        assert_ne!(config.storage_signing_key.as_str(), "short");
    }
}
