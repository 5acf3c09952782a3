//! Registrar configuration

use std::time::Duration;

use registrar_core::{DeliverabilityStatus, InstitutionalDomain};

use crate::email::SmtpConfig;

/// Default institutional domain
pub const DEFAULT_INSTITUTIONAL_DOMAIN: &str = "miumg.edu.gt";
/// Default verification code lifetime
pub const DEFAULT_CODE_TTL_MINUTES: i64 = 10;
/// Longest accepted verification code lifetime (one day)
pub const MAX_CODE_TTL_MINUTES: i64 = 24 * 60;
/// Default number of wrong codes accepted before the challenge is dropped
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default bcrypt cost factor
pub const DEFAULT_BCRYPT_COST: u32 = 10;
/// Default ZeroBounce validation endpoint
pub const DEFAULT_ZEROBOUNCE_URL: &str = "https://api.zerobounce.net/v2/validate";

/// Business rules applied by the registrar
#[derive(Debug, Clone)]
pub struct RegistrationPolicy {
    /// Only addresses on this domain may register
    pub institutional_domain: InstitutionalDomain,
    /// Lifetime of a verification code
    pub code_ttl: chrono::Duration,
    /// Oracle statuses that count as deliverable
    pub allowed_statuses: Vec<DeliverabilityStatus>,
    /// Wrong codes tolerated per challenge
    pub max_attempts: u32,
    /// Enforce the `0000-00-0000` carnet layout; otherwise any non-empty
    /// carnet is accepted
    pub require_carnet_format: bool,
}

impl RegistrationPolicy {
    pub fn is_allowed(&self, status: &DeliverabilityStatus) -> bool {
        self.allowed_statuses.contains(status)
    }
}

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self {
            institutional_domain: InstitutionalDomain::parse(DEFAULT_INSTITUTIONAL_DOMAIN)
                .unwrap_or_else(|_| unreachable!("default domain is valid")),
            code_ttl: chrono::Duration::minutes(DEFAULT_CODE_TTL_MINUTES),
            allowed_statuses: vec![DeliverabilityStatus::Valid, DeliverabilityStatus::CatchAll],
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            require_carnet_format: false,
        }
    }
}

/// ZeroBounce oracle settings
#[derive(Clone)]
pub struct ZeroBounceConfig {
    pub api_key: String,
    pub api_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for ZeroBounceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZeroBounceConfig")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// SQLite database file; in-memory store when unset
    pub database_path: Option<String>,

    /// Registration business rules
    pub policy: RegistrationPolicy,

    /// bcrypt cost factor for password hashes
    pub bcrypt_cost: u32,

    /// Deliverability oracle; domain-only policy when unset
    pub zerobounce: Option<ZeroBounceConfig>,

    /// SMTP configuration for sending verification emails; console when unset
    pub smtp: Option<SmtpConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database_path: None,
            policy: RegistrationPolicy::default(),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            zerobounce: None,
            smtp: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Empty values count as unset. Values that fail to parse fall back to
    /// their defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let defaults = Self::default();

        let institutional_domain = match get("INSTITUTIONAL_DOMAIN") {
            Some(raw) => InstitutionalDomain::parse(&raw).unwrap_or_else(|e| {
                tracing::warn!(value = %raw, error = %e, "Ignoring INSTITUTIONAL_DOMAIN");
                defaults.policy.institutional_domain.clone()
            }),
            None => defaults.policy.institutional_domain.clone(),
        };

        let allowed_statuses = get("ALLOWED_DELIVERABILITY_STATUSES")
            .map(|raw| DeliverabilityStatus::parse_list(&raw))
            .filter(|list| !list.is_empty())
            .unwrap_or(defaults.policy.allowed_statuses);

        let code_ttl_minutes = parse_or(&get, "CODE_TTL_MINUTES", DEFAULT_CODE_TTL_MINUTES)
            .clamp(1, MAX_CODE_TTL_MINUTES);
        let code_ttl = chrono::TimeDelta::try_minutes(code_ttl_minutes)
            .unwrap_or(defaults.policy.code_ttl);

        let policy = RegistrationPolicy {
            institutional_domain,
            code_ttl,
            allowed_statuses,
            max_attempts: parse_or(&get, "MAX_VERIFICATION_ATTEMPTS", DEFAULT_MAX_ATTEMPTS).max(1),
            require_carnet_format: parse_or(&get, "REQUIRE_CARNET_FORMAT", false),
        };

        let zerobounce = get("ZEROBOUNCE_API_KEY").map(|api_key| ZeroBounceConfig {
            api_key,
            api_url: get("ZEROBOUNCE_API_URL").unwrap_or_else(|| DEFAULT_ZEROBOUNCE_URL.into()),
            timeout: Duration::from_secs(parse_or(&get, "ORACLE_TIMEOUT_SECS", 10)),
        });

        Self {
            port: parse_or(&get, "PORT", defaults.port),
            database_path: get("DATABASE_PATH"),
            policy,
            bcrypt_cost: parse_or(&get, "BCRYPT_COST", DEFAULT_BCRYPT_COST)
                .clamp(4, 31),
            zerobounce,
            smtp: SmtpConfig::from_lookup(&get),
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Unparseable configuration value, using default");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.policy.institutional_domain.as_str(), "miumg.edu.gt");
        assert_eq!(config.policy.code_ttl, chrono::Duration::minutes(10));
        assert_eq!(config.policy.max_attempts, 5);
        assert!(!config.policy.require_carnet_format);
        assert!(config.policy.is_allowed(&DeliverabilityStatus::Valid));
        assert!(config.policy.is_allowed(&DeliverabilityStatus::CatchAll));
        assert!(!config.policy.is_allowed(&DeliverabilityStatus::Unknown));
        assert_eq!(config.bcrypt_cost, 10);
        assert!(config.database_path.is_none());
        assert!(config.zerobounce.is_none());
        assert!(config.smtp.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("DATABASE_PATH", "/tmp/registrar.db"),
            ("INSTITUTIONAL_DOMAIN", "@Example.EDU"),
            ("CODE_TTL_MINUTES", "15"),
            ("ALLOWED_DELIVERABILITY_STATUSES", "VALID"),
            ("MAX_VERIFICATION_ATTEMPTS", "3"),
            ("REQUIRE_CARNET_FORMAT", "true"),
            ("BCRYPT_COST", "12"),
            ("ZEROBOUNCE_API_KEY", "secret"),
            ("ORACLE_TIMEOUT_SECS", "3"),
        ]);

        assert_eq!(config.port, 8080);
        assert_eq!(config.database_path.as_deref(), Some("/tmp/registrar.db"));
        assert_eq!(config.policy.institutional_domain.as_str(), "example.edu");
        assert_eq!(config.policy.code_ttl, chrono::Duration::minutes(15));
        assert_eq!(config.policy.allowed_statuses, vec![DeliverabilityStatus::Valid]);
        assert_eq!(config.policy.max_attempts, 3);
        assert!(config.policy.require_carnet_format);
        assert_eq!(config.bcrypt_cost, 12);

        let zerobounce = config.zerobounce.unwrap();
        assert_eq!(zerobounce.api_key, "secret");
        assert_eq!(zerobounce.api_url, DEFAULT_ZEROBOUNCE_URL);
        assert_eq!(zerobounce.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = config_from(&[
            ("PORT", "not-a-port"),
            ("INSTITUTIONAL_DOMAIN", "nodots"),
            ("CODE_TTL_MINUTES", "-5"),
            ("ALLOWED_DELIVERABILITY_STATUSES", " , "),
        ]);

        assert_eq!(config.port, 3000);
        assert_eq!(config.policy.institutional_domain.as_str(), "miumg.edu.gt");
        assert_eq!(config.policy.code_ttl, chrono::Duration::minutes(1));
        assert_eq!(config.policy.allowed_statuses.len(), 2);
    }

    #[test]
    fn test_code_ttl_is_capped() {
        for raw in ["9223372036854775807", "100000000000000", "1441"] {
            let config = config_from(&[("CODE_TTL_MINUTES", raw)]);
            assert_eq!(
                config.policy.code_ttl,
                chrono::Duration::minutes(MAX_CODE_TTL_MINUTES),
                "{}",
                raw
            );
        }

        let config = config_from(&[("CODE_TTL_MINUTES", "1440")]);
        assert_eq!(config.policy.code_ttl, chrono::Duration::hours(24));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = config_from(&[("ZEROBOUNCE_API_KEY", "  "), ("DATABASE_PATH", "")]);
        assert!(config.zerobounce.is_none());
        assert!(config.database_path.is_none());
    }
}
