//! Configuration for the ZeroByte API client
//!
//! Values come from, in increasing precedence: built-in defaults, the TOML
//! configuration file, environment variables, and explicit builder calls.

use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use zerobyte_core::address::NodeAddress;
use zerobyte_core::config::ConfigSchema;
use zerobyte_core::rate_limit::RateLimitConfig;
use zerobyte_core::retry::RetryConfig;

/// Default VirusTotal v3 API
pub const DEFAULT_VIRUSTOTAL_URL: &str = "https://www.virustotal.com/api/v3";

/// Default Firebase identity toolkit API
pub const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Default Firebase secure token API
pub const DEFAULT_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the IPFS node RPC API (`.../api/v0`)
    pub ipfs_api_url: String,
    /// Base URL of the VirusTotal API
    pub virustotal_url: String,
    /// VirusTotal API key
    pub virustotal_api_key: Option<String>,
    /// Base URL of the Firebase identity toolkit
    pub identity_url: String,
    /// Base URL of the Firebase token endpoint
    pub token_url: String,
    /// Firebase Web API key
    pub firebase_api_key: Option<String>,
    /// Request timeout
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Retry configuration for individual requests
    pub retry: RetryConfig,
    /// Polling schedule for malware analyses
    pub scan_polling: RetryConfig,
    /// VirusTotal request quota
    pub rate_limit: RateLimitConfig,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ipfs_api_url: NodeAddress::default().api_base_url(),
            virustotal_url: DEFAULT_VIRUSTOTAL_URL.to_string(),
            virustotal_api_key: None,
            identity_url: DEFAULT_IDENTITY_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            firebase_api_key: None,
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            scan_polling: RetryConfig::scan_polling(),
            rate_limit: RateLimitConfig::virustotal_public(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from defaults and environment variables
    pub fn from_env() -> ApiResult<Self> {
        Self::default().with_env_overrides()
    }

    /// Create configuration from a loaded configuration file
    #[must_use]
    pub fn from_schema(schema: &ConfigSchema) -> Self {
        let vt = &schema.virustotal;
        // Cap at the last poll's delay so the doubling schedule is never cut short
        let last_delay_secs = vt
            .poll_initial_delay_secs
            .saturating_mul(2u64.saturating_pow(vt.max_poll_attempts.saturating_sub(1)));
        let scan_polling = RetryConfig::scan_polling()
            .with_max_attempts(vt.max_poll_attempts)
            .with_initial_delay(Duration::from_secs(vt.poll_initial_delay_secs))
            .with_max_delay(Duration::from_secs(last_delay_secs));

        Self {
            ipfs_api_url: schema.ipfs.address.api_base_url(),
            virustotal_api_key: vt.api_key.clone().filter(|k| !k.trim().is_empty()),
            firebase_api_key: schema.firebase.api_key.clone().filter(|k| !k.trim().is_empty()),
            timeout: Duration::from_secs(schema.ipfs.timeout_secs),
            scan_polling,
            rate_limit: RateLimitConfig::strict(vt.requests_per_minute, Duration::from_secs(60)),
            ..Self::default()
        }
    }

    /// Apply environment variable overrides
    ///
    /// Reads the following environment variables:
    /// - `ZEROBYTE_IPFS_ADDR`: node multiaddr, e.g. `/ip4/10.0.0.2/tcp/5001`
    /// - `ZEROBYTE_IPFS_API`: full RPC base URL (wins over `ZEROBYTE_IPFS_ADDR`)
    /// - `VIRUSTOTAL_API_KEY`, `FIREBASE_API_KEY`: service API keys
    /// - `ZEROBYTE_TIMEOUT_SECS`: request timeout in seconds
    /// - `ZEROBYTE_VIRUSTOTAL_URL`, `ZEROBYTE_IDENTITY_URL`, `ZEROBYTE_TOKEN_URL`:
    ///   alternative service endpoints
    pub fn with_env_overrides(self) -> ApiResult<Self> {
        self.with_overrides_from(|key| env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> ApiResult<Self> {
        if let Some(addr) = lookup("ZEROBYTE_IPFS_ADDR") {
            let node = NodeAddress::parse(&addr).map_err(|e| ApiError::config(e.message))?;
            self.ipfs_api_url = node.api_base_url();
        }
        if let Some(url) = lookup("ZEROBYTE_IPFS_API") {
            self.ipfs_api_url = url;
        }
        if let Some(key) = lookup("VIRUSTOTAL_API_KEY") {
            self.virustotal_api_key = Some(key);
        }
        if let Some(key) = lookup("FIREBASE_API_KEY") {
            self.firebase_api_key = Some(key);
        }
        if let Some(secs) = lookup("ZEROBYTE_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| ApiError::config(format!("ZEROBYTE_TIMEOUT_SECS is not a number: {secs}")))?;
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(url) = lookup("ZEROBYTE_VIRUSTOTAL_URL") {
            self.virustotal_url = url;
        }
        if let Some(url) = lookup("ZEROBYTE_IDENTITY_URL") {
            self.identity_url = url;
        }
        if let Some(url) = lookup("ZEROBYTE_TOKEN_URL") {
            self.token_url = url;
        }
        Ok(self)
    }

    /// Builder-style method to point at an IPFS node
    #[must_use]
    pub fn with_node(mut self, node: &NodeAddress) -> Self {
        self.ipfs_api_url = node.api_base_url();
        self
    }

    /// Builder-style method to set the IPFS RPC base URL
    #[must_use]
    pub fn with_ipfs_api_url(mut self, url: impl Into<String>) -> Self {
        self.ipfs_api_url = url.into();
        self
    }

    /// Builder-style method to set the VirusTotal base URL
    #[must_use]
    pub fn with_virustotal_url(mut self, url: impl Into<String>) -> Self {
        self.virustotal_url = url.into();
        self
    }

    /// Builder-style method to set the VirusTotal API key
    #[must_use]
    pub fn with_virustotal_api_key(mut self, key: impl Into<String>) -> Self {
        self.virustotal_api_key = Some(key.into());
        self
    }

    /// Builder-style method to set the identity toolkit base URL
    #[must_use]
    pub fn with_identity_url(mut self, url: impl Into<String>) -> Self {
        self.identity_url = url.into();
        self
    }

    /// Builder-style method to set the secure token base URL
    #[must_use]
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Builder-style method to set the Firebase API key
    #[must_use]
    pub fn with_firebase_api_key(mut self, key: impl Into<String>) -> Self {
        self.firebase_api_key = Some(key.into());
        self
    }

    /// Builder-style method to set timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder-style method to set retry config
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Builder-style method to set the analysis polling schedule
    #[must_use]
    pub fn with_scan_polling(mut self, polling: RetryConfig) -> Self {
        self.scan_polling = polling;
        self
    }

    /// Builder-style method to set rate limit config
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ApiResult<()> {
        for (name, url) in [
            ("ipfs_api_url", &self.ipfs_api_url),
            ("virustotal_url", &self.virustotal_url),
            ("identity_url", &self.identity_url),
            ("token_url", &self.token_url),
        ] {
            if url.is_empty() {
                return Err(ApiError::config(format!("{name} cannot be empty")));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ApiError::InvalidUrl(format!("{name} must start with http:// or https://: {url}")));
            }
        }

        if self.timeout.is_zero() {
            return Err(ApiError::config("timeout cannot be zero"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.ipfs_api_url, "http://127.0.0.1:5001/api/v0");
        assert!(config.virustotal_url.contains("virustotal.com"));
        assert!(config.virustotal_api_key.is_none());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.scan_polling.max_attempts, 7);
    }

    #[test]
    fn test_from_schema() {
        let mut schema = ConfigSchema::default();
        schema.ipfs.address = "/ip4/10.0.0.7/tcp/5005".parse().unwrap();
        schema.ipfs.timeout_secs = 12;
        schema.virustotal.api_key = Some("vt".into());
        schema.virustotal.max_poll_attempts = 3;
        schema.virustotal.poll_initial_delay_secs = 1;
        schema.firebase.api_key = Some("   ".into());

        let config = ClientConfig::from_schema(&schema);
        assert_eq!(config.ipfs_api_url, "http://10.0.0.7:5005/api/v0");
        assert_eq!(config.timeout, Duration::from_secs(12));
        assert_eq!(config.virustotal_api_key.as_deref(), Some("vt"));
        assert!(config.firebase_api_key.is_none());
        assert_eq!(config.scan_polling.max_attempts, 3);
        assert_eq!(config.scan_polling.poll_delay(0), Duration::from_secs(1));
        assert_eq!(config.scan_polling.poll_delay(2), Duration::from_secs(4));
    }

    #[test]
    fn test_long_poll_delay_not_capped() {
        let mut schema = ConfigSchema::default();
        schema.virustotal.max_poll_attempts = 4;
        schema.virustotal.poll_initial_delay_secs = 300;

        let polling = ClientConfig::from_schema(&schema).scan_polling;
        let delays: Vec<u64> = (0..4).map(|p| polling.poll_delay(p).as_secs()).collect();
        assert_eq!(delays, vec![300, 600, 1200, 2400]);
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::default()
            .with_overrides_from(lookup(&[
                ("ZEROBYTE_IPFS_ADDR", "/ip4/192.168.1.2/tcp/5001"),
                ("VIRUSTOTAL_API_KEY", "from-env"),
                ("ZEROBYTE_TIMEOUT_SECS", "5"),
            ]))
            .unwrap();

        assert_eq!(config.ipfs_api_url, "http://192.168.1.2:5001/api/v0");
        assert_eq!(config.virustotal_api_key.as_deref(), Some("from-env"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_api_url_override_wins_over_addr() {
        let config = ClientConfig::default()
            .with_overrides_from(lookup(&[
                ("ZEROBYTE_IPFS_ADDR", "/ip4/192.168.1.2/tcp/5001"),
                ("ZEROBYTE_IPFS_API", "http://gateway.local:8080/api/v0"),
            ]))
            .unwrap();
        assert_eq!(config.ipfs_api_url, "http://gateway.local:8080/api/v0");
    }

    #[test]
    fn test_bad_overrides_rejected() {
        assert!(ClientConfig::default()
            .with_overrides_from(lookup(&[("ZEROBYTE_IPFS_ADDR", "localhost:5001")]))
            .is_err());
        assert!(ClientConfig::default()
            .with_overrides_from(lookup(&[("ZEROBYTE_TIMEOUT_SECS", "soon")]))
            .is_err());
    }

    #[test]
    fn test_builder_pattern() {
        let node: NodeAddress = "/ip4/10.9.8.7/tcp/5001".parse().unwrap();
        let config = ClientConfig::default()
            .with_node(&node)
            .with_timeout(Duration::from_secs(60));

        assert_eq!(config.ipfs_api_url, "http://10.9.8.7:5001/api/v0");
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_validation() {
        assert!(ClientConfig::default().validate().is_ok());
        assert!(ClientConfig::default().with_ipfs_api_url("").validate().is_err());
        assert!(ClientConfig::default().with_virustotal_url("ftp://vt").validate().is_err());
        assert!(ClientConfig::default().with_timeout(Duration::ZERO).validate().is_err());
    }
}
