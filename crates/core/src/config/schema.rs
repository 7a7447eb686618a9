//! Configuration schema definitions

use crate::address::NodeAddress;
use crate::error::{Error, ErrorCode, Result};
use serde::{Deserialize, Serialize};

/// Polls double their delay each time; beyond this the schedule spans days
const MAX_POLL_ATTEMPTS: u32 = 20;
const MAX_POLL_INITIAL_DELAY_SECS: u64 = 3600;

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ConfigSchema {
    #[serde(default)]
    pub ipfs: IpfsConfig,

    #[serde(default)]
    pub virustotal: VirusTotalConfig,

    #[serde(default)]
    pub firebase: FirebaseConfig,

    #[serde(default)]
    pub download: DownloadConfig,
}

impl ConfigSchema {
    /// Check values that deserialize fine but cannot work
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.ipfs.timeout_secs == 0 {
            problems.push("ipfs.timeout_secs must be greater than zero");
        }
        if self.virustotal.max_poll_attempts == 0 {
            problems.push("virustotal.max_poll_attempts must be greater than zero");
        }
        if self.virustotal.max_poll_attempts > MAX_POLL_ATTEMPTS {
            problems.push("virustotal.max_poll_attempts must be at most 20");
        }
        if self.virustotal.poll_initial_delay_secs == 0 {
            problems.push("virustotal.poll_initial_delay_secs must be greater than zero");
        }
        if self.virustotal.poll_initial_delay_secs > MAX_POLL_INITIAL_DELAY_SECS {
            problems.push("virustotal.poll_initial_delay_secs must be at most 3600");
        }
        if self.virustotal.requests_per_minute == 0 {
            problems.push("virustotal.requests_per_minute must be greater than zero");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::new(ErrorCode::ConfigValidationError, problems.join("; ")))
        }
    }

    /// Copy with API keys masked, for display
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.virustotal.api_key = copy.virustotal.api_key.as_deref().map(mask_secret);
        copy.firebase.api_key = copy.firebase.api_key.as_deref().map(mask_secret);
        copy
    }
}

/// Mask all but the last four characters of a secret
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}

/// IPFS node settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IpfsConfig {
    /// Multiaddr of the node's RPC API
    #[serde(default)]
    pub address: NodeAddress,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            address: NodeAddress::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// VirusTotal settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VirusTotalConfig {
    /// API key (VIRUSTOTAL_API_KEY takes precedence)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Number of times an analysis is polled before giving up
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Delay before the first poll; doubles for each later poll
    #[serde(default = "default_poll_initial_delay_secs")]
    pub poll_initial_delay_secs: u64,

    /// Request quota of the API key
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

impl Default for VirusTotalConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            max_poll_attempts: default_max_poll_attempts(),
            poll_initial_delay_secs: default_poll_initial_delay_secs(),
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

fn default_max_poll_attempts() -> u32 {
    7
}

fn default_poll_initial_delay_secs() -> u64 {
    4
}

fn default_requests_per_minute() -> u32 {
    4
}

/// Firebase identity settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FirebaseConfig {
    /// Web API key of the Firebase project (FIREBASE_API_KEY takes precedence)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Download behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DownloadConfig {
    /// Scan downloaded content with VirusTotal before saving it
    #[serde(default = "default_true")]
    pub scan: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self { scan: true }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let schema = ConfigSchema::default();
        assert_eq!(schema.ipfs.address.to_string(), "/ip4/127.0.0.1/tcp/5001");
        assert_eq!(schema.virustotal.max_poll_attempts, 7);
        assert!(schema.download.scan);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let schema: ConfigSchema = toml::from_str(
            r#"
            [ipfs]
            address = "/ip4/10.1.1.1/tcp/5001"

            [download]
            scan = false
            "#,
        )
        .unwrap();

        assert_eq!(schema.ipfs.address.port, 5001);
        assert_eq!(schema.ipfs.timeout_secs, 30);
        assert!(!schema.download.scan);
        assert_eq!(schema.virustotal.requests_per_minute, 4);
    }

    #[test]
    fn test_invalid_address_rejected_at_parse() {
        let result: std::result::Result<ConfigSchema, _> =
            toml::from_str("[ipfs]\naddress = \"10.1.1.1:5001\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_zero_values() {
        let mut schema = ConfigSchema::default();
        schema.ipfs.timeout_secs = 0;
        schema.virustotal.max_poll_attempts = 0;

        let err = schema.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigValidationError);
        assert!(err.message.contains("timeout_secs"));
        assert!(err.message.contains("max_poll_attempts"));
    }

    #[test]
    fn test_validate_poll_bounds() {
        let mut schema = ConfigSchema::default();
        schema.virustotal.max_poll_attempts = 21;
        schema.virustotal.poll_initial_delay_secs = 7200;

        let err = schema.validate().unwrap_err();
        assert!(err.message.contains("max_poll_attempts must be at most 20"));
        assert!(err.message.contains("poll_initial_delay_secs must be at most 3600"));
    }

    #[test]
    fn test_redacted_masks_keys() {
        let mut schema = ConfigSchema::default();
        schema.virustotal.api_key = Some("abcdef123456".to_string());
        schema.firebase.api_key = Some("key".to_string());

        let redacted = schema.redacted();
        assert_eq!(redacted.virustotal.api_key.as_deref(), Some("********3456"));
        assert_eq!(redacted.firebase.api_key.as_deref(), Some("***"));
    }
}
