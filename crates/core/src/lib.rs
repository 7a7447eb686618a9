//! Core utilities for the ZeroByte IPFS client
//!
//! This crate provides the pieces shared by the API client and the CLI:
//!
//! - **Error handling**: errors with codes, context, and recovery suggestions
//! - **Addresses**: IPFS node multiaddrs and their RPC base URLs
//! - **Content IDs**: validation of CIDv0 / CIDv1 strings
//! - **Resilience**: retry with backoff, circuit breaker, rate limiting
//! - **Configuration**: TOML configuration with validation
//! - **Digests**: SHA-256 of files for malware report lookups
//!
//! # Example
//!
//! ```rust,no_run
//! use zerobyte_core::{address::NodeAddress, cid::Cid};
//!
//! let node: NodeAddress = "/ip4/192.168.1.10/tcp/5001".parse().expect("valid multiaddr");
//! println!("RPC API at {}", node.api_base_url());
//!
//! let cid = Cid::parse("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG").expect("valid CID");
//! println!("CIDv{}", cid.version());
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod address;
pub mod cid;
pub mod config;
pub mod digest;
pub mod error;
pub mod rate_limit;
pub mod retry;
pub mod validation;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::address::NodeAddress;
    pub use crate::cid::Cid;
    pub use crate::config::{Config, ConfigSchema};
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
    pub use crate::rate_limit::{RateLimitConfig, RateLimiter};
    pub use crate::retry::{retry, retry_async, CircuitBreaker, RetryConfig};
    pub use crate::validation::{ValidationResult, Validator};
}
