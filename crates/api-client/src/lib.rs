//! API clients for the services behind ZeroByte
//!
//! This crate provides one resilient HTTP client for the three services the
//! ZeroByte CLI talks to: an IPFS node's RPC API, VirusTotal, and Firebase
//! identity.
//!
//! # Features
//!
//! - **Layered configuration**: defaults, config file, environment variables
//! - **Retry with exponential backoff**: Automatic retry for transient failures
//! - **Circuit breaker per service**: Stop calling a service that is down
//! - **Rate limiting**: Stay within the VirusTotal public API quota
//! - **Request correlation**: Track requests with unique IDs for debugging
//!
//! # Example
//!
//! ```rust,no_run
//! use zerobyte_api_client::{ClientConfig, ZeroByteClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ZeroByteClient::with_config(ClientConfig::from_env()?)?;
//!
//!     let status = client.ipfs().check_online().await;
//!     println!("Node: {}", status.message);
//!
//!     let added = client.ipfs().add_file("notes.txt".as_ref()).await?;
//!     println!("Stored as {}", added.cid);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod middleware;

pub use client::{Service, ZeroByteClient};
pub use config::ClientConfig;
pub use error::{ApiError, ApiResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::client::{Service, ZeroByteClient};
    pub use crate::config::ClientConfig;
    pub use crate::endpoints::{
        AuthApi, AuthSession, IpfsApi, NodeStatus, ScanReport, ScanStats, Verdict, VirusTotalApi,
    };
    pub use crate::error::{ApiError, ApiResult};
}
