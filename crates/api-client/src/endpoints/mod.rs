//! Endpoint-specific API implementations
//!
//! Each module provides a typed interface for one remote service.
//!
//! | Module | Service | Description |
//! |--------|---------|-------------|
//! | `ipfs` | IPFS node RPC (`/api/v0`) | Liveness, add, cat, pin status |
//! | `virustotal` | VirusTotal v3 | Hash lookup, upload, analysis polling |
//! | `auth` | Firebase identity toolkit | Email, anonymous and Google sign-in |

pub mod auth;
pub mod ipfs;
pub mod virustotal;

pub use auth::{AuthApi, AuthProvider, AuthSession, RefreshedToken};
pub use ipfs::{AddedFile, IpfsApi, NodeStatus, VersionInfo};
pub use virustotal::{Analysis, AnalysisStatus, ScanReport, ScanSource, ScanStats, Verdict, VirusTotalApi};
