//! IPFS node RPC endpoints
//!
//! Every RPC command is a `POST` to `<api>/<command>`, with arguments passed
//! as query parameters.

use crate::client::{Service, ZeroByteClient};
use crate::error::{ApiError, ApiResult};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use zerobyte_core::cid::Cid;
use zerobyte_core::retry::RetryConfig;

/// IPFS node API interface
#[derive(Clone)]
pub struct IpfsApi {
    client: ZeroByteClient,
}

impl IpfsApi {
    /// Create a new IPFS API interface
    pub(crate) fn new(client: ZeroByteClient) -> Self {
        Self { client }
    }

    fn url(&self, command: &str) -> String {
        format!("{}/{}", self.client.config().ipfs_api_url.trim_end_matches('/'), command)
    }

    /// Check the node and report whether it is reachable
    ///
    /// Never fails: an unreachable node is reported as offline with the
    /// error text as message.
    pub async fn check_online(&self) -> NodeStatus {
        let url = self.url("refs/local");
        let reachable = self
            .client
            .send_with_retry(Service::Ipfs, &RetryConfig::no_retry(), |c| {
                c.post(&url).timeout(self.client.config().timeout)
            })
            .await;

        match reachable {
            Ok(_) => {
                let version = self.version().await.ok().map(|v| v.version);
                NodeStatus {
                    online: true,
                    message: "Online".to_string(),
                    version,
                }
            }
            Err(e) => {
                debug!(error = %e, "IPFS node check failed");
                let message = e.to_string();
                NodeStatus {
                    online: false,
                    message: if message.trim().is_empty() {
                        "Connection failed".to_string()
                    } else {
                        message
                    },
                    version: None,
                }
            }
        }
    }

    /// Node software version
    pub async fn version(&self) -> ApiResult<VersionInfo> {
        let url = self.url("version");
        self.client.send_json(Service::Ipfs, |c| c.post(&url)).await
    }

    /// Add a local file to the node and pin it
    pub async fn add_file(&self, path: &Path) -> ApiResult<AddedFile> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ApiError::config(format!("{} has no file name", path.display())))?;
        let data = tokio::fs::read(path).await?;
        self.add_bytes(&name, data).await
    }

    /// Add an in-memory blob to the node under `name` and pin it
    pub async fn add_bytes(&self, name: &str, data: Vec<u8>) -> ApiResult<AddedFile> {
        let url = self.url("add");
        let size = data.len();

        let response = self
            .client
            .send(Service::Ipfs, |c| {
                let part = Part::bytes(data.clone()).file_name(name.to_string());
                c.post(&url)
                    .query(&[("pin", "true")])
                    .multipart(Form::new().part("file", part))
            })
            .await?;

        let body = self.client.within_timeout(response.text()).await?;
        let added = parse_add_response(&body)?;
        info!(name, cid = %added.cid, bytes = size, "Added file to IPFS");
        Ok(added)
    }

    /// Stream the content behind `cid` into `dest`
    ///
    /// `on_progress` receives the cumulative number of bytes written.
    /// Returns the total number of bytes written. The transfer may run as
    /// long as data keeps arriving; it fails only when a single read stalls
    /// past the configured timeout.
    pub async fn cat_to_file(&self, cid: &Cid, dest: &Path, mut on_progress: impl FnMut(u64)) -> ApiResult<u64> {
        let url = self.url("cat");
        let mut response = self
            .client
            .send(Service::Ipfs, |c| c.post(&url).query(&[("arg", cid.as_str())]))
            .await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = self.client.within_timeout(response.chunk()).await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            on_progress(written);
        }
        file.flush().await?;

        debug!(cid = %cid, bytes = written, dest = %dest.display(), "Fetched content");
        Ok(written)
    }

    /// Whether the node has `cid` pinned
    pub async fn pin_ls(&self, cid: &Cid) -> ApiResult<bool> {
        let url = self.url("pin/ls");
        let result = self
            .client
            .send_with_retry(Service::Ipfs, &RetryConfig::no_retry(), |c| {
                c.post(&url)
                    .query(&[("arg", cid.as_str())])
                    .timeout(self.client.config().timeout)
            })
            .await;

        match result {
            Ok(response) => {
                let pins: PinLsResponse = response.json().await?;
                Ok(pins.keys.contains_key(cid.as_str()))
            }
            Err(ApiError::ApiResponse { message, .. }) if message.contains("not pinned") => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Parse the NDJSON body of `add`; the last object describes the root
fn parse_add_response(body: &str) -> ApiResult<AddedFile> {
    let line = body
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| ApiError::unexpected("empty response from add"))?;

    let raw: RawAddEntry = serde_json::from_str(line)?;
    let cid = Cid::parse(&raw.hash)?;
    let size = raw.size.trim().parse().unwrap_or(0);

    Ok(AddedFile {
        name: raw.name,
        cid,
        size,
    })
}

/// Result of a liveness check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeStatus {
    /// Whether the node answered
    pub online: bool,
    /// "Online" or the reason the check failed
    pub message: String,
    /// Node version, when it could be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Response of the `version` command
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct VersionInfo {
    /// Implementation version, e.g. `0.29.0`
    #[serde(default)]
    pub version: String,
    /// Git commit
    #[serde(default)]
    pub commit: String,
    /// Repository format version
    #[serde(default)]
    pub repo: String,
    /// Platform
    #[serde(default)]
    pub system: String,
    /// Go toolchain
    #[serde(default)]
    pub golang: String,
}

/// A file stored on the node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddedFile {
    /// File name as sent
    pub name: String,
    /// Content identifier assigned by the node
    pub cid: Cid,
    /// Size reported by the node, in bytes
    pub size: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawAddEntry {
    #[serde(default)]
    name: String,
    hash: String,
    #[serde(default)]
    size: String,
}

#[derive(Debug, Deserialize)]
struct PinLsResponse {
    #[serde(rename = "Keys", default)]
    keys: std::collections::HashMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CID: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

    #[test]
    fn test_parse_add_single_line() {
        let body = format!(r#"{{"Name":"notes.txt","Hash":"{CID}","Size":"1024"}}"#);
        let added = parse_add_response(&body).unwrap();
        assert_eq!(added.name, "notes.txt");
        assert_eq!(added.cid.as_str(), CID);
        assert_eq!(added.size, 1024);
    }

    #[test]
    fn test_parse_add_takes_last_line() {
        let body = format!(
            "{{\"Name\":\"dir/a.txt\",\"Hash\":\"QmcJw6x4bQr7oFnVnF6i8SLcJvhXjaxWvj54FYXmZ4Ct6p\",\"Size\":\"3\"}}\n\
             {{\"Name\":\"dir\",\"Hash\":\"{CID}\",\"Size\":\"60\"}}\n\n"
        );
        let added = parse_add_response(&body).unwrap();
        assert_eq!(added.name, "dir");
        assert_eq!(added.cid.as_str(), CID);
    }

    #[test]
    fn test_parse_add_errors() {
        assert!(matches!(parse_add_response("\n"), Err(ApiError::UnexpectedResponse(_))));
        assert!(matches!(
            parse_add_response(r#"{"Name":"x","Hash":"nope","Size":"1"}"#),
            Err(ApiError::InvalidCid(_))
        ));
    }

    #[test]
    fn test_version_deserialize() {
        let json = r#"{"Version":"0.29.0","Commit":"3f0947b","Repo":"15","System":"amd64/linux","Golang":"go1.22.2"}"#;
        let version: VersionInfo = serde_json::from_str(json).unwrap();
        assert_eq!(version.version, "0.29.0");
        assert_eq!(version.repo, "15");
    }
}
