//! VirusTotal v3 endpoints
//!
//! Files are identified by SHA-256. A file VirusTotal has seen before is
//! answered from its last analysis; anything else is uploaded and the
//! resulting analysis polled until it completes.

use crate::client::{Service, ZeroByteClient};
use crate::error::{ApiError, ApiResult};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};
use zerobyte_core::digest::sha256_file;

const API_KEY_HEADER: &str = "x-apikey";

/// Uploads above this size must go through a one-off upload URL
pub const DIRECT_UPLOAD_LIMIT: usize = 32 * 1024 * 1024;

/// VirusTotal API interface
#[derive(Clone)]
pub struct VirusTotalApi {
    client: ZeroByteClient,
}

impl VirusTotalApi {
    /// Create a new VirusTotal API interface
    pub(crate) fn new(client: ZeroByteClient) -> Self {
        Self { client }
    }

    fn api_key(&self) -> ApiResult<&str> {
        self.client
            .config()
            .virustotal_api_key
            .as_deref()
            .ok_or(ApiError::MissingApiKey("virustotal"))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.client.config().virustotal_url.trim_end_matches('/'), path)
    }

    /// Last analysis of a file VirusTotal already knows, by SHA-256
    ///
    /// Returns `Ok(None)` when the hash is unknown.
    pub async fn lookup_file(&self, sha256: &str) -> ApiResult<Option<ScanStats>> {
        let key = self.api_key()?;
        let url = self.url(&format!("files/{sha256}"));

        let result: ApiResult<ObjectResponse<FileAttributes>> = self
            .client
            .send_json(Service::VirusTotal, |c| c.get(&url).header(API_KEY_HEADER, key))
            .await;

        match result {
            Ok(report) => Ok(report.data.attributes.and_then(|a| a.last_analysis_stats)),
            Err(e) if e.is_not_found() => {
                debug!(sha256, "No existing VirusTotal report");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Submit a file for analysis, returning the analysis id
    pub async fn upload_file(&self, path: &Path) -> ApiResult<String> {
        let key = self.api_key()?;
        let name = path
            .file_name()
            .map_or_else(|| "upload.bin".to_string(), |n| n.to_string_lossy().into_owned());
        let data = tokio::fs::read(path).await?;

        let url = if data.len() > DIRECT_UPLOAD_LIMIT {
            self.upload_url().await?
        } else {
            self.url("files")
        };

        let response: ObjectResponse<serde_json::Value> = self
            .client
            .send_upload_json(Service::VirusTotal, |c| {
                let part = Part::bytes(data.clone()).file_name(name.clone());
                c.post(&url)
                    .header(API_KEY_HEADER, key)
                    .multipart(Form::new().part("file", part))
            })
            .await?;

        let id = response
            .data
            .id
            .ok_or_else(|| ApiError::unexpected("upload response has no analysis id"))?;
        info!(file = %name, analysis_id = %id, "Submitted file to VirusTotal");
        Ok(id)
    }

    async fn upload_url(&self) -> ApiResult<String> {
        let key = self.api_key()?;
        let url = self.url("files/upload_url");
        let response: UploadUrlResponse = self
            .client
            .send_json(Service::VirusTotal, |c| c.get(&url).header(API_KEY_HEADER, key))
            .await?;
        Ok(response.data)
    }

    /// Current state of an analysis
    pub async fn get_analysis(&self, analysis_id: &str) -> ApiResult<Analysis> {
        let key = self.api_key()?;
        let url = self.url(&format!("analyses/{analysis_id}"));
        let response: ObjectResponse<Analysis> = self
            .client
            .send_json(Service::VirusTotal, |c| c.get(&url).header(API_KEY_HEADER, key))
            .await?;
        response
            .data
            .attributes
            .ok_or_else(|| ApiError::unexpected(format!("analysis {analysis_id} has no attributes")))
    }

    /// Poll an analysis until it completes
    ///
    /// Each poll is preceded by the configured backoff delay. A failed poll
    /// still uses up an attempt.
    pub async fn wait_for_analysis(&self, analysis_id: &str) -> ApiResult<ScanStats> {
        self.api_key()?;
        let polling = self.client.config().scan_polling.clone();

        for poll in 0..polling.max_attempts {
            let delay = polling.poll_delay(poll);
            debug!(analysis_id, poll = poll + 1, delay_secs = delay.as_secs_f64(), "Waiting for analysis");
            tokio::time::sleep(delay).await;

            match self.get_analysis(analysis_id).await {
                Ok(analysis) if analysis.status == AnalysisStatus::Completed => {
                    return Ok(analysis.stats);
                }
                Ok(analysis) => debug!(analysis_id, status = ?analysis.status, "Analysis not finished"),
                Err(e) => warn!(analysis_id, poll = poll + 1, error = %e, "Analysis poll failed"),
            }
        }

        Err(ApiError::ScanTimeout {
            analysis_id: analysis_id.to_string(),
            attempts: polling.max_attempts,
        })
    }

    /// Scan a local file, reusing an existing report when there is one
    pub async fn scan_file(&self, path: &Path) -> ApiResult<ScanReport> {
        self.api_key()?;
        let sha256 = sha256_file(path)?;

        if let Some(stats) = self.lookup_file(&sha256).await? {
            info!(sha256 = %sha256, verdict = %stats.verdict(), "Using existing VirusTotal report");
            return Ok(ScanReport {
                sha256,
                stats,
                source: ScanSource::Cached,
            });
        }

        let analysis_id = self.upload_file(path).await?;
        let stats = self.wait_for_analysis(&analysis_id).await?;
        info!(sha256 = %sha256, verdict = %stats.verdict(), "VirusTotal analysis completed");

        Ok(ScanReport {
            sha256,
            stats,
            source: ScanSource::Fresh,
        })
    }
}

/// Engine verdict counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Engines flagging the file as malicious
    #[serde(default)]
    pub malicious: u32,
    /// Engines flagging the file as suspicious
    #[serde(default)]
    pub suspicious: u32,
    /// Engines that found nothing
    #[serde(default)]
    pub undetected: u32,
    /// Engines that consider the file harmless
    #[serde(default)]
    pub harmless: u32,
    /// Engines that timed out
    #[serde(default)]
    pub timeout: u32,
}

impl ScanStats {
    /// Any engine reported the file as malicious or suspicious
    #[must_use]
    pub fn is_infected(&self) -> bool {
        self.malicious > 0 || self.suspicious > 0
    }

    /// Clean / infected summary
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        if self.is_infected() {
            Verdict::Infected
        } else {
            Verdict::Clean
        }
    }

    /// Number of engines that reported
    #[must_use]
    pub fn total(&self) -> u32 {
        self.malicious + self.suspicious + self.undetected + self.harmless + self.timeout
    }
}

/// Outcome of a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// No engine flagged the file
    Clean,
    /// At least one engine flagged the file
    Infected,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => f.write_str("clean"),
            Self::Infected => f.write_str("infected"),
        }
    }
}

/// Analysis progress as reported by VirusTotal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisStatus {
    /// Waiting for an engine slot
    Queued,
    /// Engines are running
    InProgress,
    /// Results are final
    Completed,
    /// A status this client does not know
    #[serde(other)]
    Unknown,
}

/// A VirusTotal analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    /// Progress of the analysis
    pub status: AnalysisStatus,
    /// Verdict counts so far
    #[serde(default)]
    pub stats: ScanStats,
}

/// Where a scan result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanSource {
    /// Existing report for the same hash
    Cached,
    /// New upload and analysis
    Fresh,
}

/// Result of [`VirusTotalApi::scan_file`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// SHA-256 of the scanned file
    pub sha256: String,
    /// Verdict counts
    pub stats: ScanStats,
    /// Whether the report was reused or freshly computed
    pub source: ScanSource,
}

impl ScanReport {
    /// Clean / infected summary
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        self.stats.verdict()
    }
}

#[derive(Debug, Deserialize)]
struct ObjectResponse<A> {
    data: ObjectData<A>,
}

#[derive(Debug, Deserialize)]
struct ObjectData<A> {
    #[serde(default)]
    id: Option<String>,
    attributes: Option<A>,
}

#[derive(Debug, Deserialize, Default)]
struct FileAttributes {
    #[serde(default)]
    last_analysis_stats: Option<ScanStats>,
}

#[derive(Debug, Deserialize)]
struct UploadUrlResponse {
    data: String,
}
