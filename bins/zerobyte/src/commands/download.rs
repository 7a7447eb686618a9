//! Download command
//!
//! Content is fetched into a temporary file next to the destination and
//! only moved into place once the scan has passed (or the user accepted
//! the risk). Nothing unscanned is left behind on failure.

use crate::commands::Context;
use crate::commands::scan::{clean_count, print_report, scan_with_progress};
use crate::session::ensure_session;
use anyhow::{Context as _, Result};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zerobyte_cli::Status;
use zerobyte_cli::output::format_size;
use zerobyte_cli::progress::{byte_progress, finish_error, finish_success};
use zerobyte_cli::prompt::confirm;
use zerobyte_core::cid::Cid;
use zerobyte_core::error::exit_codes;
use zerobyte_core::{Error, ErrorCode};

pub async fn run(ctx: &Context, cid: &str, output: Option<PathBuf>, skip_scan: bool, force: bool) -> Result<i32> {
    let cid = Cid::parse(cid)?;
    let dest = output.unwrap_or_else(|| PathBuf::from(cid.as_str()));
    if dest.exists() && !force {
        return Err(Error::new(
            ErrorCode::FileExists,
            format!("{} already exists", dest.display()),
        )
        .with_suggestion("Choose another path with --output, or pass --force to overwrite")
        .into());
    }

    let client = ctx.client()?;
    let session = ensure_session(&ctx.sessions, &client).await?;
    info!(uid = %session.uid, cid = %cid, dest = %dest.display(), "Downloading");

    let staging = tempfile::Builder::new()
        .prefix(".zerobyte-")
        .suffix(".part")
        .tempfile_in(staging_dir(&dest))
        .context("Failed to create temporary download file")?;

    let scan = !skip_scan && ctx.config.schema.download.scan;
    let steps = if scan { 3 } else { 2 };
    if ctx.is_text() {
        Status::step(1, steps, &format!("Fetching {cid}"));
    }

    let pb = ctx.is_text().then(|| byte_progress(None, "Downloading file..."));
    let fetched = client
        .ipfs()
        .cat_to_file(&cid, staging.path(), |bytes| {
            if let Some(pb) = &pb {
                pb.set_position(bytes);
            }
        })
        .await;

    let size = match fetched {
        Ok(size) => {
            if let Some(pb) = &pb {
                finish_success(pb, "Download complete");
            }
            size
        }
        Err(e) => {
            if let Some(pb) = &pb {
                finish_error(pb, "Download failed");
            }
            return Err(e).context("Download failed");
        }
    };

    let report = if scan {
        if ctx.is_text() {
            Status::step(2, steps, "Checking downloaded content");
        }
        let report = scan_with_progress(ctx, &client, staging.path()).await?;
        if ctx.is_text() {
            print_report(&report);
        }

        let stats = report.stats;
        if stats.is_infected() {
            warn!(cid = %cid, malicious = stats.malicious, suspicious = stats.suspicious, "Downloaded content flagged");
            if ctx.is_text() {
                Status::security_alert(stats.malicious, stats.suspicious, clean_count(&stats));
            }
            if !force && !confirm("Download anyway?", false)? {
                return Err(Error::malware_detected(stats.malicious, stats.suspicious)
                    .with_context("Download cancelled")
                    .into());
            }
        }
        Some(report)
    } else {
        if ctx.is_text() {
            Status::warning("Saving without a malware scan");
        }
        None
    };

    if ctx.is_text() {
        Status::step(steps, steps, &format!("Saving to {}", dest.display()));
    }
    staging
        .persist(&dest)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to save {}", dest.display()))?;

    if ctx.is_text() {
        Status::success("Download completed successfully");
        Status::detail("saved to", &dest.display().to_string());
        Status::detail("size", &format_size(size));
    } else {
        ctx.print_json(&json!({
            "success": true,
            "cid": cid,
            "path": dest,
            "size": size,
            "scanned": report.is_some(),
            "scan": report.map(|r| json!({
                "verdict": r.verdict(),
                "sha256": r.sha256,
                "stats": r.stats,
            })),
        }))?;
    }

    Ok(exit_codes::SUCCESS)
}

/// Directory for the temporary file, so the final rename stays on one filesystem
fn staging_dir(dest: &Path) -> PathBuf {
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_dir() {
        assert_eq!(staging_dir(Path::new("file.bin")), PathBuf::from("."));
        assert_eq!(staging_dir(Path::new("out/file.bin")), PathBuf::from("out"));
        assert_eq!(staging_dir(Path::new("/tmp/file.bin")), PathBuf::from("/tmp"));
    }
}
