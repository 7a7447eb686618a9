//! Upload command

use crate::commands::Context;
use crate::commands::scan::{check_file, clean_count, print_report, scan_with_progress};
use crate::session::ensure_session;
use anyhow::{Context as _, Result};
use serde_json::json;
use std::path::Path;
use tracing::info;
use zerobyte_cli::output::format_size;
use zerobyte_cli::progress::{finish_error, finish_success, spinner};
use zerobyte_cli::prompt::confirm;
use zerobyte_cli::Status;
use zerobyte_core::error::exit_codes;
use zerobyte_core::{Error, ErrorCode};

pub async fn run(ctx: &Context, file: &Path, scan: bool, force: bool) -> Result<i32> {
    check_file(file)?;
    let client = ctx.client()?;
    let session = ensure_session(&ctx.sessions, &client).await?;
    info!(uid = %session.uid, file = %file.display(), "Uploading");

    let report = if scan {
        let report = scan_with_progress(ctx, &client, file).await?;
        if ctx.is_text() {
            print_report(&report);
        }

        let stats = report.stats;
        if stats.is_infected() && !force {
            if ctx.is_text() {
                Status::security_alert(stats.malicious, stats.suspicious, clean_count(&stats));
            }
            if !confirm("Upload anyway?", false)? {
                return Err(Error::malware_detected(stats.malicious, stats.suspicious)
                    .with_context("Upload cancelled")
                    .into());
            }
        }
        Some(report)
    } else {
        None
    };

    let pb = ctx.is_text().then(|| spinner("Uploading to IPFS..."));
    let added = match client.ipfs().add_file(file).await {
        Ok(added) => {
            if let Some(pb) = &pb {
                finish_success(pb, "Upload complete");
            }
            added
        }
        Err(e) => {
            if let Some(pb) = &pb {
                finish_error(pb, "Upload failed");
            }
            let code = e.code();
            return Err(e).with_context(|| {
                if code == ErrorCode::NetworkError {
                    "Upload failed: is the IPFS node running? Check with `zerobyte status`".to_string()
                } else {
                    "Upload failed".to_string()
                }
            });
        }
    };

    if ctx.is_text() {
        Status::success("File uploaded successfully");
        Status::detail("cid", added.cid.as_str());
        Status::detail("name", &added.name);
        Status::detail("size", &format_size(added.size));
    } else {
        ctx.print_json(&json!({
            "success": true,
            "cid": added.cid,
            "name": added.name,
            "size": added.size,
            "scan": report.map(|r| json!({
                "verdict": r.verdict(),
                "sha256": r.sha256,
                "stats": r.stats,
            })),
        }))?;
    }

    Ok(exit_codes::SUCCESS)
}
