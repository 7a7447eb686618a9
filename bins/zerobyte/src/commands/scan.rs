//! Scan command, plus the scan step shared with upload and download

use crate::commands::Context;
use anyhow::Result;
use serde_json::json;
use std::path::Path;
use zerobyte_api_client::ZeroByteClient;
use zerobyte_api_client::endpoints::{ScanReport, ScanSource, ScanStats};
use zerobyte_cli::Status;
use zerobyte_cli::output::format_count;
use zerobyte_cli::progress::{finish_error, finish_success, spinner};
use zerobyte_core::error::exit_codes;
use zerobyte_core::validation::validate_upload_path;
use zerobyte_core::{Error, ErrorCode};

pub async fn run(ctx: &Context, file: &Path) -> Result<i32> {
    check_file(file)?;
    let client = ctx.client()?;
    let report = scan_with_progress(ctx, &client, file).await?;

    if ctx.is_text() {
        print_report(&report);
    } else {
        ctx.print_json(&json!({
            "file": file,
            "sha256": report.sha256,
            "verdict": report.verdict(),
            "source": report.source,
            "stats": report.stats,
        }))?;
    }

    Ok(if report.stats.is_infected() {
        exit_codes::SECURITY_ERROR
    } else {
        exit_codes::SUCCESS
    })
}

/// Reject paths that are not readable regular files
pub fn check_file(file: &Path) -> Result<()> {
    let validation = validate_upload_path(file);
    for warning in validation.warnings() {
        Status::warning(&warning.to_string());
    }
    validation.to_result()?;
    Ok(())
}

/// Scan `file`, showing a spinner in text mode
///
/// Any failure is reported as a scan failure so callers treat it as a
/// security outcome rather than a plain network error.
pub async fn scan_with_progress(ctx: &Context, client: &ZeroByteClient, file: &Path) -> Result<ScanReport> {
    let pb = ctx.is_text().then(|| spinner("Scanning for viruses..."));

    match client.virustotal().scan_file(file).await {
        Ok(report) => {
            if let Some(pb) = pb {
                finish_success(&pb, "Scan complete");
            }
            Ok(report)
        }
        Err(e) => {
            if let Some(pb) = pb {
                finish_error(&pb, "Scan failed");
            }
            let code = e.code();
            let scan_error = if code == ErrorCode::MissingApiKey {
                Error::new(code, e.to_string())
                    .with_suggestion("Set VIRUSTOTAL_API_KEY or [virustotal] api_key in the config file")
            } else {
                Error::new(ErrorCode::ScanFailed, format!("Scan failed: {e}"))
                    .with_suggestion("Try again in a minute; the free VirusTotal API allows 4 requests per minute")
            };
            Err(scan_error.with_source(e).into())
        }
    }
}

/// Number of engines that found nothing wrong
pub fn clean_count(stats: &ScanStats) -> u32 {
    stats.undetected + stats.harmless
}

pub fn print_report(report: &ScanReport) {
    let stats = &report.stats;
    let engines = format_count(u64::from(stats.total()), "engine", "engines");

    if stats.is_infected() {
        Status::error(&format!(
            "Threats found: {} malicious, {} suspicious ({engines})",
            stats.malicious, stats.suspicious
        ));
    } else {
        Status::success(&format!("No threats found ({engines})"));
    }
    Status::detail("sha256", &report.sha256);
    Status::detail(
        "report",
        match report.source {
            ScanSource::Cached => "existing VirusTotal analysis",
            ScanSource::Fresh => "new VirusTotal analysis",
        },
    );
}
