//! Node status command

use crate::commands::Context;
use anyhow::Result;
use chrono::Utc;
use owo_colors::OwoColorize;
use serde_json::json;
use std::time::Instant;
use zerobyte_cli::Status;
use zerobyte_cli::output::format_duration;
use zerobyte_cli::progress::spinner;
use zerobyte_core::error::exit_codes;

pub async fn run(ctx: &Context, detailed: bool) -> Result<i32> {
    let client = ctx.client()?;
    let api_url = client.config().ipfs_api_url.clone();

    let pb = ctx.is_text().then(|| spinner("Checking connection..."));
    let start = Instant::now();
    let status = client.ipfs().check_online().await;
    let elapsed = start.elapsed();
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let version = if detailed && status.online {
        client.ipfs().version().await.ok()
    } else {
        None
    };
    let session = ctx.sessions.load().ok().flatten();
    let config = client.config();

    if ctx.is_text() {
        if status.online {
            Status::success("Online");
        } else {
            Status::error(&format!("Offline: {}", status.message));
        }
        Status::detail("node", &api_url);
        if let Some(v) = &status.version {
            Status::detail("version", v);
        }

        if detailed {
            Status::detail("response time", &format_duration(elapsed));
            if let Some(v) = &version {
                Status::detail("commit", &v.commit);
                Status::detail("repo", &v.repo);
                Status::detail("system", &v.system);
            }

            Status::header("Services");
            Status::detail("virustotal", &key_state(config.virustotal_api_key.is_some()));
            Status::detail("firebase", &key_state(config.firebase_api_key.is_some()));
            Status::detail(
                "download scan",
                if ctx.config.schema.download.scan { "enabled" } else { "disabled" },
            );
            let config_file = ctx
                .config
                .path
                .as_ref()
                .map_or_else(|| "defaults (no file)".to_string(), |p| p.display().to_string());
            Status::detail("config", &config_file);

            Status::header("Session");
            match &session {
                Some(s) if s.is_expired(Utc::now()) => {
                    Status::detail("user", &format!("{} (token expired)", s.display_name()));
                }
                Some(s) => Status::detail("user", &s.display_name()),
                None => Status::detail("user", "not signed in"),
            }
        }
    } else {
        let mut out = json!({
            "online": status.online,
            "message": status.message,
            "node": api_url,
            "version": status.version,
        });
        if detailed {
            out["details"] = json!({
                "response_time_ms": elapsed.as_millis() as u64,
                "node_version": version,
                "virustotal_configured": config.virustotal_api_key.is_some(),
                "firebase_configured": config.firebase_api_key.is_some(),
                "download_scan": ctx.config.schema.download.scan,
                "config_path": ctx.config.path,
                "signed_in": session.as_ref().map(|s| s.uid.clone()),
            });
        }
        ctx.print_json(&out)?;
    }

    Ok(if status.online {
        exit_codes::SUCCESS
    } else {
        exit_codes::NETWORK_ERROR
    })
}

fn key_state(configured: bool) -> String {
    if configured {
        "API key configured".green().to_string()
    } else {
        "API key missing".yellow().to_string()
    }
}
