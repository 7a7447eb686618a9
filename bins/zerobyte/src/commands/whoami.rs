//! Whoami command

use crate::commands::Context;
use crate::session::not_signed_in;
use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use zerobyte_cli::Status;
use zerobyte_core::error::exit_codes;

pub fn run(ctx: &Context) -> Result<i32> {
    let Some(session) = ctx.sessions.load()? else {
        return Err(not_signed_in().into());
    };
    let expired = session.is_expired(Utc::now());

    if ctx.is_text() {
        Status::info(&session.welcome_message());
        Status::detail("uid", &session.uid);
        Status::detail("provider", &session.provider.to_string());
        let expiry = if expired {
            format!("{} (expired, refreshed on next use)", session.expires_at.to_rfc3339())
        } else {
            session.expires_at.to_rfc3339()
        };
        Status::detail("token expires", &expiry);
    } else {
        ctx.print_json(&json!({
            "uid": session.uid,
            "email": session.email,
            "provider": session.provider,
            "expires_at": session.expires_at,
            "expired": expired,
        }))?;
    }

    Ok(exit_codes::SUCCESS)
}
