//! Logout command

use crate::commands::Context;
use anyhow::Result;
use serde_json::json;
use zerobyte_cli::Status;
use zerobyte_core::error::exit_codes;

pub fn run(ctx: &Context) -> Result<i32> {
    let removed = ctx.sessions.clear()?;

    if ctx.is_text() {
        if removed {
            Status::success("Logged out successfully");
        } else {
            Status::info("Not signed in");
        }
    } else {
        ctx.print_json(&json!({ "success": true, "was_signed_in": removed }))?;
    }

    Ok(exit_codes::SUCCESS)
}
