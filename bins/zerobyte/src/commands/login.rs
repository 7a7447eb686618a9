//! Login command

use crate::commands::Context;
use crate::session::Session;
use anyhow::{Context as _, Result};
use chrono::Utc;
use clap::Args;
use serde_json::json;
use zerobyte_cli::Status;
use zerobyte_core::error::exit_codes;
use zerobyte_core::validation::validate_credentials;
use zerobyte_core::{Error, ErrorCode};

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email
    #[arg(short, long, env = "ZEROBYTE_EMAIL")]
    pub email: Option<String>,

    /// Account password
    #[arg(short, long, env = "ZEROBYTE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Create the account instead of signing in
    #[arg(long, conflicts_with_all = ["anonymous", "google_id_token"])]
    pub signup: bool,

    /// Sign in without an account
    #[arg(long, conflicts_with = "google_id_token")]
    pub anonymous: bool,

    /// Sign in with a Google ID token
    #[arg(long, value_name = "TOKEN")]
    pub google_id_token: Option<String>,
}

pub async fn run(ctx: &Context, args: LoginArgs) -> Result<i32> {
    let client = ctx.client()?;
    let auth = client.auth();

    let session = if args.anonymous {
        auth.sign_in_anonymously().await.context("Anonymous sign-in failed")?
    } else if let Some(token) = args.google_id_token.as_deref() {
        auth.sign_in_with_google(token).await.context("Google sign-in failed")?
    } else {
        let email = args.email.as_deref().map(str::trim).unwrap_or_default();
        let password = args.password.as_deref().unwrap_or_default();
        if email.is_empty() || password.is_empty() {
            return Err(Error::new(ErrorCode::InvalidInput, "Please enter email and password")
                .with_suggestion("Pass --email and --password, or use --anonymous")
                .into());
        }
        validate_credentials(email, password).to_result()?;

        if args.signup {
            auth.sign_up(email, password).await.context("Sign up failed")?
        } else {
            auth.sign_in_with_password(email, password)
                .await
                .context("Authentication failed")?
        }
    };

    let session = Session::from_auth(session, Utc::now());
    ctx.sessions.save(&session)?;

    if ctx.is_text() {
        Status::success(&session.welcome_message());
    } else {
        ctx.print_json(&json!({
            "success": true,
            "uid": session.uid,
            "email": session.email,
            "provider": session.provider,
            "expires_at": session.expires_at,
        }))?;
    }

    Ok(exit_codes::SUCCESS)
}
