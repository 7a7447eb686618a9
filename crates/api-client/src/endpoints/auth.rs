//! Firebase identity endpoints
//!
//! REST equivalents of the email/password, anonymous and Google sign-in
//! flows, plus ID token refresh.

use crate::client::{Service, ZeroByteClient};
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tracing::info;

/// Firebase identity API interface
#[derive(Clone)]
pub struct AuthApi {
    client: ZeroByteClient,
}

impl AuthApi {
    /// Create a new identity API interface
    pub(crate) fn new(client: ZeroByteClient) -> Self {
        Self { client }
    }

    fn api_key(&self) -> ApiResult<&str> {
        self.client
            .config()
            .firebase_api_key
            .as_deref()
            .ok_or(ApiError::MissingApiKey("firebase"))
    }

    async fn accounts(&self, method: &str, body: serde_json::Value) -> ApiResult<AccountResponse> {
        let key = self.api_key()?;
        let url = format!(
            "{}/accounts:{method}",
            self.client.config().identity_url.trim_end_matches('/')
        );

        self.client
            .send_json(Service::Identity, |c| c.post(&url).query(&[("key", key)]).json(&body))
            .await
            .map_err(map_auth_error)
    }

    /// Sign in with email and password
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> ApiResult<AuthSession> {
        let body = json!({ "email": email, "password": password, "returnSecureToken": true });
        let account = self.accounts("signInWithPassword", body).await?;
        let session = account.into_session(AuthProvider::Password)?;
        info!(uid = %session.uid, "Signed in with password");
        Ok(session)
    }

    /// Create an email/password account and sign in to it
    pub async fn sign_up(&self, email: &str, password: &str) -> ApiResult<AuthSession> {
        let body = json!({ "email": email, "password": password, "returnSecureToken": true });
        let account = self.accounts("signUp", body).await?;
        let session = account.into_session(AuthProvider::Password)?;
        info!(uid = %session.uid, "Created account");
        Ok(session)
    }

    /// Create an anonymous account
    pub async fn sign_in_anonymously(&self) -> ApiResult<AuthSession> {
        let account = self.accounts("signUp", json!({ "returnSecureToken": true })).await?;
        let session = account.into_session(AuthProvider::Anonymous)?;
        info!(uid = %session.uid, "Signed in anonymously");
        Ok(session)
    }

    /// Exchange a Google ID token for a session
    pub async fn sign_in_with_google(&self, google_id_token: &str) -> ApiResult<AuthSession> {
        let body = json!({
            "postBody": format!("id_token={google_id_token}&providerId=google.com"),
            "requestUri": "http://localhost",
            "returnIdpCredential": true,
            "returnSecureToken": true,
        });
        let account = self.accounts("signInWithIdp", body).await?;
        let session = account.into_session(AuthProvider::Google)?;
        info!(uid = %session.uid, "Signed in with Google");
        Ok(session)
    }

    /// Exchange a refresh token for a new ID token
    pub async fn refresh(&self, refresh_token: &str) -> ApiResult<RefreshedToken> {
        let key = self.api_key()?;
        let url = format!("{}/token", self.client.config().token_url.trim_end_matches('/'));
        let form = [("grant_type", "refresh_token"), ("refresh_token", refresh_token)];

        let raw: RawRefresh = self
            .client
            .send_json(Service::Identity, |c| c.post(&url).query(&[("key", key)]).form(&form))
            .await
            .map_err(map_auth_error)?;

        Ok(RefreshedToken {
            uid: raw.user_id,
            id_token: raw.id_token,
            refresh_token: raw.refresh_token,
            expires_in: parse_expires_in(&raw.expires_in),
        })
    }
}

/// Turn a rejected identity request into an [`ApiError::Auth`]
fn map_auth_error(err: ApiError) -> ApiError {
    match err {
        ApiError::ApiResponse { status, message } if (400..500).contains(&status) => {
            // Messages look like "WEAK_PASSWORD : Password should be at least 6 characters"
            let code = message
                .split(|c: char| c == ' ' || c == ':')
                .next()
                .unwrap_or_default()
                .to_string();
            let message = describe_auth_error(&code);
            ApiError::Auth { code, message }
        }
        other => other,
    }
}

/// Human-readable explanation of a Firebase error code
#[must_use]
pub fn describe_auth_error(code: &str) -> String {
    let text = match code {
        "EMAIL_NOT_FOUND" => "No account exists for this email",
        "INVALID_PASSWORD" => "Wrong password",
        "INVALID_LOGIN_CREDENTIALS" => "Invalid email or password",
        "EMAIL_EXISTS" => "An account with this email already exists",
        "WEAK_PASSWORD" => "Password should be at least 6 characters",
        "INVALID_EMAIL" | "MISSING_EMAIL" => "Invalid email address",
        "MISSING_PASSWORD" => "Password is required",
        "USER_DISABLED" => "This account has been disabled",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts, try again later",
        "OPERATION_NOT_ALLOWED" | "ADMIN_ONLY_OPERATION" => "This sign-in method is disabled for the project",
        "INVALID_IDP_RESPONSE" => "Google rejected the ID token",
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => "Session expired, please sign in again",
        "INVALID_API_KEY" | "API_KEY_INVALID" => "The Firebase API key is not valid",
        _ => return format!("Authentication failed ({code})"),
    };
    text.to_string()
}

fn parse_expires_in(value: &str) -> u64 {
    value.trim().parse().unwrap_or(3600)
}

/// How a session was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    /// Email and password
    Password,
    /// Anonymous account
    Anonymous,
    /// Google account
    Google,
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password => f.write_str("password"),
            Self::Anonymous => f.write_str("anonymous"),
            Self::Google => f.write_str("google"),
        }
    }
}

/// A signed-in user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    /// Firebase user id
    pub uid: String,
    /// Email, absent for anonymous accounts
    pub email: Option<String>,
    /// Short-lived ID token
    pub id_token: String,
    /// Long-lived refresh token
    pub refresh_token: String,
    /// ID token lifetime in seconds
    pub expires_in: u64,
    /// Sign-in method
    pub provider: AuthProvider,
}

/// New tokens from a refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshedToken {
    /// Firebase user id
    pub uid: String,
    /// New ID token
    pub id_token: String,
    /// Refresh token to use next time
    pub refresh_token: String,
    /// ID token lifetime in seconds
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: Option<String>,
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: String,
}

impl AccountResponse {
    fn into_session(self, provider: AuthProvider) -> ApiResult<AuthSession> {
        let id_token = self
            .id_token
            .ok_or_else(|| ApiError::unexpected("sign-in response has no idToken"))?;
        let refresh_token = self
            .refresh_token
            .ok_or_else(|| ApiError::unexpected("sign-in response has no refreshToken"))?;

        Ok(AuthSession {
            uid: self.local_id,
            email: self.email.filter(|e| !e.is_empty()),
            id_token,
            refresh_token,
            expires_in: parse_expires_in(&self.expires_in),
            provider,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawRefresh {
    id_token: String,
    refresh_token: String,
    user_id: String,
    #[serde(default)]
    expires_in: String,
}
