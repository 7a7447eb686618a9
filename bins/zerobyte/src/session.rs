//! Persisted sign-in state
//!
//! The session lives in a small JSON file so that `upload` and `download`
//! can run in later invocations without signing in again.

use anyhow::{Context as _, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zerobyte_api_client::ZeroByteClient;
use zerobyte_api_client::endpoints::{AuthProvider, AuthSession, RefreshedToken};
use zerobyte_api_client::ApiError;
use zerobyte_core::{Error, ErrorCode};

/// ID tokens this close to expiry are refreshed before use
const EXPIRY_SKEW_SECS: i64 = 60;

/// A signed-in user as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub provider: AuthProvider,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn from_auth(auth: AuthSession, now: DateTime<Utc>) -> Self {
        Self {
            uid: auth.uid,
            email: auth.email,
            provider: auth.provider,
            id_token: auth.id_token,
            refresh_token: auth.refresh_token,
            expires_at: now + Duration::seconds(secs_i64(auth.expires_in)),
        }
    }

    /// Swap in freshly issued tokens
    pub fn apply_refresh(&mut self, refreshed: RefreshedToken, now: DateTime<Utc>) {
        self.id_token = refreshed.id_token;
        self.refresh_token = refreshed.refresh_token;
        self.expires_at = now + Duration::seconds(secs_i64(refreshed.expires_in));
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECS) >= self.expires_at
    }

    pub fn welcome_message(&self) -> String {
        match &self.email {
            Some(email) => format!("Welcome, {email}"),
            None => "Welcome to ZeroByte".to_string(),
        }
    }

    /// Email, or a description of the account when it has none
    pub fn display_name(&self) -> String {
        self.email
            .clone()
            .unwrap_or_else(|| format!("{} user {}", self.provider, self.uid))
    }
}

/// Token lifetimes are capped at a year to keep date arithmetic in range
fn secs_i64(secs: u64) -> i64 {
    secs.min(365 * 24 * 60 * 60) as i64
}

/// Reads and writes the session file
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `ZEROBYTE_SESSION`, else `<config_dir>/zerobyte/session.json`
    pub fn default_location() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os("ZEROBYTE_SESSION").filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("zerobyte").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored session; an unreadable file counts as signed out
    pub fn load(&self) -> Result<Option<Session>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read session file {}", self.path.display()));
            }
        };

        match serde_json::from_str(&content) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring corrupt session file");
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(session)?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&self.path)
            .with_context(|| format!("Failed to open session file {}", self.path.display()))?;

        // `mode` only applies on creation; tighten an existing file before the token lands in it
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write session file {}", self.path.display()))?;

        debug!(path = %self.path.display(), "Saved session");
        Ok(())
    }

    /// Remove the stored session; returns whether there was one
    pub fn clear(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

pub fn not_signed_in() -> Error {
    Error::new(ErrorCode::NotSignedIn, "Not signed in").with_suggestion("Run `zerobyte login` first")
}

/// Return a usable session, refreshing its ID token when it has expired
pub async fn ensure_session(store: &SessionStore, client: &ZeroByteClient) -> Result<Session> {
    let Some(mut session) = store.load()? else {
        return Err(not_signed_in().into());
    };

    let now = Utc::now();
    if !session.is_expired(now) {
        return Ok(session);
    }

    debug!(uid = %session.uid, "ID token expired, refreshing");
    match client.auth().refresh(&session.refresh_token).await {
        Ok(refreshed) => {
            session.apply_refresh(refreshed, Utc::now());
            store.save(&session)?;
            info!(uid = %session.uid, "Refreshed session");
            Ok(session)
        }
        Err(ApiError::Auth { message, .. }) => {
            store.clear()?;
            Err(Error::new(ErrorCode::SessionExpired, message)
                .with_suggestion("Run `zerobyte login` again")
                .into())
        }
        Err(e) => Err(e).context("Failed to refresh session"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(now: DateTime<Utc>) -> Session {
        Session::from_auth(
            AuthSession {
                uid: "uid-1".into(),
                email: Some("ada@example.com".into()),
                id_token: "id".into(),
                refresh_token: "rt".into(),
                expires_in: 3600,
                provider: AuthProvider::Password,
            },
            now,
        )
    }

    #[test]
    fn test_expiry_with_skew() {
        let now = Utc::now();
        let session = sample(now);
        assert!(!session.is_expired(now));
        assert!(!session.is_expired(now + Duration::seconds(3500)));
        assert!(session.is_expired(now + Duration::seconds(3541)));
    }

    #[test]
    fn test_apply_refresh() {
        let now = Utc::now();
        let mut session = sample(now - Duration::hours(2));
        assert!(session.is_expired(now));

        session.apply_refresh(
            RefreshedToken {
                uid: "uid-1".into(),
                id_token: "id-2".into(),
                refresh_token: "rt-2".into(),
                expires_in: 3600,
            },
            now,
        );
        assert_eq!(session.id_token, "id-2");
        assert!(!session.is_expired(now));
    }

    #[test]
    fn test_welcome_message() {
        let mut session = sample(Utc::now());
        assert_eq!(session.welcome_message(), "Welcome, ada@example.com");
        session.email = None;
        session.provider = AuthProvider::Anonymous;
        assert_eq!(session.welcome_message(), "Welcome to ZeroByte");
        assert_eq!(session.display_name(), "anonymous user uid-1");
    }

    #[test]
    fn test_store_roundtrip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));

        assert!(store.load().unwrap().is_none());
        assert!(!store.clear().unwrap());

        let session = sample(Utc::now());
        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), Some(session));

        assert!(store.clear().unwrap());
        assert!(store.load().unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        store.save(&sample(Utc::now())).unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_readable_file_is_tightened() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = SessionStore::new(path.clone());
        let session = sample(Utc::now());
        store.save(&session).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load().unwrap(), Some(session));
    }

    #[test]
    fn test_corrupt_file_is_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(SessionStore::new(path).load().unwrap().is_none());
    }
}
