//! The persisted OAuth token and the on-disk credential/token store.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::credentials::ClientSecrets;
use crate::drive::TokenResponse;
use crate::errors::AuthError;

/// Tokens this close to expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Access and refresh token as stored in `token.json`.
///
/// The layout matches what the Google client libraries write
/// (`expiry_date` in epoch milliseconds), and fields drivedocs does not know
/// about are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Token {
    /// Build a token from a token-endpoint response received at `now`.
    pub fn from_response(resp: TokenResponse, now: DateTime<Utc>) -> Self {
        let mut extra = serde_json::Map::new();
        if let Some(id_token) = resp.id_token {
            extra.insert("id_token".into(), serde_json::Value::String(id_token));
        }
        Self {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            scope: resp.scope,
            token_type: resp.token_type,
            expiry_date: resp
                .expires_in
                .map(|secs| (now + Duration::seconds(secs)).timestamp_millis()),
            extra,
        }
    }

    /// Fold a refresh response into this token.
    ///
    /// Google usually omits the refresh token when refreshing, in which case
    /// the existing one is kept.
    pub fn merge_refresh(&mut self, resp: TokenResponse, now: DateTime<Utc>) {
        let refreshed = Self::from_response(resp, now);
        self.access_token = refreshed.access_token;
        self.expiry_date = refreshed.expiry_date;
        if refreshed.refresh_token.is_some() {
            self.refresh_token = refreshed.refresh_token;
        }
        if refreshed.scope.is_some() {
            self.scope = refreshed.scope;
        }
        if refreshed.token_type.is_some() {
            self.token_type = refreshed.token_type;
        }
        self.extra.extend(refreshed.extra);
    }

    /// Whether the access token is past (or about to pass) its expiry.
    /// Tokens without an expiry are assumed valid.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry_date {
            Some(ms) => now.timestamp_millis() + EXPIRY_SKEW_SECS * 1000 >= ms,
            None => false,
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Reads the client-secret file and reads/writes the token file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    credentials_path: PathBuf,
    token_path: PathBuf,
}

impl TokenStore {
    pub fn new(credentials_path: impl Into<PathBuf>, token_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            token_path: token_path.into(),
        }
    }

    pub fn credentials_path(&self) -> &Path {
        &self.credentials_path
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// Load `credentials.json`. Absence and corruption are both fatal
    /// configuration errors.
    pub fn load_client_secrets(&self) -> Result<ClientSecrets, AuthError> {
        let path = &self.credentials_path;
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AuthError::CredentialsMissing { path: path.clone() })
            }
            Err(e) => {
                return Err(AuthError::CredentialsInvalid {
                    path: path.clone(),
                    detail: e.to_string(),
                })
            }
        };
        let secrets =
            ClientSecrets::from_json(&contents).map_err(|detail| AuthError::CredentialsInvalid {
                path: path.clone(),
                detail,
            })?;
        debug!(path = %path.display(), "loaded client secrets");
        Ok(secrets)
    }

    /// Load `token.json`.
    pub fn load_token(&self) -> Result<Token, AuthError> {
        let path = &self.token_path;
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AuthError::TokenMissing { path: path.clone() })
            }
            Err(e) => {
                return Err(AuthError::TokenInvalid {
                    path: path.clone(),
                    detail: e.to_string(),
                })
            }
        };
        let token: Token =
            serde_json::from_str(&contents).map_err(|e| AuthError::TokenInvalid {
                path: path.clone(),
                detail: e.to_string(),
            })?;
        debug!(path = %path.display(), "loaded token");
        Ok(token)
    }

    /// Persist `token`, replacing any previous file.
    pub fn save_token(&self, token: &Token) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(token).map_err(|e| AuthError::TokenInvalid {
            path: self.token_path.clone(),
            detail: e.to_string(),
        })?;
        if let Some(parent) = self.token_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.token_path, json)?;
        info!(path = %self.token_path.display(), "token stored");
        Ok(())
    }

    /// Delete a corrupt token so the bootstrap can start over.
    pub fn discard_token(&self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.token_path) {
            Ok(()) => {
                warn!(path = %self.token_path.display(), "discarded token file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn response(refresh: Option<&str>) -> TokenResponse {
        TokenResponse {
            access_token: "ya29.new".into(),
            expires_in: Some(3599),
            refresh_token: refresh.map(String::from),
            scope: Some("https://www.googleapis.com/auth/drive.readonly".into()),
            token_type: Some("Bearer".into()),
            id_token: None,
        }
    }

    #[test]
    fn test_token_from_response_sets_expiry() {
        let token = Token::from_response(response(Some("1//r")), now());
        assert_eq!(
            token.expiry_date,
            Some(now().timestamp_millis() + 3_599_000)
        );
        assert!(!token.is_expired(now()));
        assert!(token.is_expired(now() + Duration::seconds(3550)));
        assert!(token.can_refresh());
    }

    #[test]
    fn test_token_without_expiry_never_expires() {
        let token: Token = serde_json::from_str(r#"{"access_token": "a"}"#).unwrap();
        assert!(!token.is_expired(now()));
        assert!(!token.can_refresh());
    }

    #[test]
    fn test_merge_refresh_keeps_refresh_token() {
        let mut token = Token::from_response(response(Some("1//keep")), now());
        token.merge_refresh(response(None), now() + Duration::hours(2));
        assert_eq!(token.refresh_token.as_deref(), Some("1//keep"));
        assert_eq!(token.access_token, "ya29.new");
        assert!(!token.is_expired(now() + Duration::hours(2)));
    }

    #[test]
    fn test_token_preserves_unknown_fields() {
        let json = r#"{"access_token":"a","refresh_token":"r","expiry_date":1700000000000,"refresh_token_expires_in":604799}"#;
        let token: Token = serde_json::from_str(json).unwrap();
        assert_eq!(token.expiry_date, Some(1_700_000_000_000));
        let out = serde_json::to_value(&token).unwrap();
        assert_eq!(out["refresh_token_expires_in"], 604799);
    }

    #[test]
    fn test_store_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("credentials.json"), dir.path().join("token.json"));
        assert!(matches!(
            store.load_client_secrets(),
            Err(AuthError::CredentialsMissing { .. })
        ));
        assert!(matches!(store.load_token(), Err(AuthError::TokenMissing { .. })));
        store.discard_token().unwrap();
    }

    #[test]
    fn test_store_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("credentials.json"), dir.path().join("token.json"));
        std::fs::write(store.credentials_path(), "{").unwrap();
        std::fs::write(store.token_path(), "[]").unwrap();
        assert!(matches!(
            store.load_client_secrets(),
            Err(AuthError::CredentialsInvalid { .. })
        ));
        assert!(matches!(store.load_token(), Err(AuthError::TokenInvalid { .. })));
        store.discard_token().unwrap();
        assert!(!store.token_path().exists());
    }

    #[test]
    fn test_store_round_trip_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("credentials.json"), dir.path().join("token.json"));
        let token = Token::from_response(response(Some("1//r")), now());
        store.save_token(&token).unwrap();
        assert_eq!(store.load_token().unwrap(), token);
    }
}
