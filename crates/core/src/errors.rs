//! Error types for the drivedocs core library.
//!
//! Each subsystem has its own error type derived with `thiserror`. The CLI
//! wraps them in `anyhow` with context at the call site.

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading, validation and precedence resolution.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A required value was given neither on the command line nor in the
    /// config file.
    #[error("{flag} must be provided either on the command line or as '{field}' in the config file")]
    MissingValue { flag: String, field: String },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Authentication errors
// ---------------------------------------------------------------------------

/// Errors from the credential/token store and the OAuth bootstrap.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The client-secret file does not exist.
    #[error("client secret file not found: {path}. Download it from Google Cloud Console (APIs & Services > Credentials > OAuth 2.0 Client IDs) and save it there")]
    CredentialsMissing { path: PathBuf },

    /// The client-secret file exists but could not be understood.
    #[error("error loading client secret file {path}: {detail}")]
    CredentialsInvalid { path: PathBuf, detail: String },

    /// No token has been issued yet.
    #[error("token file not found: {path}. Run 'drivedocs auth' first to generate it")]
    TokenMissing { path: PathBuf },

    /// The token file is corrupt.
    #[error("error loading token from {path}: {detail}. Delete it and run 'drivedocs auth' again")]
    TokenInvalid { path: PathBuf, detail: String },

    /// The provider redirected back without an authorization code.
    #[error("no authorization code received")]
    NoAuthorizationCode,

    /// The user (or the provider) refused the consent request.
    #[error("authorization denied by provider: {0}")]
    ProviderDenied(String),

    /// The redirect carried a `state` value we did not issue.
    #[error("authorization state mismatch; the redirect did not originate from this request")]
    StateMismatch,

    /// The local callback listener failed.
    #[error("local callback server error: {0}")]
    Listener(String),

    /// The configured consent page URL cannot be used.
    #[error("invalid authorization endpoint: {0}")]
    InvalidEndpoint(String),

    /// Token exchange or refresh failed at the transport level.
    #[error("token request failed: {0}")]
    Drive(#[from] DriveError),

    /// Reading or writing the token file failed.
    #[error("auth I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Drive API errors
// ---------------------------------------------------------------------------

/// Errors from Google Drive / OAuth REST interactions.
#[derive(Debug, Error)]
pub enum DriveError {
    /// HTTP-level transport error (network, TLS, etc.).
    #[error("Drive HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned a non-success status code.
    #[error("Drive API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    /// Access token is missing, expired or lacks the required scope.
    #[error("Drive authentication failed (HTTP {status}): {body}")]
    AuthenticationFailed { status: u16, body: String },

    /// Rate limit exceeded.
    #[error("Drive rate limit exceeded (retry after {retry_after})")]
    RateLimited { retry_after: String },

    /// JSON deserialization failure.
    #[error("Drive response parse error: {0}")]
    Parse(String),

    /// The client has no access token to send.
    #[error("no access token available; authenticate first")]
    NotAuthenticated,
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Per-file errors raised while exporting a single document.
///
/// None of these abort a sync; the replicator logs them and moves on.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The entry's MIME type has no row in the export table.
    #[error("no export mapping for MIME type '{mime_type}'")]
    UnsupportedMimeType { mime_type: String },

    /// Drive did not offer the target format for this file.
    #[error("no export link for '{name}' to '{target}'")]
    MissingExportLink { name: String, target: String },

    /// Fetching the exported content failed.
    #[error("export download failed: {0}")]
    Transport(#[from] DriveError),

    /// Writing the output file failed.
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Sync errors
// ---------------------------------------------------------------------------

/// Errors that abort a whole sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The target directory could not be emptied or recreated.
    #[error("failed to clear output directory '{path}': {source}")]
    Clear {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = AuthError::CredentialsMissing {
            path: PathBuf::from("/site/credentials.json"),
        };
        assert!(err.to_string().contains("/site/credentials.json"));

        let err = AuthError::TokenMissing {
            path: PathBuf::from("token.json"),
        };
        assert!(err.to_string().contains("drivedocs auth"));

        let err = ConfigError::MissingValue {
            flag: "--shared-drive-id".into(),
            field: "drive.shared_drive_id".into(),
        };
        assert!(err.to_string().contains("--shared-drive-id"));

        let err = DriveError::Api {
            status: 500,
            body: "backend error".into(),
        };
        assert_eq!(err.to_string(), "Drive API error (HTTP 500): backend error");
    }

    #[test]
    fn test_drive_error_converts_into_auth_and_export() {
        let export_err: ExportError = DriveError::RateLimited {
            retry_after: "30".into(),
        }
        .into();
        assert!(matches!(export_err, ExportError::Transport(DriveError::RateLimited { .. })));

        let auth_err: AuthError = DriveError::NotAuthenticated.into();
        assert!(matches!(auth_err, AuthError::Drive(DriveError::NotAuthenticated)));
    }
}
