//! Credential/token store and OAuth bootstrap.
//!
//! The non-interactive path ([`load_or_refresh`]) assumes a token already
//! exists and fails fatally otherwise. The interactive path
//! ([`bootstrap::authorize`]) acquires a token through a browser redirect to
//! a short-lived local listener.

pub mod bootstrap;
pub mod credentials;
pub mod token;

use chrono::Utc;
use tracing::{info, warn};

pub use bootstrap::{authorize, AuthorizeOutcome};
pub use credentials::ClientSecrets;
pub use token::{Token, TokenStore};

use crate::config::AuthSettings;
use crate::drive::GoogleDriveClient;
use crate::errors::AuthError;

/// Build an authenticated Drive client from the files on disk.
///
/// No network call happens unless the stored access token has expired, in
/// which case it is refreshed and the refreshed token written back.
pub async fn load_or_refresh(settings: &AuthSettings) -> Result<GoogleDriveClient, AuthError> {
    let store = TokenStore::new(&settings.credentials_path, &settings.token_path);
    let secrets = store.load_client_secrets()?;
    let token = store.load_token()?;

    let expired = token.is_expired(Utc::now());
    let can_refresh = token.can_refresh();
    let mut client = GoogleDriveClient::new(secrets, settings.endpoints.clone())?.with_token(token);

    if expired {
        if can_refresh {
            info!("access token expired, refreshing");
            let refreshed = client.refresh_access_token().await?;
            store.save_token(&refreshed)?;
        } else {
            warn!(
                path = %store.token_path().display(),
                "access token expired and no refresh token is stored; run 'drivedocs auth' if requests fail"
            );
        }
    }

    info!("authentication successful");
    Ok(client)
}
