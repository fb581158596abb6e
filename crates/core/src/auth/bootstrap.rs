//! Interactive OAuth authorization-code bootstrap.
//!
//! Serves a single route on a local port, sends the user to Google's consent
//! page, waits for the redirect carrying the authorization code, exchanges it
//! and stores the token. The listener is shut down before returning on every
//! path, successful or not.

use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::token::{Token, TokenStore};
use crate::config::AuthSettings;
use crate::drive::{DriveApi, GoogleDriveClient};
use crate::errors::AuthError;

const SUCCESS_PAGE: &str = "<html><body>Authentication successful! You can close this tab.</body></html>";
const FAILURE_PAGE: &str = "<html><body>Authentication failed. Check the terminal for details.</body></html>";

/// Result of [`authorize`].
#[derive(Debug)]
pub enum AuthorizeOutcome {
    /// A readable token was already on disk; nothing was done.
    AlreadyAuthorized,
    /// A new token was obtained and stored.
    Authorized(Token),
}

type CallbackResult = Result<String, AuthError>;

struct CallbackState {
    expected_state: String,
    result: Mutex<Option<oneshot::Sender<CallbackResult>>>,
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Run the interactive authorization flow.
///
/// `on_url` receives the consent URL once the listener is up; the CLI opens
/// it in a browser and prints it as a fallback.
pub async fn authorize<F>(settings: &AuthSettings, on_url: F) -> Result<AuthorizeOutcome, AuthError>
where
    F: FnOnce(&str),
{
    let store = TokenStore::new(&settings.credentials_path, &settings.token_path);
    let secrets = store.load_client_secrets()?;

    match store.load_token() {
        Ok(_) => {
            info!(
                path = %store.token_path().display(),
                "token already exists; delete it and run again to re-authenticate"
            );
            return Ok(AuthorizeOutcome::AlreadyAuthorized);
        }
        Err(AuthError::TokenInvalid { path, detail }) => {
            warn!(path = %path.display(), %detail, "existing token is invalid, re-authenticating");
            store.discard_token()?;
        }
        Err(AuthError::TokenMissing { .. }) => {}
        Err(e) => return Err(e),
    }

    let client = GoogleDriveClient::new(secrets, settings.endpoints.clone())?;

    let listener = TcpListener::bind(("127.0.0.1", settings.callback_port))
        .await
        .map_err(|e| AuthError::Listener(e.to_string()))?;
    let port = listener
        .local_addr()
        .map_err(|e| AuthError::Listener(e.to_string()))?
        .port();
    let redirect_uri = format!("http://localhost:{port}");
    let state = Uuid::new_v4().simple().to_string();
    let auth_url = authorization_url(
        &settings.endpoints.auth_url,
        &client.secrets().client_id,
        &redirect_uri,
        &settings.scopes,
        &state,
    )?;

    let (result_tx, result_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let app = Router::new()
        .route("/", get(callback))
        .with_state(Arc::new(CallbackState {
            expected_state: state,
            result: Mutex::new(Some(result_tx)),
        }));
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });
    info!(%redirect_uri, "local callback server listening");

    on_url(&auth_url);

    let received = result_rx.await.unwrap_or_else(|_| {
        Err(AuthError::Listener(
            "callback server stopped before receiving a redirect".into(),
        ))
    });

    let _ = shutdown_tx.send(());
    match server.await {
        Ok(Ok(())) => debug!("callback server closed"),
        Ok(Err(e)) => warn!(error = %e, "callback server exited with an error"),
        Err(e) => warn!(error = %e, "callback server task failed"),
    }

    let code = received?;
    let token = client.exchange_code(&code, &redirect_uri).await?;
    store.save_token(&token)?;
    Ok(AuthorizeOutcome::Authorized(token))
}

/// Build the consent page URL requesting offline access.
pub fn authorization_url(
    auth_url: &str,
    client_id: &str,
    redirect_uri: &str,
    scopes: &[String],
    state: &str,
) -> Result<String, AuthError> {
    let scope = scopes.join(" ");
    let url = reqwest::Url::parse_with_params(
        auth_url,
        &[
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", state),
        ],
    )
    .map_err(|e| AuthError::InvalidEndpoint(format!("{auth_url}: {e}")))?;
    Ok(url.into())
}

async fn callback(
    State(cb): State<Arc<CallbackState>>,
    Query(params): Query<CallbackParams>,
) -> Html<&'static str> {
    let result = if let Some(error) = params.error {
        Err(AuthError::ProviderDenied(error))
    } else if params.state.as_deref() != Some(cb.expected_state.as_str()) {
        Err(AuthError::StateMismatch)
    } else {
        params
            .code
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::NoAuthorizationCode)
    };

    let page = if result.is_ok() { SUCCESS_PAGE } else { FAILURE_PAGE };

    let sender = cb.result.lock().ok().and_then(|mut slot| slot.take());
    match sender {
        Some(tx) => {
            let _ = tx.send(result);
        }
        None => debug!("ignoring redirect received after the flow completed"),
    }
    Html(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_url_parameters() {
        let url = authorization_url(
            "https://accounts.google.com/o/oauth2/v2/auth",
            "client-123",
            "http://localhost:8080",
            &["https://www.googleapis.com/auth/drive.readonly".to_string()],
            "xyz",
        )
        .unwrap();
        let parsed = reqwest::Url::parse(&url).unwrap();
        let params: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["redirect_uri"], "http://localhost:8080");
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["state"], "xyz");
        assert_eq!(
            params["scope"],
            "https://www.googleapis.com/auth/drive.readonly"
        );
    }

    #[test]
    fn test_authorization_url_rejects_bad_endpoint() {
        let err = authorization_url("not a url", "c", "http://localhost:1", &[], "s").unwrap_err();
        assert!(matches!(err, AuthError::InvalidEndpoint(_)));
    }
}
