//! Google Drive v3 / OAuth REST client.

use std::fmt;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER, USER_AGENT};
use tracing::{debug, info, instrument};

use super::api::DriveApi;
use super::model::{FilePage, TokenResponse};
use crate::auth::{ClientSecrets, Token};
use crate::config::GoogleEndpoints;
use crate::errors::DriveError;

/// Fields requested from `files.list`.
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, exportLinks, modifiedTime)";

/// Asynchronous client for Drive listing, export downloads and the OAuth
/// token endpoint.
#[derive(Clone)]
pub struct GoogleDriveClient {
    http: reqwest::Client,
    endpoints: GoogleEndpoints,
    secrets: ClientSecrets,
    token: Option<Token>,
}

impl fmt::Debug for GoogleDriveClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleDriveClient")
            .field("endpoints", &self.endpoints)
            .field("client_id", &self.secrets.client_id)
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

impl GoogleDriveClient {
    pub fn new(secrets: ClientSecrets, endpoints: GoogleEndpoints) -> Result<Self, DriveError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("drivedocs/", env!("CARGO_PKG_VERSION"))),
        );
        let http = reqwest::Client::builder().default_headers(headers).build()?;
        let endpoints = GoogleEndpoints {
            api_url: endpoints.api_url.trim_end_matches('/').to_string(),
            ..endpoints
        };
        info!(api_url = %endpoints.api_url, "created GoogleDriveClient");
        Ok(Self {
            http,
            endpoints,
            secrets,
            token: None,
        })
    }

    pub fn with_token(mut self, token: Token) -> Self {
        self.token = Some(token);
        self
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn secrets(&self) -> &ClientSecrets {
        &self.secrets
    }

    /// Use the refresh token to obtain a new access token.
    ///
    /// Returns the merged token, which the caller is expected to persist.
    #[instrument(skip(self))]
    pub async fn refresh_access_token(&mut self) -> Result<Token, DriveError> {
        let token = self.token.as_ref().ok_or(DriveError::NotAuthenticated)?;
        let refresh_token = token
            .refresh_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or(DriveError::NotAuthenticated)?;

        let resp = self
            .http
            .post(&self.endpoints.token_url)
            .form(&[
                ("client_id", self.secrets.client_id.as_str()),
                ("client_secret", self.secrets.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;
        let resp = check_response(resp).await?;
        let body: TokenResponse = parse_json(resp).await?;

        let mut merged = token.clone();
        merged.merge_refresh(body, Utc::now());
        self.token = Some(merged.clone());
        info!("refreshed access token");
        Ok(merged)
    }

    fn access_token(&self) -> Result<&str, DriveError> {
        self.token
            .as_ref()
            .map(|t| t.access_token.as_str())
            .filter(|t| !t.is_empty())
            .ok_or(DriveError::NotAuthenticated)
    }
}

#[async_trait]
impl DriveApi for GoogleDriveClient {
    #[instrument(skip(self))]
    async fn list_children(
        &self,
        parent_id: &str,
        drive_id: &str,
        page_token: Option<&str>,
    ) -> Result<FilePage, DriveError> {
        let url = format!("{}/files", self.endpoints.api_url);
        let query = format!("'{}' in parents and trashed = false", parent_id);
        let mut req = self
            .http
            .get(&url)
            .bearer_auth(self.access_token()?)
            .query(&[
                ("q", query.as_str()),
                ("corpora", "drive"),
                ("driveId", drive_id),
                ("includeItemsFromAllDrives", "true"),
                ("supportsAllDrives", "true"),
                ("fields", LIST_FIELDS),
            ]);
        if let Some(token) = page_token {
            req = req.query(&[("pageToken", token)]);
        }
        let resp = check_response(req.send().await?).await?;
        let page: FilePage = parse_json(resp).await?;
        debug!(
            count = page.files.len(),
            has_more = page.next_page_token.is_some(),
            "listed folder page"
        );
        Ok(page)
    }

    #[instrument(skip(self))]
    async fn export(&self, export_url: &str) -> Result<String, DriveError> {
        let resp = self
            .http
            .get(export_url)
            .header(ACCEPT, "*/*")
            .bearer_auth(self.access_token()?)
            .send()
            .await?;
        let resp = check_response(resp).await?;
        let body = resp.text().await?;
        debug!(bytes = body.len(), "downloaded export");
        Ok(body)
    }

    #[instrument(skip(self, code))]
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<Token, DriveError> {
        let resp = self
            .http
            .post(&self.endpoints.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.secrets.client_id.as_str()),
                ("client_secret", self.secrets.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        let resp = check_response(resp).await?;
        let body: TokenResponse = parse_json(resp).await?;
        info!(has_refresh_token = body.refresh_token.is_some(), "exchanged authorization code");
        Ok(Token::from_response(body, Utc::now()))
    }
}

/// Turn non-success statuses into [`DriveError`]s, reading the error body
/// when one is available.
async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, DriveError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let retry_after = resp
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let body = resp.text().await.unwrap_or_default();
    match status.as_u16() {
        401 | 403 => Err(DriveError::AuthenticationFailed {
            status: status.as_u16(),
            body,
        }),
        429 => Err(DriveError::RateLimited { retry_after }),
        code => Err(DriveError::Api { status: code, body }),
    }
}

async fn parse_json<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, DriveError> {
    let text = resp.text().await?;
    serde_json::from_str(&text).map_err(|e| DriveError::Parse(e.to_string()))
}
