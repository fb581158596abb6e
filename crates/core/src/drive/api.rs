//! The provider operations drivedocs depends on.

use async_trait::async_trait;

use crate::auth::Token;
use crate::errors::DriveError;

use super::model::FilePage;

/// Narrow view of Google Drive and its OAuth endpoint.
///
/// [`GoogleDriveClient`](super::GoogleDriveClient) talks to the real service;
/// tests substitute an in-memory implementation.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// List one page of non-trashed children of `parent_id` inside the shared
    /// drive `drive_id`.
    async fn list_children(
        &self,
        parent_id: &str,
        drive_id: &str,
        page_token: Option<&str>,
    ) -> Result<FilePage, DriveError>;

    /// Download a converted representation via a per-file export link.
    async fn export(&self, export_url: &str) -> Result<String, DriveError>;

    /// Trade an authorization code for a token.
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<Token, DriveError>;
}
