//! Google Drive access for drivedocs.

pub mod api;
pub mod client;
pub mod model;

pub use api::DriveApi;
pub use client::GoogleDriveClient;
pub use model::{DriveEntry, FilePage, TokenResponse, FOLDER_MIME};
