//! drivedocs core library.
//!
//! This crate provides the building blocks for mirroring a Google Drive
//! shared drive into a tree of Markdown files: configuration, the
//! credential/token store and OAuth bootstrap, the Drive REST client, the
//! Markdown post-processing and the replicator that ties them together.

pub mod auth;
pub mod config;
pub mod drive;
pub mod errors;
pub mod markdown;
pub mod replicator;

// Re-exports for convenience.
pub use auth::{authorize, load_or_refresh, AuthorizeOutcome, TokenStore};
pub use config::{AuthSettings, DocsConfig, SyncOverrides, SyncSettings};
pub use drive::{DriveApi, GoogleDriveClient};
pub use replicator::{Replicator, SyncStats};
