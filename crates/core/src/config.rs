//! TOML-based configuration for drivedocs.
//!
//! The config file plays the role of static plugin options: every value in it
//! can be overridden on the command line, and every section has a built-in
//! default so an absent file is equivalent to an empty one. Callers turn a
//! [`DocsConfig`] into the explicit settings structs ([`AuthSettings`],
//! [`SyncSettings`]) that the rest of the crate takes as parameters.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;
use crate::markdown::{ExportFormat, ExportTable, LinkRewriter};

/// Default config file name, looked up in the site directory.
pub const DEFAULT_CONFIG_FILE: &str = "drivedocs.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsConfig {
    /// Which shared drive (and folder inside it) to mirror.
    #[serde(default)]
    pub drive: DriveConfig,

    /// Where generated Markdown goes.
    #[serde(default)]
    pub output: OutputConfig,

    /// Credential and token files plus OAuth bootstrap settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Site-specific rendering settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// Google endpoints.
    #[serde(default)]
    pub google: GoogleEndpoints,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Export mapping. Defaults to Google Doc to Markdown.
    #[serde(default = "default_export_formats")]
    pub export: Vec<ExportFormat>,
}

fn default_export_formats() -> Vec<ExportFormat> {
    ExportTable::default().formats().to_vec()
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            drive: DriveConfig::default(),
            output: OutputConfig::default(),
            auth: AuthConfig::default(),
            site: SiteConfig::default(),
            google: GoogleEndpoints::default(),
            logging: LoggingConfig::default(),
            export: default_export_formats(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Shared drive selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Identifier of the shared drive (used as the `driveId` query scope).
    #[serde(default)]
    pub shared_drive_id: Option<String>,

    /// Optional folder inside the shared drive to start from.
    #[serde(default)]
    pub nested_folder_id: Option<String>,
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory, relative to the site directory unless absolute.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("docs")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

/// Credential store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// OAuth client secret file, relative to the site directory.
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,

    /// Persisted token file, relative to the site directory.
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,

    /// Port of the local redirect listener used by `auth`.
    #[serde(default = "default_callback_port")]
    pub callback_port: u16,

    /// OAuth scopes requested during the bootstrap.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("credentials.json")
}
fn default_token_path() -> PathBuf {
    PathBuf::from("token.json")
}
fn default_callback_port() -> u16 {
    8080
}
fn default_scopes() -> Vec<String> {
    vec!["https://www.googleapis.com/auth/drive.readonly".into()]
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            token_path: default_token_path(),
            callback_port: default_callback_port(),
            scopes: default_scopes(),
        }
    }
}

/// Rendering settings for the generated site.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Document served as the site's home page (`slug: /`).
    #[serde(default)]
    pub root_doc_id: Option<String>,

    /// Regex used to detect links to other Google Docs. Must capture the
    /// label in group 1 and the document id in group 2.
    #[serde(default)]
    pub link_pattern: Option<String>,
}

/// Google OAuth and Drive endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleEndpoints {
    /// Drive v3 API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// OAuth token endpoint.
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// OAuth consent page.
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
}

fn default_api_url() -> String {
    "https://www.googleapis.com/drive/v3".into()
}
fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".into()
}
fn default_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".into()
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token_url: default_token_url(),
            auth_url: default_auth_url(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also append logs to this file (relative to the site directory).
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved settings
// ---------------------------------------------------------------------------

/// Everything the credential store and the OAuth bootstrap need.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub credentials_path: PathBuf,
    pub token_path: PathBuf,
    pub callback_port: u16,
    pub scopes: Vec<String>,
    pub endpoints: GoogleEndpoints,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct SyncOverrides {
    pub shared_drive_id: Option<String>,
    pub nested_folder_id: Option<String>,
    pub output_dir: Option<PathBuf>,
}

/// Everything a sync run needs, with precedence already applied.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Shared drive scoping every listing call.
    pub shared_drive_id: String,
    /// Folder the walk starts from: the nested folder, else the drive root.
    pub root_folder_id: String,
    /// Absolute (or site-relative) directory that is wiped and rebuilt.
    pub output_dir: PathBuf,
    pub root_doc_id: Option<String>,
    pub links: LinkRewriter,
    pub export_formats: ExportTable,
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl DocsConfig {
    /// Load a [`DocsConfig`] from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Parse a [`DocsConfig`] from a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load `path` if given (it must exist), else `<site_dir>/drivedocs.toml`
    /// if present, else built-in defaults.
    pub fn discover(site_dir: &Path, path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => {
                let candidate = site_dir.join(DEFAULT_CONFIG_FILE);
                if candidate.exists() {
                    Self::load_from_file(candidate)
                } else {
                    debug!(site_dir = %site_dir.display(), "no config file found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Validate that the values present are sane.
    ///
    /// Absent optional values are fine here; the shared drive id is only
    /// required once CLI overrides have been applied in
    /// [`DocsConfig::sync_settings`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("drive.shared_drive_id", &self.drive.shared_drive_id),
            ("drive.nested_folder_id", &self.drive.nested_folder_id),
            ("site.root_doc_id", &self.site.root_doc_id),
        ] {
            if matches!(value.as_deref(), Some(v) if v.trim().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    detail: "must not be empty when set".into(),
                });
            }
        }
        if self.output.dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "output.dir".into(),
                detail: "output directory must not be empty".into(),
            });
        }
        if self.auth.callback_port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "auth.callback_port".into(),
                detail: "callback port must be > 0".into(),
            });
        }
        if self.auth.scopes.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "auth.scopes".into(),
                detail: "at least one OAuth scope is required".into(),
            });
        }
        if self.export.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "export".into(),
                detail: "at least one export format is required".into(),
            });
        }
        self.link_rewriter()?;
        Ok(())
    }

    fn link_rewriter(&self) -> Result<LinkRewriter, ConfigError> {
        match &self.site.link_pattern {
            None => Ok(LinkRewriter::default()),
            Some(p) => LinkRewriter::new(p).map_err(|detail| ConfigError::InvalidValue {
                field: "site.link_pattern".into(),
                detail,
            }),
        }
    }

    /// Resolve credential store settings relative to `site_dir`.
    pub fn auth_settings(&self, site_dir: &Path) -> AuthSettings {
        AuthSettings {
            credentials_path: site_dir.join(&self.auth.credentials_path),
            token_path: site_dir.join(&self.auth.token_path),
            callback_port: self.auth.callback_port,
            scopes: self.auth.scopes.clone(),
            endpoints: self.google.clone(),
        }
    }

    /// Apply CLI flag > config file > built-in default precedence.
    pub fn sync_settings(
        &self,
        overrides: &SyncOverrides,
        site_dir: &Path,
    ) -> Result<SyncSettings, ConfigError> {
        let shared_drive_id = first_non_empty(
            overrides.shared_drive_id.as_deref(),
            self.drive.shared_drive_id.as_deref(),
        )
        .ok_or_else(|| ConfigError::MissingValue {
            flag: "--shared-drive-id".into(),
            field: "drive.shared_drive_id".into(),
        })?;

        let nested_folder_id = first_non_empty(
            overrides.nested_folder_id.as_deref(),
            self.drive.nested_folder_id.as_deref(),
        );

        let output_dir = overrides
            .output_dir
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(self.output.dir.as_path());

        let settings = SyncSettings {
            root_folder_id: nested_folder_id.unwrap_or(shared_drive_id).to_string(),
            shared_drive_id: shared_drive_id.to_string(),
            output_dir: site_dir.join(output_dir),
            root_doc_id: self.site.root_doc_id.clone(),
            links: self.link_rewriter()?,
            export_formats: ExportTable::new(self.export.clone()),
        };
        debug!(
            shared_drive_id = %settings.shared_drive_id,
            root_folder_id = %settings.root_folder_id,
            output_dir = %settings.output_dir.display(),
            "resolved sync settings"
        );
        Ok(settings)
    }

    /// Generate a default TOML config template string.
    pub fn default_template() -> &'static str {
        r#"# drivedocs configuration
# Every value can be overridden on the command line.

[drive]
shared_drive_id = "your-shared-drive-id"
# nested_folder_id = "folder-inside-the-shared-drive"

[output]
dir = "docs"

[auth]
credentials_path = "credentials.json"
token_path = "token.json"
callback_port = 8080
scopes = ["https://www.googleapis.com/auth/drive.readonly"]

[site]
# root_doc_id = "id-of-the-home-page-document"
# link_pattern = '\[((?:\\.|[^\]\\])*)\]\(https://docs\.google\.com/document/d/([^/)\s]+)/edit[^)]*\)'

[logging]
level = "info"
# file = "drivedocs.log"
"#
    }
}

fn first_non_empty<'a>(primary: Option<&'a str>, fallback: Option<&'a str>) -> Option<&'a str> {
    primary
        .filter(|v| !v.is_empty())
        .or(fallback.filter(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> &'static str {
        r#"
[drive]
shared_drive_id = "0ACo0rf1yKpmjUk9PVA"
nested_folder_id = "1KGbXzCh5qJcxr"

[output]
dir = "content/docs"

[auth]
credentials_path = "secrets/credentials.json"
callback_port = 9090

[site]
root_doc_id = "home-doc"

[logging]
level = "debug"
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config = DocsConfig::from_toml_str(sample_toml()).unwrap();
        assert_eq!(config.drive.shared_drive_id.as_deref(), Some("0ACo0rf1yKpmjUk9PVA"));
        assert_eq!(config.output.dir, PathBuf::from("content/docs"));
        assert_eq!(config.auth.callback_port, 9090);
        assert_eq!(config.auth.token_path, PathBuf::from("token.json"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.export, vec![ExportFormat::google_doc_markdown()]);
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = DocsConfig::from_toml_str("").unwrap();
        assert_eq!(config.output.dir, PathBuf::from("docs"));
        assert_eq!(config.auth.credentials_path, PathBuf::from("credentials.json"));
        assert_eq!(config.auth.callback_port, 8080);
        assert_eq!(config.google, GoogleEndpoints::default());
        assert!(config.drive.shared_drive_id.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_default_template_parses() {
        let config = DocsConfig::from_toml_str(DocsConfig::default_template()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.drive.shared_drive_id.as_deref(), Some("your-shared-drive-id"));
    }

    #[test]
    fn test_cli_overrides_config() {
        let config = DocsConfig::from_toml_str(sample_toml()).unwrap();
        let overrides = SyncOverrides {
            shared_drive_id: Some("cli-drive".into()),
            nested_folder_id: Some("cli-folder".into()),
            output_dir: Some(PathBuf::from("out")),
        };
        let settings = config.sync_settings(&overrides, Path::new("/site")).unwrap();
        assert_eq!(settings.shared_drive_id, "cli-drive");
        assert_eq!(settings.root_folder_id, "cli-folder");
        assert_eq!(settings.output_dir, PathBuf::from("/site/out"));
    }

    #[test]
    fn test_config_used_when_no_override() {
        let config = DocsConfig::from_toml_str(sample_toml()).unwrap();
        let settings = config
            .sync_settings(&SyncOverrides::default(), Path::new("/site"))
            .unwrap();
        assert_eq!(settings.shared_drive_id, "0ACo0rf1yKpmjUk9PVA");
        assert_eq!(settings.root_folder_id, "1KGbXzCh5qJcxr");
        assert_eq!(settings.output_dir, PathBuf::from("/site/content/docs"));
        assert_eq!(settings.root_doc_id.as_deref(), Some("home-doc"));
    }

    #[test]
    fn test_root_folder_falls_back_to_drive() {
        let config = DocsConfig::default();
        let overrides = SyncOverrides {
            shared_drive_id: Some("drive".into()),
            nested_folder_id: Some(String::new()),
            ..Default::default()
        };
        let settings = config.sync_settings(&overrides, Path::new("/site")).unwrap();
        assert_eq!(settings.root_folder_id, "drive");
        assert_eq!(settings.output_dir, PathBuf::from("/site/docs"));
    }

    #[test]
    fn test_missing_shared_drive_id() {
        let config = DocsConfig::default();
        let err = config
            .sync_settings(&SyncOverrides::default(), Path::new("."))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingValue { .. }));
    }

    #[test]
    fn test_validation_rejects_bad_link_pattern() {
        let mut config = DocsConfig::default();
        config.site.link_pattern = Some(r"no groups here".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("site.link_pattern"));
    }

    #[test]
    fn test_validation_rejects_zero_port() {
        let mut config = DocsConfig::default();
        config.auth.callback_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_auth_settings_relative_to_site() {
        let config = DocsConfig::from_toml_str(sample_toml()).unwrap();
        let auth = config.auth_settings(Path::new("/site"));
        assert_eq!(auth.credentials_path, PathBuf::from("/site/secrets/credentials.json"));
        assert_eq!(auth.token_path, PathBuf::from("/site/token.json"));
    }

    #[test]
    fn test_discover_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DocsConfig::discover(dir.path(), None).unwrap();
        assert_eq!(config.output.dir, PathBuf::from("docs"));

        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            DocsConfig::discover(dir.path(), Some(&missing)),
            Err(ConfigError::FileNotFound(_))
        ));
    }
}
