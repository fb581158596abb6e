//! Wire types for the Drive v3 and OAuth token endpoints.
//!
//! Only the fields drivedocs requests are modelled; see
//! <https://developers.google.com/drive/api/reference/rest/v3/files>.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// MIME type Drive uses for folders.
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Fallback used when Drive returns an entry without a name.
const UNTITLED: &str = "Untitled";

/// A file or folder as returned by `files.list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    /// Target MIME type to download URL. Only present for native Google
    /// Workspace files.
    #[serde(default)]
    pub export_links: Option<HashMap<String, String>>,
    #[serde(default)]
    pub modified_time: Option<String>,
}

impl DriveEntry {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME
    }

    /// The provider-supplied export URL for `target_mime`, if offered.
    pub fn export_link(&self, target_mime: &str) -> Option<&str> {
        self.export_links
            .as_ref()
            .and_then(|links| links.get(target_mime))
            .map(String::as_str)
    }

    /// The entry's name as a single path component.
    ///
    /// Drive names may contain `/`, which would otherwise nest the output one
    /// level deeper (or climb out with `..`).
    pub fn local_name(&self) -> String {
        let name = self.name.trim();
        match name {
            "" | "." | ".." => UNTITLED.to_string(),
            _ => name.replace(['/', '\\'], "_"),
        }
    }
}

/// One page of a `files.list` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePage {
    #[serde(default)]
    pub files: Vec<DriveEntry>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Response from the OAuth token endpoint (code exchange or refresh).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_page() {
        let json = r#"{
            "nextPageToken": "tok",
            "files": [
                {"id": "f1", "name": "Guides", "mimeType": "application/vnd.google-apps.folder"},
                {"id": "d1", "name": "Intro", "mimeType": "application/vnd.google-apps.document",
                 "modifiedTime": "2024-01-02T03:04:05.000Z",
                 "exportLinks": {"text/markdown": "https://docs.google.com/export?id=d1&exportFormat=md"}}
            ]
        }"#;
        let page: FilePage = serde_json::from_str(json).unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("tok"));
        assert!(page.files[0].is_folder());
        assert!(!page.files[1].is_folder());
        assert_eq!(
            page.files[1].export_link("text/markdown"),
            Some("https://docs.google.com/export?id=d1&exportFormat=md")
        );
        assert_eq!(page.files[1].export_link("application/pdf"), None);
        assert_eq!(page.files[0].export_link("text/markdown"), None);
    }

    #[test]
    fn test_parse_empty_page() {
        let page: FilePage = serde_json::from_str("{}").unwrap();
        assert!(page.files.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_local_name() {
        let mut entry = DriveEntry {
            name: "Q1/Q2 plans".into(),
            ..Default::default()
        };
        assert_eq!(entry.local_name(), "Q1_Q2 plans");
        entry.name = "  ".into();
        assert_eq!(entry.local_name(), "Untitled");
        entry.name = "..".into();
        assert_eq!(entry.local_name(), "Untitled");
        entry.name = "Design Notes".into();
        assert_eq!(entry.local_name(), "Design Notes");
    }
}
