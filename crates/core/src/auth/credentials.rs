//! OAuth client secrets (`credentials.json`).

use serde::Deserialize;

/// The OAuth client registered in Google Cloud Console.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

/// Google wraps the client in `installed` (desktop apps) or `web`.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parse the JSON downloaded from Google Cloud Console.
    pub fn from_json(contents: &str) -> Result<Self, String> {
        let file: CredentialsFile = serde_json::from_str(contents).map_err(|e| e.to_string())?;
        file.installed
            .or(file.web)
            .ok_or_else(|| "expected an 'installed' or 'web' client section".to_string())
    }
}
