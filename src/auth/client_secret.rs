//! OAuth client secret file
//!
//! Google issues desktop client secrets as JSON with the client wrapped in an
//! `installed` (or, for web clients, `web`) object.

use serde::Deserialize;
use std::path::Path;
use crate::Result;
use crate::error::Error;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// OAuth client registration used for consent and refresh
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URL.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

impl ClientSecret {
    /// Read the client secret, failing with a configuration error naming the path
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(missing_secret_error(path));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("Invalid client secret at {}: {}", path.display(), e)))
    }

    fn parse(content: &str) -> Result<Self> {
        let file: ClientSecretFile = serde_json::from_str(content)?;
        file.installed
            .or(file.web)
            .ok_or_else(|| Error::Config("expected an \"installed\" or \"web\" client".to_string()))
    }
}

/// Error reported whenever the client secret file is absent
pub fn missing_secret_error(path: &Path) -> Error {
    Error::Config(format!(
        "Gmail credentials not found at {}. Download an OAuth desktop client secret \
         from the Google Cloud console and save it there.",
        path.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_installed_client() {
        let json = r#"{"installed": {
            "client_id": "abc.apps.googleusercontent.com",
            "client_secret": "shh",
            "redirect_uris": ["http://localhost"]
        }}"#;
        let secret = ClientSecret::parse(json).unwrap();
        assert_eq!(secret.client_id, "abc.apps.googleusercontent.com");
        assert_eq!(secret.client_secret, "shh");
        assert_eq!(secret.token_uri, GOOGLE_TOKEN_URL);
        assert_eq!(secret.auth_uri, GOOGLE_AUTH_URL);
    }

    #[test]
    fn test_parse_web_client_with_custom_token_uri() {
        let json = r#"{"web": {
            "client_id": "id",
            "client_secret": "secret",
            "token_uri": "http://127.0.0.1:9/token"
        }}"#;
        let secret = ClientSecret::parse(json).unwrap();
        assert_eq!(secret.token_uri, "http://127.0.0.1:9/token");
    }

    #[test]
    fn test_parse_rejects_unknown_layout() {
        assert!(ClientSecret::parse(r#"{"client_id": "id"}"#).is_err());
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = ClientSecret::load(Path::new("does/not/exist.json")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("does/not/exist.json"));
    }
}
