//! Credential persistence
//!
//! The authorized Gmail token is kept as JSON at a configurable path and
//! overwritten after every consent or refresh.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::Result;

/// Tokens are treated as expired this long before their real expiry
const EXPIRY_BUFFER_MINUTES: i64 = 5;

/// OAuth2 credential with access and refresh tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token sent with API requests
    pub access_token: String,

    /// Used to obtain a new access token without user interaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Scopes granted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Credential {
    /// Build a credential from a token endpoint response
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) -> Self {
        let expires_at = expires_in_secs.map(|secs| {
            Utc::now() + chrono::Duration::seconds(secs)
        });

        Self {
            access_token,
            refresh_token,
            token_type: default_token_type(),
            expires_at,
            scope: None,
        }
    }

    pub fn with_scope(mut self, scope: Option<String>) -> Self {
        self.scope = scope;
        self
    }

    /// True when the token expires within the next few minutes
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => {
                Utc::now() + chrono::Duration::minutes(EXPIRY_BUFFER_MINUTES) >= expires
            }
            None => false,
        }
    }

    /// Usable as-is for API requests
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Load a persisted credential, `None` when the file does not exist
pub fn load_credential(path: &Path) -> Result<Option<Credential>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let credential: Credential = serde_json::from_str(&content)?;
    Ok(Some(credential))
}

/// Persist a credential, replacing whatever was stored before
pub fn save_credential(path: &Path, credential: &Credential) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let content = serde_json::to_string_pretty(credential)?;
    std::fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

/// Remove a persisted credential if present
pub fn delete_credential(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}
