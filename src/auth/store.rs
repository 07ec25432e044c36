//! CredentialStore - keeps a usable Gmail token on disk
//!
//! Lifecycle:
//! - persisted and still valid: returned as-is
//! - expired with a refresh token: refreshed silently, then persisted
//! - absent (or expired without refresh token): interactive consent, then persisted

use std::path::{Path, PathBuf};
use std::time::Duration;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;
use crate::Result;
use crate::config::GmailConfig;
use crate::error::Error;
use super::callback_server::CallbackListener;
use super::client_secret::{missing_secret_error, ClientSecret};
use super::credentials::{delete_credential, load_credential, save_credential, Credential};
use super::pkce::{random_state, PkcePair};

/// Read-only mail access is all the tools need
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
    grant_type: &'a str,
}

#[derive(Debug, Serialize)]
struct TokenExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    code_verifier: &'a str,
    redirect_uri: &'a str,
    grant_type: &'a str,
}

/// Owns the persisted Gmail credential
#[derive(Clone)]
pub struct CredentialStore {
    client_secret_path: PathBuf,
    token_path: PathBuf,
    http_client: Client,
}

impl CredentialStore {
    pub fn new(config: &GmailConfig, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client_secret_path: config.client_secret_path.clone(),
            token_path: config.token_path.clone(),
            http_client,
        })
    }

    pub fn client_secret_path(&self) -> &Path {
        &self.client_secret_path
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// Return a credential usable for API calls, refreshing or asking for consent
    pub async fn get_valid_credential(&self) -> Result<Credential> {
        if !self.client_secret_path.exists() {
            return Err(missing_secret_error(&self.client_secret_path));
        }

        let stored = match load_credential(&self.token_path) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Ignoring unreadable token at {:?}: {}", self.token_path, e);
                None
            }
        };

        if let Some(credential) = &stored {
            if credential.is_valid() {
                tracing::debug!("Using stored Gmail token");
                return Ok(credential.clone());
            }
        }

        let secret = ClientSecret::load(&self.client_secret_path)?;

        let credential = match stored {
            Some(expired) if expired.can_refresh() => {
                tracing::info!("Gmail token expired, refreshing");
                let refresh_token = expired.refresh_token.as_deref().unwrap_or_default();
                self.refresh(&secret, refresh_token).await?
            }
            _ => {
                tracing::info!("No usable Gmail token, starting consent flow");
                self.authorize(&secret).await?
            }
        };

        save_credential(&self.token_path, &credential)?;
        Ok(credential)
    }

    /// Whether a token has been persisted (it may still need a refresh)
    pub fn has_credential(&self) -> bool {
        matches!(load_credential(&self.token_path), Ok(Some(_)))
    }

    /// Forget the persisted token
    pub fn delete(&self) -> Result<()> {
        delete_credential(&self.token_path)
    }

    async fn refresh(&self, secret: &ClientSecret, refresh_token: &str) -> Result<Credential> {
        let request = RefreshRequest {
            client_id: &secret.client_id,
            client_secret: &secret.client_secret,
            refresh_token,
            grant_type: "refresh_token",
        };

        let token = self.post_token(&secret.token_uri, &request).await
            .map_err(|e| Error::Auth(format!("Token refresh failed: {}", e)))?;

        // Google omits the refresh token on refresh responses
        let refresh = token.refresh_token.or_else(|| Some(refresh_token.to_string()));

        Ok(Credential::new(token.access_token, refresh, token.expires_in).with_scope(token.scope))
    }

    async fn authorize(&self, secret: &ClientSecret) -> Result<Credential> {
        let pkce = PkcePair::generate();
        let state = random_state();
        let listener = CallbackListener::bind().await?;
        let redirect_uri = listener.redirect_uri();

        let auth_url = build_auth_url(secret, &redirect_uri, &pkce.challenge, &state)?;

        println!("\nOpening browser for Gmail authorization...\n");
        println!("If the browser doesn't open, visit this URL:\n{}\n", auth_url);
        if let Err(e) = open::that(&auth_url) {
            tracing::warn!("Failed to open browser: {}", e);
        }

        let auth = listener.wait(&state).await?;

        let request = TokenExchangeRequest {
            client_id: &secret.client_id,
            client_secret: &secret.client_secret,
            code: &auth.code,
            code_verifier: &pkce.verifier,
            redirect_uri: &redirect_uri,
            grant_type: "authorization_code",
        };

        let token = self.post_token(&secret.token_uri, &request).await
            .map_err(|e| Error::Auth(format!("Token exchange failed: {}", e)))?;

        Ok(Credential::new(token.access_token, token.refresh_token, token.expires_in)
            .with_scope(token.scope))
    }

    async fn post_token<T: Serialize>(&self, token_uri: &str, form: &T) -> Result<TokenResponse> {
        let response = self.http_client
            .post(token_uri)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!("{}: {}", status, body)));
        }

        Ok(response.json().await?)
    }
}

fn build_auth_url(
    secret: &ClientSecret,
    redirect_uri: &str,
    code_challenge: &str,
    state: &str,
) -> Result<String> {
    let mut url = Url::parse(&secret.auth_uri)
        .map_err(|e| Error::Config(format!("Invalid auth URI {}: {}", secret.auth_uri, e)))?;

    url.query_pairs_mut()
        .append_pair("client_id", &secret.client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", GMAIL_READONLY_SCOPE)
        .append_pair("code_challenge", code_challenge)
        .append_pair("code_challenge_method", "S256")
        .append_pair("state", state)
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent");

    Ok(url.to_string())
}
