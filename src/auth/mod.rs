//! Gmail OAuth2 credential management
//!
//! This module provides:
//! - Client secret loading
//! - Credential persistence
//! - PKCE and a loopback redirect listener for interactive consent
//! - [`CredentialStore`], which hands out valid credentials

mod callback_server;
mod client_secret;
mod credentials;
mod pkce;
mod store;

pub use client_secret::ClientSecret;
pub use credentials::{Credential, load_credential, save_credential, delete_credential};
pub use store::{CredentialStore, GMAIL_READONLY_SCOPE};
