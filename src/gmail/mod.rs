//! Read-only Gmail access for the agent
//!
//! - [`client`]: REST calls behind the [`MailApi`] trait
//! - [`format`]: header summaries and MIME body extraction
//! - [`mailbox`]: search, unread count, read and recent listing, with
//!   failures reported in-band

pub mod client;
pub mod format;
pub mod mailbox;
pub mod types;

pub use client::{DetailLevel, GmailClient, MailApi};
pub use mailbox::{GoogleConnector, MailConnector, Mailbox};
pub use types::{EmailMessage, EmailSearchResult, RawMessage};

/// Whether this build ships the Gmail tools
pub const fn is_available() -> bool {
    cfg!(feature = "gmail")
}
