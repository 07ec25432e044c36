//! Turns raw Gmail payloads into [`EmailMessage`] values and plain-text bodies.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use super::types::{EmailMessage, MessagePart, RawMessage};

/// base64url that accepts data with or without `=` padding
const BODY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub const NO_SUBJECT: &str = "No Subject";
pub const UNKNOWN_SENDER: &str = "Unknown Sender";
pub const NO_DATE: &str = "No Date";

const UNREAD_LABEL: &str = "UNREAD";

/// Value of the first header named exactly `name`
pub fn header<'a>(part: &'a MessagePart, name: &str) -> Option<&'a str> {
    part.headers
        .iter()
        .find(|h| h.name == name)
        .map(|h| h.value.as_str())
}

/// Summary fields of a message; the body is left empty
pub fn summarize(raw: &RawMessage) -> EmailMessage {
    let payload = &raw.payload;
    EmailMessage {
        id: raw.id.clone(),
        subject: header(payload, "Subject").unwrap_or(NO_SUBJECT).to_string(),
        sender: header(payload, "From").unwrap_or(UNKNOWN_SENDER).to_string(),
        date: header(payload, "Date").unwrap_or(NO_DATE).to_string(),
        snippet: raw.snippet.clone(),
        body: String::new(),
        is_unread: raw.label_ids.iter().any(|l| l == UNREAD_LABEL),
    }
}

/// Summary plus the extracted plain-text body
pub fn full_message(raw: &RawMessage) -> EmailMessage {
    EmailMessage {
        body: extract_body(&raw.payload),
        ..summarize(raw)
    }
}

/// Plain-text body of a payload, or `""` when none can be found.
///
/// Inline data on the node itself wins. Otherwise children are scanned in
/// order: a `text/plain` part with data is returned, a
/// `multipart/alternative` part is searched the same way, anything else is
/// skipped.
pub fn extract_body(payload: &MessagePart) -> String {
    if let Some(data) = non_empty_data(payload) {
        return decode_body_data(data);
    }

    for part in &payload.parts {
        match part.mime_type.as_str() {
            "text/plain" => {
                if let Some(data) = non_empty_data(part) {
                    return decode_body_data(data);
                }
            }
            "multipart/alternative" => {
                let nested = extract_body(part);
                if !nested.is_empty() {
                    return nested;
                }
            }
            _ => {}
        }
    }

    String::new()
}

fn non_empty_data(part: &MessagePart) -> Option<&str> {
    part.body.data.as_deref().filter(|d| !d.is_empty())
}

/// Decode base64url body data, dropping invalid UTF-8 sequences
pub fn decode_body_data(data: &str) -> String {
    let bytes = match BODY_ENGINE.decode(data.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!("Undecodable body data: {}", e);
            return String::new();
        }
    };

    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}
